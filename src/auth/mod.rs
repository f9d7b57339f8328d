use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub mod handlers;
pub mod jwt;
pub mod password;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/signin", post(handlers::signin))
        .route("/auth/signout", get(handlers::signout))
}
