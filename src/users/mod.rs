use crate::state::AppState;
use axum::{routing::get, Router};

pub mod handlers;
pub mod model;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(handlers::list).post(handlers::create))
        .route(
            "/api/users/:user_id",
            get(handlers::read)
                .put(handlers::update)
                .delete(handlers::remove),
        )
}
