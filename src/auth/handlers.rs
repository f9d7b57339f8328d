use axum::{
    extract::{FromRef, State},
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::jwt::JwtKeys,
    error::ApiError,
    state::AppState,
    users::model::{PublicUser, User},
};

#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SigninResponse {
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[instrument(skip(state, payload))]
pub async fn signin(
    State(state): State<AppState>,
    Json(mut payload): Json<SigninRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let user = User::find_by_email(&state.db, &payload.email)
        .await
        .map_err(|err| {
            error!(error = %err, "signin lookup failed");
            ApiError::Store("Something went wrong".into())
        })?
        .ok_or_else(|| {
            warn!(email = %payload.email, "signin unknown email");
            ApiError::Authentication("User not found".into())
        })?;

    if !user.authenticate(&payload.password) {
        warn!(user_id = %user.id, "signin invalid password");
        return Err(ApiError::Authentication(
            "Email and password don't match.".into(),
        ));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id).map_err(|err| {
        error!(error = %err, "jwt sign failed");
        ApiError::Store("Something went wrong".into())
    })?;

    info!(user_id = %user.id, "user signed in");
    let cookie = format!("t={token}; HttpOnly; Path=/; SameSite=Lax");
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(SigninResponse {
            token,
            user: PublicUser::from(user),
        }),
    ))
}

/// Stateless signout: instructs the client to drop its cookie. A previously
/// issued token keeps verifying until it expires.
#[instrument]
pub async fn signout() -> impl IntoResponse {
    let cookie = "t=; HttpOnly; Path=/; Max-Age=0".to_string();
    (
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(MessageResponse {
            message: "signed out".into(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[test]
    fn signin_response_serializes_sanitized_user() {
        let mut user = User {
            id: Uuid::new_v4(),
            name: "Ann".into(),
            email: "ann@x.com".into(),
            salt: String::new(),
            hashed_password: String::new(),
            created: OffsetDateTime::now_utc(),
            updated: None,
        };
        user.set_password("secret1");
        let (salt, hash) = (user.salt.clone(), user.hashed_password.clone());

        let json = serde_json::to_string(&SigninResponse {
            token: "tok".into(),
            user: PublicUser::from(user),
        })
        .unwrap();
        assert!(json.contains("ann@x.com"));
        assert!(!json.contains(&salt));
        assert!(!json.contains(&hash));
    }
}
