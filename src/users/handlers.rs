use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        jwt::AuthUser,
        password::{digest, make_salt},
    },
    error::ApiError,
    state::AppState,
    users::model::{validate, PublicUser, User},
};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Loads the target user of a `/api/users/:user_id` request. A missing row
/// and a failed lookup are distinct conditions with distinct messages.
pub async fn resolve(db: &PgPool, id: Uuid) -> Result<User, ApiError> {
    match User::find_by_id(db, id).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(ApiError::NotFound("User not found".into())),
        Err(err) => {
            error!(error = %err, user_id = %id, "user lookup failed");
            Err(ApiError::Store("Could not retrieve user".into()))
        }
    }
}

/// Ownership check for mutating operations: the verified caller must be the
/// user being modified. Reads deliberately skip this.
pub fn authorize(subject: Uuid, owner: Uuid) -> Result<(), ApiError> {
    if subject == owner {
        Ok(())
    } else {
        Err(ApiError::Forbidden("User is not authorized".into()))
    }
}

#[instrument(skip(state, payload))]
pub async fn create(
    State(state): State<AppState>,
    Json(mut payload): Json<CreateUserRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.name = payload.name.trim().to_string();
    payload.email = payload.email.trim().to_lowercase();
    validate(&payload.name, &payload.email, payload.password.as_deref(), true)?;

    let salt = make_salt();
    let hashed = digest(payload.password.as_deref().unwrap_or_default(), &salt);
    let user =
        User::insert(&state.db, &payload.name, &payload.email, &salt, &hashed).await?;

    info!(user_id = %user.id, email = %user.email, "user signed up");
    Ok(Json(MessageResponse {
        message: "Successfully signed up!".into(),
    }))
}

#[instrument(skip(state))]
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<PublicUser>>, ApiError> {
    let users = User::list(&state.db).await?;
    Ok(Json(users))
}

#[instrument(skip(state))]
pub async fn read(
    State(state): State<AppState>,
    AuthUser(_subject): AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<PublicUser>, ApiError> {
    let user = resolve(&state.db, user_id).await?;
    Ok(Json(PublicUser::from(user)))
}

#[instrument(skip(state, payload))]
pub async fn update(
    State(state): State<AppState>,
    AuthUser(subject): AuthUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    let mut user = resolve(&state.db, user_id).await?;
    authorize(subject, user.id)?;

    if let Some(name) = payload.name {
        user.name = name.trim().to_string();
    }
    if let Some(email) = payload.email {
        user.email = email.trim().to_lowercase();
    }
    validate(&user.name, &user.email, payload.password.as_deref(), false)?;
    if let Some(plain) = payload.password.as_deref() {
        user.set_password(plain);
    }

    let updated = user.update(&state.db).await?;
    info!(user_id = %updated.id, "user updated");
    Ok(Json(PublicUser::from(updated)))
}

#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    AuthUser(subject): AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<PublicUser>, ApiError> {
    let user = resolve(&state.db, user_id).await?;
    authorize(subject, user.id)?;

    let deleted = match User::delete(&state.db, user_id).await? {
        Some(user) => user,
        None => {
            // Raced with a concurrent delete.
            warn!(user_id = %user_id, "user vanished before delete");
            return Err(ApiError::NotFound("User not found".into()));
        }
    };
    info!(user_id = %deleted.id, "user deleted");
    Ok(Json(PublicUser::from(deleted)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_allows_the_owner_only() {
        let ann = Uuid::new_v4();
        let bob = Uuid::new_v4();
        assert!(authorize(ann, ann).is_ok());
        assert_eq!(
            authorize(ann, bob).unwrap_err(),
            ApiError::Forbidden("User is not authorized".into())
        );
    }

    #[test]
    fn signup_rejects_short_password_before_hashing() {
        let err = validate("Ann", "ann@x.com", Some("ab"), true).unwrap_err();
        assert_eq!(
            err,
            ApiError::Validation("Password must be at least 6 characters.".into())
        );
    }
}
