use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

/// Error taxonomy for the whole service. Handlers return these instead of
/// ad-hoc status tuples; the single `IntoResponse` impl below is the only
/// place error kinds are mapped to transport responses.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ApiError {
    /// Field-level validation failure, produced at entity-validate time.
    #[error("{0}")]
    Validation(String),
    /// Duplicate key rejected by the database (unique email).
    #[error("{0}")]
    Unique(String),
    /// Lookup by identifier found no record.
    #[error("{0}")]
    NotFound(String),
    /// Signin with an unknown email or a wrong password.
    #[error("{0}")]
    Authentication(String),
    /// Missing, malformed, tampered or expired token.
    #[error("{0}")]
    Unauthorized(String),
    /// Authenticated caller is not the owner of the resource.
    #[error("{0}")]
    Forbidden(String),
    /// Unexpected persistence failure, already logged.
    #[error("{0}")]
    Store(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            // Not-found by id intentionally shares 400 with store failures
            // for wire compatibility; the variants stay distinct.
            ApiError::Validation(_)
            | ApiError::Unique(_)
            | ApiError::NotFound(_)
            | ApiError::Store(_) => StatusCode::BAD_REQUEST,
            ApiError::Authentication(_) | ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    /// Normalizes a persistence error into a stable, user-facing message.
    /// Unique violations name the offending field; everything else becomes
    /// a generic failure. Pure: no logging, no panics.
    pub fn from_sqlx(err: &sqlx::Error) -> ApiError {
        if let sqlx::Error::Database(db) = err {
            if db.code().as_deref() == Some("23505") {
                return ApiError::Unique(unique_message(db.constraint()));
            }
        }
        ApiError::Store("Something went wrong".into())
    }
}

/// The `?` boundary for repo calls. Unexpected store errors are logged here,
/// once, before the raw error is discarded.
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        let normalized = ApiError::from_sqlx(&err);
        if matches!(normalized, ApiError::Store(_)) {
            error!(error = %err, "database error");
        }
        normalized
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Builds "<Field> already exists" from a unique-index name such as
/// `users_email_key`. Falls back to a generic message when the name does not
/// follow the `<table>_<field>_key` convention.
fn unique_message(constraint: Option<&str>) -> String {
    let field = constraint
        .and_then(|name| name.strip_suffix("_key").or_else(|| name.strip_suffix("_idx")))
        .and_then(|name| name.rsplit('_').next())
        .filter(|field| !field.is_empty());
    match field {
        Some(field) => {
            let mut chars = field.chars();
            let first = chars.next().map(|c| c.to_uppercase().to_string()).unwrap_or_default();
            format!("{}{} already exists", first, chars.as_str())
        }
        None => "Unique field already exists".into(),
    }
}
