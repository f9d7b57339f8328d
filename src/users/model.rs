use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::password::{authenticate, digest, make_salt};
use crate::error::ApiError;

/// User record as stored. The salt and digest never serialize, so even a
/// path that leaks the raw row cannot expose them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub salt: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated: Option<OffsetDateTime>,
}

impl User {
    /// Replaces the (salt, digest) pair atomically from a plaintext that is
    /// dropped as soon as this returns.
    pub fn set_password(&mut self, plain: &str) {
        self.salt = make_salt();
        self.hashed_password = digest(plain, &self.salt);
    }

    pub fn authenticate(&self, plain: &str) -> bool {
        authenticate(plain, &self.salt, &self.hashed_password)
    }
}

/// Sanitized view returned by every endpoint that serializes a user.
#[derive(Debug, Serialize, FromRow)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated: Option<OffsetDateTime>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            created: user.created,
            updated: user.updated,
        }
    }
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Field-level validation run before every persistence write. Checks run in
/// field declaration order and the first failure wins, so error messages are
/// stable.
pub fn validate(
    name: &str,
    email: &str,
    password: Option<&str>,
    is_new: bool,
) -> Result<(), ApiError> {
    let mut errors: Vec<&str> = Vec::new();
    if name.is_empty() {
        errors.push("Name is required");
    }
    if email.is_empty() {
        errors.push("Email is required");
    } else if !is_valid_email(email) {
        errors.push("Please fill a valid email address");
    }
    if is_new && password.is_none() {
        errors.push("Password is required");
    }
    if let Some(plain) = password {
        if plain.chars().count() < 6 {
            errors.push("Password must be at least 6 characters.");
        }
    }
    match errors.first() {
        Some(message) => Err(ApiError::Validation((*message).to_string())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
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
        user
    }

    #[test]
    fn set_password_fills_salt_and_digest() {
        let user = sample_user();
        assert!(!user.salt.is_empty());
        assert!(!user.hashed_password.is_empty());
        assert_ne!(user.hashed_password, "secret1");
    }

    #[test]
    fn set_password_replaces_both_fields() {
        let mut user = sample_user();
        let (old_salt, old_hash) = (user.salt.clone(), user.hashed_password.clone());
        user.set_password("another7");
        assert_ne!(user.salt, old_salt);
        assert_ne!(user.hashed_password, old_hash);
    }

    #[test]
    fn authenticate_matches_only_the_set_password() {
        let user = sample_user();
        assert!(user.authenticate("secret1"));
        assert!(!user.authenticate("secret2"));
    }

    #[test]
    fn serialized_user_hides_secret_fields() {
        let json = serde_json::to_string(&sample_user()).unwrap();
        assert!(!json.contains("salt"));
        assert!(!json.contains("hashed_password"));
        assert!(json.contains("ann@x.com"));
    }

    #[test]
    fn public_user_carries_no_secret_fields() {
        let user = sample_user();
        let (salt, hash) = (user.salt.clone(), user.hashed_password.clone());
        let json = serde_json::to_string(&PublicUser::from(user)).unwrap();
        assert!(!json.contains(&salt));
        assert!(!json.contains(&hash));
    }

    #[test]
    fn validate_requires_name_and_email() {
        assert_eq!(
            validate("", "ann@x.com", Some("secret1"), true).unwrap_err(),
            ApiError::Validation("Name is required".into())
        );
        assert_eq!(
            validate("Ann", "", Some("secret1"), true).unwrap_err(),
            ApiError::Validation("Email is required".into())
        );
        assert_eq!(
            validate("Ann", "not-an-email", Some("secret1"), true).unwrap_err(),
            ApiError::Validation("Please fill a valid email address".into())
        );
    }

    #[test]
    fn validate_password_rules() {
        assert_eq!(
            validate("Ann", "ann@x.com", None, true).unwrap_err(),
            ApiError::Validation("Password is required".into())
        );
        assert_eq!(
            validate("Ann", "ann@x.com", Some("ab"), true).unwrap_err(),
            ApiError::Validation("Password must be at least 6 characters.".into())
        );
        // On update the password is optional, but the length rule still
        // applies when one is supplied.
        assert!(validate("Ann", "ann@x.com", None, false).is_ok());
        assert_eq!(
            validate("Ann", "ann@x.com", Some("ab"), false).unwrap_err(),
            ApiError::Validation("Password must be at least 6 characters.".into())
        );
    }

    #[test]
    fn first_failing_field_wins() {
        assert_eq!(
            validate("", "", None, true).unwrap_err(),
            ApiError::Validation("Name is required".into())
        );
    }
}
