use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::model::{PublicUser, User};

const USER_COLUMNS: &str = "id, name, email, salt, hashed_password, created, updated";

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, salt, hashed_password, created, updated
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, salt, hashed_password, created, updated
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    /// List projection never selects the secret columns.
    pub async fn list(db: &PgPool) -> Result<Vec<PublicUser>, sqlx::Error> {
        sqlx::query_as::<_, PublicUser>(
            r#"
            SELECT id, name, email, created, updated
            FROM users
            ORDER BY created
            "#,
        )
        .fetch_all(db)
        .await
    }

    pub async fn insert(
        db: &PgPool,
        name: &str,
        email: &str,
        salt: &str,
        hashed_password: &str,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, salt, hashed_password)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(name)
        .bind(email)
        .bind(salt)
        .bind(hashed_password)
        .fetch_one(db)
        .await
    }

    /// Writes back the merged record and refreshes the `updated` timestamp.
    /// Concurrent updates are not serialized; the later write wins.
    pub async fn update(&self, db: &PgPool) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET name = $2, email = $3, salt = $4, hashed_password = $5, updated = $6
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(self.id)
        .bind(&self.name)
        .bind(&self.email)
        .bind(&self.salt)
        .bind(&self.hashed_password)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(db)
        .await
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            DELETE FROM users
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(id)
        .fetch_optional(db)
        .await
    }
}
