//! Users repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::CredentialStore;
use crate::{
    error::{AppError, AppResult},
    models::User,
};

/// Postgres error code for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for UsersRepository {
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT username, credential_hash, role, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn exists(&self, username: &str) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn insert(&self, user: &User) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, credential_hash, role, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&user.username)
        .bind(&user.credential_hash)
        .bind(user.role)
        .bind(user.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                Err(AppError::DuplicateUser(user.username.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
