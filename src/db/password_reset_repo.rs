// src/db/password_reset_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;

// Só o hash do token é persistido
#[derive(Clone)]
pub struct PasswordResetRepository {
    pool: PgPool,
}

impl PasswordResetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, user_id: Uuid, token_hash: &str, expires_at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("INSERT INTO password_resets (user_id, token_hash, expires_at) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(token_hash)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Marca o token como usado e devolve se ele era válido (existente, não usado, não expirado).
    pub async fn consume<'e, E>(&self, executor: E, user_id: Uuid, token_hash: &str) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE password_resets
            SET used = TRUE
            WHERE user_id = $1 AND token_hash = $2 AND NOT used AND expires_at > NOW()
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
