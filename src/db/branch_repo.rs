// src/db/branch_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{branch::Branch, clinic::Clinic},
};

#[derive(Clone)]
pub struct BranchRepository {
    pool: PgPool,
}

impl BranchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn count_for_principal<'e, E>(&self, executor: E, clinica_principal_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM sucursales WHERE clinica_principal_id = $1",
        )
        .bind(clinica_principal_id)
        .fetch_one(executor)
        .await?;
        Ok(total)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        clinica_principal_id: Uuid,
        clinica_vinculada_id: Uuid,
    ) -> Result<Branch, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let branch = sqlx::query_as::<_, Branch>(
            r#"
            INSERT INTO sucursales (clinica_principal_id, clinica_vinculada_id)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(clinica_principal_id)
        .bind(clinica_vinculada_id)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "La clínica ya es sucursal"))?;
        Ok(branch)
    }

    /// Clínicas vinculadas como sucursal da principal.
    pub async fn list_branches(&self, clinica_principal_id: Uuid) -> Result<Vec<Clinic>, AppError> {
        let clinics = sqlx::query_as::<_, Clinic>(
            r#"
            SELECT c.*
            FROM sucursales s
            JOIN clinicas c ON c.id = s.clinica_vinculada_id
            WHERE s.clinica_principal_id = $1
            ORDER BY s.created_at, c.nombre
            "#,
        )
        .bind(clinica_principal_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(clinics)
    }
}
