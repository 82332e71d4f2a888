// src/db/clinic_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::clinic::{Clinic, UpdateClinicProfilePayload},
};

#[derive(Clone)]
pub struct ClinicRepository {
    pool: PgPool,
}

impl ClinicRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Clinic>, AppError> {
        let clinics = sqlx::query_as::<_, Clinic>("SELECT * FROM clinicas ORDER BY nombre")
            .fetch_all(&self.pool)
            .await?;
        Ok(clinics)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Clinic>, AppError> {
        let clinic = sqlx::query_as::<_, Clinic>("SELECT * FROM clinicas WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(clinic)
    }

    pub async fn exists<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM clinicas WHERE id = $1)")
            .bind(id)
            .fetch_one(executor)
            .await?;
        Ok(exists)
    }

    /// Trava a linha da clínica até o fim da transação. `false` se ela não existe.
    pub async fn lock_for_update<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let locked = sqlx::query_scalar::<_, Uuid>("SELECT id FROM clinicas WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(locked.is_some())
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        nombre: &str,
        direccion: Option<&str>,
        telefono_contacto: Option<&str>,
    ) -> Result<Clinic, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let clinic = sqlx::query_as::<_, Clinic>(
            r#"
            INSERT INTO clinicas (nombre, direccion, telefono_contacto)
            VALUES ($1, COALESCE($2, ''), $3)
            RETURNING *
            "#,
        )
        .bind(nombre)
        .bind(direccion)
        .bind(telefono_contacto)
        .fetch_one(executor)
        .await?;
        Ok(clinic)
    }

    pub async fn delete(&self, id: Uuid) -> Result<u64, AppError> {
        // Pacientes só da clínica ficariam sem dono (CHECK pacientes_tiene_dono)
        let result = sqlx::query("DELETE FROM clinicas WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::from_constraint_violation(e, "La clínica tiene pacientes asociados"))?;
        Ok(result.rows_affected())
    }

    // `imagen_url` vazio limpa a coluna
    pub async fn update_profile(
        &self,
        id: Uuid,
        payload: &UpdateClinicProfilePayload,
    ) -> Result<Option<Clinic>, AppError> {
        let clinic = sqlx::query_as::<_, Clinic>(
            r#"
            UPDATE clinicas
            SET direccion = COALESCE($2, direccion),
                telefono_contacto = COALESCE($3, telefono_contacto),
                imagen_url = CASE
                    WHEN $4::TEXT IS NULL THEN imagen_url
                    WHEN $4::TEXT = '' THEN NULL
                    ELSE $4::TEXT
                END
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(payload.direccion.as_deref())
        .bind(payload.telefono_contacto.as_deref())
        .bind(payload.imagen_url.as_deref())
        .fetch_optional(&self.pool)
        .await?;
        Ok(clinic)
    }
}
