// src/db/doctor_profile_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::doctor_profile::{
        DoctorDocument, DoctorProfile, DoctorProfilePayload, DoctorPublicCard, SavedProfile,
    },
};

#[derive(Clone)]
pub struct DoctorProfileRepository {
    pool: PgPool,
}

impl DoctorProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_user(&self, user_id: Uuid) -> Result<Option<DoctorProfile>, AppError> {
        let profile = sqlx::query_as::<_, DoctorProfile>("SELECT * FROM doctor_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    pub async fn public_card(&self, user_id: Uuid) -> Result<Option<DoctorPublicCard>, AppError> {
        let card = sqlx::query_as::<_, DoctorPublicCard>(
            r#"
            SELECT u.id, u.usuario, u.rol, u.clinica_id,
                   dp.nombre, dp.apellido, dp.direccion, dp.telefono, dp.email,
                   dp.bio, dp.avatar_url, dp.especialidad,
                   c.nombre AS clinica_nombre,
                   COALESCE(
                       (SELECT NULLIF(COUNT(*), 0) FROM pacientes p WHERE p.doctor_id = u.id),
                       (SELECT COUNT(*) FROM pacientes p WHERE p.clinica_id = u.clinica_id)
                   ) AS total_pacientes
            FROM usuarios u
            LEFT JOIN doctor_profiles dp ON dp.user_id = u.id
            LEFT JOIN clinicas c ON c.id = u.clinica_id
            WHERE u.id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(card)
    }

    /// Cria ou atualiza. Ausente mantém a coluna, vazio grava NULL.
    pub async fn upsert(&self, user_id: Uuid, payload: &DoctorProfilePayload) -> Result<SavedProfile, AppError> {
        let saved = sqlx::query_as::<_, SavedProfile>(
            r#"
            INSERT INTO doctor_profiles
                (user_id, nombre, apellido, direccion, telefono, email, bio, avatar_url, especialidad)
            VALUES ($1, NULLIF($2, ''), NULLIF($3, ''), NULLIF($4, ''), NULLIF($5, ''),
                    NULLIF($6, ''), NULLIF($7, ''), NULLIF($8, ''), NULLIF($9, ''))
            ON CONFLICT (user_id) DO UPDATE SET
                nombre = CASE WHEN $2::TEXT IS NULL THEN doctor_profiles.nombre ELSE NULLIF($2, '') END,
                apellido = CASE WHEN $3::TEXT IS NULL THEN doctor_profiles.apellido ELSE NULLIF($3, '') END,
                direccion = CASE WHEN $4::TEXT IS NULL THEN doctor_profiles.direccion ELSE NULLIF($4, '') END,
                telefono = CASE WHEN $5::TEXT IS NULL THEN doctor_profiles.telefono ELSE NULLIF($5, '') END,
                email = CASE WHEN $6::TEXT IS NULL THEN doctor_profiles.email ELSE NULLIF($6, '') END,
                bio = CASE WHEN $7::TEXT IS NULL THEN doctor_profiles.bio ELSE NULLIF($7, '') END,
                avatar_url = CASE WHEN $8::TEXT IS NULL THEN doctor_profiles.avatar_url ELSE NULLIF($8, '') END,
                especialidad = CASE WHEN $9::TEXT IS NULL THEN doctor_profiles.especialidad ELSE NULLIF($9, '') END,
                updated_at = NOW()
            RETURNING *, (xmax = 0) AS inserted
            "#,
        )
        .bind(user_id)
        .bind(payload.nombre.as_deref())
        .bind(payload.apellido.as_deref())
        .bind(payload.direccion.as_deref())
        .bind(payload.telefono.as_deref())
        .bind(payload.email.as_deref())
        .bind(payload.bio.as_deref())
        .bind(payload.avatar_url.as_deref())
        .bind(payload.especialidad.as_deref())
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }

    pub async fn add_document<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        filename: &str,
        url: &str,
    ) -> Result<DoctorDocument, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let document = sqlx::query_as::<_, DoctorDocument>(
            "INSERT INTO doctor_documentos (user_id, filename, url) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(user_id)
        .bind(filename)
        .bind(url)
        .fetch_one(executor)
        .await?;
        Ok(document)
    }

    pub async fn documents(&self, user_id: Uuid) -> Result<Vec<DoctorDocument>, AppError> {
        let documents = sqlx::query_as::<_, DoctorDocument>(
            "SELECT * FROM doctor_documentos WHERE user_id = $1 ORDER BY created_at, filename",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(documents)
    }
}
