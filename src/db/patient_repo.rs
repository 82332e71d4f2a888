// src/db/patient_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{scope_params, PATIENT_CLINIC, PATIENT_INDIVIDUAL, PATIENT_OWNED, PATIENT_VISIBLE},
        error::AppError,
    },
    models::{
        patient::{Patient, PatientOwner, PatientPayload, PatientView},
        tenancy::TenantContext,
    },
};

const PATIENT_COLUMNS: &str = "p.id, p.nombres, p.apellidos, p.cedula, p.telefono, p.direccion, \
     p.fecha_nacimiento, p.clinica_id, p.doctor_id, p.created_at";

#[derive(Clone)]
pub struct PatientRepository {
    pool: PgPool,
}

impl PatientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, ctx: &TenantContext, view: PatientView) -> Result<Vec<Patient>, AppError> {
        let filter = match view {
            PatientView::Individual => PATIENT_INDIVIDUAL,
            PatientView::Clinica => PATIENT_CLINIC,
            PatientView::Default | PatientView::Both => PATIENT_VISIBLE,
        };
        let (clinic, actor) = scope_params(ctx);

        let patients = sqlx::query_as::<_, Patient>(&format!(
            "SELECT {PATIENT_COLUMNS} FROM pacientes p WHERE {filter} ORDER BY p.created_at DESC"
        ))
        .bind(clinic)
        .bind(actor)
        .fetch_all(&self.pool)
        .await?;
        Ok(patients)
    }

    pub async fn find_visible<'e, E>(&self, executor: E, ctx: &TenantContext, id: Uuid) -> Result<Option<Patient>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (clinic, actor) = scope_params(ctx);
        let patient = sqlx::query_as::<_, Patient>(&format!(
            "SELECT {PATIENT_COLUMNS} FROM pacientes p WHERE {PATIENT_VISIBLE} AND p.id = $3"
        ))
        .bind(clinic)
        .bind(actor)
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(patient)
    }

    /// Como `find_visible`, mas exige dono exato e trava a linha.
    pub async fn find_owned_for_update<'e, E>(
        &self,
        executor: E,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<Option<Patient>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (clinic, actor) = scope_params(ctx);
        let patient = sqlx::query_as::<_, Patient>(&format!(
            "SELECT {PATIENT_COLUMNS} FROM pacientes p WHERE {PATIENT_OWNED} AND p.id = $3 FOR UPDATE"
        ))
        .bind(clinic)
        .bind(actor)
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(patient)
    }

    pub async fn create<'e, E>(&self, executor: E, owner: PatientOwner, payload: &PatientPayload) -> Result<Patient, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (clinica_id, doctor_id) = owner.columns();
        let patient = sqlx::query_as::<_, Patient>(
            r#"
            INSERT INTO pacientes (nombres, apellidos, cedula, telefono, direccion, fecha_nacimiento, clinica_id, doctor_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, nombres, apellidos, cedula, telefono, direccion, fecha_nacimiento, clinica_id, doctor_id, created_at
            "#,
        )
        .bind(&payload.nombres)
        .bind(&payload.apellidos)
        .bind(payload.cedula.as_deref())
        .bind(payload.telefono.as_deref())
        .bind(payload.direccion.as_deref())
        .bind(payload.fecha_nacimiento)
        .bind(clinica_id)
        .bind(doctor_id)
        .fetch_one(executor)
        .await?;
        Ok(patient)
    }

    // O dono não muda pelo update
    pub async fn update(&self, ctx: &TenantContext, id: Uuid, payload: &PatientPayload) -> Result<Option<Patient>, AppError> {
        let (clinic, actor) = scope_params(ctx);
        let patient = sqlx::query_as::<_, Patient>(&format!(
            r#"
            UPDATE pacientes p
            SET nombres = $4,
                apellidos = $5,
                cedula = $6,
                telefono = $7,
                direccion = $8,
                fecha_nacimiento = $9
            WHERE {PATIENT_OWNED} AND p.id = $3
            RETURNING {PATIENT_COLUMNS}
            "#
        ))
        .bind(clinic)
        .bind(actor)
        .bind(id)
        .bind(&payload.nombres)
        .bind(&payload.apellidos)
        .bind(payload.cedula.as_deref())
        .bind(payload.telefono.as_deref())
        .bind(payload.direccion.as_deref())
        .bind(payload.fecha_nacimiento)
        .fetch_optional(&self.pool)
        .await?;
        Ok(patient)
    }

    pub async fn delete_history<'e, E>(&self, executor: E, paciente_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM historial WHERE paciente_id = $1")
            .bind(paciente_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_appointments<'e, E>(&self, executor: E, paciente_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM citas WHERE paciente_id = $1")
            .bind(paciente_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_row<'e, E>(&self, executor: E, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM pacientes WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Pacientes "da clínica": diretos ou de doctores atualmente afiliados.
    pub async fn count_for_clinic<'e, E>(&self, executor: E, clinica_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM pacientes p
            WHERE p.clinica_id = $1
               OR p.doctor_id IN (SELECT u.id FROM usuarios u WHERE u.clinica_id = $1)
            "#,
        )
        .bind(clinica_id)
        .fetch_one(executor)
        .await?;
        Ok(total)
    }

    /// Só os que ainda são do doctor (não migrados para clínica).
    pub async fn count_individual<'e, E>(&self, executor: E, doctor_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM pacientes WHERE doctor_id = $1 AND clinica_id IS NULL",
        )
        .bind(doctor_id)
        .fetch_one(executor)
        .await?;
        Ok(total)
    }

    /// Migra os pacientes individuais do doctor para a clínica, mantendo `doctor_id` como rastro.
    pub async fn migrate_to_clinic<'e, E>(&self, executor: E, doctor_id: Uuid, clinica_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE pacientes SET clinica_id = $2 WHERE doctor_id = $1 AND clinica_id IS NULL",
        )
        .bind(doctor_id)
        .bind(clinica_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Busca pública por cédula (rota com rate limit).
    pub async fn find_by_cedula(&self, cedula: &str) -> Result<Option<Patient>, AppError> {
        let patient = sqlx::query_as::<_, Patient>(&format!(
            "SELECT {PATIENT_COLUMNS} FROM pacientes p WHERE p.cedula = $1 ORDER BY p.created_at DESC LIMIT 1"
        ))
        .bind(cedula)
        .fetch_optional(&self.pool)
        .await?;
        Ok(patient)
    }
}
