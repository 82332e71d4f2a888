// src/db/appointment_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{scope_params, APPOINTMENT_OWNED, APPOINTMENT_VISIBLE},
        error::AppError,
    },
    models::{
        appointment::{Appointment, AppointmentPayload},
        tenancy::TenantContext,
    },
};

// Cita + dados do paciente. Usado tanto no SELECT quanto depois das CTEs de escrita.
const APPOINTMENT_SELECT: &str = "c.id, c.paciente_id, c.clinica_id, c.fecha, c.hora, c.motivo, c.estado, \
     c.created_at, p.nombres, p.apellidos, p.doctor_id";

#[derive(Clone)]
pub struct AppointmentRepository {
    pool: PgPool,
}

impl AppointmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, ctx: &TenantContext) -> Result<Vec<Appointment>, AppError> {
        let (clinic, actor) = scope_params(ctx);
        let rows = sqlx::query_as::<_, Appointment>(&format!(
            r#"
            SELECT {APPOINTMENT_SELECT}
            FROM citas c
            JOIN pacientes p ON p.id = c.paciente_id
            WHERE {APPOINTMENT_VISIBLE}
            ORDER BY c.fecha DESC, c.hora DESC
            "#
        ))
        .bind(clinic)
        .bind(actor)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn find(&self, ctx: &TenantContext, id: Uuid) -> Result<Option<Appointment>, AppError> {
        let (clinic, actor) = scope_params(ctx);
        let row = sqlx::query_as::<_, Appointment>(&format!(
            r#"
            SELECT {APPOINTMENT_SELECT}
            FROM citas c
            JOIN pacientes p ON p.id = c.paciente_id
            WHERE {APPOINTMENT_VISIBLE} AND c.id = $3
            "#
        ))
        .bind(clinic)
        .bind(actor)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// `clinica_id` só é gravado para citas criadas no escopo de clínica.
    pub async fn create<'e, E>(
        &self,
        executor: E,
        clinica_id: Option<Uuid>,
        payload: &AppointmentPayload,
    ) -> Result<Appointment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, Appointment>(&format!(
            r#"
            WITH c AS (
                INSERT INTO citas (paciente_id, clinica_id, fecha, hora, motivo, estado)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
            )
            SELECT {APPOINTMENT_SELECT}
            FROM c
            JOIN pacientes p ON p.id = c.paciente_id
            "#
        ))
        .bind(payload.paciente_id)
        .bind(clinica_id)
        .bind(payload.fecha)
        .bind(payload.hora)
        .bind(payload.motivo.as_deref())
        .bind(payload.estado_or_default())
        .fetch_one(executor)
        .await?;
        Ok(row)
    }

    // A autorização usa o paciente atual da cita; o novo paciente é checado no serviço
    pub async fn update(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        payload: &AppointmentPayload,
    ) -> Result<Option<Appointment>, AppError> {
        let (clinic, actor) = scope_params(ctx);
        let row = sqlx::query_as::<_, Appointment>(&format!(
            r#"
            WITH c AS (
                UPDATE citas c
                SET paciente_id = $4,
                    fecha = $5,
                    hora = $6,
                    motivo = $7,
                    estado = $8
                FROM pacientes p
                WHERE p.id = c.paciente_id AND {APPOINTMENT_OWNED} AND c.id = $3
                RETURNING c.*
            )
            SELECT {APPOINTMENT_SELECT}
            FROM c
            JOIN pacientes p ON p.id = c.paciente_id
            "#
        ))
        .bind(clinic)
        .bind(actor)
        .bind(id)
        .bind(payload.paciente_id)
        .bind(payload.fecha)
        .bind(payload.hora)
        .bind(payload.motivo.as_deref())
        .bind(payload.estado_or_default())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn delete(&self, ctx: &TenantContext, id: Uuid) -> Result<u64, AppError> {
        let (clinic, actor) = scope_params(ctx);
        let result = sqlx::query(&format!(
            r#"
            DELETE FROM citas c
            USING pacientes p
            WHERE p.id = c.paciente_id AND {APPOINTMENT_OWNED} AND c.id = $3
            "#
        ))
        .bind(clinic)
        .bind(actor)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
