// src/db/history_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{scope_params, PATIENT_OWNED, PATIENT_VISIBLE},
        error::AppError,
    },
    models::{
        history::{HistoryPayload, HistoryRecord},
        tenancy::TenantContext,
    },
};

const HISTORY_SELECT: &str = "h.id, h.paciente_id, h.motivo_consulta, h.peso, h.estatura, h.imc, h.presion, \
     h.frecuencia_cardiaca, h.frecuencia_respiratoria, h.temperatura, h.otros, h.diagnostico, \
     h.tratamiento, h.receta, h.fecha, h.imagenes, p.nombres, p.apellidos, p.doctor_id";

// Historial não tem dono próprio: tudo passa pelo paciente.
#[derive(Clone)]
pub struct HistoryRepository {
    pool: PgPool,
}

impl HistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, ctx: &TenantContext, paciente_id: Option<Uuid>) -> Result<Vec<HistoryRecord>, AppError> {
        let (clinic, actor) = scope_params(ctx);
        let rows = sqlx::query_as::<_, HistoryRecord>(&format!(
            r#"
            SELECT {HISTORY_SELECT}
            FROM historial h
            JOIN pacientes p ON p.id = h.paciente_id
            WHERE {PATIENT_VISIBLE} AND ($3::UUID IS NULL OR h.paciente_id = $3)
            ORDER BY h.fecha DESC
            "#
        ))
        .bind(clinic)
        .bind(actor)
        .bind(paciente_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn find(&self, ctx: &TenantContext, id: Uuid) -> Result<Option<HistoryRecord>, AppError> {
        let (clinic, actor) = scope_params(ctx);
        let row = sqlx::query_as::<_, HistoryRecord>(&format!(
            r#"
            SELECT {HISTORY_SELECT}
            FROM historial h
            JOIN pacientes p ON p.id = h.paciente_id
            WHERE {PATIENT_VISIBLE} AND h.id = $3
            "#
        ))
        .bind(clinic)
        .bind(actor)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn create<'e, E>(&self, executor: E, payload: &HistoryPayload) -> Result<HistoryRecord, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, HistoryRecord>(&format!(
            r#"
            WITH h AS (
                INSERT INTO historial (
                    paciente_id, motivo_consulta, peso, estatura, imc, presion,
                    frecuencia_cardiaca, frecuencia_respiratoria, temperatura,
                    otros, diagnostico, tratamiento, receta, fecha, imagenes
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, COALESCE($14, CURRENT_DATE), $15)
                RETURNING *
            )
            SELECT {HISTORY_SELECT}
            FROM h
            JOIN pacientes p ON p.id = h.paciente_id
            "#
        ))
        .bind(payload.paciente_id)
        .bind(payload.motivo_consulta.as_deref())
        .bind(payload.peso)
        .bind(payload.estatura)
        .bind(payload.imc)
        .bind(payload.presion.as_deref())
        .bind(payload.frecuencia_cardiaca)
        .bind(payload.frecuencia_respiratoria)
        .bind(payload.temperatura)
        .bind(payload.otros.as_deref())
        .bind(payload.diagnostico.as_deref())
        .bind(payload.tratamiento.as_deref())
        .bind(payload.receta.as_deref())
        .bind(payload.fecha)
        .bind(payload.clean_images())
        .fetch_one(executor)
        .await?;
        Ok(row)
    }

    // O paciente do registro não muda no update
    pub async fn update(&self, ctx: &TenantContext, id: Uuid, payload: &HistoryPayload) -> Result<Option<HistoryRecord>, AppError> {
        let (clinic, actor) = scope_params(ctx);
        let row = sqlx::query_as::<_, HistoryRecord>(&format!(
            r#"
            WITH h AS (
                UPDATE historial h
                SET motivo_consulta = $4,
                    peso = $5,
                    estatura = $6,
                    imc = $7,
                    presion = $8,
                    frecuencia_cardiaca = $9,
                    frecuencia_respiratoria = $10,
                    temperatura = $11,
                    otros = $12,
                    diagnostico = $13,
                    tratamiento = $14,
                    receta = $15,
                    fecha = COALESCE($16, h.fecha),
                    imagenes = $17
                FROM pacientes p
                WHERE p.id = h.paciente_id AND {PATIENT_OWNED} AND h.id = $3
                RETURNING h.*
            )
            SELECT {HISTORY_SELECT}
            FROM h
            JOIN pacientes p ON p.id = h.paciente_id
            "#
        ))
        .bind(clinic)
        .bind(actor)
        .bind(id)
        .bind(payload.motivo_consulta.as_deref())
        .bind(payload.peso)
        .bind(payload.estatura)
        .bind(payload.imc)
        .bind(payload.presion.as_deref())
        .bind(payload.frecuencia_cardiaca)
        .bind(payload.frecuencia_respiratoria)
        .bind(payload.temperatura)
        .bind(payload.otros.as_deref())
        .bind(payload.diagnostico.as_deref())
        .bind(payload.tratamiento.as_deref())
        .bind(payload.receta.as_deref())
        .bind(payload.fecha)
        .bind(payload.clean_images())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn delete(&self, ctx: &TenantContext, id: Uuid) -> Result<u64, AppError> {
        let (clinic, actor) = scope_params(ctx);
        let result = sqlx::query(&format!(
            r#"
            DELETE FROM historial h
            USING pacientes p
            WHERE p.id = h.paciente_id AND {PATIENT_OWNED} AND h.id = $3
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
