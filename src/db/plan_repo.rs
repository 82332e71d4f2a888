// src/db/plan_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::plan::{ClinicPlan, Plan, PlanTier},
};

const PLAN_COLUMNS: &str =
    "pl.id, pl.nombre, pl.tier, pl.precio, pl.pacientes_max, pl.doctores_max, pl.sucursales_incluidas, pl.descripcion";

#[derive(Clone)]
pub struct PlanRepository {
    pool: PgPool,
}

impl PlanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Plan>, AppError> {
        let plans = sqlx::query_as::<_, Plan>(&format!("SELECT {PLAN_COLUMNS} FROM planes pl ORDER BY pl.precio"))
            .fetch_all(&self.pool)
            .await?;
        Ok(plans)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Plan>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let plan = sqlx::query_as::<_, Plan>(&format!("SELECT {PLAN_COLUMNS} FROM planes pl WHERE pl.id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(plan)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        nombre: &str,
        tier: PlanTier,
        precio: Decimal,
        pacientes_max: i32,
        doctores_max: i32,
        sucursales_incluidas: i32,
        descripcion: Option<&str>,
    ) -> Result<Plan, AppError> {
        let plan = sqlx::query_as::<_, Plan>(
            r#"
            INSERT INTO planes (nombre, tier, precio, pacientes_max, doctores_max, sucursales_incluidas, descripcion)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, nombre, tier, precio, pacientes_max, doctores_max, sucursales_incluidas, descripcion
            "#,
        )
        .bind(nombre)
        .bind(tier)
        .bind(precio)
        .bind(pacientes_max)
        .bind(doctores_max)
        .bind(sucursales_incluidas)
        .bind(descripcion)
        .fetch_one(&self.pool)
        .await?;
        Ok(plan)
    }

    /// Plano da atribuição ativa da clínica (no máximo uma, pelo índice parcial).
    pub async fn active_for_clinic<'e, E>(&self, executor: E, clinica_id: Uuid) -> Result<Option<Plan>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let plan = sqlx::query_as::<_, Plan>(&format!(
            r#"
            SELECT {PLAN_COLUMNS}
            FROM clinica_planes cp
            JOIN planes pl ON pl.id = cp.plan_id
            WHERE cp.clinica_id = $1 AND cp.activo
            "#
        ))
        .bind(clinica_id)
        .fetch_optional(executor)
        .await?;
        Ok(plan)
    }

    /// Plano VIP do catálogo: pelo tier, com o nome como fallback legado.
    pub async fn find_vip<'e, E>(&self, executor: E) -> Result<Option<Plan>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let plan = sqlx::query_as::<_, Plan>(&format!(
            r#"
            SELECT {PLAN_COLUMNS}
            FROM planes pl
            WHERE pl.tier = 'VIP' OR LOWER(pl.nombre) LIKE '%vip%'
            ORDER BY (pl.tier = 'VIP') DESC, pl.doctores_max DESC
            LIMIT 1
            "#
        ))
        .fetch_optional(executor)
        .await?;
        Ok(plan)
    }

    pub async fn deactivate_active<'e, E>(&self, executor: E, clinica_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE clinica_planes SET activo = FALSE, fecha_fin = COALESCE(fecha_fin, CURRENT_DATE) WHERE clinica_id = $1 AND activo",
        )
        .bind(clinica_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Insere a atribuição. Não desativa a anterior: o chamador decide.
    /// Violação do índice `uq_clinica_planes_activo` volta como `sqlx::Error` para o chamador tratar.
    pub async fn assign<'e, E>(
        &self,
        executor: E,
        clinica_id: Uuid,
        plan_id: Uuid,
        fecha_inicio: Option<NaiveDate>,
        fecha_fin: Option<NaiveDate>,
    ) -> Result<ClinicPlan, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, ClinicPlan>(
            r#"
            INSERT INTO clinica_planes (clinica_id, plan_id, fecha_inicio, fecha_fin, activo)
            VALUES ($1, $2, COALESCE($3, CURRENT_DATE), $4, TRUE)
            RETURNING id, clinica_id, plan_id, fecha_inicio, fecha_fin, activo
            "#,
        )
        .bind(clinica_id)
        .bind(plan_id)
        .bind(fecha_inicio)
        .bind(fecha_fin)
        .fetch_one(executor)
        .await
    }

    pub async fn assignments_for_clinic(&self, clinica_id: Uuid) -> Result<Vec<ClinicPlan>, AppError> {
        let rows = sqlx::query_as::<_, ClinicPlan>(
            r#"
            SELECT id, clinica_id, plan_id, fecha_inicio, fecha_fin, activo
            FROM clinica_planes
            WHERE clinica_id = $1
            ORDER BY activo DESC, fecha_inicio DESC
            "#,
        )
        .bind(clinica_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
