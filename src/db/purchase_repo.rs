// src/db/purchase_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::purchase::ExtrasLedger};

// Os três livros de compras de extras. Só INSERT e contagem.
#[derive(Clone)]
pub struct PurchaseRepository {
    pool: PgPool,
}

impl PurchaseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// `usuario_id` só é preenchido pela taxa de vinculação (o doctor vinculado).
    pub async fn record_doctor_slot<'e, E>(
        &self,
        executor: E,
        clinica_id: Uuid,
        usuario_id: Option<Uuid>,
        monto: Decimal,
    ) -> Result<Uuid, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO compras_doctores (clinica_id, usuario_id, monto)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(clinica_id)
        .bind(usuario_id)
        .bind(monto)
        .fetch_one(executor)
        .await?;
        Ok(id)
    }

    pub async fn record_patient_slot<'e, E>(&self, executor: E, clinica_id: Uuid, monto: Decimal) -> Result<Uuid, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO compras_pacientes (clinica_id, monto) VALUES ($1, $2) RETURNING id",
        )
        .bind(clinica_id)
        .bind(monto)
        .fetch_one(executor)
        .await?;
        Ok(id)
    }

    pub async fn record_individual_slot<'e, E>(&self, executor: E, doctor_id: Uuid, monto: Decimal) -> Result<Uuid, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO compras_pacientes_individual (doctor_id, monto) VALUES ($1, $2) RETURNING id",
        )
        .bind(doctor_id)
        .bind(monto)
        .fetch_one(executor)
        .await?;
        Ok(id)
    }

    /// Cada linha vale um slot, independente do valor pago.
    pub async fn count<'e, E>(&self, executor: E, ledger: ExtrasLedger, scope_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Tabela e coluna vêm de um enum fechado, nunca do cliente
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {} = $1",
            ledger.table(),
            ledger.scope_column()
        );
        let total = sqlx::query_scalar::<_, i64>(&sql)
            .bind(scope_id)
            .fetch_one(executor)
            .await?;
        Ok(total)
    }

    /// Compras de doctor feitas em nome deste usuário (vinculação paga).
    pub async fn count_by_doctor(&self, usuario_id: Uuid) -> Result<i64, AppError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM compras_doctores WHERE usuario_id = $1")
            .bind(usuario_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    pub async fn purchaser_ids(&self, clinica_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT DISTINCT usuario_id
            FROM compras_doctores
            WHERE clinica_id = $1 AND usuario_id IS NOT NULL
            "#,
        )
        .bind(clinica_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}
