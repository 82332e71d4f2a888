// src/services/history_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{db_utils::affected_or_not_found, error::AppError},
    db::{HistoryRepository, PatientRepository},
    models::{
        history::{HistoryPayload, HistoryRecord},
        tenancy::TenantContext,
    },
};

#[derive(Clone)]
pub struct HistoryService {
    history_repo: HistoryRepository,
    patient_repo: PatientRepository,
    pool: PgPool,
}

impl HistoryService {
    pub fn new(history_repo: HistoryRepository, patient_repo: PatientRepository, pool: PgPool) -> Self {
        Self {
            history_repo,
            patient_repo,
            pool,
        }
    }

    pub async fn list(&self, ctx: &TenantContext, paciente_id: Option<Uuid>) -> Result<Vec<HistoryRecord>, AppError> {
        self.history_repo.list(ctx, paciente_id).await
    }

    pub async fn get(&self, ctx: &TenantContext, id: Uuid) -> Result<HistoryRecord, AppError> {
        self.history_repo
            .find(ctx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Historial no encontrado".into()))
    }

    pub async fn create(&self, ctx: &TenantContext, payload: &HistoryPayload) -> Result<HistoryRecord, AppError> {
        if self
            .patient_repo
            .find_visible(&self.pool, ctx, payload.paciente_id)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound("Paciente no encontrado".into()));
        }

        let record = self.history_repo.create(&self.pool, payload).await?;
        tracing::info!(historial_id = %record.id, patient_id = %record.paciente_id, "Historial criado");
        Ok(record)
    }

    pub async fn update(&self, ctx: &TenantContext, id: Uuid, payload: &HistoryPayload) -> Result<HistoryRecord, AppError> {
        self.history_repo
            .update(ctx, id, payload)
            .await?
            .ok_or_else(|| AppError::NotFound("Historial no encontrado".into()))
    }

    pub async fn delete(&self, ctx: &TenantContext, id: Uuid) -> Result<(), AppError> {
        let rows = self.history_repo.delete(ctx, id).await?;
        affected_or_not_found(rows, "Historial")
    }
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;

    use super::*;
    use crate::models::tenancy::TenantScope;

    async fn seed_doctor(pool: &PgPool, usuario: &str) -> Uuid {
        sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO usuarios (usuario, password_hash, rol) VALUES ($1, 'x', 'doctor') RETURNING id",
        )
        .bind(usuario)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    fn individual(doctor: Uuid) -> TenantContext {
        TenantContext {
            scope: TenantScope::IndividualDoctor(doctor),
            user_id: doctor,
        }
    }

    fn payload(paciente_id: Uuid, diagnostico: &str) -> HistoryPayload {
        HistoryPayload {
            paciente_id,
            motivo_consulta: Some("control".into()),
            peso: None,
            estatura: None,
            imc: None,
            presion: None,
            frecuencia_cardiaca: None,
            frecuencia_respiratoria: None,
            temperatura: None,
            otros: None,
            diagnostico: Some(diagnostico.into()),
            tratamiento: None,
            receta: None,
            fecha: None,
            imagenes: Vec::new(),
        }
    }

    #[sqlx::test]
    #[ignore = "requer DATABASE_URL"]
    async fn other_scope_cannot_touch_history(pool: PgPool) {
        let doctor = seed_doctor(&pool, "dr.dono").await;
        let stranger = seed_doctor(&pool, "dr.outro").await;
        let patient = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO pacientes (nombres, apellidos, doctor_id) VALUES ('Ana', 'Ruiz', $1) RETURNING id",
        )
        .bind(doctor)
        .fetch_one(&pool)
        .await
        .unwrap();

        let service = HistoryService::new(
            HistoryRepository::new(pool.clone()),
            PatientRepository::new(pool.clone()),
            pool.clone(),
        );
        let record = service
            .create(&individual(doctor), &payload(patient, "gripe"))
            .await
            .unwrap();

        let intruder = individual(stranger);
        assert!(matches!(service.get(&intruder, record.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            service.update(&intruder, record.id, &payload(patient, "alterado")).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(service.delete(&intruder, record.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            service.create(&intruder, &payload(patient, "intruso")).await,
            Err(AppError::NotFound(_))
        ));

        let diagnosticos: Vec<Option<String>> =
            sqlx::query_scalar("SELECT diagnostico FROM historial WHERE paciente_id = $1")
                .bind(patient)
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(diagnosticos, vec![Some("gripe".to_string())]);
    }
}
