// src/services/appointment_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AppointmentRepository, PatientRepository},
    models::{
        appointment::{Appointment, AppointmentPayload},
        patient::Patient,
        tenancy::TenantContext,
    },
};

/// Clínica gravada na cita: nenhuma para paciente individual do próprio doctor.
fn stamp_clinic(ctx: &TenantContext, patient: &Patient) -> Option<Uuid> {
    if patient.clinica_id.is_none() && patient.doctor_id == Some(ctx.user_id) {
        None
    } else {
        ctx.scope.clinic_id()
    }
}

#[derive(Clone)]
pub struct AppointmentService {
    appointment_repo: AppointmentRepository,
    patient_repo: PatientRepository,
    pool: PgPool,
}

impl AppointmentService {
    pub fn new(appointment_repo: AppointmentRepository, patient_repo: PatientRepository, pool: PgPool) -> Self {
        Self {
            appointment_repo,
            patient_repo,
            pool,
        }
    }

    pub async fn list(&self, ctx: &TenantContext) -> Result<Vec<Appointment>, AppError> {
        self.appointment_repo.list(ctx).await
    }

    pub async fn get(&self, ctx: &TenantContext, id: Uuid) -> Result<Appointment, AppError> {
        self.appointment_repo
            .find(ctx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Cita no encontrada".into()))
    }

    pub async fn create(&self, ctx: &TenantContext, payload: &AppointmentPayload) -> Result<Appointment, AppError> {
        let patient = self.visible_patient(ctx, payload.paciente_id).await?;

        let cita = self
            .appointment_repo
            .create(&self.pool, stamp_clinic(ctx, &patient), payload)
            .await?;

        tracing::info!(cita_id = %cita.id, patient_id = %patient.id, "Cita criada");
        Ok(cita)
    }

    pub async fn update(&self, ctx: &TenantContext, id: Uuid, payload: &AppointmentPayload) -> Result<Appointment, AppError> {
        self.visible_patient(ctx, payload.paciente_id).await?;

        self.appointment_repo
            .update(ctx, id, payload)
            .await?
            .ok_or_else(|| AppError::NotFound("Cita no encontrada".into()))
    }

    pub async fn delete(&self, ctx: &TenantContext, id: Uuid) -> Result<(), AppError> {
        let rows = self.appointment_repo.delete(ctx, id).await?;
        if rows == 0 {
            return Err(AppError::NotFound("Cita no encontrada".into()));
        }
        Ok(())
    }

    async fn visible_patient(&self, ctx: &TenantContext, paciente_id: Uuid) -> Result<Patient, AppError> {
        let patient = self.patient_repo.find_visible(&self.pool, ctx, paciente_id).await?;
        patient.ok_or_else(|| AppError::NotFound("Paciente no encontrado".into()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime, Utc};
    use sqlx::PgPool;

    use super::*;
    use crate::models::tenancy::TenantScope;

    fn patient(clinica_id: Option<Uuid>, doctor_id: Option<Uuid>) -> Patient {
        Patient {
            id: Uuid::new_v4(),
            nombres: "Ana".into(),
            apellidos: "Ruiz".into(),
            cedula: None,
            telefono: None,
            direccion: None,
            fecha_nacimiento: None,
            clinica_id,
            doctor_id,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn clinic_scope_stamps_clinic_on_shared_patients() {
        let clinic = Uuid::new_v4();
        let ctx = TenantContext {
            scope: TenantScope::Clinic(clinic),
            user_id: Uuid::new_v4(),
        };
        assert_eq!(stamp_clinic(&ctx, &patient(Some(clinic), None)), Some(clinic));
        // Paciente de outro doctor afiliado (não migrado)
        assert_eq!(stamp_clinic(&ctx, &patient(None, Some(Uuid::new_v4()))), Some(clinic));
    }

    #[test]
    fn own_individual_patient_is_never_stamped() {
        let clinic = Uuid::new_v4();
        let doctor = Uuid::new_v4();
        let ctx = TenantContext {
            scope: TenantScope::Clinic(clinic),
            user_id: doctor,
        };
        assert_eq!(stamp_clinic(&ctx, &patient(None, Some(doctor))), None);

        let individual = TenantContext {
            scope: TenantScope::IndividualDoctor(doctor),
            user_id: doctor,
        };
        assert_eq!(stamp_clinic(&individual, &patient(None, Some(doctor))), None);
    }

    fn service(pool: PgPool) -> AppointmentService {
        AppointmentService::new(
            AppointmentRepository::new(pool.clone()),
            PatientRepository::new(pool.clone()),
            pool,
        )
    }

    async fn seed_user(pool: &PgPool, usuario: &str, rol: &str, clinica_id: Option<Uuid>) -> Uuid {
        sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO usuarios (usuario, password_hash, rol, clinica_id) VALUES ($1, 'x', $2::user_role, $3) RETURNING id",
        )
        .bind(usuario)
        .bind(rol)
        .bind(clinica_id)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    /// Paciente individual do doctor com uma cita gravada com `clinica_id`.
    async fn seed_appointment(pool: &PgPool, doctor: Uuid, stamped: Option<Uuid>) -> (Uuid, Uuid) {
        let patient = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO pacientes (nombres, apellidos, doctor_id) VALUES ('Ana', 'Ruiz', $1) RETURNING id",
        )
        .bind(doctor)
        .fetch_one(pool)
        .await
        .unwrap();
        let cita = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO citas (paciente_id, clinica_id, fecha, hora, motivo) \
             VALUES ($1, $2, '2025-03-10', '09:00', 'control') RETURNING id",
        )
        .bind(patient)
        .bind(stamped)
        .fetch_one(pool)
        .await
        .unwrap();
        (patient, cita)
    }

    async fn stored(pool: &PgPool, cita: Uuid) -> Option<(String, String)> {
        sqlx::query_as("SELECT motivo, estado FROM citas WHERE id = $1")
            .bind(cita)
            .fetch_optional(pool)
            .await
            .unwrap()
    }

    fn reschedule(paciente_id: Uuid) -> AppointmentPayload {
        AppointmentPayload {
            paciente_id,
            fecha: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            hora: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
            motivo: Some("alterado".into()),
            estado: Some("cancelada".into()),
        }
    }

    fn untouched() -> Option<(String, String)> {
        Some(("control".into(), "programada".into()))
    }

    #[sqlx::test]
    #[ignore = "requer DATABASE_URL"]
    async fn other_scope_cannot_touch_appointment(pool: PgPool) {
        let doctor = seed_user(&pool, "dr.dono", "doctor", None).await;
        let stranger = seed_user(&pool, "dr.outro", "doctor", None).await;
        let (patient, cita) = seed_appointment(&pool, doctor, None).await;
        let ctx = TenantContext {
            scope: TenantScope::IndividualDoctor(stranger),
            user_id: stranger,
        };
        let citas = service(pool.clone());

        let err = citas.update(&ctx, cita, &reschedule(patient)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let err = citas.delete(&ctx, cita).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        assert_eq!(stored(&pool, cita).await, untouched());
    }

    #[sqlx::test]
    #[ignore = "requer DATABASE_URL"]
    async fn clinic_stamp_does_not_grant_writes(pool: PgPool) {
        let clinic = sqlx::query_scalar::<_, Uuid>("INSERT INTO clinicas (nombre) VALUES ('Clínica Test') RETURNING id")
            .fetch_one(&pool)
            .await
            .unwrap();
        let doctor = seed_user(&pool, "dr.afiliado", "doctor", Some(clinic)).await;
        let admin = seed_user(&pool, "admin", "admin", Some(clinic)).await;
        let (patient, cita) = seed_appointment(&pool, doctor, Some(clinic)).await;
        let ctx = TenantContext {
            scope: TenantScope::Clinic(clinic),
            user_id: admin,
        };
        let citas = service(pool.clone());

        // A clínica enxerga a cita do paciente individual, mas não reescreve
        assert!(citas.get(&ctx, cita).await.is_ok());
        let err = citas.update(&ctx, cita, &reschedule(patient)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        // Depois que o doctor sai, só resta a clínica gravada na cita
        sqlx::query("UPDATE usuarios SET clinica_id = NULL WHERE id = $1")
            .bind(doctor)
            .execute(&pool)
            .await
            .unwrap();
        let err = citas.delete(&ctx, cita).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(stored(&pool, cita).await, untouched());

        // O próprio doctor continua podendo alterar
        let own = TenantContext {
            scope: TenantScope::IndividualDoctor(doctor),
            user_id: doctor,
        };
        let updated = citas.update(&own, cita, &reschedule(patient)).await.unwrap();
        assert_eq!(updated.estado, "cancelada");
    }
}
