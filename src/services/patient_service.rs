// src/services/patient_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::PatientRepository,
    models::{
        auth::{Principal, Role},
        limits::LimitResource,
        patient::{Patient, PatientOwner, PatientPayload, PatientView, PublicPatient},
        tenancy::{TenantContext, TenantScope},
    },
    services::limit_service::LimitService,
};

/// Decide o dono do paciente novo a partir do escopo e do `doctor_id` opcional.
///
/// Um doctor afiliado pode criar paciente individual mandando o próprio id;
/// qualquer outro `doctor_id` é recusado.
fn resolve_owner(principal: &Principal, scope: TenantScope, doctor_id: Option<Uuid>) -> Result<PatientOwner, AppError> {
    match (scope, doctor_id) {
        (TenantScope::IndividualDoctor(own), None) => Ok(PatientOwner::Doctor(own)),
        (TenantScope::IndividualDoctor(own), Some(requested)) if requested == own => Ok(PatientOwner::Doctor(own)),
        (TenantScope::Clinic(clinic), None) => Ok(PatientOwner::Clinic(clinic)),
        (TenantScope::Clinic(_), Some(requested)) if requested == principal.id && principal.rol == Role::Doctor => {
            Ok(PatientOwner::Doctor(requested))
        }
        _ => Err(AppError::Forbidden(
            "No puede crear pacientes para otro doctor".into(),
        )),
    }
}

#[derive(Clone)]
pub struct PatientService {
    patient_repo: PatientRepository,
    limit_service: LimitService,
    pool: PgPool,
}

impl PatientService {
    pub fn new(patient_repo: PatientRepository, limit_service: LimitService, pool: PgPool) -> Self {
        Self {
            patient_repo,
            limit_service,
            pool,
        }
    }

    pub async fn list(&self, ctx: &TenantContext, view: PatientView) -> Result<Vec<Patient>, AppError> {
        self.patient_repo.list(ctx, view).await
    }

    pub async fn get(&self, ctx: &TenantContext, id: Uuid) -> Result<Patient, AppError> {
        self.patient_repo
            .find_visible(&self.pool, ctx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Paciente no encontrado".into()))
    }

    /// Admissão + INSERT. Clínica pode subir para VIP; individual nunca.
    pub async fn create(&self, principal: &Principal, payload: &PatientPayload) -> Result<Patient, AppError> {
        let scope = TenantScope::resolve(principal, None)?;
        let owner = resolve_owner(principal, scope, payload.doctor_id)?;

        let budget = match owner {
            PatientOwner::Clinic(clinic) => TenantScope::Clinic(clinic),
            PatientOwner::Doctor(doctor) => TenantScope::IndividualDoctor(doctor),
        };
        let _guard = self.limit_service.serialize(&budget).await;

        match owner {
            PatientOwner::Clinic(clinic) => {
                self.limit_service
                    .admit_clinic(LimitResource::Patients, clinic)
                    .await?;
            }
            PatientOwner::Doctor(doctor) => {
                self.limit_service.admit_individual(doctor).await?;
            }
        }

        let patient = self.patient_repo.create(&self.pool, owner, payload).await?;

        tracing::info!(patient_id = %patient.id, scope = %budget.key(), "Paciente criado");
        Ok(patient)
    }

    pub async fn update(&self, ctx: &TenantContext, id: Uuid, payload: &PatientPayload) -> Result<Patient, AppError> {
        self.patient_repo
            .update(ctx, id, payload)
            .await?
            .ok_or_else(|| AppError::NotFound("Paciente no encontrado".into()))
    }

    /// Remove historial, citas e o paciente numa transação só.
    pub async fn delete(&self, ctx: &TenantContext, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        self.patient_repo
            .find_owned_for_update(&mut *tx, ctx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Paciente no encontrado".into()))?;

        let historial = self.patient_repo.delete_history(&mut *tx, id).await?;
        let citas = self.patient_repo.delete_appointments(&mut *tx, id).await?;
        self.patient_repo.delete_row(&mut *tx, id).await?;

        tx.commit().await?;

        tracing::info!(patient_id = %id, historial, citas, "Paciente removido com dependentes");
        Ok(())
    }

    pub async fn lookup_by_cedula(&self, cedula: &str) -> Result<PublicPatient, AppError> {
        let cedula = cedula.trim();
        if cedula.is_empty() {
            return Err(AppError::BadRequest("Cédula requerida".into()));
        }
        self.patient_repo
            .find_by_cedula(cedula)
            .await?
            .map(PublicPatient::from)
            .ok_or_else(|| AppError::NotFound("Paciente no encontrado".into()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        db::{PlanRepository, PurchaseRepository, UserRepository},
        services::{limit_service::PgCapacityLedger, plan_service::PlanService},
    };

    fn principal(rol: Role, clinica_id: Option<Uuid>) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            rol,
            clinica_id,
            dueno: false,
        }
    }

    #[test]
    fn individual_doctor_owns_new_patients() {
        let p = principal(Role::Doctor, None);
        let scope = TenantScope::resolve(&p, None).unwrap();
        assert_eq!(resolve_owner(&p, scope, None).unwrap(), PatientOwner::Doctor(p.id));
        assert_eq!(resolve_owner(&p, scope, Some(p.id)).unwrap(), PatientOwner::Doctor(p.id));
        assert!(resolve_owner(&p, scope, Some(Uuid::new_v4())).is_err());
    }

    #[test]
    fn clinic_scope_defaults_to_clinic_owner() {
        let clinic = Uuid::new_v4();
        let p = principal(Role::Admin, Some(clinic));
        let scope = TenantScope::resolve(&p, None).unwrap();
        assert_eq!(resolve_owner(&p, scope, None).unwrap(), PatientOwner::Clinic(clinic));
    }

    #[test]
    fn affiliated_doctor_may_keep_individual_patients() {
        let clinic = Uuid::new_v4();
        let doctor = principal(Role::Doctor, Some(clinic));
        let scope = TenantScope::resolve(&doctor, None).unwrap();
        assert_eq!(
            resolve_owner(&doctor, scope, Some(doctor.id)).unwrap(),
            PatientOwner::Doctor(doctor.id)
        );
        assert!(matches!(
            resolve_owner(&doctor, scope, Some(Uuid::new_v4())),
            Err(AppError::Forbidden(_))
        ));

        // Admin de clínica não tem pacientes individuais
        let admin = principal(Role::Admin, Some(clinic));
        assert!(resolve_owner(&admin, scope, Some(admin.id)).is_err());
    }

    fn service(pool: PgPool) -> PatientService {
        let patient_repo = PatientRepository::new(pool.clone());
        let ledger = PgCapacityLedger::new(
            pool.clone(),
            PlanService::new(PlanRepository::new(pool.clone()), pool.clone()),
            UserRepository::new(pool.clone()),
            patient_repo.clone(),
            PurchaseRepository::new(pool.clone()),
        );
        PatientService::new(patient_repo, LimitService::new(Arc::new(ledger), false), pool)
    }

    async fn seed_patient_with_records(pool: &PgPool, doctor: Uuid) -> Uuid {
        let patient = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO pacientes (nombres, apellidos, doctor_id) VALUES ('Ana', 'Ruiz', $1) RETURNING id",
        )
        .bind(doctor)
        .fetch_one(pool)
        .await
        .unwrap();
        for _ in 0..2 {
            sqlx::query("INSERT INTO historial (paciente_id, motivo_consulta) VALUES ($1, 'control')")
                .bind(patient)
                .execute(pool)
                .await
                .unwrap();
            sqlx::query("INSERT INTO citas (paciente_id, fecha, hora) VALUES ($1, CURRENT_DATE, '10:00')")
                .bind(patient)
                .execute(pool)
                .await
                .unwrap();
        }
        patient
    }

    async fn seed_doctor(pool: &PgPool) -> Uuid {
        sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO usuarios (usuario, password_hash, rol) VALUES ('dr.ruiz', 'x', 'doctor') RETURNING id",
        )
        .fetch_one(pool)
        .await
        .unwrap()
    }

    async fn dependents(pool: &PgPool, patient: Uuid) -> (i64, i64) {
        let h: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM historial WHERE paciente_id = $1")
            .bind(patient)
            .fetch_one(pool)
            .await
            .unwrap();
        let c: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM citas WHERE paciente_id = $1")
            .bind(patient)
            .fetch_one(pool)
            .await
            .unwrap();
        (h, c)
    }

    #[sqlx::test]
    #[ignore = "requer DATABASE_URL"]
    async fn delete_removes_patient_and_dependents(pool: PgPool) {
        let doctor = seed_doctor(&pool).await;
        let patient = seed_patient_with_records(&pool, doctor).await;
        let ctx = TenantContext {
            scope: TenantScope::IndividualDoctor(doctor),
            user_id: doctor,
        };

        service(pool.clone()).delete(&ctx, patient).await.unwrap();

        assert_eq!(dependents(&pool, patient).await, (0, 0));
        let left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pacientes WHERE id = $1")
            .bind(patient)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(left, 0);
    }

    #[sqlx::test]
    #[ignore = "requer DATABASE_URL"]
    async fn failed_delete_rolls_back_dependents(pool: PgPool) {
        let doctor = seed_doctor(&pool).await;
        let patient = seed_patient_with_records(&pool, doctor).await;
        let ctx = TenantContext {
            scope: TenantScope::IndividualDoctor(doctor),
            user_id: doctor,
        };

        // O DELETE do paciente falha depois que historial e citas já saíram
        sqlx::query(
            "CREATE FUNCTION falhar_delete_paciente() RETURNS trigger AS $$ \
             BEGIN RAISE EXCEPTION 'delete bloqueado'; END; $$ LANGUAGE plpgsql",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "CREATE TRIGGER pacientes_sem_delete BEFORE DELETE ON pacientes \
             FOR EACH ROW EXECUTE FUNCTION falhar_delete_paciente()",
        )
        .execute(&pool)
        .await
        .unwrap();

        assert!(service(pool.clone()).delete(&ctx, patient).await.is_err());

        assert_eq!(dependents(&pool, patient).await, (2, 2));
        let left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pacientes WHERE id = $1")
            .bind(patient)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(left, 1);
    }

    #[sqlx::test]
    #[ignore = "requer DATABASE_URL"]
    async fn rejected_create_writes_nothing(pool: PgPool) {
        let doctor = seed_doctor(&pool).await;
        sqlx::query(
            "INSERT INTO pacientes (nombres, apellidos, doctor_id) \
             SELECT 'P' || n, 'X', $1 FROM generate_series(1, 20) AS n",
        )
        .bind(doctor)
        .execute(&pool)
        .await
        .unwrap();

        let principal = Principal {
            id: doctor,
            rol: Role::Doctor,
            clinica_id: None,
            dueno: false,
        };
        let payload = PatientPayload {
            nombres: "Uno".into(),
            apellidos: "Demasiado".into(),
            cedula: Some("0999".into()),
            telefono: None,
            direccion: None,
            fecha_nacimiento: None,
            doctor_id: None,
        };

        let err = service(pool.clone()).create(&principal, &payload).await.unwrap_err();
        assert!(matches!(err, AppError::LimitReached(_)));

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pacientes WHERE doctor_id = $1")
            .bind(doctor)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(total, 20);
        let written: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pacientes WHERE cedula = '0999'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(written, 0);
    }

    #[sqlx::test]
    #[ignore = "requer DATABASE_URL"]
    async fn other_scope_cannot_delete(pool: PgPool) {
        let doctor = seed_doctor(&pool).await;
        let patient = seed_patient_with_records(&pool, doctor).await;
        let stranger = Uuid::new_v4();
        let ctx = TenantContext {
            scope: TenantScope::IndividualDoctor(stranger),
            user_id: stranger,
        };

        let err = service(pool.clone()).delete(&ctx, patient).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(dependents(&pool, patient).await, (2, 2));
    }
}
