// src/services/linking_service.rs
//
// INDIVIDUAL -> CLINIC_OWNER      (vincular-dueno)
// INDIVIDUAL -> CLINIC_AFFILIATED (vincular-doctor, pago)
// CLINIC_AFFILIATED -> INDIVIDUAL (desvincular-doctor, só se houve pagamento)

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ClinicRepository, PatientRepository, PurchaseRepository, UserRepository},
    models::{
        auth::{Principal, Role, User},
        limits::link_fee,
        linking::LinkOutcome,
        tenancy::TenantScope,
    },
    services::limit_service::LimitService,
};

/// Só doctores individuais (sem clínica) podem ser vinculados.
fn ensure_linkable(doctor: &User) -> Result<(), AppError> {
    if doctor.dueno {
        return Err(AppError::BadRequest(
            "No se puede vincular a un doctor que es dueño de una clínica".into(),
        ));
    }
    if doctor.rol != Role::Doctor {
        return Err(AppError::BadRequest("El usuario no es doctor".into()));
    }
    if doctor.clinica_id.is_some() {
        return Err(AppError::BadRequest("El doctor ya pertenece a una clínica".into()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct LinkingService {
    user_repo: UserRepository,
    clinic_repo: ClinicRepository,
    patient_repo: PatientRepository,
    purchase_repo: PurchaseRepository,
    limit_service: LimitService,
    pool: PgPool,
}

impl LinkingService {
    pub fn new(
        user_repo: UserRepository,
        clinic_repo: ClinicRepository,
        patient_repo: PatientRepository,
        purchase_repo: PurchaseRepository,
        limit_service: LimitService,
        pool: PgPool,
    ) -> Self {
        Self {
            user_repo,
            clinic_repo,
            patient_repo,
            purchase_repo,
            limit_service,
            pool,
        }
    }

    /// Vincula um doctor individual à clínica do chamador, levando os pacientes.
    ///
    /// Tudo numa transação: checagens, taxa de vinculação, update do usuário e
    /// migração dos pacientes. Qualquer falha desfaz tudo.
    pub async fn link_doctor(&self, principal: &Principal, doctor_id: Uuid, clinica_id: Uuid) -> Result<LinkOutcome, AppError> {
        if !(principal.dueno && principal.clinica_id == Some(clinica_id)) {
            return Err(AppError::Forbidden(
                "Solo el dueño de la clínica puede vincular doctores".into(),
            ));
        }

        let _guard = self.limit_service.serialize(&TenantScope::Clinic(clinica_id)).await;

        let mut tx = self.pool.begin().await?;

        // Vinculações da mesma clínica esperam aqui até o commit da anterior
        if !self.clinic_repo.lock_for_update(&mut *tx, clinica_id).await? {
            return Err(AppError::NotFound("Clínica no encontrada".into()));
        }

        let doctor = self
            .user_repo
            .find_for_update(&mut *tx, doctor_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Doctor no encontrado".into()))?;
        ensure_linkable(&doctor)?;

        // Sem upgrade automático aqui: ou cabe no plano atual, ou recusa
        self.limit_service.check_link(clinica_id).await?;

        self.purchase_repo
            .record_doctor_slot(&mut *tx, clinica_id, Some(doctor_id), link_fee())
            .await?;
        self.user_repo
            .set_clinic(&mut *tx, doctor_id, Some(clinica_id), false)
            .await?;
        let migrated = self
            .patient_repo
            .migrate_to_clinic(&mut *tx, doctor_id, clinica_id)
            .await?;

        tx.commit().await?;

        tracing::info!(
            clinic_id = %clinica_id,
            doctor_id = %doctor_id,
            pacientes = migrated,
            "Doctor vinculado à clínica"
        );
        Ok(LinkOutcome::ok(
            "Doctor y pacientes vinculados correctamente.",
            Some(migrated),
        ))
    }

    /// O próprio doctor sai da clínica. Pacientes migrados ficam com a clínica.
    pub async fn unlink_doctor(&self, principal: &Principal) -> Result<LinkOutcome, AppError> {
        let Some(clinica_id) = principal.clinica_id.filter(|_| principal.rol == Role::Doctor) else {
            return Err(AppError::Forbidden(
                "Solo doctores vinculados pueden desvincularse".into(),
            ));
        };
        if principal.dueno {
            return Err(AppError::Forbidden(
                "El dueño de la clínica no puede desvincularse".into(),
            ));
        }

        // Criado pela clínica = nenhuma compra em nome dele
        let purchases = self.purchase_repo.count_by_doctor(principal.id).await?;
        if purchases == 0 {
            return Err(AppError::Forbidden(
                "Los doctores creados por la clínica no pueden desvincularse".into(),
            ));
        }

        self.user_repo
            .set_clinic(&self.pool, principal.id, None, false)
            .await?;

        tracing::info!(clinic_id = %clinica_id, doctor_id = %principal.id, "Doctor desvinculado");
        Ok(LinkOutcome::ok("Desvinculación realizada", None))
    }

    /// Converte um doctor individual em dono de uma clínica existente. Sem pagamento.
    pub async fn link_owner(&self, principal: &Principal, doctor_id: Uuid, clinica_id: Uuid) -> Result<LinkOutcome, AppError> {
        if principal.id != doctor_id && !principal.is_platform_admin() {
            return Err(AppError::Forbidden("Acceso no permitido".into()));
        }

        let mut tx = self.pool.begin().await?;

        let doctor = self
            .user_repo
            .find_for_update(&mut *tx, doctor_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Doctor no encontrado".into()))?;
        ensure_linkable(&doctor)?;

        if !self.clinic_repo.exists(&mut *tx, clinica_id).await? {
            return Err(AppError::NotFound("Clínica no encontrada".into()));
        }

        self.user_repo
            .set_clinic(&mut *tx, doctor_id, Some(clinica_id), true)
            .await?;

        tx.commit().await?;

        tracing::info!(clinic_id = %clinica_id, doctor_id = %doctor_id, "Doctor vinculado como dono");
        Ok(LinkOutcome::ok("Doctor vinculado como dueño de clínica", None))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use super::*;
    use crate::services::limit_service::PgCapacityLedger;
    use crate::{db::PlanRepository, services::plan_service::PlanService};

    fn user(rol: Role, clinica_id: Option<Uuid>, dueno: bool) -> User {
        User {
            id: Uuid::new_v4(),
            usuario: "dr.prueba".into(),
            email: None,
            password_hash: String::new(),
            rol,
            clinica_id,
            dueno,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn only_individual_doctors_are_linkable() {
        assert!(ensure_linkable(&user(Role::Doctor, None, false)).is_ok());
        assert!(ensure_linkable(&user(Role::Doctor, None, true)).is_err());
        assert!(ensure_linkable(&user(Role::Admin, None, false)).is_err());
        assert!(ensure_linkable(&user(Role::Doctor, Some(Uuid::new_v4()), false)).is_err());
    }

    fn service(pool: PgPool) -> LinkingService {
        let user_repo = UserRepository::new(pool.clone());
        let patient_repo = PatientRepository::new(pool.clone());
        let purchase_repo = PurchaseRepository::new(pool.clone());
        let plan_service = PlanService::new(PlanRepository::new(pool.clone()), pool.clone());
        let ledger = PgCapacityLedger::new(
            pool.clone(),
            plan_service,
            user_repo.clone(),
            patient_repo.clone(),
            purchase_repo.clone(),
        );
        LinkingService::new(
            user_repo,
            ClinicRepository::new(pool.clone()),
            patient_repo,
            purchase_repo,
            LimitService::new(Arc::new(ledger), false),
            pool,
        )
    }

    async fn seed_user(pool: &PgPool, usuario: &str, rol: &str, clinica_id: Option<Uuid>, dueno: bool) -> Uuid {
        sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO usuarios (usuario, password_hash, rol, clinica_id, dueno) VALUES ($1, 'x', $2::user_role, $3, $4) RETURNING id",
        )
        .bind(usuario)
        .bind(rol)
        .bind(clinica_id)
        .bind(dueno)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    async fn seed_clinic_with_plan(pool: &PgPool, plan: &str) -> Uuid {
        let clinic = sqlx::query_scalar::<_, Uuid>("INSERT INTO clinicas (nombre) VALUES ('Clínica Test') RETURNING id")
            .fetch_one(pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO clinica_planes (clinica_id, plan_id) SELECT $1, id FROM planes WHERE nombre = $2")
            .bind(clinic)
            .bind(plan)
            .execute(pool)
            .await
            .unwrap();
        clinic
    }

    fn owner_of(id: Uuid, clinic: Uuid) -> Principal {
        Principal {
            id,
            rol: Role::Doctor,
            clinica_id: Some(clinic),
            dueno: true,
        }
    }

    #[sqlx::test]
    #[ignore = "requer DATABASE_URL"]
    async fn linking_moves_doctor_and_patients(pool: PgPool) {
        let clinic = seed_clinic_with_plan(&pool, "Clínica Mediana").await;
        let owner = seed_user(&pool, "dueno", "doctor", Some(clinic), true).await;
        let doctor = seed_user(&pool, "individual", "doctor", None, false).await;
        for i in 0..5 {
            sqlx::query("INSERT INTO pacientes (nombres, apellidos, doctor_id) VALUES ($1, 'X', $2)")
                .bind(format!("P{i}"))
                .bind(doctor)
                .execute(&pool)
                .await
                .unwrap();
        }

        let outcome = service(pool.clone())
            .link_doctor(&owner_of(owner, clinic), doctor, clinic)
            .await
            .unwrap();
        assert_eq!(outcome.pacientes_migrados, Some(5));

        let moved: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pacientes WHERE doctor_id = $1 AND clinica_id = $2")
            .bind(doctor)
            .bind(clinic)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(moved, 5);

        let (clinica_id, dueno): (Option<Uuid>, bool) =
            sqlx::query_as("SELECT clinica_id, dueno FROM usuarios WHERE id = $1")
                .bind(doctor)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(clinica_id, Some(clinic));
        assert!(!dueno);

        let fees: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM compras_doctores WHERE usuario_id = $1 AND monto = 10")
            .bind(doctor)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(fees, 1);
    }

    #[sqlx::test]
    #[ignore = "requer DATABASE_URL"]
    async fn natively_created_doctor_cannot_unlink(pool: PgPool) {
        let clinic = seed_clinic_with_plan(&pool, "Clínica Mediana").await;
        let doctor = seed_user(&pool, "nativo", "doctor", Some(clinic), false).await;
        let principal = Principal {
            id: doctor,
            rol: Role::Doctor,
            clinica_id: Some(clinic),
            dueno: false,
        };

        let err = service(pool.clone()).unlink_doctor(&principal).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let clinica_id: Option<Uuid> = sqlx::query_scalar("SELECT clinica_id FROM usuarios WHERE id = $1")
            .bind(doctor)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(clinica_id, Some(clinic));
    }

    #[sqlx::test]
    #[ignore = "requer DATABASE_URL"]
    async fn linking_over_capacity_rolls_back(pool: PgPool) {
        // Básico: 1 doctor, já ocupado pelo dono
        let clinic = seed_clinic_with_plan(&pool, "Básico").await;
        let owner = seed_user(&pool, "dueno", "doctor", Some(clinic), true).await;
        let doctor = seed_user(&pool, "individual", "doctor", None, false).await;

        let err = service(pool.clone())
            .link_doctor(&owner_of(owner, clinic), doctor, clinic)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::LimitReached(_)));

        let fees: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM compras_doctores WHERE clinica_id = $1")
            .bind(clinic)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(fees, 0);
    }

    #[sqlx::test]
    #[ignore = "requer DATABASE_URL"]
    async fn linking_into_missing_clinic_is_not_found(pool: PgPool) {
        let ghost = Uuid::new_v4();
        let doctor = seed_user(&pool, "individual", "doctor", None, false).await;

        let err = service(pool.clone())
            .link_doctor(&owner_of(Uuid::new_v4(), ghost), doctor, ghost)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let clinica_id: Option<Uuid> = sqlx::query_scalar("SELECT clinica_id FROM usuarios WHERE id = $1")
            .bind(doctor)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(clinica_id, None);
    }

    #[sqlx::test]
    #[ignore = "requer DATABASE_URL"]
    async fn concurrent_links_to_one_clinic_both_land(pool: PgPool) {
        let clinic = seed_clinic_with_plan(&pool, "Clínica Mediana").await;
        let owner = owner_of(seed_user(&pool, "dueno", "doctor", Some(clinic), true).await, clinic);
        let first = seed_user(&pool, "individual1", "doctor", None, false).await;
        let second = seed_user(&pool, "individual2", "doctor", None, false).await;

        let linking = service(pool.clone());
        let (a, b) = tokio::join!(
            linking.link_doctor(&owner, first, clinic),
            linking.link_doctor(&owner, second, clinic),
        );
        assert!(a.is_ok());
        assert!(b.is_ok());

        let (doctors, fees): (i64, i64) = sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM usuarios WHERE clinica_id = $1 AND rol = 'doctor'), \
                    (SELECT COUNT(*) FROM compras_doctores WHERE clinica_id = $1)",
        )
        .bind(clinic)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!((doctors, fees), (3, 2));
    }
}
