// src/services/user_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{db_utils::affected_or_not_found, error::AppError},
    db::{ClinicRepository, PurchaseRepository, UserRepository},
    models::{
        auth::{
            AccountSummary, CreateUserPayload, CreatedUser, Principal, PublicDoctor, Role,
            UpdateUserPayload, User, UsernameAvailability,
        },
        limits::LimitResource,
        tenancy::TenantScope,
    },
    services::{auth::hash_password, limit_service::LimitService, plan_service::PlanService},
};

#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    clinic_repo: ClinicRepository,
    purchase_repo: PurchaseRepository,
    plan_service: PlanService,
    limit_service: LimitService,
    app_admin_user: Option<String>,
    pool: PgPool,
}

impl UserService {
    pub fn new(
        user_repo: UserRepository,
        clinic_repo: ClinicRepository,
        purchase_repo: PurchaseRepository,
        plan_service: PlanService,
        limit_service: LimitService,
        app_admin_user: Option<String>,
        pool: PgPool,
    ) -> Self {
        Self {
            user_repo,
            clinic_repo,
            purchase_repo,
            plan_service,
            limit_service,
            app_admin_user,
            pool,
        }
    }

    pub async fn check_username(&self, usuario: &str) -> Result<UsernameAvailability, AppError> {
        let usuario = usuario.trim();
        if usuario.is_empty() {
            return Err(AppError::BadRequest("usuario requerido".into()));
        }
        let taken = self.user_repo.usuario_exists(usuario).await?;
        Ok(UsernameAvailability { disponible: !taken })
    }

    pub async fn public_doctors(&self) -> Result<Vec<PublicDoctor>, AppError> {
        self.user_repo.list_public_doctors().await
    }

    /// Usuários da clínica do chamador; o doctor individual só vê a si mesmo.
    pub async fn list(&self, principal: &Principal) -> Result<Vec<User>, AppError> {
        match TenantScope::resolve(principal, None)? {
            TenantScope::Clinic(clinica_id) => self.user_repo.list_by_clinic(clinica_id).await,
            TenantScope::IndividualDoctor(id) => Ok(self.user_repo.find_by_id(id).await?.into_iter().collect()),
        }
    }

    pub async fn get(&self, principal: &Principal, id: Uuid) -> Result<User, AppError> {
        let found = match TenantScope::resolve(principal, None)? {
            TenantScope::Clinic(clinica_id) => self.user_repo.find_in_clinic(id, clinica_id).await?,
            TenantScope::IndividualDoctor(own) if own == id => self.user_repo.find_by_id(id).await?,
            TenantScope::IndividualDoctor(_) => None,
        };
        found.ok_or_else(|| AppError::NotFound("Usuario no encontrado".into()))
    }

    /// Cria doctor ou admin dentro de uma clínica. Nunca cria dono.
    ///
    /// Doctores passam pelo avaliador de limites (com upgrade para VIP quando couber).
    pub async fn create(&self, principal: &Principal, payload: &CreateUserPayload) -> Result<CreatedUser, AppError> {
        let scope = TenantScope::resolve(principal, payload.clinica_id)?;
        let TenantScope::Clinic(clinica_id) = scope else {
            return Err(AppError::Forbidden(
                "Los doctores individuales no pueden crear usuarios".into(),
            ));
        };
        if !principal.can_manage_clinic(clinica_id) {
            return Err(AppError::Forbidden("Acceso no permitido".into()));
        }
        if !self.clinic_repo.exists(&self.pool, clinica_id).await? {
            return Err(AppError::NotFound("Clínica no encontrada".into()));
        }

        let hashed_password = hash_password(&payload.clave).await?;

        let _guard = self.limit_service.serialize(&scope).await;

        let plan = match payload.rol {
            Role::Doctor => self
                .limit_service
                .admit_clinic(LimitResource::Doctors, clinica_id)
                .await?
                .plan,
            Role::Admin => None,
        };

        let user = self
            .user_repo
            .create_user(
                &self.pool,
                &payload.usuario,
                payload.email.as_deref(),
                &hashed_password,
                payload.rol,
                Some(clinica_id),
                false,
            )
            .await?;

        tracing::info!(user_id = %user.id, clinic_id = %clinica_id, rol = ?user.rol, "Usuario criado");
        Ok(CreatedUser { user, plan })
    }

    /// Dono ou admin da plataforma, sempre dentro da clínica do chamador.
    pub async fn update(&self, principal: &Principal, id: Uuid, payload: &UpdateUserPayload) -> Result<User, AppError> {
        let clinica_id = self.managed_clinic(principal)?;
        let current = self
            .user_repo
            .find_in_clinic(id, clinica_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Usuario no encontrado".into()))?;

        // Promover a doctor ocupa uma vaga
        let promoting = payload.rol == Some(Role::Doctor) && current.rol != Role::Doctor;
        let _guard = if promoting {
            let guard = self.limit_service.serialize(&TenantScope::Clinic(clinica_id)).await;
            self.limit_service
                .admit_clinic(LimitResource::Doctors, clinica_id)
                .await?;
            guard
        } else {
            None
        };

        self.user_repo
            .update_in_clinic(
                id,
                clinica_id,
                payload.usuario.as_deref(),
                payload.email.as_deref(),
                payload.rol,
            )
            .await?
            .ok_or_else(|| AppError::NotFound("Usuario no encontrado".into()))
    }

    pub async fn delete(&self, principal: &Principal, id: Uuid) -> Result<(), AppError> {
        let clinica_id = self.managed_clinic(principal)?;
        let target = self
            .user_repo
            .find_in_clinic(id, clinica_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Usuario no encontrado".into()))?;

        if target.dueno && !principal.is_platform_admin() {
            return Err(AppError::Forbidden(
                "No se puede eliminar al dueño de la clínica".into(),
            ));
        }

        let rows = self.user_repo.delete_in_clinic(id, clinica_id).await?;
        affected_or_not_found(rows, "Usuario")?;

        tracing::info!(user_id = %id, clinic_id = %clinica_id, "Usuario removido");
        Ok(())
    }

    /// "mis-datos": limites, plano, extras e doctores do escopo do chamador.
    pub async fn account_summary(&self, principal: &Principal) -> Result<AccountSummary, AppError> {
        let user = self
            .user_repo
            .find_by_id(principal.id)
            .await?
            .ok_or_else(|| AppError::NotFound("Usuario no encontrado".into()))?;

        let is_app_admin = principal.is_platform_admin()
            || self.app_admin_user.as_deref() == Some(user.usuario.as_str());

        let Some(clinica_id) = user.clinica_id else {
            let check = self.limit_service.evaluate_individual(user.id).await?;
            return Ok(AccountSummary::individual(&user, &check, false, is_app_admin));
        };

        let clinic = self.clinic_repo.find_by_id(clinica_id).await?;
        let check = self.limit_service.evaluate_patients(clinica_id).await?;
        let plan = self.plan_service.active_plan(clinica_id).await?;
        let doctores = self.user_repo.clinic_doctors(clinica_id).await?;
        let es_vinculado = self.purchase_repo.count_by_doctor(user.id).await? > 0;

        Ok(AccountSummary {
            id: user.id,
            usuario: user.usuario,
            rol: user.rol,
            clinica_id: Some(clinica_id),
            clinica: clinic.map(|c| c.nombre),
            dueno: user.dueno,
            is_app_admin,
            total_pacientes: check.total,
            limite: check.limit,
            extra: check.extras,
            plan,
            doctores,
            es_vinculado,
        })
    }

    fn managed_clinic(&self, principal: &Principal) -> Result<Uuid, AppError> {
        principal
            .clinica_id
            .filter(|clinic| principal.can_manage_clinic(*clinic))
            .ok_or_else(|| AppError::Forbidden("Acceso no permitido".into()))
    }
}
