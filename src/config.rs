// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{
        AppointmentRepository, BranchRepository, ClinicRepository, DoctorProfileRepository,
        HistoryRepository, PasswordResetRepository, PatientRepository, PlanRepository,
        PurchaseRepository, UserRepository,
    },
    middleware::rate_limit::LookupRateLimiter,
    services::{
        appointment_service::AppointmentService,
        auth::AuthService,
        branch_service::BranchService,
        clinic_service::ClinicService,
        doctor_profile_service::DoctorProfileService,
        email_service::LogMailer,
        history_service::HistoryService,
        limit_service::{LimitService, PgCapacityLedger},
        linking_service::LinkingService,
        patient_service::PatientService,
        plan_service::PlanService,
        purchase_service::PurchaseService,
        user_service::UserService,
    },
};

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{key} tem um valor inválido: {raw}")),
        _ => Ok(default),
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

// Tudo que vem do ambiente, lido uma vez no boot
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    /// Base dos links de recuperação de senha.
    pub frontend_url: String,
    /// Devolve o token de recuperação na resposta (só para desenvolvimento).
    pub dev_return_token: bool,
    /// Usuário tratado como administrador da aplicação em "mis-datos".
    pub app_admin_user: Option<String>,
    /// Lock por escopo entre avaliar o limite e inserir.
    pub limit_serialized: bool,
    pub lookup_rate_max: u32,
    pub lookup_rate_window: Duration,
    /// Confia no `X-Forwarded-For` (só atrás de um proxy reverso).
    pub trust_proxy: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        Ok(Self {
            database_url,
            jwt_secret,
            port: env_or("PORT", 3000)?,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 10)?,
            db_acquire_timeout: Duration::from_secs(env_or("DB_ACQUIRE_TIMEOUT_SECS", 3)?),
            frontend_url: env_or("FRONTEND_URL", String::new())?,
            dev_return_token: env_flag("DEV_RETURN_TOKEN"),
            app_admin_user: env::var("APP_ADMIN_USER").ok().filter(|v| !v.trim().is_empty()),
            limit_serialized: env_flag("LIMIT_SERIALIZED"),
            lookup_rate_max: env_or("LOOKUP_RATE_MAX", 30)?,
            lookup_rate_window: Duration::from_secs(env_or("LOOKUP_RATE_WINDOW_SECS", 60)?),
            trust_proxy: env_flag("TRUST_PROXY"),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<AppConfig>,
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub clinic_service: ClinicService,
    pub doctor_profile_service: DoctorProfileService,
    pub branch_service: BranchService,
    pub plan_service: PlanService,
    pub purchase_service: PurchaseService,
    pub linking_service: LinkingService,
    pub patient_service: PatientService,
    pub appointment_service: AppointmentService,
    pub history_service: HistoryService,
    pub lookup_limiter: LookupRateLimiter,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = AppConfig::from_env()?;

        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(config.db_acquire_timeout)
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::build(db_pool, config))
    }

    /// Monta o gráfico de dependências sobre um pool já criado.
    pub fn build(db_pool: PgPool, config: AppConfig) -> Self {
        let user_repo = UserRepository::new(db_pool.clone());
        let clinic_repo = ClinicRepository::new(db_pool.clone());
        let plan_repo = PlanRepository::new(db_pool.clone());
        let purchase_repo = PurchaseRepository::new(db_pool.clone());
        let patient_repo = PatientRepository::new(db_pool.clone());
        let appointment_repo = AppointmentRepository::new(db_pool.clone());
        let history_repo = HistoryRepository::new(db_pool.clone());
        let reset_repo = PasswordResetRepository::new(db_pool.clone());

        let profile_repo = DoctorProfileRepository::new(db_pool.clone());
        let branch_repo = BranchRepository::new(db_pool.clone());

        let branch_service = BranchService::new(branch_repo, clinic_repo.clone(), plan_repo.clone(), db_pool.clone());
        let plan_service = PlanService::new(plan_repo, db_pool.clone());
        let ledger = PgCapacityLedger::new(
            db_pool.clone(),
            plan_service.clone(),
            user_repo.clone(),
            patient_repo.clone(),
            purchase_repo.clone(),
        );
        let limit_service = LimitService::new(Arc::new(ledger), config.limit_serialized);

        let auth_service = AuthService::new(
            user_repo.clone(),
            reset_repo,
            Arc::new(LogMailer),
            config.jwt_secret.clone(),
            config.frontend_url.clone(),
            config.dev_return_token,
            db_pool.clone(),
        );
        let user_service = UserService::new(
            user_repo.clone(),
            clinic_repo.clone(),
            purchase_repo.clone(),
            plan_service.clone(),
            limit_service.clone(),
            config.app_admin_user.clone(),
            db_pool.clone(),
        );
        let clinic_service = ClinicService::new(clinic_repo.clone(), db_pool.clone());
        let doctor_profile_service = DoctorProfileService::new(profile_repo, user_repo.clone(), db_pool.clone());
        let purchase_service = PurchaseService::new(purchase_repo.clone(), limit_service.clone(), db_pool.clone());
        let linking_service = LinkingService::new(
            user_repo,
            clinic_repo,
            patient_repo.clone(),
            purchase_repo,
            limit_service.clone(),
            db_pool.clone(),
        );
        let patient_service = PatientService::new(patient_repo.clone(), limit_service, db_pool.clone());
        let appointment_service = AppointmentService::new(appointment_repo, patient_repo.clone(), db_pool.clone());
        let history_service = HistoryService::new(history_repo, patient_repo, db_pool.clone());

        let lookup_limiter = LookupRateLimiter::new(
            config.lookup_rate_max,
            config.lookup_rate_window,
            config.trust_proxy,
        );

        Self {
            db_pool,
            config: Arc::new(config),
            auth_service,
            user_service,
            clinic_service,
            doctor_profile_service,
            branch_service,
            plan_service,
            purchase_service,
            linking_service,
            patient_service,
            appointment_service,
            history_service,
            lookup_limiter,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn test_config() -> AppConfig {
        AppConfig {
            database_url: "postgres://localhost/clinica_test".into(),
            jwt_secret: "segredo-de-teste".into(),
            port: 0,
            db_max_connections: 1,
            db_acquire_timeout: Duration::from_secs(1),
            frontend_url: "http://localhost:5173".into(),
            dev_return_token: false,
            app_admin_user: None,
            limit_serialized: false,
            lookup_rate_max: 2,
            lookup_rate_window: Duration::from_secs(60),
            trust_proxy: false,
        }
    }

    /// Estado com pool preguiçoso: nada conecta até a primeira query.
    pub fn lazy_state() -> AppState {
        let config = test_config();
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .expect("URL de teste válida");
        AppState::build(pool, config)
    }
}
