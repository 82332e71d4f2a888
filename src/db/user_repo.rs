// src/db/user_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::auth::{ClinicDoctorSummary, PublicDoctor, Role, User},
};

const USER_COLUMNS: &str = "id, usuario, email, password_hash, rol, clinica_id, dueno, created_at";

// O repositório de usuários, responsável por todas as interações com a tabela 'usuarios'
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM usuarios WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Trava a linha do usuário até o fim da transação.
    pub async fn find_for_update<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM usuarios WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(user)
    }

    pub async fn find_by_usuario(&self, usuario: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM usuarios WHERE usuario = $1"))
            .bind(usuario)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    // Recuperação de senha aceita usuário ou email
    pub async fn find_by_usuario_or_email(
        &self,
        usuario: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM usuarios WHERE usuario = $1 OR email = $2 LIMIT 1"
        ))
        .bind(usuario)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn usuario_exists(&self, usuario: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM usuarios WHERE usuario = $1)")
            .bind(usuario)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    // Cria um novo usuário. Usuário duplicado vira `DuplicateEntity`.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_user<'e, E>(
        &self,
        executor: E,
        usuario: &str,
        email: Option<&str>,
        password_hash: &str,
        rol: Role,
        clinica_id: Option<Uuid>,
        dueno: bool,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO usuarios (usuario, email, password_hash, rol, clinica_id, dueno)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(usuario)
        .bind(email)
        .bind(password_hash)
        .bind(rol)
        .bind(clinica_id)
        .bind(dueno)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "El usuario ya existe"))
    }

    pub async fn list_by_clinic(&self, clinica_id: Uuid) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM usuarios WHERE clinica_id = $1 ORDER BY usuario"
        ))
        .bind(clinica_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    pub async fn find_in_clinic(&self, id: Uuid, clinica_id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM usuarios WHERE id = $1 AND clinica_id = $2"
        ))
        .bind(id)
        .bind(clinica_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    // Campos ausentes ficam como estão (COALESCE)
    pub async fn update_in_clinic(
        &self,
        id: Uuid,
        clinica_id: Uuid,
        usuario: Option<&str>,
        email: Option<&str>,
        rol: Option<Role>,
    ) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE usuarios
            SET usuario = COALESCE($3, usuario),
                email = COALESCE($4, email),
                rol = COALESCE($5, rol)
            WHERE id = $1 AND clinica_id = $2
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(clinica_id)
        .bind(usuario)
        .bind(email)
        .bind(rol)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "El usuario ya existe"))
    }

    pub async fn delete_in_clinic(&self, id: Uuid, clinica_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM usuarios WHERE id = $1 AND clinica_id = $2")
            .bind(id)
            .bind(clinica_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::from_constraint_violation(e, "El usuario tiene pacientes o registros asociados")
            })?;
        Ok(result.rows_affected())
    }

    /// Diretório público: doctores individuais e vinculados.
    pub async fn list_public_doctors(&self) -> Result<Vec<PublicDoctor>, AppError> {
        let doctors = sqlx::query_as::<_, PublicDoctor>(
            "SELECT id, usuario, rol, clinica_id FROM usuarios WHERE rol = 'doctor' ORDER BY usuario",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(doctors)
    }

    pub async fn clinic_doctors(&self, clinica_id: Uuid) -> Result<Vec<ClinicDoctorSummary>, AppError> {
        let doctors = sqlx::query_as::<_, ClinicDoctorSummary>(
            "SELECT id, usuario, dueno FROM usuarios WHERE clinica_id = $1 AND rol = 'doctor' ORDER BY usuario",
        )
        .bind(clinica_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(doctors)
    }

    pub async fn count_doctors<'e, E>(&self, executor: E, clinica_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM usuarios WHERE clinica_id = $1 AND rol = 'doctor'",
        )
        .bind(clinica_id)
        .fetch_one(executor)
        .await?;
        Ok(total)
    }

    /// Muda a afiliação do usuário (vinculação / desvinculação).
    pub async fn set_clinic<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        clinica_id: Option<Uuid>,
        dueno: bool,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("UPDATE usuarios SET clinica_id = $2, dueno = $3 WHERE id = $1")
            .bind(id)
            .bind(clinica_id)
            .bind(dueno)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn update_password<'e, E>(&self, executor: E, id: Uuid, password_hash: &str) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("UPDATE usuarios SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
