// src/services/auth.rs

use std::sync::Arc;

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{PasswordResetRepository, UserRepository},
    models::auth::{
        AuthResponse, Claims, PasswordResetIssued, PasswordResetPayload, PasswordResetRequestPayload,
        RegisterDoctorPayload, Role, User,
    },
    services::email_service::{send_detached, Mailer},
};

const RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// bcrypt em thread separada (é CPU-bound).
pub async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
    Ok(hashed)
}

pub(crate) fn encode_token(secret: &str, user_id: Uuid) -> Result<String, AppError> {
    let now = Utc::now();
    let expires_at = now + chrono::Duration::days(7);

    let claims = Claims {
        sub: user_id,
        exp: expires_at.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?)
}

pub(crate) fn decode_token(secret: &str, token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::InvalidToken)
}

/// Só o SHA-256 do token de recuperação vai para o banco.
pub(crate) fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn new_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    reset_repo: PasswordResetRepository,
    mailer: Arc<dyn Mailer>,
    jwt_secret: String,
    frontend_url: String,
    dev_return_token: bool,
    pool: PgPool,
}

impl AuthService {
    pub fn new(
        user_repo: UserRepository,
        reset_repo: PasswordResetRepository,
        mailer: Arc<dyn Mailer>,
        jwt_secret: String,
        frontend_url: String,
        dev_return_token: bool,
        pool: PgPool,
    ) -> Self {
        Self {
            user_repo,
            reset_repo,
            mailer,
            jwt_secret,
            frontend_url,
            dev_return_token,
            pool,
        }
    }

    /// Registro público: sempre cria um doctor individual (sem clínica, não dono).
    pub async fn register_doctor(&self, payload: &RegisterDoctorPayload) -> Result<AuthResponse, AppError> {
        let hashed_password = hash_password(&payload.clave).await?;

        let user = self
            .user_repo
            .create_user(
                &self.pool,
                &payload.usuario,
                payload.email.as_deref(),
                &hashed_password,
                Role::Doctor,
                None,
                false,
            )
            .await?;

        tracing::info!(user_id = %user.id, "Doctor individual registrado");
        self.auth_response(&user)
    }

    pub async fn login(&self, usuario: &str, clave: &str) -> Result<AuthResponse, AppError> {
        let user = self
            .user_repo
            .find_by_usuario(usuario)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = clave.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        self.auth_response(&user)
    }

    /// Recarrega o usuário a cada requisição: vinculações valem na hora.
    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let claims = decode_token(&self.jwt_secret, token)?;

        self.user_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)
    }

    fn auth_response(&self, user: &User) -> Result<AuthResponse, AppError> {
        Ok(AuthResponse {
            token: encode_token(&self.jwt_secret, user.id)?,
            id: user.id,
            usuario: user.usuario.clone(),
            rol: user.rol,
            clinica_id: user.clinica_id,
            dueno: user.dueno,
        })
    }

    // ---
    // Recuperação de senha
    // ---

    /// Responde igual exista ou não o usuário.
    pub async fn request_password_reset(
        &self,
        payload: &PasswordResetRequestPayload,
    ) -> Result<PasswordResetIssued, AppError> {
        let usuario = payload.usuario.as_deref().filter(|s| !s.trim().is_empty());
        let email = payload.email.as_deref().filter(|s| !s.trim().is_empty());
        if usuario.is_none() && email.is_none() {
            return Err(AppError::BadRequest("usuario o email requeridos".into()));
        }

        let silent = PasswordResetIssued {
            ok: true,
            debug_token: None,
            reset_url: None,
        };

        let Some(user) = self.user_repo.find_by_usuario_or_email(usuario, email).await? else {
            return Ok(silent);
        };

        let token = new_reset_token();
        let expires_at = Utc::now() + chrono::Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        self.reset_repo
            .insert(user.id, &hash_reset_token(&token), expires_at)
            .await?;

        let reset_url = format!(
            "{}/reset-password?token={}&uid={}",
            self.frontend_url.trim_end_matches('/'),
            token,
            user.id
        );

        match &user.email {
            Some(to) => send_detached(
                self.mailer.clone(),
                to.clone(),
                "Recuperación de contraseña".into(),
                format!("Para restablecer su contraseña visite: {reset_url}\nEl enlace expira en 1 hora."),
            ),
            None => tracing::warn!(user_id = %user.id, "Usuário sem email, token de recuperação não enviado"),
        }

        if self.dev_return_token {
            return Ok(PasswordResetIssued {
                ok: true,
                debug_token: Some(token),
                reset_url: Some(reset_url),
            });
        }
        Ok(silent)
    }

    pub async fn reset_password(&self, payload: &PasswordResetPayload) -> Result<(), AppError> {
        let hashed_password = hash_password(&payload.new_password).await?;

        let mut tx = self.pool.begin().await?;

        let valid = self
            .reset_repo
            .consume(&mut *tx, payload.uid, &hash_reset_token(&payload.token))
            .await?;
        if !valid {
            return Err(AppError::BadRequest("Token inválido o expirado".into()));
        }

        self.user_repo
            .update_password(&mut *tx, payload.uid, &hashed_password)
            .await?;

        tx.commit().await?;

        tracing::info!(user_id = %payload.uid, "Senha redefinida");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip_keeps_subject() {
        let user_id = Uuid::new_v4();
        let token = encode_token("segredo", user_id).unwrap();
        let claims = decode_token("segredo", &token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = encode_token("segredo", Uuid::new_v4()).unwrap();
        assert!(matches!(decode_token("outro", &token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn reset_token_hash_is_stable_hex() {
        let a = hash_reset_token("abc");
        assert_eq!(a, hash_reset_token("abc"));
        assert_eq!(a.len(), 64);
        assert_ne!(a, hash_reset_token("abd"));
    }

    #[test]
    fn reset_tokens_are_random() {
        assert_ne!(new_reset_token(), new_reset_token());
    }

    #[tokio::test]
    async fn hashed_password_verifies() {
        let hashed = hash_password("clave123").await.unwrap();
        assert!(verify("clave123", &hashed).unwrap());
    }
}
