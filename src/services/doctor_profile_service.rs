// src/services/doctor_profile_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{DoctorProfileRepository, UserRepository},
    models::{
        auth::{Principal, User},
        doctor_profile::{
            DoctorDocument, DoctorProfile, DoctorProfilePayload, DoctorPublicCard, DocumentsPayload,
        },
    },
};

#[derive(Clone)]
pub struct DoctorProfileService {
    profile_repo: DoctorProfileRepository,
    user_repo: UserRepository,
    pool: PgPool,
}

// Leitura: o próprio doctor, o admin da plataforma ou alguém da mesma clínica
fn can_view(principal: &Principal, target: &User) -> bool {
    principal.id == target.id
        || principal.is_platform_admin()
        || target.clinica_id.is_some_and(|c| principal.belongs_to_clinic(c))
}

// Escrita: o próprio doctor, o admin da plataforma ou quem gere a clínica dele
fn can_edit(principal: &Principal, target: &User) -> bool {
    principal.id == target.id
        || principal.is_platform_admin()
        || target.clinica_id.is_some_and(|c| principal.can_manage_clinic(c))
}

impl DoctorProfileService {
    pub fn new(profile_repo: DoctorProfileRepository, user_repo: UserRepository, pool: PgPool) -> Self {
        Self {
            profile_repo,
            user_repo,
            pool,
        }
    }

    async fn target(&self, user_id: Uuid) -> Result<User, AppError> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Usuario no encontrado".into()))
    }

    /// Vitrine pública: devolve o perfil como está gravado.
    pub async fn public_profile(&self, user_id: Uuid) -> Result<DoctorProfile, AppError> {
        self.profile_repo
            .find_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Perfil no encontrado".into()))
    }

    pub async fn public_card(&self, user_id: Uuid) -> Result<DoctorPublicCard, AppError> {
        self.profile_repo
            .public_card(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Doctor no encontrado".into()))
    }

    pub async fn get(&self, principal: &Principal, user_id: Uuid) -> Result<DoctorProfile, AppError> {
        let target = self.target(user_id).await?;
        if !can_view(principal, &target) {
            return Err(AppError::Forbidden("Acceso no permitido".into()));
        }
        self.public_profile(user_id).await
    }

    /// Devolve o perfil e `true` quando a linha foi criada agora.
    pub async fn upsert(
        &self,
        principal: &Principal,
        user_id: Uuid,
        payload: &DoctorProfilePayload,
    ) -> Result<(DoctorProfile, bool), AppError> {
        let target = self.target(user_id).await?;
        if !can_edit(principal, &target) {
            return Err(AppError::Forbidden("Acceso no permitido".into()));
        }
        if payload.is_empty() {
            return Err(AppError::BadRequest("No hay campos para actualizar".into()));
        }

        let saved = self.profile_repo.upsert(user_id, &payload.normalized()).await?;
        tracing::info!(user_id = %user_id, created = saved.inserted, "Perfil de doctor gravado");
        Ok((saved.profile, saved.inserted))
    }

    /// Grava o lote inteiro ou nada.
    pub async fn add_documents(
        &self,
        principal: &Principal,
        user_id: Uuid,
        payload: &DocumentsPayload,
    ) -> Result<Vec<DoctorDocument>, AppError> {
        let target = self.target(user_id).await?;
        if !can_edit(principal, &target) {
            return Err(AppError::Forbidden("Acceso no permitido".into()));
        }

        let mut tx = self.pool.begin().await?;
        let mut saved = Vec::with_capacity(payload.documentos.len());
        for doc in &payload.documentos {
            saved.push(
                self.profile_repo
                    .add_document(&mut *tx, user_id, doc.filename.trim(), doc.url.trim())
                    .await?,
            );
        }
        tx.commit().await?;

        tracing::info!(user_id = %user_id, total = saved.len(), "Documentos de doctor gravados");
        Ok(saved)
    }

    pub async fn documents(&self, principal: &Principal, user_id: Uuid) -> Result<Vec<DoctorDocument>, AppError> {
        let target = self.target(user_id).await?;
        if !can_view(principal, &target) {
            return Err(AppError::Forbidden("Acceso no permitido".into()));
        }
        self.profile_repo.documents(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;

    use super::*;
    use crate::models::{auth::Role, doctor_profile::DocumentPayload};

    fn user(id: Uuid, rol: Role, clinica_id: Option<Uuid>, dueno: bool) -> (Principal, User) {
        let principal = Principal { id, rol, clinica_id, dueno };
        let user = User {
            id,
            usuario: format!("u-{id}"),
            email: None,
            password_hash: String::new(),
            rol,
            clinica_id,
            dueno,
            created_at: chrono::Utc::now(),
        };
        (principal, user)
    }

    #[test]
    fn colleagues_can_view_but_only_managers_can_edit() {
        let clinic = Uuid::new_v4();
        let (_, target) = user(Uuid::new_v4(), Role::Doctor, Some(clinic), false);
        let (colleague, _) = user(Uuid::new_v4(), Role::Doctor, Some(clinic), false);
        let (owner, _) = user(Uuid::new_v4(), Role::Doctor, Some(clinic), true);
        let (outsider, _) = user(Uuid::new_v4(), Role::Admin, Some(Uuid::new_v4()), false);

        assert!(can_view(&colleague, &target));
        assert!(!can_edit(&colleague, &target));
        assert!(can_edit(&owner, &target));
        assert!(!can_view(&outsider, &target));
        assert!(!can_edit(&outsider, &target));
    }

    #[test]
    fn individual_doctor_profile_is_private_to_self_and_platform() {
        let (me, target) = user(Uuid::new_v4(), Role::Doctor, None, false);
        let (other, _) = user(Uuid::new_v4(), Role::Doctor, None, false);
        let (platform, _) = user(Uuid::new_v4(), Role::Admin, None, false);

        assert!(can_edit(&me, &target));
        assert!(can_edit(&platform, &target));
        assert!(!can_view(&other, &target));
    }

    async fn seed_doctor(pool: &PgPool, usuario: &str) -> Principal {
        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO usuarios (usuario, password_hash, rol) VALUES ($1, 'x', 'doctor') RETURNING id",
        )
        .bind(usuario)
        .fetch_one(pool)
        .await
        .unwrap();
        Principal {
            id,
            rol: Role::Doctor,
            clinica_id: None,
            dueno: false,
        }
    }

    fn service(pool: &PgPool) -> DoctorProfileService {
        DoctorProfileService::new(
            DoctorProfileRepository::new(pool.clone()),
            UserRepository::new(pool.clone()),
            pool.clone(),
        )
    }

    #[sqlx::test]
    #[ignore = "requer DATABASE_URL"]
    async fn first_put_creates_and_later_puts_patch(pool: PgPool) {
        let doctor = seed_doctor(&pool, "dr.perfil").await;
        let service = service(&pool);

        let created = DoctorProfilePayload {
            nombre: Some(" Ana ".into()),
            bio: Some("Pediatra".into()),
            especialidad: Some("Pediatría".into()),
            ..Default::default()
        };
        let (profile, inserted) = service.upsert(&doctor, doctor.id, &created).await.unwrap();
        assert!(inserted);
        assert_eq!(profile.nombre.as_deref(), Some("Ana"));

        // Ausente mantém, vazio limpa
        let patch = DoctorProfilePayload {
            bio: Some(String::new()),
            telefono: Some("0991".into()),
            ..Default::default()
        };
        let (profile, inserted) = service.upsert(&doctor, doctor.id, &patch).await.unwrap();
        assert!(!inserted);
        assert_eq!(profile.nombre.as_deref(), Some("Ana"));
        assert_eq!(profile.especialidad.as_deref(), Some("Pediatría"));
        assert_eq!(profile.telefono.as_deref(), Some("0991"));
        assert_eq!(profile.bio, None);

        assert_eq!(service.public_profile(doctor.id).await.unwrap().telefono.as_deref(), Some("0991"));

        sqlx::query("INSERT INTO pacientes (nombres, apellidos, doctor_id) VALUES ('Luis', 'Paz', $1)")
            .bind(doctor.id)
            .execute(&pool)
            .await
            .unwrap();
        let card = service.public_card(doctor.id).await.unwrap();
        assert_eq!(card.especialidad.as_deref(), Some("Pediatría"));
        assert_eq!(card.total_pacientes, Some(1));
        assert_eq!(card.clinica_nombre, None);
        assert!(matches!(service.public_card(Uuid::new_v4()).await, Err(AppError::NotFound(_))));
    }

    #[sqlx::test]
    #[ignore = "requer DATABASE_URL"]
    async fn stranger_cannot_edit_and_missing_profile_is_not_found(pool: PgPool) {
        let doctor = seed_doctor(&pool, "dr.alvo").await;
        let stranger = seed_doctor(&pool, "dr.intruso").await;
        let service = service(&pool);

        assert!(matches!(
            service.public_profile(doctor.id).await,
            Err(AppError::NotFound(_))
        ));

        let payload = DoctorProfilePayload {
            bio: Some("invadido".into()),
            ..Default::default()
        };
        assert!(matches!(
            service.upsert(&stranger, doctor.id, &payload).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            service.upsert(&doctor, Uuid::new_v4(), &payload).await,
            Err(AppError::NotFound(_))
        ));

        let docs = DocumentsPayload {
            documentos: vec![DocumentPayload {
                filename: "titulo.pdf".into(),
                url: "/uploads/documents/titulo.pdf".into(),
            }],
        };
        assert!(matches!(
            service.add_documents(&stranger, doctor.id, &docs).await,
            Err(AppError::Forbidden(_))
        ));
        assert_eq!(service.add_documents(&doctor, doctor.id, &docs).await.unwrap().len(), 1);
        assert_eq!(service.documents(&doctor, doctor.id).await.unwrap().len(), 1);
    }
}
