// src/middleware/rbac.rs

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    common::error::AppError,
    middleware::auth::AuthenticatedUser,
    models::auth::{Principal, Role},
};

/// Regra de acesso avaliada só sobre o principal.
pub trait RoleGate: Send + Sync + 'static {
    fn allows(principal: &Principal) -> bool;
    fn denial() -> &'static str;
}

/// Extrator: o handler só roda se `T` aceitar o principal.
pub struct RequireRole<T>(pub Principal, pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleGate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(principal) = AuthenticatedUser::from_request_parts(parts, state).await?;
        if !T::allows(&principal) {
            return Err(AppError::Forbidden(T::denial().into()));
        }
        Ok(RequireRole(principal, PhantomData))
    }
}

// ---
// Regras
// ---

/// Dono de clínica ou qualquer admin. A clínica alvo ainda passa por `can_manage_clinic`.
pub struct OwnerOrAdmin;
impl RoleGate for OwnerOrAdmin {
    fn allows(principal: &Principal) -> bool {
        principal.dueno || principal.rol == Role::Admin
    }
    fn denial() -> &'static str {
        "Solo el dueño de la clínica o un administrador puede realizar esta acción"
    }
}

pub struct PlatformAdmin;
impl RoleGate for PlatformAdmin {
    fn allows(principal: &Principal) -> bool {
        principal.is_platform_admin()
    }
    fn denial() -> &'static str {
        "Solo un administrador puede realizar esta acción"
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;
    use uuid::Uuid;

    use super::*;

    async fn gate<T: RoleGate>(principal: Principal) -> Result<RequireRole<T>, AppError> {
        let mut request = Request::builder().uri("/").body(()).unwrap();
        request.extensions_mut().insert(principal);
        let (mut parts, _) = request.into_parts();
        RequireRole::<T>::from_request_parts(&mut parts, &()).await
    }

    fn principal(rol: Role, clinica_id: Option<Uuid>, dueno: bool) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            rol,
            clinica_id,
            dueno,
        }
    }

    #[tokio::test]
    async fn owner_passes_owner_gate_but_not_admin_gate() {
        let owner = principal(Role::Doctor, Some(Uuid::new_v4()), true);
        assert!(gate::<OwnerOrAdmin>(owner.clone()).await.is_ok());
        assert!(matches!(
            gate::<PlatformAdmin>(owner).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn plain_doctor_is_denied() {
        let doctor = principal(Role::Doctor, Some(Uuid::new_v4()), false);
        assert!(gate::<OwnerOrAdmin>(doctor).await.is_err());
    }

    #[tokio::test]
    async fn clinic_admin_is_not_a_platform_admin() {
        let admin = principal(Role::Admin, Some(Uuid::new_v4()), false);
        assert!(gate::<OwnerOrAdmin>(admin.clone()).await.is_ok());
        assert!(matches!(
            gate::<PlatformAdmin>(admin).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn platform_admin_passes_both() {
        let admin = principal(Role::Admin, None, false);
        let RequireRole(p, _) = gate::<PlatformAdmin>(admin.clone()).await.unwrap();
        assert_eq!(p, admin);
        assert!(gate::<OwnerOrAdmin>(admin).await.is_ok());
    }
}
