// src/models/tenancy.rs

use serde::Serialize;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::auth::{Principal, Role},
};

// ---
// TenantScope: "de quem" é o dado que a requisição toca
// ---
// Exatamente um dos dois: a clínica, ou o próprio doctor individual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum TenantScope {
    Clinic(Uuid),
    IndividualDoctor(Uuid),
}

impl TenantScope {
    /// Resolve o escopo efetivo do principal.
    ///
    /// `bootstrap_clinic` só é considerado para um admin sem clínica em rotas de
    /// criação que trazem a clínica alvo no corpo (bootstrap do admin da plataforma).
    pub fn resolve(principal: &Principal, bootstrap_clinic: Option<Uuid>) -> Result<Self, AppError> {
        if principal.rol == Role::Admin && principal.clinica_id.is_none() {
            if let Some(clinic_id) = bootstrap_clinic {
                return Ok(TenantScope::Clinic(clinic_id));
            }
        }

        match (principal.clinica_id, principal.rol) {
            (Some(clinic_id), _) => Ok(TenantScope::Clinic(clinic_id)),
            (None, Role::Doctor) => Ok(TenantScope::IndividualDoctor(principal.id)),
            (None, _) => Err(AppError::Forbidden("Acceso no permitido".into())),
        }
    }

    pub fn clinic_id(&self) -> Option<Uuid> {
        match self {
            TenantScope::Clinic(id) => Some(*id),
            TenantScope::IndividualDoctor(_) => None,
        }
    }

    /// Chave estável usada para locks por escopo.
    pub fn key(&self) -> String {
        match self {
            TenantScope::Clinic(id) => format!("clinic:{id}"),
            TenantScope::IndividualDoctor(id) => format!("doctor:{id}"),
        }
    }
}

/// Escopo resolvido + quem está agindo. É o que os handlers recebem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantContext {
    pub scope: TenantScope,
    pub user_id: Uuid,
}

impl TenantContext {
    pub fn resolve(principal: &Principal) -> Result<Self, AppError> {
        Ok(Self {
            scope: TenantScope::resolve(principal, None)?,
            user_id: principal.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(rol: Role, clinica_id: Option<Uuid>) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            rol,
            clinica_id,
            dueno: false,
        }
    }

    #[test]
    fn clinic_member_resolves_to_clinic_regardless_of_role() {
        let clinic = Uuid::new_v4();
        for rol in [Role::Admin, Role::Doctor] {
            let p = principal(rol, Some(clinic));
            assert_eq!(TenantScope::resolve(&p, None).unwrap(), TenantScope::Clinic(clinic));
        }
    }

    #[test]
    fn doctor_without_clinic_is_individual() {
        let p = principal(Role::Doctor, None);
        assert_eq!(
            TenantScope::resolve(&p, None).unwrap(),
            TenantScope::IndividualDoctor(p.id)
        );
    }

    #[test]
    fn admin_without_clinic_is_denied() {
        let p = principal(Role::Admin, None);
        assert!(matches!(
            TenantScope::resolve(&p, None),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn admin_bootstrap_uses_explicit_clinic() {
        let target = Uuid::new_v4();
        let p = principal(Role::Admin, None);
        assert_eq!(
            TenantScope::resolve(&p, Some(target)).unwrap(),
            TenantScope::Clinic(target)
        );
    }

    #[test]
    fn body_clinic_is_ignored_for_everyone_else() {
        let own = Uuid::new_v4();
        let other = Uuid::new_v4();

        let admin = principal(Role::Admin, Some(own));
        assert_eq!(TenantScope::resolve(&admin, Some(other)).unwrap(), TenantScope::Clinic(own));

        let doctor = principal(Role::Doctor, None);
        assert_eq!(
            TenantScope::resolve(&doctor, Some(other)).unwrap(),
            TenantScope::IndividualDoctor(doctor.id)
        );
    }

    #[test]
    fn context_keeps_actor_for_clinic_members() {
        let clinic = Uuid::new_v4();
        let p = principal(Role::Doctor, Some(clinic));
        let ctx = TenantContext::resolve(&p).unwrap();
        assert_eq!(ctx.scope, TenantScope::Clinic(clinic));
        assert_eq!(ctx.user_id, p.id);
        assert_eq!(ctx.scope.key(), format!("clinic:{clinic}"));
    }
}
