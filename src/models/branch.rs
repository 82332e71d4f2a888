// src/models/branch.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{limits::LimitRejection, plan::Plan};

// Vínculo principal -> sucursal entre duas clínicas
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Branch {
    pub id: Uuid,
    pub clinica_principal_id: Uuid,
    pub clinica_vinculada_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LinkBranchPayload {
    pub clinica_principal_id: Uuid,
    pub clinica_vinculada_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BranchCreated {
    pub id: Uuid,
}

/// A principal só ganha mais uma sucursal se o plano ativo ainda tiver vaga.
pub fn ensure_branch_capacity(plan: Option<&Plan>, total: i64) -> Result<(), LimitRejection> {
    let limit = plan.map(|p| i64::from(p.sucursales_incluidas)).unwrap_or(0);
    if total < limit {
        return Ok(());
    }
    Err(LimitRejection::BranchCapacity {
        total,
        limit,
        plan: plan.map(|p| p.nombre.clone()),
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::plan::PlanTier;

    fn plan(nombre: &str, sucursales_incluidas: i32) -> Plan {
        Plan {
            id: Uuid::new_v4(),
            nombre: nombre.into(),
            tier: PlanTier::Standard,
            precio: Decimal::ZERO,
            pacientes_max: 100,
            doctores_max: 5,
            sucursales_incluidas,
            descripcion: None,
        }
    }

    #[test]
    fn clinic_without_plan_cannot_add_branches() {
        let err = ensure_branch_capacity(None, 0).unwrap_err();
        assert_eq!(err, LimitRejection::BranchCapacity { total: 0, limit: 0, plan: None });
        assert!(err.message().contains("no incluye sucursales"));
    }

    #[test]
    fn branches_fill_up_to_the_plan_allowance() {
        let mediana = plan("Clínica Mediana", 1);
        assert!(ensure_branch_capacity(Some(&mediana), 0).is_ok());

        let err = ensure_branch_capacity(Some(&mediana), 1).unwrap_err();
        assert!(matches!(
            err,
            LimitRejection::BranchCapacity { total: 1, limit: 1, plan: Some(ref n) } if n == "Clínica Mediana"
        ));
        assert!(err.message().contains("Límite de sucursales"));
    }
}
