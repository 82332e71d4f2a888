// src/models/limits.rs
//
// Regras puras de capacidade. Nada aqui toca no banco: os serviços buscam
// contagens e planos e chamam estas funções para decidir.

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::plan::EffectivePlan;

/// Pacientes incluídos para um doctor individual antes de qualquer compra.
pub const INDIVIDUAL_BASE_PATIENTS: i64 = 20;
/// Teto absoluto do doctor individual, independente de compras.
pub const INDIVIDUAL_HARD_CEILING: i64 = 80;

/// Preço padrão de um slot de doctor (5.00).
pub fn doctor_slot_price() -> Decimal {
    Decimal::new(500, 2)
}

/// Preço padrão de um slot de paciente (1.00).
pub fn patient_slot_price() -> Decimal {
    Decimal::new(100, 2)
}

/// Pagamento único registrado ao vincular um doctor a uma clínica (10.00).
pub fn link_fee() -> Decimal {
    Decimal::new(1000, 2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LimitResource {
    Doctors,
    Patients,
}

impl LimitResource {
    fn label(self) -> &'static str {
        match self {
            LimitResource::Doctors => "doctores",
            LimitResource::Patients => "pacientes",
        }
    }
}

// ---
// Resultado de uma avaliação de limite de clínica
// ---
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LimitCheck {
    pub resource: LimitResource,
    pub allowed: bool,
    pub total: i64,
    pub limit: i64,
    pub extras: i64,
    /// Teto do plano sem os extras (0 quando a clínica não tem plano).
    pub base_cap: i64,
    pub plan: Option<EffectivePlan>,
}

impl LimitCheck {
    /// limit = teto do plano efetivo + extras comprados; allowed = total < limit.
    pub fn compute(
        resource: LimitResource,
        plan: Option<EffectivePlan>,
        total: i64,
        extras: i64,
    ) -> Self {
        let base_cap = plan
            .as_ref()
            .map(|p| match resource {
                LimitResource::Doctors => p.doctores_max,
                LimitResource::Patients => p.pacientes_max,
            })
            .unwrap_or(0);
        let limit = base_cap + extras;

        Self {
            resource,
            allowed: total < limit,
            total,
            limit,
            extras,
            base_cap,
            plan,
        }
    }

    fn plan_name(&self) -> Option<String> {
        self.plan.as_ref().map(|p| p.nombre.clone())
    }
}

// ---
// Doctor individual (sem clínica)
// ---
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct IndividualLimitCheck {
    pub allowed: bool,
    pub count: i64,
    pub limit: i64,
    pub extras: i64,
}

impl IndividualLimitCheck {
    /// limit = min(20 + extras, 80). Cada compra vale um slot, não importa o valor pago.
    pub fn compute(count: i64, extras: i64) -> Self {
        let limit = (INDIVIDUAL_BASE_PATIENTS + extras.max(0)).min(INDIVIDUAL_HARD_CEILING);
        Self {
            allowed: count < limit,
            count,
            limit,
            extras,
        }
    }

    pub fn ensure_allowed(&self) -> Result<(), LimitRejection> {
        if self.allowed {
            return Ok(());
        }
        if self.limit >= INDIVIDUAL_HARD_CEILING {
            Err(LimitRejection::HardCeiling {
                total: self.count,
                limit: self.limit,
            })
        } else {
            Err(LimitRejection::IndividualLimit {
                total: self.count,
                limit: self.limit,
            })
        }
    }
}

// ---
// Motivos de rejeição (viram 403 na borda)
// ---
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum LimitRejection {
    /// Abaixo do teto base mas sem vaga: comprar extras ou mudar de plano.
    BuyExtras {
        resource: LimitResource,
        total: i64,
        limit: i64,
        plan: Option<String>,
    },
    /// Já migrou para VIP e continua sem vaga.
    EvenOnVip {
        resource: LimitResource,
        total: i64,
        limit: i64,
        plan: Option<String>,
    },
    /// Vinculação de doctor recusada pela capacidade do plano atual.
    PlanCapacity {
        total: i64,
        limit: i64,
        plan: Option<String>,
    },
    /// Plano da clínica principal sem sucursais livres.
    BranchCapacity {
        total: i64,
        limit: i64,
        plan: Option<String>,
    },
    IndividualLimit {
        total: i64,
        limit: i64,
    },
    HardCeiling {
        total: i64,
        limit: i64,
    },
}

impl LimitRejection {
    pub fn message(&self) -> String {
        match self {
            LimitRejection::BuyExtras { resource, .. } => format!(
                "Límite de {} alcanzado para su plan. Compre más extras o cambie de plan.",
                resource.label()
            ),
            LimitRejection::EvenOnVip { resource, .. } => format!(
                "Límite de {} alcanzado incluso en VIP. Compre más extras.",
                resource.label()
            ),
            LimitRejection::PlanCapacity { .. } => {
                "Límite de doctores alcanzado para el plan actual. Compre un plan superior."
                    .to_string()
            }
            LimitRejection::BranchCapacity { limit: 0, .. } => {
                "Su plan no incluye sucursales. Cambie a un plan superior.".to_string()
            }
            LimitRejection::BranchCapacity { .. } => {
                "Límite de sucursales alcanzado para su plan.".to_string()
            }
            LimitRejection::IndividualLimit { .. } => {
                "Límite de pacientes para doctor individual alcanzado. Compra más pacientes."
                    .to_string()
            }
            LimitRejection::HardCeiling { .. } => {
                "Has alcanzado 80 pacientes. Compra plan Clínica Pequeña para tener más pacientes."
                    .to_string()
            }
        }
    }
}

// ---
// Protocolo de admissão com upgrade automático para VIP
// ---
#[derive(Debug, Clone, PartialEq)]
pub enum AdmissionStep {
    Admit,
    UpgradeToVip,
    Reject(LimitRejection),
}

pub struct AdmissionPolicy;

impl AdmissionPolicy {
    /// Primeira decisão sobre uma criação de doctor/paciente de clínica.
    ///
    /// Sem vaga e total >= teto base: troca para VIP e reavalia uma vez.
    /// Uma clínica no teto base sem nenhum extra comprado cai aqui também,
    /// ou seja, vai para VIP sem oferecer a compra de um slot antes.
    pub fn decide(check: &LimitCheck) -> AdmissionStep {
        if check.allowed {
            AdmissionStep::Admit
        } else if check.total >= check.base_cap {
            AdmissionStep::UpgradeToVip
        } else {
            AdmissionStep::Reject(LimitRejection::BuyExtras {
                resource: check.resource,
                total: check.total,
                limit: check.limit,
                plan: check.plan_name(),
            })
        }
    }

    /// Reavaliação única depois da troca para VIP.
    pub fn after_upgrade(check: &LimitCheck) -> Result<(), LimitRejection> {
        if check.allowed {
            Ok(())
        } else {
            Err(LimitRejection::EvenOnVip {
                resource: check.resource,
                total: check.total,
                limit: check.limit,
                plan: check.plan_name(),
            })
        }
    }

    /// Vinculação de doctor: sem upgrade, só aceita ou recusa.
    pub fn for_linking(check: &LimitCheck) -> Result<(), LimitRejection> {
        if check.allowed {
            Ok(())
        } else {
            Err(LimitRejection::PlanCapacity {
                total: check.total,
                limit: check.limit,
                plan: check.plan_name(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::plan::{test_plan, PlanTier};

    fn two_doctor_plan() -> Option<EffectivePlan> {
        Some(test_plan("Básico Plus", PlanTier::Standard, 2, 100).effective())
    }

    #[test]
    fn limit_is_base_plus_extras() {
        let check = LimitCheck::compute(LimitResource::Doctors, two_doctor_plan(), 2, 1);
        assert_eq!(check.limit, 3);
        assert!(check.allowed);
    }

    #[test]
    fn missing_plan_means_zero_capacity() {
        let check = LimitCheck::compute(LimitResource::Patients, None, 0, 0);
        assert_eq!(check.base_cap, 0);
        assert!(!check.allowed);
        assert_eq!(AdmissionPolicy::decide(&check), AdmissionStep::UpgradeToVip);
    }

    #[test]
    fn at_base_cap_without_extras_goes_straight_to_vip() {
        let check = LimitCheck::compute(LimitResource::Doctors, two_doctor_plan(), 2, 0);
        assert!(!check.allowed);
        assert_eq!(AdmissionPolicy::decide(&check), AdmissionStep::UpgradeToVip);
    }

    #[test]
    fn extras_exhausted_above_base_cap_upgrades() {
        let check = LimitCheck::compute(LimitResource::Doctors, two_doctor_plan(), 4, 2);
        assert_eq!(AdmissionPolicy::decide(&check), AdmissionStep::UpgradeToVip);
    }

    #[test]
    fn below_base_cap_but_not_allowed_rejects_with_buy_extras() {
        // Só acontece com extras negativos/corrompidos; a regra é mantida mesmo assim.
        let check = LimitCheck::compute(LimitResource::Patients, two_doctor_plan(), 50, -60);
        assert!(!check.allowed);
        match AdmissionPolicy::decide(&check) {
            AdmissionStep::Reject(LimitRejection::BuyExtras { resource, .. }) => {
                assert_eq!(resource, LimitResource::Patients)
            }
            other => panic!("decisão inesperada: {other:?}"),
        }
    }

    #[test]
    fn after_upgrade_rejection_mentions_vip() {
        let vip = Some(test_plan("Combo VIP", PlanTier::Vip, 3, 5000).effective());
        let check = LimitCheck::compute(LimitResource::Doctors, vip, 3, 0);
        let err = AdmissionPolicy::after_upgrade(&check).unwrap_err();
        assert!(err.message().contains("incluso en VIP"));
    }

    #[test]
    fn individual_limit_grows_with_purchases() {
        let check = IndividualLimitCheck::compute(20, 0);
        assert_eq!(check.limit, 20);
        let err = check.ensure_allowed().unwrap_err();
        assert!(err
            .message()
            .contains("Límite de pacientes para doctor individual alcanzado."));

        let check = IndividualLimitCheck::compute(20, 5);
        assert_eq!(check.limit, 25);
        assert!(check.ensure_allowed().is_ok());
    }

    #[test]
    fn individual_hard_ceiling_ignores_extra_purchases() {
        let check = IndividualLimitCheck::compute(80, 1_000);
        assert_eq!(check.limit, INDIVIDUAL_HARD_CEILING);
        assert!(!check.allowed);
        assert!(matches!(
            check.ensure_allowed(),
            Err(LimitRejection::HardCeiling { total: 80, limit: 80 })
        ));
    }

    #[test]
    fn linking_rejection_is_plan_capacity() {
        let check = LimitCheck::compute(LimitResource::Doctors, two_doctor_plan(), 2, 0);
        assert!(matches!(
            AdmissionPolicy::for_linking(&check),
            Err(LimitRejection::PlanCapacity { total: 2, limit: 2, .. })
        ));
    }
}
