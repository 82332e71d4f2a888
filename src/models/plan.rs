// src/models/plan.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// ---
// 1. PlanTier (a "faixa" do plano)
// ---
// Mapeia o CREATE TYPE plan_tier do banco.
// O tier substitui a comparação por nome ("contém 'vip'") das versões antigas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "plan_tier", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanTier {
    Standard,
    ClinicaPequena,
    Vip,
}

/// Tetos efetivos de um plano.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct PlanCaps {
    pub doctores_max: i64,
    pub pacientes_max: i64,
}

impl PlanTier {
    /// Tabela tier -> tetos forçados. Aplicada na leitura, nunca persistida.
    ///
    /// "Clínica Pequeña" tem 2 doctores / 165 pacientes independente do catálogo,
    /// mesmo quando a linha do catálogo diz outra coisa.
    pub fn cap_override(self) -> Option<PlanCaps> {
        match self {
            PlanTier::ClinicaPequena => Some(PlanCaps {
                doctores_max: 2,
                pacientes_max: 165,
            }),
            PlanTier::Standard | PlanTier::Vip => None,
        }
    }

    /// Classificação legada pelo nome do plano.
    ///
    /// Só é usada quando um plano é criado sem tier explícito. Renomear um plano
    /// não muda o tier já gravado, então não dependa disso para planos existentes.
    pub fn classify_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.contains("vip") {
            PlanTier::Vip
        } else if lower.contains("clínica pequeña") || lower.contains("clinica pequeña") {
            PlanTier::ClinicaPequena
        } else {
            PlanTier::Standard
        }
    }
}

// ---
// 2. Plan (o catálogo)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Plan {
    pub id: Uuid,
    #[schema(example = "Clínica Pequeña")]
    pub nombre: String,
    pub tier: PlanTier,
    #[schema(value_type = f64, example = 49.0)]
    pub precio: Decimal,
    pub pacientes_max: i32,
    pub doctores_max: i32,
    pub sucursales_incluidas: i32,
    pub descripcion: Option<String>,
}

impl Plan {
    /// Tetos que o avaliador de limites realmente usa (catálogo + override do tier).
    pub fn effective(&self) -> EffectivePlan {
        let caps = self.tier.cap_override().unwrap_or(PlanCaps {
            doctores_max: i64::from(self.doctores_max),
            pacientes_max: i64::from(self.pacientes_max),
        });

        EffectivePlan {
            id: self.id,
            nombre: self.nombre.clone(),
            tier: self.tier,
            doctores_max: caps.doctores_max,
            pacientes_max: caps.pacientes_max,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct EffectivePlan {
    pub id: Uuid,
    pub nombre: String,
    pub tier: PlanTier,
    pub doctores_max: i64,
    pub pacientes_max: i64,
}

// ---
// 3. ClinicPlan (a atribuição plano <-> clínica)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ClinicPlan {
    pub id: Uuid,
    pub clinica_id: Uuid,
    pub plan_id: Uuid,
    pub fecha_inicio: NaiveDate,
    pub fecha_fin: Option<NaiveDate>,
    pub activo: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePlanPayload {
    #[validate(length(min = 1, message = "El nombre es obligatorio"))]
    pub nombre: String,
    pub tier: Option<PlanTier>,
    #[schema(value_type = f64)]
    pub precio: Decimal,
    #[validate(range(min = 0, message = "pacientes_max no puede ser negativo"))]
    pub pacientes_max: i32,
    #[validate(range(min = 0, message = "doctores_max no puede ser negativo"))]
    pub doctores_max: i32,
    #[serde(default)]
    pub sucursales_incluidas: i32,
    pub descripcion: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignPlanPayload {
    pub clinica_id: Uuid,
    pub plan_id: Uuid,
    pub fecha_inicio: Option<NaiveDate>,
    pub fecha_fin: Option<NaiveDate>,
}

/// Troca o plano ativo (o anterior é desativado).
#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangePlanPayload {
    pub plan_id: Uuid,
    pub fecha_fin: Option<NaiveDate>,
}

#[cfg(test)]
pub(crate) fn test_plan(nombre: &str, tier: PlanTier, doctores_max: i32, pacientes_max: i32) -> Plan {
    Plan {
        id: Uuid::new_v4(),
        nombre: nombre.to_string(),
        tier,
        precio: Decimal::ZERO,
        pacientes_max,
        doctores_max,
        sucursales_incluidas: 0,
        descripcion: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_clinic_override_wins_over_catalog() {
        let plan = test_plan("Clínica Pequeña", PlanTier::ClinicaPequena, 3, 150);
        let effective = plan.effective();
        assert_eq!(effective.doctores_max, 2);
        assert_eq!(effective.pacientes_max, 165);
    }

    #[test]
    fn standard_plan_uses_catalog_values() {
        let plan = test_plan("Clínica Mediana", PlanTier::Standard, 5, 500);
        let effective = plan.effective();
        assert_eq!(effective.doctores_max, 5);
        assert_eq!(effective.pacientes_max, 500);
    }

    #[test]
    fn classify_name_matches_legacy_rules() {
        assert_eq!(PlanTier::classify_name("Combo VIP"), PlanTier::Vip);
        assert_eq!(PlanTier::classify_name("CLÍNICA PEQUEÑA anual"), PlanTier::ClinicaPequena);
        assert_eq!(PlanTier::classify_name("Básico"), PlanTier::Standard);
    }
}
