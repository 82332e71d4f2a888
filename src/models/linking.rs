// src/models/linking.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LinkDoctorPayload {
    pub doctor_id: Uuid,
    pub clinica_id: Uuid,
}

// Clientes antigos mandam camelCase nesta rota
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinkOwnerPayload {
    #[serde(alias = "doctor_id")]
    pub doctor_id: Uuid,
    #[serde(alias = "clinica_id")]
    pub clinica_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LinkOutcome {
    pub success: bool,
    pub mensaje: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pacientes_migrados: Option<u64>,
}

impl LinkOutcome {
    pub fn ok(mensaje: &str, pacientes_migrados: Option<u64>) -> Self {
        Self {
            success: true,
            mensaje: mensaje.to_string(),
            pacientes_migrados,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_payload_accepts_both_casings() {
        let d = Uuid::new_v4();
        let c = Uuid::new_v4();
        let camel: LinkOwnerPayload =
            serde_json::from_value(serde_json::json!({"doctorId": d, "clinicaId": c})).unwrap();
        let snake: LinkOwnerPayload =
            serde_json::from_value(serde_json::json!({"doctor_id": d, "clinica_id": c})).unwrap();
        assert_eq!((camel.doctor_id, camel.clinica_id), (d, c));
        assert_eq!((snake.doctor_id, snake.clinica_id), (d, c));
    }
}
