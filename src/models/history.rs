// src/models/history.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// Registro de historial. O dono é sempre o dono do paciente (join).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct HistoryRecord {
    pub id: Uuid,
    pub paciente_id: Uuid,
    pub motivo_consulta: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub peso: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub estatura: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub imc: Option<Decimal>,
    pub presion: Option<String>,
    pub frecuencia_cardiaca: Option<i32>,
    pub frecuencia_respiratoria: Option<i32>,
    #[schema(value_type = Option<f64>)]
    pub temperatura: Option<Decimal>,
    pub otros: Option<String>,
    pub diagnostico: Option<String>,
    pub tratamiento: Option<String>,
    pub receta: Option<String>,
    pub fecha: NaiveDate,
    /// URLs devolvidas pelo armazenamento de arquivos.
    pub imagenes: Vec<String>,

    // Dados do paciente (join)
    pub nombres: String,
    pub apellidos: String,
    pub doctor_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct HistoryPayload {
    pub paciente_id: Uuid,
    /// Clientes antigos mandam `motivo`.
    #[serde(alias = "motivo")]
    pub motivo_consulta: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub peso: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub estatura: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub imc: Option<Decimal>,
    pub presion: Option<String>,
    #[validate(range(min = 0, max = 400, message = "Frecuencia cardiaca fuera de rango"))]
    pub frecuencia_cardiaca: Option<i32>,
    #[validate(range(min = 0, max = 200, message = "Frecuencia respiratoria fuera de rango"))]
    pub frecuencia_respiratoria: Option<i32>,
    #[schema(value_type = Option<f64>)]
    pub temperatura: Option<Decimal>,
    pub otros: Option<String>,
    pub diagnostico: Option<String>,
    pub tratamiento: Option<String>,
    pub receta: Option<String>,
    pub fecha: Option<NaiveDate>,
    #[serde(default)]
    pub imagenes: Vec<String>,
}

impl HistoryPayload {
    /// Remove entradas vazias que alguns clientes mandam no array de imagens.
    pub fn clean_images(&self) -> Vec<String> {
        self.imagenes
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_legacy_motivo_field() {
        let payload: HistoryPayload = serde_json::from_value(serde_json::json!({
            "paciente_id": Uuid::new_v4(),
            "motivo": "Dolor de cabeza",
            "imagenes": ["/uploads/historial/a.png", "  ", ""]
        }))
        .unwrap();
        assert_eq!(payload.motivo_consulta.as_deref(), Some("Dolor de cabeza"));
        assert_eq!(payload.clean_images(), vec!["/uploads/historial/a.png".to_string()]);
    }
}
