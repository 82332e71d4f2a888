// src/common/db_utils.rs
//
// Fragmentos SQL de escopo. Todos usam a mesma convenção de parâmetros:
//   $1 = clínica do escopo (NULL para doctor individual)
//   $2 = usuário que age (o próprio doctor, no escopo individual)
// Com $1 NULL as comparações por clínica nunca casam, então o mesmo
// fragmento serve para os dois escopos.

use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::tenancy::TenantContext;

/// Paciente visível para leitura: da clínica, de doctores atualmente na
/// clínica (linhas nunca migradas), ou individual do próprio usuário.
pub(crate) const PATIENT_VISIBLE: &str = "(p.clinica_id = $1 \
     OR p.doctor_id IN (SELECT u.id FROM usuarios u WHERE u.clinica_id = $1) \
     OR (p.clinica_id IS NULL AND p.doctor_id = $2))";

/// Paciente que o escopo pode alterar: dono exato.
pub(crate) const PATIENT_OWNED: &str =
    "(p.clinica_id = $1 OR (p.clinica_id IS NULL AND p.doctor_id = $2))";

/// Só pacientes individuais do usuário.
pub(crate) const PATIENT_INDIVIDUAL: &str = "(p.clinica_id IS NULL AND p.doctor_id = $2)";

/// Só o conjunto da clínica (união com os doctores afiliados).
pub(crate) const PATIENT_CLINIC: &str = "(p.clinica_id = $1 \
     OR p.doctor_id IN (SELECT u.id FROM usuarios u WHERE u.clinica_id = $1))";

// Citas gravam `clinica_id` quando criadas no escopo de clínica.
pub(crate) const APPOINTMENT_VISIBLE: &str = "(c.clinica_id = $1 \
     OR p.clinica_id = $1 \
     OR p.doctor_id IN (SELECT u.id FROM usuarios u WHERE u.clinica_id = $1) \
     OR (p.clinica_id IS NULL AND p.doctor_id = $2))";

/// Escrita em cita segue o dono atual do paciente, nunca a clínica gravada na cita.
pub(crate) const APPOINTMENT_OWNED: &str = PATIENT_OWNED;

/// Os dois parâmetros de escopo, na ordem esperada pelos fragmentos.
pub(crate) fn scope_params(ctx: &TenantContext) -> (Option<Uuid>, Uuid) {
    (ctx.scope.clinic_id(), ctx.user_id)
}

/// 0 linhas afetadas = não encontrado (ou sem permissão, que é a mesma coisa).
pub(crate) fn affected_or_not_found(rows: u64, what: &str) -> Result<(), AppError> {
    if rows == 0 {
        Err(AppError::NotFound(format!("{what} no encontrado")))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tenancy::TenantScope;

    #[test]
    fn individual_scope_binds_null_clinic() {
        let doctor = Uuid::new_v4();
        let ctx = TenantContext {
            scope: TenantScope::IndividualDoctor(doctor),
            user_id: doctor,
        };
        assert_eq!(scope_params(&ctx), (None, doctor));
    }

    #[test]
    fn clinic_scope_binds_clinic_and_actor() {
        let clinic = Uuid::new_v4();
        let actor = Uuid::new_v4();
        let ctx = TenantContext {
            scope: TenantScope::Clinic(clinic),
            user_id: actor,
        };
        assert_eq!(scope_params(&ctx), (Some(clinic), actor));
    }

    #[test]
    fn zero_rows_is_not_found() {
        assert!(matches!(
            affected_or_not_found(0, "Paciente"),
            Err(AppError::NotFound(msg)) if msg == "Paciente no encontrado"
        ));
        assert!(affected_or_not_found(1, "Paciente").is_ok());
    }
}
