// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::check_username,
        handlers::auth::login,
        handlers::auth::request_password_reset,
        handlers::auth::reset_password,

        // --- Users ---
        handlers::users::public_doctors,
        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::create_user,
        handlers::users::update_user,
        handlers::users::delete_user,
        handlers::users::account_summary,

        // --- Clinics ---
        handlers::clinics::list_clinics,
        handlers::clinics::get_clinic,
        handlers::clinics::create_clinic,
        handlers::clinics::delete_clinic,
        handlers::clinics::update_clinic_profile,

        // --- Profiles ---
        handlers::doctor_profiles::public_profile,
        handlers::doctor_profiles::public_card,
        handlers::doctor_profiles::get_profile,
        handlers::doctor_profiles::upsert_profile,
        handlers::doctor_profiles::add_documents,
        handlers::doctor_profiles::list_documents,

        // --- Branches ---
        handlers::branches::link_branch,
        handlers::branches::list_branches,

        // --- Plans ---
        handlers::plans::list_plans,
        handlers::plans::create_plan,
        handlers::plans::assign_plan,
        handlers::plans::change_plan,
        handlers::plans::active_plan,
        handlers::plans::plan_history,

        // --- Purchases ---
        handlers::purchases::buy_doctor_slot,
        handlers::purchases::validate_doctor_limit,
        handlers::purchases::doctor_slot_total,
        handlers::purchases::doctor_slot_purchasers,
        handlers::purchases::buy_patient_slot,
        handlers::purchases::validate_patient_limit,
        handlers::purchases::validate_individual_limit,
        handlers::purchases::patient_slot_total,

        // --- Linking ---
        handlers::linking::link_doctor,
        handlers::linking::unlink_doctor,
        handlers::linking::link_owner,

        // --- Patients ---
        handlers::patients::lookup_by_cedula,
        handlers::patients::list_patients,
        handlers::patients::get_patient,
        handlers::patients::create_patient,
        handlers::patients::update_patient,
        handlers::patients::delete_patient,

        // --- Appointments ---
        handlers::appointments::list_appointments,
        handlers::appointments::get_appointment,
        handlers::appointments::create_appointment,
        handlers::appointments::update_appointment,
        handlers::appointments::delete_appointment,

        // --- History ---
        handlers::history::list_history,
        handlers::history::list_history_by_patient,
        handlers::history::get_history,
        handlers::history::create_history,
        handlers::history::update_history,
        handlers::history::delete_history,
    ),
    components(
        schemas(
            // --- AUTH / USERS ---
            models::auth::Role,
            models::auth::User,
            models::auth::Principal,
            models::auth::RegisterDoctorPayload,
            models::auth::CreateUserPayload,
            models::auth::UpdateUserPayload,
            models::auth::UsernameAvailability,
            models::auth::LoginPayload,
            models::auth::AuthResponse,
            models::auth::PasswordResetRequestPayload,
            models::auth::PasswordResetPayload,
            models::auth::PasswordResetIssued,
            models::auth::ClinicDoctorSummary,
            models::auth::AccountSummary,
            models::auth::CreatedUser,
            models::auth::PublicDoctor,

            // --- CLINICS / PLANS ---
            models::clinic::Clinic,
            models::clinic::CreateClinicPayload,
            models::clinic::UpdateClinicProfilePayload,
            models::doctor_profile::DoctorProfile,
            models::doctor_profile::DoctorProfilePayload,
            models::doctor_profile::DoctorPublicCard,
            models::doctor_profile::DoctorDocument,
            models::doctor_profile::DocumentPayload,
            models::doctor_profile::DocumentsPayload,
            models::doctor_profile::DocumentsSaved,
            models::branch::Branch,
            models::branch::LinkBranchPayload,
            models::branch::BranchCreated,
            models::plan::PlanTier,
            models::plan::PlanCaps,
            models::plan::Plan,
            models::plan::EffectivePlan,
            models::plan::ClinicPlan,
            models::plan::CreatePlanPayload,
            models::plan::AssignPlanPayload,
            models::plan::ChangePlanPayload,

            // --- LIMITS / PURCHASES ---
            models::limits::LimitResource,
            models::limits::LimitCheck,
            models::limits::IndividualLimitCheck,
            models::limits::LimitRejection,
            models::purchase::PurchaseSlotPayload,
            models::purchase::PurchasePatientSlotPayload,
            models::purchase::PurchaseCreated,
            models::purchase::PurchaseTotal,
            models::purchase::PurchaserList,
            models::purchase::ClinicLimitValidation,
            models::purchase::IndividualLimitValidation,

            // --- LINKING ---
            models::linking::LinkDoctorPayload,
            models::linking::LinkOwnerPayload,
            models::linking::LinkOutcome,

            // --- PATIENTS / APPOINTMENTS / HISTORY ---
            models::patient::Patient,
            models::patient::PatientPayload,
            models::patient::PublicPatient,
            models::patient::PatientView,
            models::appointment::Appointment,
            models::appointment::AppointmentPayload,
            models::history::HistoryRecord,
            models::history::HistoryPayload,
        )
    ),
    tags(
        (name = "Auth", description = "Registro, Login e Recuperação de Senha"),
        (name = "Users", description = "Usuários da Clínica e Resumo da Conta"),
        (name = "Clinics", description = "Gestão de Clínicas"),
        (name = "Profiles", description = "Perfis e Documentos de Doctores"),
        (name = "Branches", description = "Sucursais entre Clínicas"),
        (name = "Plans", description = "Catálogo de Planos e Atribuição"),
        (name = "Purchases", description = "Compras de Slots e Validação de Limites"),
        (name = "Linking", description = "Vinculação de Doctores a Clínicas"),
        (name = "Patients", description = "Pacientes"),
        (name = "Appointments", description = "Citas"),
        (name = "History", description = "Historial Clínico")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_protected_routes_with_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/vinculacion_doctor/vincular-doctor"));
        assert!(doc.paths.paths.contains_key("/api/pacientes/cedula/{cedula}"));
        assert!(doc.paths.paths.contains_key("/api/doctor_profiles/{user_id}/public"));
        assert!(doc.paths.paths.contains_key("/api/sucursales/vincular"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("api_jwt"));
    }
}
