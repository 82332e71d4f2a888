pub mod appointment_service;
pub mod auth;
pub mod branch_service;
pub mod clinic_service;
pub mod doctor_profile_service;
pub mod email_service;
pub mod history_service;
pub mod limit_service;
pub mod linking_service;
pub mod patient_service;
pub mod plan_service;
pub mod purchase_service;
pub mod user_service;
