pub mod user_repo;
pub use user_repo::UserRepository;
pub mod clinic_repo;
pub use clinic_repo::ClinicRepository;
pub mod plan_repo;
pub use plan_repo::PlanRepository;
pub mod purchase_repo;
pub use purchase_repo::PurchaseRepository;
pub mod patient_repo;
pub use patient_repo::PatientRepository;
pub mod appointment_repo;
pub use appointment_repo::AppointmentRepository;
pub mod history_repo;
pub use history_repo::HistoryRepository;
pub mod password_reset_repo;
pub use password_reset_repo::PasswordResetRepository;
pub mod doctor_profile_repo;
pub use doctor_profile_repo::DoctorProfileRepository;
pub mod branch_repo;
pub use branch_repo::BranchRepository;
