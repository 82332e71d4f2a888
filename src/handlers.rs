pub mod appointments;
pub mod auth;
pub mod branches;
pub mod clinics;
pub mod doctor_profiles;
pub mod history;
pub mod linking;
pub mod patients;
pub mod plans;
pub mod purchases;
pub mod users;
