pub mod appointment;
pub mod auth;
pub mod branch;
pub mod clinic;
pub mod doctor_profile;
pub mod history;
pub mod limits;
pub mod linking;
pub mod patient;
pub mod plan;
pub mod purchase;
pub mod tenancy;
