//! Domain layer
//!
//! Business entities, rules, and services.

pub mod members;
pub mod projects;
pub mod reports;
