//! Shared types and models for the Fleet Safety Management Platform
//!
//! This crate contains types shared between the backend and other
//! components of the system (admin dashboard, LIFF driver app).

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
