//! Database models for the Fleet Safety Management Platform
//!
//! Re-exports models from the shared crate

pub use shared::models::*;
