//! Shared types and models for the Garage Workshop Management Platform
//!
//! This crate contains domain types shared between the backend server and
//! its integration tests: role and visit models, pagination types, and the
//! pure validation/number-format helpers that carry the workshop's business
//! rules without any database dependency.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
