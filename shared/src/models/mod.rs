//! Domain models for the Garage Workshop Management Platform

mod user;
mod visit;

pub use user::*;
pub use visit::*;
