//! HTTP request handlers

pub mod auth;
pub mod category;
pub mod health;
pub mod purchase;
pub mod spare_part;
pub mod supplier;
pub mod user;
pub mod visit;

pub use auth::*;
pub use category::*;
pub use health::*;
pub use purchase::*;
pub use spare_part::*;
pub use supplier::*;
pub use user::*;
pub use visit::*;
