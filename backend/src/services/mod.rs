//! Business logic services for the Garage Workshop Management Platform

pub mod auth;
pub mod category;
pub mod inventory;
pub mod purchase;
pub mod supplier;
pub mod user;
pub mod visit;

pub use auth::AuthService;
pub use category::CategoryService;
pub use inventory::InventoryService;
pub use purchase::PurchaseService;
pub use supplier::SupplierService;
pub use user::UserService;
pub use visit::VisitService;

/// How often a version-conflicted ledger operation is re-run with fresh
/// reads before the conflict is surfaced to the caller.
pub(crate) const MAX_CONFLICT_RETRIES: usize = 3;

/// Deserializer for nullable update fields: an absent field keeps the
/// stored value (`None`), an explicit `null` clears it (`Some(None)`).
/// Pair with `#[serde(default)]`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}
