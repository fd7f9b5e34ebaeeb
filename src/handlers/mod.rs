// handlers/mod.rs - Handler tiers
//
// Public (anonymous) → Protected (logged-in admins) → Elevated (superusers)
pub mod public;
pub mod protected;
pub mod elevated;

pub use public::*;
pub use protected::*;
pub use elevated::*;

use uuid::Uuid;

use crate::error::ApiError;

/// Path ids that do not parse are treated like ids that do not exist.
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found(format!("{what} '{raw}' not found")))
}
