//! Cross-organization access grants.
//!
//! A grant lets one organization reach another tenant's sample under a
//! role, optionally with an expiry. Revoking a grant also revokes every
//! download token issued under it, atomically and with a transactional
//! audit entry; see [`RevocationCoordinator`].

mod error;
mod record;
mod revocation;

#[cfg(test)]
mod tests;

pub use error::GrantError;
pub use record::{AccessGrantRecord, GrantRole};
pub use revocation::{CreateGrantRequest, RevocationCoordinator, RevokeGrantRequest};
