//! Download token lifecycle.
//!
//! A download token is a short-lived bearer secret authorizing one
//! access event against a sample or derived sample. Storage holds only
//! the SHA-256 digest of the secret. [`TokenIssuer`] mints tokens,
//! [`TokenValidator`] checks presented secrets and consumes one-time
//! tokens, and expiry decisions apply a safety buffer so access that
//! validates just before the deadline cannot lapse mid-download.

mod digest;
mod error;
mod expiry;
mod issuer;
mod record;
mod validator;


pub(crate) use digest::digest_eq;
pub use digest::{digest_secret, generate_secret, TokenDigest, DIGEST_SIZE};
pub use error::TokenError;
pub use expiry::is_expired_with_buffer;
pub use issuer::{IssueRequest, IssuedToken, TokenIssuer};
pub use record::DownloadTokenRecord;
pub use validator::{TokenValidator, ValidatedToken};
