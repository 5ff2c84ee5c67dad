//! Engine tuning knobs.
//!
//! The embedding service owns configuration loading; this crate only defines
//! the shape. [`EngineConfig`] deserializes from whatever config format the
//! host uses and carries defaults matching the platform's production
//! settings, so `EngineConfig::default()` is always a valid configuration.

use serde::Deserialize;

/// Default download-token lifetime in minutes.
pub const DEFAULT_TOKEN_TTL_MINUTES: u64 = 15;

/// Default safety buffer applied to every expiry comparison, in seconds.
///
/// A credential is treated as expired this many seconds before its actual
/// expiry so that a request validated just before the boundary cannot
/// complete its protected operation after it. See
/// [`crate::token::is_expired_with_buffer`].
pub const DEFAULT_EXPIRY_SAFETY_BUFFER_SECS: u64 = 30;

/// Default maximum derivation depth (root + this many derived generations).
pub const DEFAULT_MAX_DERIVATION_DEPTH: u8 = 2;

/// Default token secret length in bytes (256 bits of entropy).
pub const DEFAULT_SECRET_LEN: usize = 32;

/// Minimum acceptable token secret length in bytes.
///
/// Secrets below 256 bits are refused outright; there is no legitimate
/// configuration that weakens token entropy.
pub const MIN_SECRET_LEN: usize = 32;

/// Tuning knobs for the lineage and token components.
///
/// Missing fields deserialize to their defaults, so a host can override a
/// single knob without restating the rest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Lifetime of newly issued download tokens, in minutes.
    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: u64,

    /// Safety buffer subtracted from every expiry check, in seconds.
    #[serde(default = "default_expiry_safety_buffer_secs")]
    pub expiry_safety_buffer_secs: u64,

    /// Maximum derivation depth a lineage chain may reach.
    #[serde(default = "default_max_derivation_depth")]
    pub max_derivation_depth: u8,

    /// Length of generated token secrets, in bytes.
    #[serde(default = "default_secret_len")]
    pub secret_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            token_ttl_minutes: DEFAULT_TOKEN_TTL_MINUTES,
            expiry_safety_buffer_secs: DEFAULT_EXPIRY_SAFETY_BUFFER_SECS,
            max_derivation_depth: DEFAULT_MAX_DERIVATION_DEPTH,
            secret_len: DEFAULT_SECRET_LEN,
        }
    }
}

const fn default_token_ttl_minutes() -> u64 {
    DEFAULT_TOKEN_TTL_MINUTES
}

const fn default_expiry_safety_buffer_secs() -> u64 {
    DEFAULT_EXPIRY_SAFETY_BUFFER_SECS
}

const fn default_max_derivation_depth() -> u8 {
    DEFAULT_MAX_DERIVATION_DEPTH
}

const fn default_secret_len() -> usize {
    DEFAULT_SECRET_LEN
}
