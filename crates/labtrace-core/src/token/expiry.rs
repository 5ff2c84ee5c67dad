//! Expiry decisions with a safety buffer.

/// Returns whether a credential expiring at `expires_at` should be
/// treated as expired at `now`.
///
/// `None` means the credential never expires. Anything lapsing within
/// `buffer_secs` of `now` already counts as expired: validation and the
/// protected operation it authorizes are separated by network time and
/// clock skew, and access validated just before the deadline must not
/// lapse mid-flight. An expiry of exactly `now + buffer_secs` is still
/// accepted.
#[must_use]
pub fn is_expired_with_buffer(now: u64, expires_at: Option<u64>, buffer_secs: u64) -> bool {
    match expires_at {
        None => false,
        Some(expires_at) => expires_at < now.saturating_add(buffer_secs),
    }
}
