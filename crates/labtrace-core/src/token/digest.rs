//! Secret generation and digesting.
//!
//! A raw token secret exists in exactly two places: the CSPRNG output
//! wrapped in a [`SecretString`] at issue time, and whatever URL the
//! caller embeds it in. Storage only ever holds the SHA-256 digest, so a
//! copied database cannot mint a working download link.

use rand::RngCore;
use secrecy::SecretString;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Number of bytes in a stored token digest.
pub const DIGEST_SIZE: usize = 32;

/// SHA-256 digest of a token secret.
pub type TokenDigest = [u8; DIGEST_SIZE];

/// Generates a fresh hex-encoded secret from `len` CSPRNG bytes.
#[must_use]
pub fn generate_secret(len: usize) -> SecretString {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    SecretString::new(hex::encode(bytes))
}

/// Computes the storage digest of a presented secret.
#[must_use]
pub fn digest_secret(secret: &str) -> TokenDigest {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().into()
}

/// Compares two digests in constant time.
pub(crate) fn digest_eq(a: &TokenDigest, b: &TokenDigest) -> bool {
    a.ct_eq(b).into()
}
