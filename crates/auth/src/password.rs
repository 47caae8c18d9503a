//! Salted password hashing
//!
//! `h_0 = SHA256(salt || secret)`, `h_i = SHA256(salt || h_{i-1})`, stored
//! hex-encoded next to a random 16-byte salt and the round count `i`.
//! Verification compares digests in constant time.

use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const SALT_LEN: usize = 16;

/// A hashed secret ready for storage
///
/// Carries its own round count, so credentials hashed under an older
/// `hash_iterations` setting keep verifying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash {
    pub hash: String,
    pub salt: String,
    pub iterations: u32,
}

impl PasswordHash {
    /// Check a secret against this hash
    ///
    /// Unreadable stored values never verify.
    pub fn verify(&self, secret: &str) -> bool {
        let (Ok(expected), Ok(salt)) = (hex::decode(&self.hash), hex::decode(&self.salt)) else {
            return false;
        };

        let actual = digest(self.iterations, &salt, secret.as_bytes());
        expected.len() == actual.len() && bool::from(actual.as_slice().ct_eq(expected.as_slice()))
    }
}

fn digest(iterations: u32, salt: &[u8], secret: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(secret);
    let mut digest: [u8; 32] = hasher.finalize().into();

    for _ in 1..iterations.max(1) {
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(digest);
        digest = hasher.finalize().into();
    }
    digest
}

/// Iterated SHA-256 password hasher; the round count applies to new hashes
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    iterations: u32,
}

impl PasswordHasher {
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Hash a secret with a fresh random salt
    pub fn hash(&self, secret: &str) -> PasswordHash {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);

        PasswordHash {
            hash: hex::encode(digest(self.iterations, &salt, secret.as_bytes())),
            salt: hex::encode(salt),
            iterations: self.iterations,
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(10_000)
    }
}
