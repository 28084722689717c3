/// Secret Hashing and Verification
///
/// One-way bcrypt hashing used for both account passwords and refresh
/// credentials. Verification only ever answers yes or no: a malformed
/// digest is indistinguishable from a wrong secret to the caller.

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::AppError;

/// Lowest cost bcrypt accepts; only for tests and throwaway digests
pub const MIN_HASH_COST: u32 = 4;
/// Highest cost bcrypt accepts
pub const MAX_HASH_COST: u32 = 31;

/// Hash a secret with the default bcrypt cost
pub fn hash_secret(secret: &str) -> Result<String, AppError> {
    hash_secret_with_cost(secret, DEFAULT_COST)
}

/// Hash a secret with an explicit bcrypt cost
///
/// # Errors
/// Returns `AppError::Internal` if the hashing engine fails (e.g. invalid cost)
pub fn hash_secret_with_cost(secret: &str, cost: u32) -> Result<String, AppError> {
    hash(secret, cost).map_err(|e| AppError::Internal(format!("Secret hashing failed: {}", e)))
}

/// Check `secret` against a stored bcrypt `digest`
pub fn verify_secret(digest: &str, secret: &str) -> bool {
    match verify(secret, digest) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!(error = %e, "Stored digest could not be verified");
            false
        }
    }
}
