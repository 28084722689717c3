/// JWT Claims structure
///
/// Payload of an access credential: the principal it was issued to and
/// the instant it stops being valid (RFC 7519 `sub`/`exp`/`iat`).

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject (principal id, decimal string)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl Claims {
    /// Create claims for `principal_id`, issued at `issued_at` and valid for `ttl_seconds`.
    pub fn new(principal_id: i64, issued_at: i64, ttl_seconds: i64) -> Self {
        Self {
            sub: principal_id.to_string(),
            exp: issued_at + ttl_seconds,
            iat: issued_at,
        }
    }

    /// Extract the principal id from the subject claim
    pub fn principal_id(&self) -> Result<i64, AuthError> {
        self.sub.parse::<i64>().map_err(|_| AuthError::TokenInvalid)
    }

    /// A token is valid strictly before its expiry instant
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }
}
