/// Access Token Generation and Validation
///
/// Access credentials are HS256-signed JWTs carrying the principal id and
/// an absolute expiry. The signing key is injected once at startup through
/// `SigningKey`, which cannot be constructed from a blank secret.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::fmt;
use std::sync::Arc;

use crate::auth::claims::Claims;
use crate::error::{AppError, AuthError, ConfigError};

/// Shared HMAC secret. Immutable after construction and cheap to clone.
#[derive(Clone)]
pub struct SigningKey(Arc<[u8]>);

impl SigningKey {
    pub fn new(secret: impl AsRef<str>) -> Result<Self, ConfigError> {
        let secret = secret.as_ref();
        if secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("auth.signing_key".to_string()));
        }
        Ok(Self(Arc::from(secret.as_bytes())))
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(..)")
    }
}

/// Issues and verifies access credentials
#[derive(Clone, Debug)]
pub struct TokenCodec {
    key: SigningKey,
    ttl: Duration,
}

impl TokenCodec {
    pub fn new(key: SigningKey, ttl: Duration) -> Self {
        Self { key, ttl }
    }

    /// Lifetime of issued tokens
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `principal_id` against the wall clock
    pub fn issue(&self, principal_id: i64) -> Result<String, AppError> {
        self.issue_at(principal_id, Utc::now())
    }

    /// Issue a token as if the current instant were `now`
    ///
    /// # Errors
    /// Returns `AppError::Internal` if signing fails
    pub fn issue_at(&self, principal_id: i64, now: DateTime<Utc>) -> Result<String, AppError> {
        let claims = Claims::new(principal_id, now.timestamp(), self.ttl.num_seconds());

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.key.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Verify a token against the wall clock and return its principal id
    pub fn verify(&self, token: &str) -> Result<i64, AuthError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token as if the current instant were `now`
    ///
    /// Rejects any algorithm other than HS256 (including `none`), a bad
    /// signature, a missing `exp`/`sub`, and `now >= exp`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<i64, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // expiry is checked below against the supplied instant, without leeway
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.key.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::warn!(error = %e, "Access token rejected");
            AuthError::TokenInvalid
        })?;

        if claims.is_expired_at(now.timestamp()) {
            tracing::debug!(sub = %claims.sub, "Access token expired");
            return Err(AuthError::TokenExpired);
        }

        claims.principal_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    fn test_codec() -> TokenCodec {
        TokenCodec::new(
            SigningKey::new("test-secret-key-at-least-32-characters-long").unwrap(),
            Duration::minutes(15),
        )
    }

    #[test]
    fn test_issue_and_verify() {
        let codec = test_codec();

        let token = codec.issue(42).expect("Failed to generate token");
        assert_eq!(codec.verify(&token), Ok(42));
    }

    #[test]
    fn test_blank_signing_key_rejected() {
        assert!(SigningKey::new("").is_err());
        assert!(SigningKey::new("  \t").is_err());
    }

    #[test]
    fn test_expiry_window() {
        let codec = test_codec();
        let t = Utc::now();
        let token = codec.issue_at(7, t).unwrap();

        assert_eq!(codec.verify_at(&token, t + Duration::minutes(14)), Ok(7));
        assert_eq!(
            codec.verify_at(&token, t + Duration::minutes(16)),
            Err(AuthError::TokenExpired)
        );
    }

    #[test]
    fn test_invalid_token() {
        let codec = test_codec();
        assert_eq!(codec.verify("invalid.token.here"), Err(AuthError::TokenInvalid));
        assert_eq!(codec.verify(""), Err(AuthError::TokenInvalid));
    }

    #[test]
    fn test_tampered_token() {
        let codec = test_codec();
        let token = codec.issue(1).unwrap();

        let tampered = format!("{}X", token);
        assert_eq!(codec.verify(&tampered), Err(AuthError::TokenInvalid));
    }

    #[test]
    fn test_token_from_other_key_rejected() {
        let token = test_codec().issue(1).unwrap();
        let other = TokenCodec::new(SigningKey::new("another-key").unwrap(), Duration::minutes(15));

        assert_eq!(other.verify(&token), Err(AuthError::TokenInvalid));
    }

    #[test]
    fn test_none_algorithm_rejected() {
        let codec = test_codec();
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let exp = Utc::now().timestamp() + 600;
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"1","exp":{},"iat":0}}"#, exp));
        let forged = format!("{}.{}.", header, payload);

        assert_eq!(codec.verify(&forged), Err(AuthError::TokenInvalid));
    }

    #[test]
    fn test_other_hmac_algorithm_rejected() {
        let codec = test_codec();
        let claims = Claims::new(1, Utc::now().timestamp(), 600);
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"test-secret-key-at-least-32-characters-long"),
        )
        .unwrap();

        assert_eq!(codec.verify(&token), Err(AuthError::TokenInvalid));
    }
}
