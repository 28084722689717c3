/// Authentication Flow
///
/// Orchestrates registration, login, refresh and logout on top of the
/// secret hasher, the token codec and the refresh token manager.
///
/// # Security Notes
/// - Unknown email and wrong password produce the same `Unauthorized`,
///   and both pay for one bcrypt verification
/// - Expired, mismatched and missing refresh credentials are indistinguishable
/// - Storage failures surface as internal errors without their detail

use serde::Deserialize;
use std::sync::Arc;

use crate::auth::clock::{Clock, SystemClock};
use crate::auth::jwt::{SigningKey, TokenCodec};
use crate::auth::password::{hash_secret_with_cost, verify_secret};
use crate::auth::refresh_token::{
    generate_refresh_token, RefreshTokenManager, RefreshValidation, RotationOutcome,
};
use crate::configuration::AuthSettings;
use crate::error::{AppError, AuthError, ConfigError, ValidationError};
use crate::store::{NewPrincipal, Principal, PrincipalStore, ProfileUpdate, Stores};
use crate::validators::{
    collect, is_valid_email, is_valid_name, is_valid_password, is_valid_phone, is_valid_status,
};

/// Registration request. Fields are optional so that missing ones are
/// reported as validation errors rather than a decode failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationPayload {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub status: Option<String>,
    pub password: Option<String>,
}

/// Profile update request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilePayload {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub status: Option<String>,
}

/// Credentials handed out by a successful login
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub principal_id: i64,
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of a successful refresh. `refresh_token` is only set when rotation is on.
#[derive(Debug, Clone)]
pub struct RefreshedTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

fn required<'a>(
    errors: &mut Vec<ValidationError>,
    field: &str,
    value: &'a Option<String>,
) -> Option<&'a str> {
    match value.as_deref() {
        Some(v) => Some(v),
        None => {
            errors.push(ValidationError::EmptyField(field.to_string()));
            None
        }
    }
}

/// Validate profile fields shared by registration and updates
pub fn validate_profile(payload: &ProfilePayload) -> Result<ProfileUpdate, AppError> {
    let mut errors = Vec::new();

    let first_name = required(&mut errors, "first_name", &payload.first_name)
        .and_then(|v| collect(&mut errors, is_valid_name("first_name", v)));
    let last_name = required(&mut errors, "last_name", &payload.last_name)
        .and_then(|v| collect(&mut errors, is_valid_name("last_name", v)));
    let email = required(&mut errors, "email", &payload.email)
        .and_then(|v| collect(&mut errors, is_valid_email(v)));
    let phone_number = collect(&mut errors, is_valid_phone(payload.phone_number.as_deref()));
    let status = collect(&mut errors, is_valid_status(payload.status.as_deref()));

    match (first_name, last_name, email, phone_number, status) {
        (Some(first_name), Some(last_name), Some(email), Some(phone_number), Some(status))
            if errors.is_empty() =>
        {
            Ok(ProfileUpdate {
                first_name,
                last_name,
                phone_number,
                email,
                status,
            })
        }
        _ => Err(AppError::Validation(errors)),
    }
}

#[derive(Clone)]
pub struct AuthService {
    principals: Arc<dyn PrincipalStore>,
    codec: TokenCodec,
    refresh_tokens: RefreshTokenManager,
    clock: Arc<dyn Clock>,
    hash_cost: u32,
    rotate_refresh_tokens: bool,
    /// Verified against when the email is unknown
    decoy_digest: Arc<str>,
}

impl AuthService {
    /// Build the service from startup settings
    ///
    /// # Errors
    /// `ConfigError` when the signing key is blank or the hash cost is out of range
    pub fn new(stores: &Stores, settings: &AuthSettings) -> Result<Self, ConfigError> {
        let key = SigningKey::new(&settings.signing_key)?;
        let decoy_digest = hash_secret_with_cost(&generate_refresh_token(), settings.hash_cost)
            .map_err(|e| ConfigError::InvalidValue(format!("auth.hash_cost: {}", e)))?;

        Ok(Self {
            principals: stores.principals.clone(),
            codec: TokenCodec::new(key, settings.access_token_ttl()),
            refresh_tokens: RefreshTokenManager::new(
                stores.refresh_tokens.clone(),
                settings.refresh_token_ttl(),
                settings.hash_cost,
            ),
            clock: Arc::new(SystemClock),
            hash_cost: settings.hash_cost,
            rotate_refresh_tokens: settings.rotate_refresh_tokens,
            decoy_digest: decoy_digest.into(),
        })
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Validate the payload, hash the password and persist a new principal
    pub async fn register(&self, payload: RegistrationPayload) -> Result<Principal, AppError> {
        let profile = ProfilePayload {
            first_name: payload.first_name,
            last_name: payload.last_name,
            phone_number: payload.phone_number,
            email: payload.email,
            status: payload.status,
        };

        let (profile, mut errors) = match validate_profile(&profile) {
            Ok(profile) => (Some(profile), Vec::new()),
            Err(AppError::Validation(errors)) => (None, errors),
            Err(other) => return Err(other),
        };
        let password = required(&mut errors, "password", &payload.password)
            .and_then(|v| collect(&mut errors, is_valid_password(v)).map(|_| v));

        let (Some(profile), Some(password)) = (profile, password) else {
            return Err(AppError::Validation(errors));
        };
        let password_hash = hash_secret_with_cost(password, self.hash_cost)?;

        let principal = self
            .principals
            .insert_principal(NewPrincipal {
                first_name: profile.first_name,
                last_name: profile.last_name,
                phone_number: profile.phone_number,
                email: profile.email,
                status: profile.status,
                password_hash,
            })
            .await?;

        tracing::info!(user_id = principal.id, "Principal registered");
        Ok(principal)
    }

    /// Exchange email and password for an access and a refresh credential
    pub async fn login(&self, email: &str, secret: &str) -> Result<IssuedTokens, AppError> {
        let Some(principal) = self
            .principals
            .find_principal_by_email(email.trim())
            .await?
        else {
            // same bcrypt work as a wrong password so timing does not reveal the email
            verify_secret(&self.decoy_digest, secret);
            tracing::warn!("Login attempt for unknown email");
            return Err(AuthError::InvalidCredentials.into());
        };

        if !verify_secret(&principal.password_hash, secret) {
            tracing::warn!(user_id = principal.id, "Login attempt with wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }

        let now = self.clock.now();
        let access_token = self.codec.issue_at(principal.id, now)?;
        let (refresh_token, _) = self.refresh_tokens.issue(principal.id, now).await?;

        tracing::info!(user_id = principal.id, "Principal logged in");
        Ok(IssuedTokens {
            principal_id: principal.id,
            access_token,
            refresh_token,
        })
    }

    /// Exchange a refresh credential for a new access credential
    pub async fn refresh(
        &self,
        principal_id: i64,
        raw_refresh_token: &str,
    ) -> Result<RefreshedTokens, AppError> {
        let now = self.clock.now();

        let refresh_token = if self.rotate_refresh_tokens {
            match self
                .refresh_tokens
                .rotate(principal_id, raw_refresh_token, now)
                .await?
            {
                RotationOutcome::Rotated(raw, _) => Some(raw),
                RotationOutcome::Rejected(_) => {
                    return Err(AuthError::RefreshTokenRejected.into());
                }
            }
        } else {
            match self
                .refresh_tokens
                .validate(principal_id, raw_refresh_token, now)
                .await?
            {
                RefreshValidation::Accepted => None,
                RefreshValidation::Expired
                | RefreshValidation::Mismatch
                | RefreshValidation::Missing => {
                    return Err(AuthError::RefreshTokenRejected.into());
                }
            }
        };

        let access_token = self.codec.issue_at(principal_id, now)?;

        tracing::info!(
            user_id = principal_id,
            rotated = refresh_token.is_some(),
            "Access token refreshed"
        );
        Ok(RefreshedTokens {
            access_token,
            refresh_token,
        })
    }

    /// Revoke every refresh credential of the principal. Idempotent.
    pub async fn logout(&self, principal_id: i64) -> Result<(), AppError> {
        self.refresh_tokens.revoke(principal_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(email: &str) -> ProfilePayload {
        ProfilePayload {
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
            phone_number: Some("+1234567890".to_string()),
            email: Some(email.to_string()),
            status: None,
        }
    }

    #[test]
    fn test_validate_profile_accepts_valid_payload() {
        let update = validate_profile(&profile("a@x.com")).unwrap();

        assert_eq!(update.email, "a@x.com");
        assert_eq!(update.status, "active");
        assert_eq!(update.phone_number.as_deref(), Some("+1234567890"));
    }

    #[test]
    fn test_validate_profile_reports_every_field() {
        let payload = ProfilePayload {
            first_name: None,
            last_name: Some("".to_string()),
            phone_number: Some("abc".to_string()),
            email: Some("not-an-email".to_string()),
            status: Some("banned".to_string()),
        };

        match validate_profile(&payload) {
            Err(AppError::Validation(errors)) => assert_eq!(errors.len(), 5),
            other => panic!("Expected validation errors, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_signing_key_fails_construction() {
        let settings = AuthSettings {
            signing_key: "".to_string(),
            access_token_ttl_seconds: 900,
            refresh_token_ttl_seconds: 604_800,
            rotate_refresh_tokens: false,
            hash_cost: crate::auth::MIN_HASH_COST,
        };

        assert!(AuthService::new(&Stores::in_memory(), &settings).is_err());
    }

    #[test]
    fn test_out_of_range_hash_cost_fails_construction() {
        let settings = AuthSettings {
            signing_key: "unit-test-key".to_string(),
            access_token_ttl_seconds: 900,
            refresh_token_ttl_seconds: 604_800,
            rotate_refresh_tokens: false,
            hash_cost: 2,
        };

        assert!(matches!(
            AuthService::new(&Stores::in_memory(), &settings),
            Err(ConfigError::InvalidValue(_))
        ));
    }
}
