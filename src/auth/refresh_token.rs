/// Refresh Token Management
///
/// Refresh credentials are:
/// - 32 random bytes, base64url-encoded for the client
/// - bcrypt-hashed before storage (the raw value is returned exactly once)
/// - looked up per principal, most recent valid record first
/// - deleted on logout, and replaced on login or rotation
/// - consumed at most once when rotated, even by concurrent callers

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::Arc;

use crate::auth::password::{hash_secret_with_cost, verify_secret};
use crate::error::AppError;
use crate::store::{NewRefreshRecord, RefreshRecord, RefreshStore};

const REFRESH_TOKEN_BYTES: usize = 32;

/// Result of checking a presented refresh credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshValidation {
    Accepted,
    Expired,
    Mismatch,
    /// No refresh record exists for the principal
    Missing,
}

/// Result of exchanging a refresh credential for a new one
#[derive(Debug, Clone, PartialEq)]
pub enum RotationOutcome {
    /// New raw value and its persisted record
    Rotated(String, RefreshRecord),
    Rejected(RefreshValidation),
}

/// Generate a new raw refresh token
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE.encode(bytes)
}

#[derive(Clone)]
pub struct RefreshTokenManager {
    store: Arc<dyn RefreshStore>,
    ttl: Duration,
    hash_cost: u32,
}

impl RefreshTokenManager {
    pub fn new(store: Arc<dyn RefreshStore>, ttl: Duration, hash_cost: u32) -> Self {
        Self {
            store,
            ttl,
            hash_cost,
        }
    }

    /// Mint a credential for `principal_id` and make it the principal's only
    /// stored refresh record. Returns the raw value and the persisted record.
    ///
    /// # Errors
    /// Hashing or persistence failures; nothing is returned to the client then.
    pub async fn issue(
        &self,
        principal_id: i64,
        now: DateTime<Utc>,
    ) -> Result<(String, RefreshRecord), AppError> {
        let raw_token = generate_refresh_token();
        let token_hash = hash_secret_with_cost(&raw_token, self.hash_cost)?;

        let record = self
            .store
            .replace_refresh_records(NewRefreshRecord {
                principal_id,
                token_hash,
                expires_at: now + self.ttl,
                created_at: now,
            })
            .await?;

        tracing::debug!(user_id = principal_id, record_id = record.id, "Refresh token issued");
        Ok((raw_token, record))
    }

    /// Check `raw_token` against the principal's most recent refresh record
    pub async fn validate(
        &self,
        principal_id: i64,
        raw_token: &str,
        now: DateTime<Utc>,
    ) -> Result<RefreshValidation, AppError> {
        Ok(match self.matching_record(principal_id, raw_token, now).await? {
            Ok(_) => RefreshValidation::Accepted,
            Err(rejection) => rejection,
        })
    }

    /// Validate `raw_token` and swap its record for a fresh credential.
    /// Only one of several concurrent callers presenting the same token wins.
    pub async fn rotate(
        &self,
        principal_id: i64,
        raw_token: &str,
        now: DateTime<Utc>,
    ) -> Result<RotationOutcome, AppError> {
        let consumed = match self.matching_record(principal_id, raw_token, now).await? {
            Ok(record) => record,
            Err(rejection) => return Ok(RotationOutcome::Rejected(rejection)),
        };

        let raw_replacement = generate_refresh_token();
        let token_hash = hash_secret_with_cost(&raw_replacement, self.hash_cost)?;

        let rotated = self
            .store
            .rotate_refresh_record(
                consumed.id,
                NewRefreshRecord {
                    principal_id,
                    token_hash,
                    expires_at: now + self.ttl,
                    created_at: now,
                },
            )
            .await?;

        match rotated {
            Some(record) => {
                tracing::debug!(user_id = principal_id, record_id = record.id, "Refresh token rotated");
                Ok(RotationOutcome::Rotated(raw_replacement, record))
            }
            None => {
                tracing::warn!(user_id = principal_id, "Refresh token already consumed");
                Ok(RotationOutcome::Rejected(RefreshValidation::Mismatch))
            }
        }
    }

    async fn matching_record(
        &self,
        principal_id: i64,
        raw_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Result<RefreshRecord, RefreshValidation>, AppError> {
        let record = match self
            .store
            .find_latest_valid_refresh_record(principal_id, now)
            .await?
        {
            Some(record) => record,
            None => {
                tracing::warn!(user_id = principal_id, "No refresh token on record");
                return Ok(Err(RefreshValidation::Missing));
            }
        };

        if now >= record.expires_at {
            tracing::info!(user_id = principal_id, "Refresh token expired");
            return Ok(Err(RefreshValidation::Expired));
        }

        if !verify_secret(&record.token_hash, raw_token) {
            tracing::warn!(user_id = principal_id, "Refresh token mismatch");
            return Ok(Err(RefreshValidation::Mismatch));
        }

        Ok(Ok(record))
    }

    /// Delete every refresh record of the principal
    pub async fn revoke(&self, principal_id: i64) -> Result<(), AppError> {
        let removed = self.store.delete_refresh_records(principal_id).await?;
        tracing::info!(user_id = principal_id, removed, "Refresh tokens revoked");
        Ok(())
    }
}
