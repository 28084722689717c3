/// Persistence contracts consumed by the authentication core.
///
/// `PgStore` backs a deployment; `InMemoryStore` backs tests and
/// database-less runs. Both implement the same two traits.

mod memory;
mod models;
mod postgres;

pub use memory::InMemoryStore;
pub use models::{NewPrincipal, NewRefreshRecord, Principal, ProfileUpdate, RefreshRecord};
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::DatabaseError;

/// Account lookup and profile persistence
#[async_trait]
pub trait PrincipalStore: Send + Sync + 'static {
    async fn find_principal_by_email(&self, email: &str) -> Result<Option<Principal>, DatabaseError>;

    async fn find_principal_by_id(&self, id: i64) -> Result<Option<Principal>, DatabaseError>;

    /// Insert and return the row with its assigned id and timestamps.
    /// A duplicate email fails with `UniqueConstraintViolation`.
    async fn insert_principal(&self, principal: NewPrincipal) -> Result<Principal, DatabaseError>;

    async fn list_principals(&self) -> Result<Vec<Principal>, DatabaseError>;

    /// Returns `None` when no principal has this id
    async fn update_principal(
        &self,
        id: i64,
        update: ProfileUpdate,
    ) -> Result<Option<Principal>, DatabaseError>;

    /// Returns whether a row was deleted
    async fn delete_principal(&self, id: i64) -> Result<bool, DatabaseError>;
}

/// Refresh credential persistence. Only hashes are ever stored.
#[async_trait]
pub trait RefreshStore: Send + Sync + 'static {
    async fn insert_refresh_record(
        &self,
        record: NewRefreshRecord,
    ) -> Result<RefreshRecord, DatabaseError>;

    /// Most recently created record of the principal with `expires_at > now`
    async fn find_latest_valid_refresh_record(
        &self,
        principal_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshRecord>, DatabaseError>;

    /// Returns the number of records removed
    async fn delete_refresh_records(&self, principal_id: i64) -> Result<u64, DatabaseError>;

    /// Delete all of the principal's records and insert `record`, atomically
    async fn replace_refresh_records(
        &self,
        record: NewRefreshRecord,
    ) -> Result<RefreshRecord, DatabaseError>;

    /// Like `replace_refresh_records`, but only while the record `consumed_id`
    /// still exists for the principal. `None` means another caller consumed it.
    async fn rotate_refresh_record(
        &self,
        consumed_id: i64,
        record: NewRefreshRecord,
    ) -> Result<Option<RefreshRecord>, DatabaseError>;
}

/// The pair of store handles the service runs against
#[derive(Clone)]
pub struct Stores {
    pub principals: Arc<dyn PrincipalStore>,
    pub refresh_tokens: Arc<dyn RefreshStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            principals: store.clone(),
            refresh_tokens: store,
        }
    }

    pub fn postgres(pool: sqlx::PgPool) -> Self {
        let store = Arc::new(PgStore::new(pool));
        Self {
            principals: store.clone(),
            refresh_tokens: store,
        }
    }
}
