/// In-process store guarded by a Tokio mutex. Single-node only.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{
    NewPrincipal, NewRefreshRecord, Principal, PrincipalStore, ProfileUpdate, RefreshRecord,
    RefreshStore,
};
use crate::error::DatabaseError;

#[derive(Debug, Default)]
struct InnerState {
    principals: Vec<Principal>,
    refresh_records: Vec<RefreshRecord>,
    next_principal_id: i64,
    next_refresh_id: i64,
}

impl InnerState {
    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.principals
            .iter()
            .any(|p| p.email == email && Some(p.id) != except)
    }

    fn push_refresh_record(&mut self, record: NewRefreshRecord) -> RefreshRecord {
        self.next_refresh_id += 1;
        let stored = RefreshRecord {
            id: self.next_refresh_id,
            principal_id: record.principal_id,
            token_hash: record.token_hash,
            expires_at: record.expires_at,
            created_at: record.created_at,
        };
        self.refresh_records.push(stored.clone());
        stored
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<InnerState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of refresh records currently held for a principal
    pub async fn refresh_record_count(&self, principal_id: i64) -> usize {
        let state = self.state.lock().await;
        state
            .refresh_records
            .iter()
            .filter(|r| r.principal_id == principal_id)
            .count()
    }
}

#[async_trait]
impl PrincipalStore for InMemoryStore {
    async fn find_principal_by_email(&self, email: &str) -> Result<Option<Principal>, DatabaseError> {
        let state = self.state.lock().await;
        Ok(state.principals.iter().find(|p| p.email == email).cloned())
    }

    async fn find_principal_by_id(&self, id: i64) -> Result<Option<Principal>, DatabaseError> {
        let state = self.state.lock().await;
        Ok(state.principals.iter().find(|p| p.id == id).cloned())
    }

    async fn insert_principal(&self, principal: NewPrincipal) -> Result<Principal, DatabaseError> {
        let mut state = self.state.lock().await;

        if state.email_taken(&principal.email, None) {
            return Err(DatabaseError::UniqueConstraintViolation(
                "Email already registered".to_string(),
            ));
        }

        state.next_principal_id += 1;
        let now = Utc::now();
        let stored = Principal {
            id: state.next_principal_id,
            first_name: principal.first_name,
            last_name: principal.last_name,
            phone_number: principal.phone_number,
            email: principal.email,
            status: principal.status,
            password_hash: principal.password_hash,
            created_at: now,
            updated_at: now,
        };
        state.principals.push(stored.clone());
        Ok(stored)
    }

    async fn list_principals(&self) -> Result<Vec<Principal>, DatabaseError> {
        let state = self.state.lock().await;
        Ok(state.principals.clone())
    }

    async fn update_principal(
        &self,
        id: i64,
        update: ProfileUpdate,
    ) -> Result<Option<Principal>, DatabaseError> {
        let mut state = self.state.lock().await;

        if state.email_taken(&update.email, Some(id)) {
            return Err(DatabaseError::UniqueConstraintViolation(
                "Email already registered".to_string(),
            ));
        }

        let Some(principal) = state.principals.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };

        principal.first_name = update.first_name;
        principal.last_name = update.last_name;
        principal.phone_number = update.phone_number;
        principal.email = update.email;
        principal.status = update.status;
        principal.updated_at = Utc::now();
        Ok(Some(principal.clone()))
    }

    async fn delete_principal(&self, id: i64) -> Result<bool, DatabaseError> {
        let mut state = self.state.lock().await;
        let before = state.principals.len();
        state.principals.retain(|p| p.id != id);
        if state.principals.len() == before {
            return Ok(false);
        }
        // mirrors ON DELETE CASCADE
        state.refresh_records.retain(|r| r.principal_id != id);
        Ok(true)
    }
}

#[async_trait]
impl RefreshStore for InMemoryStore {
    async fn insert_refresh_record(
        &self,
        record: NewRefreshRecord,
    ) -> Result<RefreshRecord, DatabaseError> {
        let mut state = self.state.lock().await;
        Ok(state.push_refresh_record(record))
    }

    async fn find_latest_valid_refresh_record(
        &self,
        principal_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshRecord>, DatabaseError> {
        let state = self.state.lock().await;
        Ok(state
            .refresh_records
            .iter()
            .filter(|r| r.principal_id == principal_id && r.expires_at > now)
            .max_by_key(|r| r.id)
            .cloned())
    }

    async fn delete_refresh_records(&self, principal_id: i64) -> Result<u64, DatabaseError> {
        let mut state = self.state.lock().await;
        let before = state.refresh_records.len();
        state.refresh_records.retain(|r| r.principal_id != principal_id);
        Ok((before - state.refresh_records.len()) as u64)
    }

    async fn replace_refresh_records(
        &self,
        record: NewRefreshRecord,
    ) -> Result<RefreshRecord, DatabaseError> {
        let mut state = self.state.lock().await;
        state
            .refresh_records
            .retain(|r| r.principal_id != record.principal_id);
        Ok(state.push_refresh_record(record))
    }

    async fn rotate_refresh_record(
        &self,
        consumed_id: i64,
        record: NewRefreshRecord,
    ) -> Result<Option<RefreshRecord>, DatabaseError> {
        let mut state = self.state.lock().await;
        let still_stored = state
            .refresh_records
            .iter()
            .any(|r| r.id == consumed_id && r.principal_id == record.principal_id);
        if !still_stored {
            return Ok(None);
        }

        state
            .refresh_records
            .retain(|r| r.principal_id != record.principal_id);
        Ok(Some(state.push_refresh_record(record)))
    }
}
