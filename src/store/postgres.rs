/// Postgres-backed store. Schema lives in `migrations/`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{
    NewPrincipal, NewRefreshRecord, Principal, PrincipalStore, ProfileUpdate, RefreshRecord,
    RefreshStore,
};
use crate::error::DatabaseError;

const PRINCIPAL_COLUMNS: &str =
    "id, first_name, last_name, phone_number, email, status, password_hash, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PrincipalStore for PgStore {
    async fn find_principal_by_email(&self, email: &str) -> Result<Option<Principal>, DatabaseError> {
        let principal = sqlx::query_as::<_, Principal>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            PRINCIPAL_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(principal)
    }

    async fn find_principal_by_id(&self, id: i64) -> Result<Option<Principal>, DatabaseError> {
        let principal = sqlx::query_as::<_, Principal>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            PRINCIPAL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(principal)
    }

    async fn insert_principal(&self, principal: NewPrincipal) -> Result<Principal, DatabaseError> {
        let stored = sqlx::query_as::<_, Principal>(&format!(
            r#"
            INSERT INTO users (first_name, last_name, phone_number, email, status, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            PRINCIPAL_COLUMNS
        ))
        .bind(&principal.first_name)
        .bind(&principal.last_name)
        .bind(&principal.phone_number)
        .bind(&principal.email)
        .bind(&principal.status)
        .bind(&principal.password_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(stored)
    }

    async fn list_principals(&self) -> Result<Vec<Principal>, DatabaseError> {
        let principals = sqlx::query_as::<_, Principal>(&format!(
            "SELECT {} FROM users ORDER BY id",
            PRINCIPAL_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(principals)
    }

    async fn update_principal(
        &self,
        id: i64,
        update: ProfileUpdate,
    ) -> Result<Option<Principal>, DatabaseError> {
        let updated = sqlx::query_as::<_, Principal>(&format!(
            r#"
            UPDATE users
            SET first_name = $1, last_name = $2, phone_number = $3, email = $4, status = $5,
                updated_at = NOW()
            WHERE id = $6
            RETURNING {}
            "#,
            PRINCIPAL_COLUMNS
        ))
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.phone_number)
        .bind(&update.email)
        .bind(&update.status)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }

    async fn delete_principal(&self, id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl RefreshStore for PgStore {
    async fn insert_refresh_record(
        &self,
        record: NewRefreshRecord,
    ) -> Result<RefreshRecord, DatabaseError> {
        let stored = sqlx::query_as::<_, RefreshRecord>(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, token_hash, expires_at, created_at
            "#,
        )
        .bind(record.principal_id)
        .bind(&record.token_hash)
        .bind(record.expires_at)
        .bind(record.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(stored)
    }

    async fn find_latest_valid_refresh_record(
        &self,
        principal_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshRecord>, DatabaseError> {
        let record = sqlx::query_as::<_, RefreshRecord>(
            r#"
            SELECT id, user_id, token_hash, expires_at, created_at
            FROM refresh_tokens
            WHERE user_id = $1 AND expires_at > $2
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(principal_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn delete_refresh_records(&self, principal_id: i64) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(principal_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn replace_refresh_records(
        &self,
        record: NewRefreshRecord,
    ) -> Result<RefreshRecord, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        // serialises concurrent logins of the same principal
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(record.principal_id)
            .execute(&mut tx)
            .await?;

        sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(record.principal_id)
            .execute(&mut tx)
            .await?;

        let stored = sqlx::query_as::<_, RefreshRecord>(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, token_hash, expires_at, created_at
            "#,
        )
        .bind(record.principal_id)
        .bind(&record.token_hash)
        .bind(record.expires_at)
        .bind(record.created_at)
        .fetch_one(&mut tx)
        .await?;

        tx.commit().await?;
        Ok(stored)
    }

    async fn rotate_refresh_record(
        &self,
        consumed_id: i64,
        record: NewRefreshRecord,
    ) -> Result<Option<RefreshRecord>, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(record.principal_id)
            .execute(&mut tx)
            .await?;

        let consumed = sqlx::query("DELETE FROM refresh_tokens WHERE id = $1 AND user_id = $2")
            .bind(consumed_id)
            .bind(record.principal_id)
            .execute(&mut tx)
            .await?;
        if consumed.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(record.principal_id)
            .execute(&mut tx)
            .await?;

        let stored = sqlx::query_as::<_, RefreshRecord>(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, token_hash, expires_at, created_at
            "#,
        )
        .bind(record.principal_id)
        .bind(&record.token_hash)
        .bind(record.expires_at)
        .bind(record.created_at)
        .fetch_one(&mut tx)
        .await?;

        tx.commit().await?;
        Ok(Some(stored))
    }
}
