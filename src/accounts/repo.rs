//! Postgres account storage.
//!
//! Expected tables (schema is managed outside this service):
//!
//! - `users (id uuid primary key, name text, email text unique, password text)`
//! - `sellers (id uuid primary key, name text, email text unique, password text,
//!   phone_number text, country text)`

use super::{Account, AccountKind, AccountRepository, CreateOutcome, NewAccount};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Connection, PgPool};
use tracing::{Instrument, info_span};
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct PgAccounts {
    pool: PgPool,
}

impl PgAccounts {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn select_columns(kind: AccountKind) -> &'static str {
    match kind {
        AccountKind::User => {
            "id, name, email, password, NULL::text AS phone_number, NULL::text AS country"
        }
        AccountKind::Seller => "id, name, email, password, phone_number, country",
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[async_trait]
impl AccountRepository for PgAccounts {
    async fn find_by_email(&self, kind: AccountKind, email: &str) -> Result<Option<Account>> {
        let query = format!(
            "SELECT {} FROM {} WHERE email = $1",
            select_columns(kind),
            kind.table()
        );
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = %query
        );
        sqlx::query_as::<_, Account>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .with_context(|| format!("Failed to look up {}", kind.as_str()))
    }

    async fn find_by_id(&self, kind: AccountKind, id: Uuid) -> Result<Option<Account>> {
        let query = format!(
            "SELECT {} FROM {} WHERE id = $1",
            select_columns(kind),
            kind.table()
        );
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = %query
        );
        sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .with_context(|| format!("Failed to look up {} by id", kind.as_str()))
    }

    async fn create(&self, kind: AccountKind, account: NewAccount) -> Result<CreateOutcome> {
        let id = Uuid::now_v7();
        let query = match kind {
            AccountKind::User => format!(
                "INSERT INTO users (id, name, email, password) VALUES ($1, $2, $3, $4) RETURNING {}",
                select_columns(kind)
            ),
            AccountKind::Seller => format!(
                "INSERT INTO sellers (id, name, email, password, phone_number, country) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
                select_columns(kind)
            ),
        };
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = %query
        );

        let mut statement = sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .bind(&account.name)
            .bind(&account.email)
            .bind(&account.password_hash);
        if kind == AccountKind::Seller {
            statement = statement
                .bind(&account.phone_number)
                .bind(&account.country);
        }

        match statement.fetch_one(&self.pool).instrument(span).await {
            Ok(created) => Ok(CreateOutcome::Created(created)),
            Err(err) if is_unique_violation(&err) => Ok(CreateOutcome::Duplicate),
            Err(err) => {
                Err(err).with_context(|| format!("Failed to create {}", kind.as_str()))
            }
        }
    }

    async fn update_password(
        &self,
        kind: AccountKind,
        email: &str,
        password_hash: &str,
    ) -> Result<bool> {
        let query = format!("UPDATE {} SET password = $1 WHERE email = $2", kind.table());
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = %query
        );
        let result = sqlx::query(&query)
            .bind(password_hash)
            .bind(email)
            .execute(&self.pool)
            .instrument(span)
            .await
            .with_context(|| format!("Failed to update {} password", kind.as_str()))?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<()> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self
            .pool
            .acquire()
            .instrument(acquire_span)
            .await
            .context("Failed to acquire database connection")?;
        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping()
            .instrument(ping_span)
            .await
            .context("Failed to ping database")
    }
}
