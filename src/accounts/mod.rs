//! Account persistence for users and sellers.
//!
//! Accounts are only created once the OTP for their email has been verified.
//! Emails are stored normalized (trimmed, lowercased) and are unique per table.

mod memory;
mod models;
pub mod password;
mod repo;

pub use self::memory::MemoryAccounts;
pub use self::models::{Account, AccountKind, AccountSummary, CreateOutcome, NewAccount};
pub use self::repo::PgAccounts;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_by_email(&self, kind: AccountKind, email: &str) -> Result<Option<Account>>;

    async fn find_by_id(&self, kind: AccountKind, id: Uuid) -> Result<Option<Account>>;

    async fn create(&self, kind: AccountKind, account: NewAccount) -> Result<CreateOutcome>;

    /// Returns `false` if no account matched.
    async fn update_password(
        &self,
        kind: AccountKind,
        email: &str,
        password_hash: &str,
    ) -> Result<bool>;

    async fn ping(&self) -> Result<()>;
}
