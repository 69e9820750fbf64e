use super::{Account, AccountKind, AccountRepository, CreateOutcome, NewAccount};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-process account table for tests and local development.
#[derive(Debug, Default)]
pub struct MemoryAccounts {
    accounts: RwLock<HashMap<(AccountKind, String), Account>>,
}

impl MemoryAccounts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountRepository for MemoryAccounts {
    async fn find_by_email(&self, kind: AccountKind, email: &str) -> Result<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(&(kind, email.to_string())).cloned())
    }

    async fn find_by_id(&self, kind: AccountKind, id: Uuid) -> Result<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .iter()
            .find(|((account_kind, _), account)| *account_kind == kind && account.id == id)
            .map(|(_, account)| account.clone()))
    }

    async fn create(&self, kind: AccountKind, account: NewAccount) -> Result<CreateOutcome> {
        let mut accounts = self.accounts.write().await;
        let key = (kind, account.email.clone());
        if accounts.contains_key(&key) {
            return Ok(CreateOutcome::Duplicate);
        }

        let created = Account {
            id: Uuid::now_v7(),
            name: account.name,
            email: account.email,
            password_hash: account.password_hash,
            phone_number: account.phone_number,
            country: account.country,
        };
        accounts.insert(key, created.clone());
        Ok(CreateOutcome::Created(created))
    }

    async fn update_password(
        &self,
        kind: AccountKind,
        email: &str,
        password_hash: &str,
    ) -> Result<bool> {
        let mut accounts = self.accounts.write().await;
        match accounts.get_mut(&(kind, email.to_string())) {
            Some(account) => {
                account.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
