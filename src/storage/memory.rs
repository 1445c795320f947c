use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{AccountStore, StoreError};
use crate::accounts::repo_types::Account;

/// In-process store for local runs without cloud credentials, and for tests.
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<String, Account>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn ensure_ready(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get(&self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.read().await.get(email).cloned())
    }

    async fn put(&self, account: &Account) -> Result<(), StoreError> {
        self.accounts
            .write()
            .await
            .insert(account.email.clone(), account.clone());
        Ok(())
    }

    async fn insert_new(&self, account: &Account) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&account.email) {
            return Err(StoreError::AlreadyExists);
        }
        accounts.insert(account.email.clone(), account.clone());
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Account>, StoreError> {
        Ok(self.accounts.read().await.values().cloned().collect())
    }
}
