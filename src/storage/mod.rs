use async_trait::async_trait;
use thiserror::Error;

use crate::accounts::repo_types::Account;

mod dynamo;
mod memory;

pub use dynamo::DynamoAccountStore;
pub use memory::MemoryAccountStore;

/// Name of the partition key attribute.
pub const KEY_ATTR: &str = "email";

#[derive(Debug, Error)]
pub enum StoreError {
    /// Provisioning or connectivity failure.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Conditional insert hit an existing key.
    #[error("record already exists")]
    AlreadyExists,

    /// Stored item could not be decoded into an account.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Durable mapping from email to account record.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Verifies the backing table exists, creating it if absent. Safe to call repeatedly.
    async fn ensure_ready(&self) -> Result<(), StoreError>;
    async fn get(&self, email: &str) -> Result<Option<Account>, StoreError>;
    /// Unconditional upsert.
    async fn put(&self, account: &Account) -> Result<(), StoreError>;
    /// Insert only if no record exists for `account.email`.
    async fn insert_new(&self, account: &Account) -> Result<(), StoreError>;
    async fn list_all(&self) -> Result<Vec<Account>, StoreError>;
}
