use std::sync::Arc;

use tracing::info;

use crate::accounts::services::AccountService;
use crate::config::{AppConfig, StoreBackend};
use crate::storage::{AccountStore, DynamoAccountStore, MemoryAccountStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub accounts: AccountService,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn AccountStore> = match config.store.backend {
            StoreBackend::DynamoDb => {
                info!(
                    table = %config.store.table,
                    region = %config.store.region,
                    endpoint = ?config.store.endpoint,
                    "using DynamoDB account store"
                );
                Arc::new(DynamoAccountStore::new(&config.store).await)
            }
            StoreBackend::Memory => {
                info!("using in-memory account store; accounts are lost on restart");
                Arc::new(MemoryAccountStore::new())
            }
        };

        Ok(Self::from_parts(Arc::new(config), store))
    }

    pub fn from_parts(config: Arc<AppConfig>, store: Arc<dyn AccountStore>) -> Self {
        Self {
            config,
            accounts: AccountService::new(store),
        }
    }

    /// State over an empty in-memory store, for tests.
    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::{SessionConfig, StoreConfig};

        let config = Arc::new(AppConfig {
            store: StoreConfig {
                backend: StoreBackend::Memory,
                table: "test-users".into(),
                region: "us-east-1".into(),
                endpoint: None,
                access_key: None,
                secret_key: None,
            },
            session: SessionConfig {
                secret: "test-secret".into(),
                secure: false,
            },
            static_dir: "static".into(),
            host: "127.0.0.1".into(),
            port: 0,
        });
        Self::from_parts(config, Arc::new(MemoryAccountStore::new()))
    }
}
