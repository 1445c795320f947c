use std::str::FromStr;

use tracing::warn;

const DEFAULT_TABLE: &str = "ecommerce-users";
const DEFAULT_REGION: &str = "us-east-1";
const DEV_SECRET: &str = "techstore-dev-secret-change-in-production";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    DynamoDb,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dynamodb" | "dynamo" => Ok(Self::DynamoDb),
            "memory" | "mem" => Ok(Self::Memory),
            other => anyhow::bail!("unknown STORE_BACKEND {other:?} (expected dynamodb or memory)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub table: String,
    pub region: String,
    /// Overrides the service endpoint, e.g. DynamoDB Local.
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub secure: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub session: SessionConfig,
    pub static_dir: String,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = match var("STORE_BACKEND") {
            Some(v) => v.parse()?,
            None => StoreBackend::DynamoDb,
        };

        let store = StoreConfig {
            backend,
            table: var("DYNAMODB_TABLE").unwrap_or_else(|| DEFAULT_TABLE.into()),
            region: var("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.into()),
            endpoint: var("DYNAMODB_ENDPOINT").filter(|v| !v.is_empty()),
            access_key: var("DYNAMODB_ACCESS_KEY"),
            secret_key: var("DYNAMODB_SECRET_KEY"),
        };

        let secret = match var("SECRET_KEY").filter(|v| !v.is_empty()) {
            Some(s) => s,
            None => {
                warn!("SECRET_KEY not set; using the development session secret");
                DEV_SECRET.into()
            }
        };
        let session = SessionConfig {
            secret,
            secure: var("SESSION_SECURE")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        };

        let port = match var("APP_PORT") {
            Some(p) => p
                .parse::<u16>()
                .map_err(|e| anyhow::anyhow!("invalid APP_PORT {p:?}: {e}"))?,
            None => 8080,
        };

        Ok(Self {
            store,
            session,
            static_dir: var("STATIC_DIR").unwrap_or_else(|| "static".into()),
            host: var("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let cfg = config_from(&[]).unwrap();
        assert_eq!(cfg.store.backend, StoreBackend::DynamoDb);
        assert_eq!(cfg.store.table, "ecommerce-users");
        assert_eq!(cfg.store.region, "us-east-1");
        assert!(cfg.store.endpoint.is_none());
        assert_eq!(cfg.session.secret, DEV_SECRET);
        assert!(!cfg.session.secure);
        assert_eq!(cfg.static_dir, "static");
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 8080);
    }

    #[test]
    fn reads_overrides() {
        let cfg = config_from(&[
            ("STORE_BACKEND", "memory"),
            ("DYNAMODB_TABLE", "users-test"),
            ("AWS_REGION", "eu-west-1"),
            ("DYNAMODB_ENDPOINT", "http://localhost:8000"),
            ("SECRET_KEY", "s3cr3t"),
            ("SESSION_SECURE", "true"),
            ("APP_PORT", "5000"),
        ])
        .unwrap();
        assert_eq!(cfg.store.backend, StoreBackend::Memory);
        assert_eq!(cfg.store.table, "users-test");
        assert_eq!(cfg.store.region, "eu-west-1");
        assert_eq!(cfg.store.endpoint.as_deref(), Some("http://localhost:8000"));
        assert_eq!(cfg.session.secret, "s3cr3t");
        assert!(cfg.session.secure);
        assert_eq!(cfg.port, 5000);
    }

    #[test]
    fn rejects_bad_port() {
        let err = config_from(&[("APP_PORT", "http")]).unwrap_err();
        assert!(err.to_string().contains("APP_PORT"));
    }

    #[test]
    fn rejects_unknown_backend() {
        let err = config_from(&[("STORE_BACKEND", "postgres")]).unwrap_err();
        assert!(err.to_string().contains("STORE_BACKEND"));
    }
}
