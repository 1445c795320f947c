use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_dynamodb::{
    config::Region,
    error::DisplayErrorContext,
    types::{
        AttributeDefinition, AttributeValue, BillingMode, KeySchemaElement, KeyType,
        ScalarAttributeType, TableStatus,
    },
    Client,
};
use time::{
    format_description::well_known::{Iso8601, Rfc3339},
    OffsetDateTime, PrimitiveDateTime,
};
use tokio::sync::OnceCell;
use tracing::{debug, error, info, instrument};

use super::{AccountStore, StoreError, KEY_ATTR};
use crate::{accounts::repo_types::Account, config::StoreConfig};

const READY_POLL_ATTEMPTS: u32 = 30;
const READY_POLL_INTERVAL: Duration = Duration::from_secs(2);

type Item = HashMap<String, AttributeValue>;

/// Account store backed by a single DynamoDB table keyed by `email`.
pub struct DynamoAccountStore {
    client: Client,
    table: String,
    ready: OnceCell<()>,
}

impl DynamoAccountStore {
    pub async fn new(cfg: &StoreConfig) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(cfg.region.clone()));

        if let Some(endpoint) = &cfg.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        if let (Some(access_key), Some(secret_key)) = (&cfg.access_key, &cfg.secret_key) {
            loader = loader.credentials_provider(Credentials::new(
                access_key, secret_key, None, None, "static",
            ));
        }

        let shared = loader.load().await;
        Self::from_client(Client::new(&shared), &cfg.table)
    }

    pub fn from_client(client: Client, table: &str) -> Self {
        Self {
            client,
            table: table.to_string(),
            ready: OnceCell::new(),
        }
    }

    /// Provisions the table at most once per store; a failed attempt is retried on the next call.
    async fn ready(&self) -> Result<(), StoreError> {
        self.ready
            .get_or_try_init(|| self.provision_table())
            .await
            .map(|_| ())
    }

    #[instrument(skip(self), fields(table = %self.table))]
    async fn provision_table(&self) -> Result<(), StoreError> {
        match self.client.describe_table().table_name(&self.table).send().await {
            Ok(out) => {
                if out.table().and_then(|t| t.table_status()) == Some(&TableStatus::Active) {
                    debug!("table is active");
                    return Ok(());
                }
                return self.wait_until_active().await;
            }
            Err(err) => {
                let missing = err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception());
                if !missing {
                    error!(error = %DisplayErrorContext(&err), "describe_table failed");
                    return Err(unavailable("describe_table", err));
                }
            }
        }

        info!("table not found, creating it");
        let key = KeySchemaElement::builder()
            .attribute_name(KEY_ATTR)
            .key_type(KeyType::Hash)
            .build()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let attr = AttributeDefinition::builder()
            .attribute_name(KEY_ATTR)
            .attribute_type(ScalarAttributeType::S)
            .build()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let created = self
            .client
            .create_table()
            .table_name(&self.table)
            .key_schema(key)
            .attribute_definitions(attr)
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await;

        match created {
            Ok(_) => {}
            // another process won the race to create it
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_in_use_exception()) =>
            {
                debug!("table created concurrently");
            }
            Err(err) => {
                error!(error = %DisplayErrorContext(&err), "create_table failed");
                return Err(unavailable("create_table", err));
            }
        }

        self.wait_until_active().await?;
        info!("table created");
        Ok(())
    }

    async fn wait_until_active(&self) -> Result<(), StoreError> {
        for attempt in 1..=READY_POLL_ATTEMPTS {
            let out = self
                .client
                .describe_table()
                .table_name(&self.table)
                .send()
                .await
                .map_err(|e| unavailable("describe_table", e))?;
            if out.table().and_then(|t| t.table_status()) == Some(&TableStatus::Active) {
                return Ok(());
            }
            debug!(attempt, "waiting for table to become active");
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
        Err(StoreError::Unavailable(format!(
            "table {} did not become active",
            self.table
        )))
    }

    async fn write(&self, account: &Account, if_absent: bool) -> Result<(), StoreError> {
        self.ready().await?;
        let mut req = self
            .client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(to_item(account)?));
        if if_absent {
            req = req.condition_expression(format!("attribute_not_exists({KEY_ATTR})"));
        }

        match req.send().await {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                Err(StoreError::AlreadyExists)
            }
            Err(err) => Err(unavailable("put_item", err)),
        }
    }
}

#[async_trait]
impl AccountStore for DynamoAccountStore {
    async fn ensure_ready(&self) -> Result<(), StoreError> {
        self.ready().await
    }

    async fn get(&self, email: &str) -> Result<Option<Account>, StoreError> {
        self.ready().await?;
        let out = self
            .client
            .get_item()
            .table_name(&self.table)
            .key(KEY_ATTR, AttributeValue::S(email.to_string()))
            .send()
            .await
            .map_err(|e| unavailable("get_item", e))?;
        out.item().map(from_item).transpose()
    }

    async fn put(&self, account: &Account) -> Result<(), StoreError> {
        self.write(account, false).await
    }

    async fn insert_new(&self, account: &Account) -> Result<(), StoreError> {
        self.write(account, true).await
    }

    async fn list_all(&self) -> Result<Vec<Account>, StoreError> {
        self.ready().await?;
        let mut accounts = Vec::new();
        let mut start_key: Option<Item> = None;
        loop {
            let out = self
                .client
                .scan()
                .table_name(&self.table)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| unavailable("scan", e))?;
            for item in out.items() {
                accounts.push(from_item(item)?);
            }
            match out.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }
        Ok(accounts)
    }
}

fn unavailable<E>(op: &str, err: E) -> StoreError
where
    E: std::error::Error,
{
    StoreError::Unavailable(format!("{op}: {}", DisplayErrorContext(err)))
}

fn to_item(account: &Account) -> Result<Item, StoreError> {
    let created_at = account
        .created_at
        .format(&Rfc3339)
        .map_err(|e| StoreError::Corrupt(format!("created_at: {e}")))?;
    Ok(HashMap::from([
        (KEY_ATTR.to_string(), AttributeValue::S(account.email.clone())),
        ("name".to_string(), AttributeValue::S(account.name.clone())),
        (
            "password_hash".to_string(),
            AttributeValue::S(account.password_hash.clone()),
        ),
        ("created_at".to_string(), AttributeValue::S(created_at)),
    ]))
}

fn from_item(item: &Item) -> Result<Account, StoreError> {
    Ok(Account {
        email: string_attr(item, KEY_ATTR)?,
        name: string_attr(item, "name")?,
        password_hash: string_attr(item, "password_hash")?,
        created_at: parse_timestamp(&string_attr(item, "created_at")?)?,
    })
}

fn string_attr(item: &Item, name: &str) -> Result<String, StoreError> {
    item.get(name)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .ok_or_else(|| StoreError::Corrupt(format!("missing string attribute {name}")))
}

/// Accepts RFC 3339, and naive ISO-8601 timestamps which are taken as UTC.
fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, StoreError> {
    OffsetDateTime::parse(raw, &Rfc3339)
        .or_else(|_| PrimitiveDateTime::parse(raw, &Iso8601::DEFAULT).map(|dt| dt.assume_utc()))
        .map_err(|e| StoreError::Corrupt(format!("created_at {raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn sample() -> Account {
        Account {
            email: "ada@x.com".into(),
            name: "Ada".into(),
            password_hash: "$argon2id$v=19$stub".into(),
            created_at: datetime!(2024-03-01 09:30:00 UTC),
        }
    }

    #[test]
    fn item_has_flat_string_schema() {
        let item = to_item(&sample()).unwrap();
        assert_eq!(item.len(), 4);
        assert_eq!(item["email"], AttributeValue::S("ada@x.com".into()));
        assert_eq!(item["name"], AttributeValue::S("Ada".into()));
        assert_eq!(
            item["password_hash"],
            AttributeValue::S("$argon2id$v=19$stub".into())
        );
        assert_eq!(
            item["created_at"],
            AttributeValue::S("2024-03-01T09:30:00Z".into())
        );
    }

    #[test]
    fn item_decodes_back_to_account() {
        let account = sample();
        let decoded = from_item(&to_item(&account).unwrap()).unwrap();
        assert_eq!(decoded, account);
    }

    #[test]
    fn missing_attribute_is_corrupt() {
        let mut item = to_item(&sample()).unwrap();
        item.remove("password_hash");
        let err = from_item(&item).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(msg) if msg.contains("password_hash")));
    }

    #[test]
    fn non_string_attribute_is_corrupt() {
        let mut item = to_item(&sample()).unwrap();
        item.insert("name".into(), AttributeValue::N("42".into()));
        assert!(matches!(from_item(&item), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn naive_iso_timestamp_is_read_as_utc() {
        let ts = parse_timestamp("2024-03-01T09:30:00.250000").unwrap();
        assert_eq!(ts.offset(), time::UtcOffset::UTC);
        assert_eq!(ts.hour(), 9);
        assert_eq!(ts.millisecond(), 250);
    }

    #[test]
    fn garbage_timestamp_is_corrupt() {
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(StoreError::Corrupt(_))
        ));
    }
}
