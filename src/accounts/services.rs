use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use super::{
    error::AccountError,
    password::{hash_password, verify_password},
    repo_types::{Account, AccountSummary, SessionUser},
};
use crate::storage::{AccountStore, StoreError};

/// Registration and authentication rules on top of an [`AccountStore`].
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn AccountStore>,
}

impl AccountService {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    pub async fn ensure_ready(&self) -> Result<(), AccountError> {
        self.store.ensure_ready().await?;
        Ok(())
    }

    /// Creates a new account. The write is conditional, so of two concurrent
    /// registrations for the same email exactly one succeeds.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> Result<(), AccountError> {
        if self.store.get(email).await?.is_some() {
            info!("registration rejected: email already exists");
            return Err(AccountError::DuplicateAccount);
        }

        let password_hash = hash_password(password).map_err(|_| AccountError::PasswordHash)?;
        let account = Account {
            email: email.to_string(),
            name: name.to_string(),
            password_hash,
            created_at: OffsetDateTime::now_utc(),
        };

        match self.store.insert_new(&account).await {
            Ok(()) => {
                info!("account registered");
                Ok(())
            }
            Err(StoreError::AlreadyExists) => {
                warn!("registration lost race for email");
                Err(AccountError::DuplicateAccount)
            }
            Err(e) => {
                error!(error = %e, "storing account failed");
                Err(e.into())
            }
        }
    }

    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SessionUser, AccountError> {
        let Some(account) = self.store.get(email).await? else {
            info!("login failed: email not found");
            return Err(AccountError::AccountNotFound);
        };

        let ok = verify_password(password, &account.password_hash)
            .map_err(|_| AccountError::PasswordHash)?;
        if !ok {
            info!("login failed: invalid password");
            return Err(AccountError::InvalidCredentials);
        }

        info!("login succeeded");
        Ok(SessionUser {
            email: account.email,
            name: account.name,
        })
    }

    /// Every account, without password hashes. Requires a logged-in caller.
    #[instrument(skip(self, _viewer))]
    pub async fn list_accounts(
        &self,
        _viewer: &SessionUser,
    ) -> Result<Vec<AccountSummary>, AccountError> {
        let mut summaries: Vec<AccountSummary> = self
            .store
            .list_all()
            .await?
            .iter()
            .map(Account::summary)
            .collect();
        summaries.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(summaries)
    }

    /// The caller's own account, or `None` if the record has since vanished.
    #[instrument(skip(self, viewer), fields(email = %viewer.email))]
    pub async fn profile(
        &self,
        viewer: &SessionUser,
    ) -> Result<Option<AccountSummary>, AccountError> {
        Ok(self
            .store
            .get(&viewer.email)
            .await?
            .map(|account| account.summary()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryAccountStore;

    fn service() -> (AccountService, Arc<MemoryAccountStore>) {
        let store = Arc::new(MemoryAccountStore::new());
        (AccountService::new(store.clone()), store)
    }

    fn viewer() -> SessionUser {
        SessionUser {
            email: "ada@x.com".into(),
            name: "Ada".into(),
        }
    }

    #[tokio::test]
    async fn register_stores_hashed_password() {
        let (svc, store) = service();
        svc.register("ada@x.com", "Ada", "secret1").await.unwrap();

        let account = store.get("ada@x.com").await.unwrap().expect("stored");
        assert_eq!(account.name, "Ada");
        assert_ne!(account.password_hash, "secret1");
        assert!(verify_password("secret1", &account.password_hash).unwrap());
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected_and_leaves_record() {
        let (svc, store) = service();
        svc.register("ada@x.com", "Ada", "secret1").await.unwrap();
        let before = store.get("ada@x.com").await.unwrap().unwrap();

        let err = svc
            .register("ada@x.com", "Someone Else", "other-pass")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::DuplicateAccount));
        assert!(err.to_string().contains("already registered"));

        let after = store.get("ada@x.com").await.unwrap().unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn concurrent_registrations_yield_one_winner() {
        let (svc, store) = service();
        let (a, b) = tokio::join!(
            svc.register("race@x.com", "First", "secret1"),
            svc.register("race@x.com", "Second", "secret2"),
        );
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        let loser = if a.is_err() { a } else { b };
        assert!(matches!(loser, Err(AccountError::DuplicateAccount)));
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    /// Store whose reads always miss, so the pre-check in `register` never
    /// sees a concurrent winner and only the conditional insert can refuse.
    struct StaleReadStore {
        inner: MemoryAccountStore,
    }

    #[async_trait::async_trait]
    impl AccountStore for StaleReadStore {
        async fn ensure_ready(&self) -> Result<(), StoreError> {
            self.inner.ensure_ready().await
        }

        async fn get(&self, _email: &str) -> Result<Option<Account>, StoreError> {
            Ok(None)
        }

        async fn put(&self, account: &Account) -> Result<(), StoreError> {
            self.inner.put(account).await
        }

        async fn insert_new(&self, account: &Account) -> Result<(), StoreError> {
            self.inner.insert_new(account).await
        }

        async fn list_all(&self) -> Result<Vec<Account>, StoreError> {
            self.inner.list_all().await
        }
    }

    #[tokio::test]
    async fn conditional_insert_conflict_is_duplicate() {
        let store = Arc::new(StaleReadStore {
            inner: MemoryAccountStore::new(),
        });
        let svc = AccountService::new(store.clone());

        svc.register("race@x.com", "First", "secret1").await.unwrap();
        let winner = store.inner.get("race@x.com").await.unwrap().unwrap();

        let err = svc
            .register("race@x.com", "Second", "secret2")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::DuplicateAccount));

        let after = store.inner.get("race@x.com").await.unwrap().unwrap();
        assert_eq!(after, winner);
        assert_eq!(after.name, "First");
        assert!(verify_password("secret1", &after.password_hash).unwrap());
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn authenticate_outcomes() {
        let (svc, _) = service();
        svc.register("ada@x.com", "Ada", "secret1").await.unwrap();

        let err = svc.authenticate("ada@x.com", "wrong").await.unwrap_err();
        assert!(matches!(err, AccountError::InvalidCredentials));
        assert_eq!(err.to_string(), "Invalid password!");

        let user = svc.authenticate("ada@x.com", "secret1").await.unwrap();
        assert_eq!(user, viewer());
    }

    #[tokio::test]
    async fn authenticate_unknown_email_on_empty_store() {
        let (svc, _) = service();
        let err = svc.authenticate("ghost@x.com", "x").await.unwrap_err();
        assert!(matches!(err, AccountError::AccountNotFound));
        assert_eq!(err.to_string(), "Email not found!");
    }

    #[tokio::test]
    async fn authenticate_with_corrupt_hash_fails() {
        let (svc, store) = service();
        store
            .put(&Account {
                email: "odd@x.com".into(),
                name: "Odd".into(),
                password_hash: "plaintext".into(),
                created_at: OffsetDateTime::now_utc(),
            })
            .await
            .unwrap();
        let err = svc.authenticate("odd@x.com", "plaintext").await.unwrap_err();
        assert!(matches!(err, AccountError::PasswordHash));
    }

    #[tokio::test]
    async fn list_accounts_never_exposes_hashes() {
        let (svc, _) = service();
        svc.register("bob@x.com", "Bob", "hunter22").await.unwrap();
        svc.register("ada@x.com", "Ada", "secret1").await.unwrap();

        let list = svc.list_accounts(&viewer()).await.unwrap();
        let emails: Vec<_> = list.iter().map(|s| s.email.as_str()).collect();
        assert_eq!(emails, ["ada@x.com", "bob@x.com"]);

        let json = serde_json::to_string(&list).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("$argon2"));
    }

    #[tokio::test]
    async fn profile_returns_summary_or_none() {
        let (svc, _) = service();
        assert!(svc.profile(&viewer()).await.unwrap().is_none());

        svc.register("ada@x.com", "Ada", "secret1").await.unwrap();
        let summary = svc.profile(&viewer()).await.unwrap().unwrap();
        assert_eq!(summary.email, "ada@x.com");
        assert_eq!(summary.name, "Ada");
    }

    #[tokio::test]
    async fn ensure_ready_twice_is_fine() {
        let (svc, _) = service();
        svc.ensure_ready().await.unwrap();
        svc.ensure_ready().await.unwrap();
    }
}
