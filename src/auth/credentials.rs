//! Credential pair and the durable key-value store it lives in.

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::sync::RwLock;

use crate::error::StoreError;

/// Storage key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Storage key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Access + refresh token issued by login.
#[derive(Debug, Clone)]
pub struct CredentialPair {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
}

impl CredentialPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::from(access.into()),
            refresh_token: SecretString::from(refresh.into()),
        }
    }
}

/// Durable storage for the session tokens.
///
/// Every method is a single atomic operation: `save_tokens` writes both keys
/// together and `clear` removes both together, so a session is never left
/// with only one half of the pair.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Current access token, if any.
    async fn access_token(&self) -> Result<Option<SecretString>, StoreError>;

    /// Current refresh token, if any.
    async fn refresh_token(&self) -> Result<Option<SecretString>, StoreError>;

    /// Store a new pair (login).
    async fn save_tokens(&self, pair: &CredentialPair) -> Result<(), StoreError>;

    /// Replace only the access token (refresh). The refresh token is not rotated.
    async fn save_access_token(&self, token: &SecretString) -> Result<(), StoreError>;

    /// Remove both tokens.
    async fn clear(&self) -> Result<(), StoreError>;

    /// Whether both tokens are present.
    async fn has_session(&self) -> Result<bool, StoreError> {
        Ok(self.access_token().await?.is_some() && self.refresh_token().await?.is_some())
    }
}

#[derive(Debug, Default)]
struct Slots {
    access: Option<SecretString>,
    refresh: Option<SecretString>,
}

/// Process-local store (tests, ephemeral sessions).
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slots: RwLock<Slots>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a session already present.
    pub fn with_tokens(pair: CredentialPair) -> Self {
        Self {
            slots: RwLock::new(Slots {
                access: Some(pair.access_token),
                refresh: Some(pair.refresh_token),
            }),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn access_token(&self) -> Result<Option<SecretString>, StoreError> {
        Ok(self.slots.read().await.access.clone())
    }

    async fn refresh_token(&self) -> Result<Option<SecretString>, StoreError> {
        Ok(self.slots.read().await.refresh.clone())
    }

    async fn save_tokens(&self, pair: &CredentialPair) -> Result<(), StoreError> {
        let mut slots = self.slots.write().await;
        slots.access = Some(pair.access_token.clone());
        slots.refresh = Some(pair.refresh_token.clone());
        Ok(())
    }

    async fn save_access_token(&self, token: &SecretString) -> Result<(), StoreError> {
        self.slots.write().await.access = Some(token.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut slots = self.slots.write().await;
        slots.access = None;
        slots.refresh = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[tokio::test]
    async fn empty_store_has_no_session() {
        let store = MemoryCredentialStore::new();
        assert!(store.access_token().await.unwrap().is_none());
        assert!(!store.has_session().await.unwrap());
    }

    #[tokio::test]
    async fn save_and_clear_pair() {
        let store = MemoryCredentialStore::new();
        store
            .save_tokens(&CredentialPair::new("a1", "r1"))
            .await
            .unwrap();
        assert!(store.has_session().await.unwrap());

        store.clear().await.unwrap();
        assert!(store.access_token().await.unwrap().is_none());
        assert!(store.refresh_token().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn access_update_keeps_refresh() {
        let store = MemoryCredentialStore::with_tokens(CredentialPair::new("a1", "r1"));
        store
            .save_access_token(&SecretString::from("a2"))
            .await
            .unwrap();

        let access = store.access_token().await.unwrap().unwrap();
        let refresh = store.refresh_token().await.unwrap().unwrap();
        assert_eq!(access.expose_secret(), "a2");
        assert_eq!(refresh.expose_secret(), "r1");
    }
}
