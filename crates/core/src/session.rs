//! Token session shared between API clients
//!
//! A [`Session`] caches the access/refresh token pair in memory and mirrors
//! every change into a [`TokenStore`]. Clients receive the session at
//! construction instead of reaching into process-global storage.

use crate::store::{ACCESS_TOKEN_KEY, MemoryTokenStore, REFRESH_TOKEN_KEY, TokenStore};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{debug, info};

/// Access and refresh credentials issued by the token endpoint
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

/// Callback invoked when a failed refresh invalidates the session
pub type ExpiryListener = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct CachedTokens {
    access: Option<String>,
    refresh: Option<String>,
}

pub struct Session {
    store: Arc<dyn TokenStore>,
    tokens: RwLock<CachedTokens>,
    refresh_lock: Mutex<()>,
    on_expired: Option<ExpiryListener>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl Session {
    /// Load whatever tokens the store currently holds
    pub async fn load(store: Arc<dyn TokenStore>) -> Result<Self> {
        let access = store.get(ACCESS_TOKEN_KEY).await?;
        let refresh = store.get(REFRESH_TOKEN_KEY).await?;
        debug!(
            has_access = access.is_some(),
            has_refresh = refresh.is_some(),
            "Session loaded from token store"
        );

        Ok(Self {
            store,
            tokens: RwLock::new(CachedTokens { access, refresh }),
            refresh_lock: Mutex::new(()),
            on_expired: None,
        })
    }

    /// Empty session backed by a [`MemoryTokenStore`]
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(MemoryTokenStore::new()),
            tokens: RwLock::new(CachedTokens::default()),
            refresh_lock: Mutex::new(()),
            on_expired: None,
        }
    }

    /// Register the listener fired by [`Session::expire`]
    pub fn with_expiry_listener(mut self, listener: ExpiryListener) -> Self {
        self.on_expired = Some(listener);
        self
    }

    pub async fn access_token(&self) -> Option<String> {
        self.tokens.read().await.access.clone()
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.tokens.read().await.refresh.clone()
    }

    /// Both tokens, if both are cached
    pub async fn tokens(&self) -> Option<TokenPair> {
        let guard = self.tokens.read().await;
        match (&guard.access, &guard.refresh) {
            (Some(access), Some(refresh)) => Some(TokenPair {
                access: access.clone(),
                refresh: refresh.clone(),
            }),
            _ => None,
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.tokens.read().await.access.is_some()
    }

    /// Cache the tokens returned by a login.
    ///
    /// Each value is written only when present and non-empty; an absent value
    /// leaves the previously cached one untouched.
    pub async fn store_tokens(&self, access: Option<&str>, refresh: Option<&str>) -> Result<()> {
        let mut guard = self.tokens.write().await;

        if let Some(access) = non_empty(access) {
            self.store.set(ACCESS_TOKEN_KEY, access).await?;
            guard.access = Some(access.to_string());
        }
        if let Some(refresh) = non_empty(refresh) {
            self.store.set(REFRESH_TOKEN_KEY, refresh).await?;
            guard.refresh = Some(refresh.to_string());
        }

        debug!(
            has_access = guard.access.is_some(),
            has_refresh = guard.refresh.is_some(),
            "Session tokens stored"
        );
        Ok(())
    }

    /// Install the result of a successful refresh.
    ///
    /// The access token is always replaced; the refresh token only when the
    /// server rotated it.
    pub async fn replace_access(&self, access: &str, refresh: Option<&str>) -> Result<()> {
        let access = access.trim();
        let refresh = non_empty(refresh);
        let mut guard = self.tokens.write().await;

        self.store.set(ACCESS_TOKEN_KEY, access).await?;
        if let Some(refresh) = refresh {
            self.store.set(REFRESH_TOKEN_KEY, refresh).await?;
            guard.refresh = Some(refresh.to_string());
        }
        guard.access = Some(access.to_string());

        debug!(rotated_refresh = refresh.is_some(), "Access token replaced");
        Ok(())
    }

    /// Forget both tokens.
    ///
    /// The in-memory cache is cleared before the store is touched, so the
    /// session reads as logged out even if the store fails.
    pub async fn clear(&self) -> Result<()> {
        let mut guard = self.tokens.write().await;
        guard.access = None;
        guard.refresh = None;

        let access = self.store.remove(ACCESS_TOKEN_KEY).await;
        let refresh = self.store.remove(REFRESH_TOKEN_KEY).await;
        access.and(refresh)
    }

    /// Clear the session after a failed refresh and notify the listener
    pub async fn expire(&self) -> Result<()> {
        let result = self.clear().await;
        info!("Session expired; tokens cleared");

        if let Some(listener) = &self.on_expired {
            listener();
        }
        result
    }

    /// Serialises token refreshes across every client sharing this session
    pub async fn refresh_guard(&self) -> MutexGuard<'_, ()> {
        self.refresh_lock.lock().await
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("has_expiry_listener", &self.on_expired.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mock::MockTokenStore;
    use crate::StoreError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_login_tokens_are_persisted() {
        let store = Arc::new(MemoryTokenStore::new());
        let session = Session::load(store.clone()).await.unwrap();

        session.store_tokens(Some("A1"), Some("R1")).await.unwrap();

        assert_eq!(store.get(ACCESS_TOKEN_KEY).await.unwrap().as_deref(), Some("A1"));
        assert_eq!(store.get(REFRESH_TOKEN_KEY).await.unwrap().as_deref(), Some("R1"));
        assert_eq!(
            session.tokens().await,
            Some(TokenPair {
                access: "A1".into(),
                refresh: "R1".into()
            })
        );
    }

    #[tokio::test]
    async fn test_store_tokens_skips_missing_values() {
        let session = Session::in_memory();
        session.store_tokens(Some("A1"), Some("R1")).await.unwrap();

        session.store_tokens(Some("A2"), None).await.unwrap();
        session.store_tokens(None, Some("  ")).await.unwrap();

        assert_eq!(session.access_token().await.as_deref(), Some("A2"));
        assert_eq!(session.refresh_token().await.as_deref(), Some("R1"));
    }

    #[tokio::test]
    async fn test_load_reads_existing_tokens() {
        let store = Arc::new(MemoryTokenStore::new());
        store.set(ACCESS_TOKEN_KEY, "A1").await.unwrap();

        let session = Session::load(store).await.unwrap();
        assert!(session.is_authenticated().await);
        assert_eq!(session.refresh_token().await, None);
        assert_eq!(session.tokens().await, None);
    }

    #[tokio::test]
    async fn test_replace_access_keeps_refresh_unless_rotated() {
        let session = Session::in_memory();
        session.store_tokens(Some("A1"), Some("R1")).await.unwrap();

        session.replace_access("A2", None).await.unwrap();
        assert_eq!(session.access_token().await.as_deref(), Some("A2"));
        assert_eq!(session.refresh_token().await.as_deref(), Some("R1"));

        session.replace_access("A3", Some("R2")).await.unwrap();
        assert_eq!(session.access_token().await.as_deref(), Some("A3"));
        assert_eq!(session.refresh_token().await.as_deref(), Some("R2"));
    }

    #[tokio::test]
    async fn test_clear_removes_both_keys() {
        let mut store = MockTokenStore::new();
        store.expect_get().returning(|_| Ok(Some("T".to_string())));
        store
            .expect_remove()
            .withf(|key| key.to_string() == ACCESS_TOKEN_KEY)
            .times(1)
            .returning(|_| Ok(()));
        store
            .expect_remove()
            .withf(|key| key.to_string() == REFRESH_TOKEN_KEY)
            .times(1)
            .returning(|_| Ok(()));

        let session = Session::load(Arc::new(store)).await.unwrap();
        assert!(session.is_authenticated().await);

        session.clear().await.unwrap();
        assert!(!session.is_authenticated().await);
        assert_eq!(session.refresh_token().await, None);
    }

    #[tokio::test]
    async fn test_clear_logs_out_even_when_store_fails() {
        let mut store = MockTokenStore::new();
        store.expect_get().returning(|_| Ok(Some("T".to_string())));
        store
            .expect_remove()
            .returning(|_| Err(StoreError::Unavailable("disk gone".into())));

        let session = Session::load(Arc::new(store)).await.unwrap();
        assert!(session.clear().await.is_err());
        assert!(!session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_clear_removes_refresh_key_after_access_removal_fails() {
        let mut store = MockTokenStore::new();
        store.expect_get().returning(|_| Ok(Some("T".to_string())));
        store
            .expect_remove()
            .withf(|key| key.to_string() == ACCESS_TOKEN_KEY)
            .times(1)
            .returning(|_| Err(StoreError::Unavailable("disk gone".into())));
        store
            .expect_remove()
            .withf(|key| key.to_string() == REFRESH_TOKEN_KEY)
            .times(1)
            .returning(|_| Ok(()));

        let session = Session::load(Arc::new(store)).await.unwrap();
        let result = session.clear().await;

        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert_eq!(session.refresh_token().await, None);
    }

    #[tokio::test]
    async fn test_refreshed_tokens_are_trimmed_like_login_tokens() {
        let store = Arc::new(MemoryTokenStore::new());
        let session = Session::load(store.clone()).await.unwrap();
        session.store_tokens(Some(" A1 "), Some(" R1 ")).await.unwrap();
        assert_eq!(store.get(ACCESS_TOKEN_KEY).await.unwrap().as_deref(), Some("A1"));

        session.replace_access(" A2\n", Some(" R2 ")).await.unwrap();

        assert_eq!(store.get(ACCESS_TOKEN_KEY).await.unwrap().as_deref(), Some("A2"));
        assert_eq!(store.get(REFRESH_TOKEN_KEY).await.unwrap().as_deref(), Some("R2"));
        assert_eq!(session.access_token().await.as_deref(), Some("A2"));
    }

    #[tokio::test]
    async fn test_expire_notifies_listener() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let session = Session::in_memory().with_expiry_listener(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        session.store_tokens(Some("A1"), Some("R1")).await.unwrap();

        session.expire().await.unwrap();

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!session.is_authenticated().await);
    }

    #[test]
    fn test_token_pair_debug_is_redacted() {
        let pair = TokenPair {
            access: "secret-access".into(),
            refresh: "secret-refresh".into(),
        };
        let rendered = format!("{pair:?}");
        assert!(!rendered.contains("secret"));
    }
}
