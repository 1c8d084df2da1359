//! VoIP push token lifecycle
//!
//! The push transport hands out a new credential on registration and tells
//! us when it invalidates it. [`TokenForwarder`] turns each credential into
//! its canonical lowercase-hex [`VoipToken`], forwards it to the call
//! presenter and persists it under a fixed key so it survives restarts. On
//! invalidation it forwards the empty token to both destinations.
//!
//! Both forwards are best-effort: failures are logged and reported in the
//! returned [`ForwardReport`], never propagated.
//!
//! # Examples
//!
//! ```rust
//! use rvoip_push_core::token::{MemoryTokenStore, TokenForwarder, TokenStore, DEFAULT_TOKEN_KEY};
//! use rvoip_push_core::presenter::PresenterSlot;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let store = Arc::new(MemoryTokenStore::new());
//! let forwarder = TokenForwarder::new(PresenterSlot::empty(), store.clone(), DEFAULT_TOKEN_KEY);
//!
//! let report = forwarder.on_credentials_updated(&[0xde, 0xad, 0xbe, 0xef]).await;
//! assert!(report.stored);
//! assert!(!report.presenter_delivered); // no presenter installed yet
//!
//! assert_eq!(store.get(DEFAULT_TOKEN_KEY).await.unwrap().as_deref(), Some("deadbeef"));
//! assert_eq!(forwarder.current_token().await.as_str(), "deadbeef");
//! # });
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{PushError, Result};
use crate::presenter::PresenterSlot;

/// Store key the current token is persisted under
pub const DEFAULT_TOKEN_KEY: &str = "cached_voip_token";

/// Canonical string form of a VoIP push credential
///
/// An empty token means "no valid token".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoipToken(String);

impl VoipToken {
    /// Encode raw credential bytes as lowercase hex
    pub fn from_credentials(credentials: &[u8]) -> Self {
        Self(hex::encode(credentials))
    }

    /// The "no valid token" value
    pub fn invalidated() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
    }
}

impl From<String> for VoipToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for VoipToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persisted key-value store for the token
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<String>>;
}

/// Process-local store, mostly for tests and ephemeral deployments
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: DashMap<String, String>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }
}

/// Store backed by a JSON object on disk
///
/// Writes are serialized and go through a temporary file that is renamed
/// into place, so a crash never leaves a half-written file behind.
#[derive(Debug)]
pub struct JsonFileTokenStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, String>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(BTreeMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                PushError::token_store(format!("corrupt store {}: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Entries to carry over into the next write
    ///
    /// A file this store cannot read must not block every later write, so
    /// unreadable contents are replaced. String entries of a valid JSON
    /// object survive; anything else is dropped.
    async fn load_for_write(&self) -> Result<BTreeMap<String, String>> {
        match self.load().await {
            Err(PushError::TokenStore(reason)) => {
                warn!("{}, rewriting token store", reason);
                let bytes = tokio::fs::read(&self.path).await?;
                let kept = serde_json::from_slice::<serde_json::Map<String, serde_json::Value>>(&bytes)
                    .map(|entries| {
                        entries
                            .into_iter()
                            .filter_map(|(key, value)| match value {
                                serde_json::Value::String(s) => Some((key, s)),
                                _ => None,
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                Ok(kept)
            }
            other => other,
        }
    }
}

#[async_trait]
impl TokenStore for JsonFileTokenStore {
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut entries = self.load_for_write().await?;
        entries.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(&entries)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load().await?.remove(key))
    }
}

/// Which destinations accepted a forwarded token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardReport {
    pub presenter_delivered: bool,
    pub stored: bool,
}

/// Forwards token updates to the presenter and the persisted store
pub struct TokenForwarder {
    presenter: PresenterSlot,
    store: Arc<dyn TokenStore>,
    key: String,
    current: Mutex<VoipToken>,
}

impl TokenForwarder {
    pub fn new(presenter: PresenterSlot, store: Arc<dyn TokenStore>, key: impl Into<String>) -> Self {
        Self {
            presenter,
            store,
            key: key.into(),
            current: Mutex::new(VoipToken::invalidated()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The transport issued a new credential
    pub async fn on_credentials_updated(&self, credentials: &[u8]) -> ForwardReport {
        let token = VoipToken::from_credentials(credentials);
        info!(len = token.as_str().len(), "VoIP token updated");
        debug!(token = %token, "New VoIP token");
        self.forward(token).await
    }

    /// The transport invalidated the current credential
    pub async fn on_token_invalidated(&self) -> ForwardReport {
        info!("VoIP token invalidated");
        self.forward(VoipToken::invalidated()).await
    }

    /// The single current token value
    pub async fn current_token(&self) -> VoipToken {
        self.current.lock().await.clone()
    }

    /// Load the persisted token as the current value without forwarding it
    pub async fn restore(&self) -> Result<VoipToken> {
        let mut current = self.current.lock().await;
        let token = self
            .store
            .get(&self.key)
            .await?
            .map(VoipToken::from)
            .unwrap_or_default();
        *current = token.clone();
        Ok(token)
    }

    async fn forward(&self, token: VoipToken) -> ForwardReport {
        // Held across both forwards so concurrent updates land in order
        let mut current = self.current.lock().await;

        let presenter_delivered = match self.presenter.set_voip_token(token.as_str()).await {
            Ok(()) => true,
            Err(PushError::PresenterUnavailable) => {
                debug!("No call presenter installed, token not forwarded");
                false
            }
            Err(e) => {
                warn!("Failed to forward VoIP token to presenter: {}", e);
                false
            }
        };

        let stored = match self.store.set(&self.key, token.as_str()).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to persist VoIP token under {}: {}", self.key, e);
                false
            }
        };

        *current = token;
        ForwardReport {
            presenter_delivered,
            stored,
        }
    }
}

impl fmt::Debug for TokenForwarder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenForwarder")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_encoding_is_lowercase() {
        let token = VoipToken::from_credentials(&[0x0A, 0xFF, 0x00]);
        assert_eq!(token.as_str(), "0aff00");
        assert!(token.is_valid());
        assert!(!VoipToken::invalidated().is_valid());
    }

    #[tokio::test]
    async fn test_invalidation_stores_empty_token() {
        let store = Arc::new(MemoryTokenStore::new());
        let forwarder = TokenForwarder::new(PresenterSlot::empty(), store.clone(), "k");

        forwarder.on_credentials_updated(&[1, 2, 3]).await;
        forwarder.on_token_invalidated().await;

        assert_eq!(store.get("k").await.unwrap().as_deref(), Some(""));
        assert!(!forwarder.current_token().await.is_valid());
    }

    #[tokio::test]
    async fn test_restore_reads_store() {
        let store = Arc::new(MemoryTokenStore::new());
        store.set("k", "abcd").await.unwrap();
        let forwarder = TokenForwarder::new(PresenterSlot::empty(), store, "k");

        assert_eq!(forwarder.restore().await.unwrap().as_str(), "abcd");
        assert_eq!(forwarder.current_token().await.as_str(), "abcd");
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tokens.json");
        let store = JsonFileTokenStore::new(&path);

        assert_eq!(store.get("k").await.unwrap(), None);
        store.set("k", "abc").await.unwrap();
        store.set("other", "x").await.unwrap();

        let reopened = JsonFileTokenStore::new(&path);
        assert_eq!(reopened.get("k").await.unwrap().as_deref(), Some("abc"));
        assert_eq!(reopened.get("other").await.unwrap().as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let store = JsonFileTokenStore::new(&path);
        assert!(matches!(store.get("k").await, Err(PushError::TokenStore(_))));
    }

    #[tokio::test]
    async fn test_file_store_overwrites_unreadable_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        let store = JsonFileTokenStore::new(&path);

        std::fs::write(&path, b"{ not json").unwrap();
        store.set("k", "abc").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("abc"));

        std::fs::write(&path, br#"{"k": 5, "other": "keep", "nested": {"a": 1}}"#).unwrap();
        store.set("k", "def").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("def"));
        assert_eq!(store.get("other").await.unwrap().as_deref(), Some("keep"));
        assert_eq!(store.get("nested").await.unwrap(), None);
    }
}
