use crate::error::{Result, StudioError};
use async_trait::async_trait;
use std::env;
use std::sync::{Arc, RwLock};

/// Environment variables checked for an API key, in order.
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// The host side of credential management: whoever owns the key picker.
#[async_trait]
pub trait CredentialHost: Send + Sync {
    async fn has_selected_credential(&self) -> bool;

    /// Resolves once the user has gone through the picker.
    async fn prompt_select_credential(&self) -> Result<()>;

    /// Key to attach to the next request. Read fresh on every call.
    fn api_key(&self) -> Option<String>;
}

/// Where a studio stands with respect to the paid credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialStatus {
    Unknown,
    Confirmed,
    Missing,
}

impl CredentialStatus {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, CredentialStatus::Confirmed)
    }
}

/// In-process key holder. Cloning shares the same slot, so a key picked in
/// one place is seen by every client built afterwards.
#[derive(Debug, Clone, Default)]
pub struct KeyStore {
    key: Arc<RwLock<Option<String>>>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        let store = Self::new();
        store.set_key(key);
        store
    }

    pub fn set_key(&self, key: impl Into<String>) {
        let key = key.into();
        let trimmed = key.trim();
        if let Ok(mut slot) = self.key.write() {
            *slot = if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            };
        }
    }

    pub fn clear(&self) {
        if let Ok(mut slot) = self.key.write() {
            *slot = None;
        }
    }

    pub fn get(&self) -> Option<String> {
        self.key.read().ok().and_then(|slot| slot.clone())
    }
}

#[async_trait]
impl CredentialHost for KeyStore {
    async fn has_selected_credential(&self) -> bool {
        self.get().is_some()
    }

    /// Without an interactive picker the best this store can do is pick up a
    /// key that was exported since startup.
    async fn prompt_select_credential(&self) -> Result<()> {
        match key_from_env() {
            Some(key) => {
                self.set_key(key);
                Ok(())
            }
            None => Err(StudioError::CredentialError(format!(
                "none of {} is set",
                API_KEY_VARS.join(", ")
            ))),
        }
    }

    fn api_key(&self) -> Option<String> {
        self.get()
    }
}

pub(crate) fn key_from_env() -> Option<String> {
    API_KEY_VARS
        .iter()
        .filter_map(|name| env::var(name).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_reports_selection() {
        let store = KeyStore::new();
        assert!(!store.has_selected_credential().await);

        store.set_key("  abc123  ");
        assert!(store.has_selected_credential().await);
        assert_eq!(store.api_key().as_deref(), Some("abc123"));
    }

    #[test]
    fn blank_key_counts_as_none() {
        let store = KeyStore::with_key("   ");
        assert_eq!(store.get(), None);
    }

    #[test]
    fn clones_share_the_slot() {
        let store = KeyStore::new();
        let shared = store.clone();
        store.set_key("k1");
        assert_eq!(shared.get().as_deref(), Some("k1"));
        shared.clear();
        assert_eq!(store.get(), None);
    }

    #[test]
    fn status_confirmation() {
        assert!(CredentialStatus::Confirmed.is_confirmed());
        assert!(!CredentialStatus::Missing.is_confirmed());
        assert!(!CredentialStatus::Unknown.is_confirmed());
    }
}
