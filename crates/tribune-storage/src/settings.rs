//! Read-only access to provider keys saved by the settings collaborator.

use tracing::warn;

use tribune_core::error::TribuneError;
use tribune_core::types::ApiKeys;

use crate::state::{StateStore, SETTINGS_KEY};

/// Read the stored provider keys.
///
/// A missing entry yields empty keys. A malformed entry is an error so the
/// caller can tell the user their settings are unreadable.
pub fn load_api_keys(store: &dyn StateStore) -> Result<ApiKeys, TribuneError> {
    match store.read(SETTINGS_KEY)? {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(ApiKeys::default()),
    }
}

/// Like [`load_api_keys`], but logs failures and falls back to empty keys.
pub fn load_api_keys_or_default(store: &dyn StateStore) -> ApiKeys {
    load_api_keys(store).unwrap_or_else(|e| {
        warn!(error = %e, kind = %e.kind(), "Stored API keys unreadable");
        ApiKeys::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemoryStateStore;

    #[test]
    fn test_missing_settings_are_empty() {
        let store = MemoryStateStore::new();
        assert_eq!(load_api_keys(&store).unwrap(), ApiKeys::default());
    }

    #[test]
    fn test_reads_camel_case_keys() {
        let store = MemoryStateStore::new();
        store
            .write(
                SETTINGS_KEY,
                r#"{"chatProviderKey":"sk-chat","videoProviderKey":"yt"}"#,
            )
            .unwrap();
        let keys = load_api_keys(&store).unwrap();
        assert_eq!(keys.chat(), Some("sk-chat"));
        assert_eq!(keys.video(), Some("yt"));
    }

    #[test]
    fn test_malformed_settings() {
        let store = MemoryStateStore::new();
        store.write(SETTINGS_KEY, "not json").unwrap();
        assert!(matches!(
            load_api_keys(&store),
            Err(TribuneError::Serialization(_))
        ));
        assert_eq!(load_api_keys_or_default(&store), ApiKeys::default());
    }
}
