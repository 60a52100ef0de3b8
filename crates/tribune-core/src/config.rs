use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;

/// Default number of distinct questions kept in the response cache.
pub const DEFAULT_RESPONSE_CACHE_CAPACITY: usize = 50;

/// Default minimum share of query words that must appear in a cached key
/// for a fuzzy hit. The comparison is strict (`>`).
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.5;

/// Words shorter than this are ignored by fuzzy matching.
pub const DEFAULT_MIN_SIGNIFICANT_WORD_LEN: usize = 4;

/// Default coalescing window for conversation and cache writes.
pub const DEFAULT_PERSIST_DEBOUNCE_MS: u64 = 500;

/// Top-level configuration for the Tribune assistant.
///
/// Loaded from `~/.tribune/config.toml` by default. Each section corresponds
/// to one subsystem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TribuneConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub chat: ChatProviderConfig,
    #[serde(default)]
    pub video: VideoProviderConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
    #[serde(default)]
    pub connectivity: ConnectivityConfig,
}

impl TribuneConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TribuneConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Resolve `general.data_dir`, expanding a leading `~/`.
    pub fn data_dir(&self) -> PathBuf {
        expand_home(&self.general.data_dir)
    }
}

/// Expand `~` to the home directory in a path string.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(rest)
    } else {
        PathBuf::from(path)
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding the SQLite state database.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.tribune/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Chat-completion provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatProviderConfig {
    /// Full URL of the chat-completions endpoint.
    pub endpoint: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for ChatProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            request_timeout_secs: 60,
            connect_timeout_secs: 10,
        }
    }
}

/// Video platform provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoProviderConfig {
    /// Base URL of the video data API (no trailing slash).
    pub api_base: String,
    /// `maxResults` sent with search requests.
    pub max_results: u32,
    /// Bound on cached search result lists. `None` means unbounded.
    pub search_cache_capacity: Option<usize>,
    /// Bound on cached video details. `None` means unbounded.
    pub detail_cache_capacity: Option<usize>,
}

impl Default for VideoProviderConfig {
    fn default() -> Self {
        Self {
            api_base: "https://www.googleapis.com/youtube/v3".to_string(),
            max_results: 5,
            search_cache_capacity: None,
            detail_cache_capacity: None,
        }
    }
}

/// Offline response cache tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum distinct normalized questions retained.
    pub response_capacity: usize,
    /// Share of significant query words a cached key must contain.
    pub fuzzy_threshold: f64,
    /// Minimum character length of a significant word.
    pub min_significant_word_len: usize,
    /// Cache changes within this window are written once.
    pub persist_debounce_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            response_capacity: DEFAULT_RESPONSE_CACHE_CAPACITY,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            min_significant_word_len: DEFAULT_MIN_SIGNIFICANT_WORD_LEN,
            persist_debounce_ms: DEFAULT_PERSIST_DEBOUNCE_MS,
        }
    }
}

/// Conversation log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Writes within this window are coalesced into one.
    pub persist_debounce_ms: u64,
    /// Assistant greeting seeded into a fresh or cleared log.
    pub greeting: String,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            persist_debounce_ms: DEFAULT_PERSIST_DEBOUNCE_MS,
            greeting: "Bonjour ! Je suis l'assistant du MRC. Posez-moi vos questions sur le \
                       parti, son programme, vos résultats de quiz ou demandez une vidéo."
                .to_string(),
        }
    }
}

/// Connectivity probe settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    /// URL requested to decide whether the device is online.
    pub probe_url: String,
    /// Seconds between probes.
    pub probe_interval_secs: u64,
    /// Timeout of a single probe.
    pub probe_timeout_secs: u64,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_url: "https://www.google.com/generate_204".to_string(),
            probe_interval_secs: 30,
            probe_timeout_secs: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_carry_named_constants() {
        let config = TribuneConfig::default();
        assert_eq!(config.cache.response_capacity, 50);
        assert!((config.cache.fuzzy_threshold - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.cache.min_significant_word_len, 4);
        assert_eq!(config.conversation.persist_debounce_ms, 500);
        assert!(config.video.search_cache_capacity.is_none());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let toml_str = r#"
            [cache]
            response_capacity = 10

            [video]
            max_results = 8
        "#;
        let config: TribuneConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.cache.response_capacity, 10);
        assert!((config.cache.fuzzy_threshold - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.video.max_results, 8);
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[chat]\nmodel = \"local-model\"\n\n[video]\ndetail_cache_capacity = 20\n",
        )
        .unwrap();

        let loaded = TribuneConfig::load(&path).unwrap();
        assert_eq!(loaded.chat.model, "local-model");
        assert_eq!(loaded.video.detail_cache_capacity, Some(20));
        assert_eq!(loaded.cache.persist_debounce_ms, DEFAULT_PERSIST_DEBOUNCE_MS);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = TribuneConfig::load_or_default(&dir.path().join("absent.toml"));
        assert_eq!(config.cache.response_capacity, DEFAULT_RESPONSE_CACHE_CAPACITY);
    }

    #[test]
    fn test_load_or_default_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "cache = [[[").unwrap();
        let config = TribuneConfig::load_or_default(&path);
        assert_eq!(config.general.data_dir, "~/.tribune/data");
    }

    #[test]
    fn test_expand_home_leaves_absolute_paths() {
        assert_eq!(expand_home("/var/lib/tribune"), PathBuf::from("/var/lib/tribune"));
    }
}
