//! CLI argument definitions for the Tribune assistant.
//!
//! Priority resolution: CLI args > env vars > config file or stored
//! settings > defaults.

use clap::Parser;
use std::path::PathBuf;

use tribune_core::types::ApiKeys;

/// Tribune - a resilient chat assistant for MRC members.
#[derive(Parser, Debug, Default)]
#[command(name = "tribune", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Directory holding the state database.
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Start offline and skip connectivity probes.
    #[arg(long = "offline")]
    pub offline: bool,

    /// Chat provider API key.
    #[arg(long = "chat-key")]
    pub chat_key: Option<String>,

    /// Video provider API key.
    #[arg(long = "video-key")]
    pub video_key: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > TRIBUNE_CONFIG env var > ~/.tribune/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("TRIBUNE_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Priority: --data-dir flag > config file value.
    pub fn resolve_data_dir(&self) -> Option<String> {
        self.data_dir
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
    }

    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }

    /// Provider keys. Priority: flags > TRIBUNE_CHAT_KEY / TRIBUNE_VIDEO_KEY
    /// env vars > keys stored by the settings screen.
    pub fn resolve_api_keys(&self, stored: &ApiKeys) -> ApiKeys {
        let from_env = ApiKeys {
            chat_provider_key: std::env::var("TRIBUNE_CHAT_KEY").ok(),
            video_provider_key: std::env::var("TRIBUNE_VIDEO_KEY").ok(),
        };
        let from_flags = ApiKeys {
            chat_provider_key: self.chat_key.clone(),
            video_provider_key: self.video_key.clone(),
        };
        stored.merged_with(&from_env).merged_with(&from_flags)
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".tribune").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".tribune").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let args = CliArgs::parse_from([
            "tribune",
            "--offline",
            "--chat-key",
            "sk-1",
            "-l",
            "debug",
            "-d",
            "/tmp/tribune",
        ]);
        assert!(args.offline);
        assert_eq!(args.chat_key.as_deref(), Some("sk-1"));
        assert_eq!(args.resolve_log_level("info"), "debug");
        assert_eq!(args.resolve_data_dir().as_deref(), Some("/tmp/tribune"));
    }

    #[test]
    fn test_config_flag_wins() {
        let args = CliArgs::parse_from(["tribune", "--config", "/etc/tribune.toml"]);
        assert_eq!(args.resolve_config_path(), PathBuf::from("/etc/tribune.toml"));
    }

    #[test]
    fn test_log_level_falls_back_to_config() {
        let args = CliArgs::default();
        assert_eq!(args.resolve_log_level("warn"), "warn");
        assert!(args.resolve_data_dir().is_none());
    }

    #[test]
    fn test_flag_keys_override_stored() {
        let stored = ApiKeys {
            chat_provider_key: Some("stored-chat".to_string()),
            video_provider_key: Some("stored-video".to_string()),
        };
        let args = CliArgs {
            video_key: Some("flag-video".to_string()),
            ..CliArgs::default()
        };
        let keys = args.resolve_api_keys(&stored);
        assert_eq!(keys.video(), Some("flag-video"));
        assert!(keys.chat().is_some());
    }
}
