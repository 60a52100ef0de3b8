//! Tribune Storage crate - SQLite-backed client state.
//!
//! Provides a WAL-mode SQLite database with migrations and a key/value
//! [`StateStore`] holding the conversation log, the offline response cache
//! and the provider keys written by the settings screen.

pub mod db;
pub mod migrations;
pub mod settings;
pub mod state;

pub use db::Database;
pub use settings::{load_api_keys, load_api_keys_or_default};
pub use state::{
    MemoryStateStore, SqliteStateStore, StateStore, CONVERSATION_KEY, RESPONSE_CACHE_KEY,
    SETTINGS_KEY,
};
