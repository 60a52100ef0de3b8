pub mod config;
pub mod connectivity;
pub mod error;
pub mod events;
pub mod types;

pub use config::TribuneConfig;
pub use connectivity::ConnectivityMonitor;
pub use error::{ErrorKind, ProviderError, Result, TribuneError};
pub use events::{ChannelNotifier, Notification, Notifier, Severity, TracingNotifier};
pub use types::*;
