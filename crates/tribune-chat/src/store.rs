//! Conversation log ownership and persistence.
//!
//! Appends are synchronous and visible immediately. Writes to the
//! [`StateStore`] happen on a background task that waits for the debounce
//! window to pass, so a burst of changes produces a single write.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::{broadcast, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use tribune_core::config::ConversationConfig;
use tribune_core::error::{ErrorKind, TribuneError};
use tribune_core::types::{now_millis, Message, MessageMetadata, MessageSource, Role};
use tribune_storage::state::{StateStore, CONVERSATION_KEY};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Change events delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationChange {
    Appended(Message),
    Cleared,
    /// The log was replaced by `n` persisted messages.
    Loaded(usize),
}

struct Inner {
    log: Mutex<Vec<Message>>,
    state: Arc<dyn StateStore>,
    greeting: String,
    dirty: AtomicBool,
    wake: Notify,
    changes: broadcast::Sender<ConversationChange>,
}

impl Inner {
    fn log(&self) -> MutexGuard<'_, Vec<Message>> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
        self.wake.notify_one();
    }

    fn persist_if_dirty(&self) {
        if self.dirty.swap(false, Ordering::AcqRel) {
            if let Err(e) = self.persist() {
                warn!(kind = %ErrorKind::CacheError, error = %e, "Failed to persist conversation");
            }
        }
    }

    fn persist(&self) -> Result<(), TribuneError> {
        let json = serde_json::to_string(&*self.log())?;
        self.state.write(CONVERSATION_KEY, &json)?;
        debug!(bytes = json.len(), "Conversation persisted");
        Ok(())
    }
}

/// Owns the ordered message log.
pub struct ConversationStore {
    inner: Arc<Inner>,
    shutdown: CancellationToken,
}

impl ConversationStore {
    /// Create a store seeded with the configured greeting and start its
    /// background writer. Must be called inside a tokio runtime.
    pub fn new(state: Arc<dyn StateStore>, config: &ConversationConfig) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let inner = Arc::new(Inner {
            log: Mutex::new(vec![Message::assistant(config.greeting.clone())]),
            state,
            greeting: config.greeting.clone(),
            dirty: AtomicBool::new(false),
            wake: Notify::new(),
            changes,
        });
        let shutdown = CancellationToken::new();
        spawn_writer(
            Arc::clone(&inner),
            Duration::from_millis(config.persist_debounce_ms),
            shutdown.clone(),
        );
        Self { inner, shutdown }
    }

    /// Append a message. Returns once the message is in the log.
    pub fn append(&self, message: Message) {
        self.inner.log().push(message.clone());
        self.inner.mark_dirty();
        let _ = self.inner.changes.send(ConversationChange::Appended(message));
    }

    /// Reset the log to the single seeded greeting.
    pub fn clear(&self) {
        *self.inner.log() = vec![Message::assistant(self.inner.greeting.clone())];
        self.inner.mark_dirty();
        let _ = self.inner.changes.send(ConversationChange::Cleared);
        info!("Conversation cleared");
    }

    /// Replace the log with the persisted one. An absent or empty log
    /// leaves the seeded greeting in place.
    pub fn load(&self) -> Result<usize, TribuneError> {
        let Some(raw) = self.inner.state.read(CONVERSATION_KEY)? else {
            return Ok(self.len());
        };
        let messages = parse_log(&raw)?;
        if messages.is_empty() {
            return Ok(self.len());
        }
        let count = messages.len();
        *self.inner.log() = messages;
        let _ = self.inner.changes.send(ConversationChange::Loaded(count));
        info!(count, "Conversation loaded");
        Ok(count)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConversationChange> {
        self.inner.changes.subscribe()
    }

    /// Write immediately, bypassing the debounce window.
    pub fn flush(&self) -> Result<(), TribuneError> {
        self.inner.dirty.store(false, Ordering::Release);
        self.inner.persist()
    }

    /// Copy of the log, for read-only collaborators such as export.
    pub fn snapshot(&self) -> Vec<Message> {
        self.inner.log().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.log().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.log().is_empty()
    }

    pub fn last(&self) -> Option<Message> {
        self.inner.log().last().cloned()
    }
}

impl Drop for ConversationStore {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.inner.persist_if_dirty();
    }
}

fn spawn_writer(inner: Arc<Inner>, debounce: Duration, shutdown: CancellationToken) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = inner.wake.notified() => {}
            }
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(debounce) => {}
            }
            inner.persist_if_dirty();
        }
        debug!("Conversation writer stopped");
    });
}

/// Parse a persisted log, tolerating timestamp format drift.
fn parse_log(raw: &str) -> Result<Vec<Message>, TribuneError> {
    let entries: Vec<Value> = serde_json::from_str(raw)?;
    Ok(entries.iter().filter_map(parse_message).collect())
}

fn parse_message(entry: &Value) -> Option<Message> {
    let role: Role = serde_json::from_value(entry.get("role")?.clone()).ok()?;
    let content = entry.get("content")?.as_str()?.to_string();
    Some(Message {
        id: entry
            .get("id")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4),
        role,
        content,
        timestamp: entry
            .get("timestamp")
            .and_then(parse_timestamp)
            .unwrap_or_else(now_millis),
        source: entry
            .get("source")
            .and_then(|v| serde_json::from_value::<MessageSource>(v.clone()).ok()),
        metadata: entry
            .get("metadata")
            .and_then(|v| serde_json::from_value::<MessageMetadata>(v.clone()).ok()),
    })
}

/// RFC 3339 text or integer epoch milliseconds.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}
