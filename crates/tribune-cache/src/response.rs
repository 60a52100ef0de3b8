//! Offline question/answer cache with exact and fuzzy lookup.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tracing::debug;

use tribune_core::config::{
    CacheConfig, DEFAULT_FUZZY_THRESHOLD, DEFAULT_MIN_SIGNIFICANT_WORD_LEN,
    DEFAULT_RESPONSE_CACHE_CAPACITY,
};
use tribune_core::error::TribuneError;
use tribune_storage::{StateStore, RESPONSE_CACHE_KEY};

use crate::bounded::BoundedMap;
use crate::normalize::{normalize, significant_words};

/// How a cached answer was found.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CacheMatch {
    Exact,
    /// Share of the query's significant words present in the cached key.
    Fuzzy { score: f64 },
}

/// A cached answer and how it matched.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit {
    pub key: String,
    pub answer: String,
    pub matched: CacheMatch,
}

/// Bounded map from normalized question to provider answer.
///
/// Shared by reference between the services that read and write it; there
/// is no process-wide instance.
#[derive(Debug)]
pub struct ResponseCache {
    entries: Mutex<BoundedMap<String>>,
    fuzzy_threshold: f64,
    min_word_len: usize,
    /// Set by every change since the last persist.
    dirty: AtomicBool,
    changed: Notify,
}

impl ResponseCache {
    pub fn new(capacity: usize, fuzzy_threshold: f64, min_word_len: usize) -> Self {
        Self {
            entries: Mutex::new(BoundedMap::new(Some(capacity))),
            fuzzy_threshold,
            min_word_len,
            dirty: AtomicBool::new(false),
            changed: Notify::new(),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(
            config.response_capacity,
            config.fuzzy_threshold,
            config.min_significant_word_len,
        )
    }

    fn entries(&self) -> MutexGuard<'_, BoundedMap<String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
        self.changed.notify_one();
    }

    /// Resolves after the next change to the cache.
    pub(crate) async fn changed(&self) {
        self.changed.notified().await;
    }

    /// Whether the cache changed since it was last persisted.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Store `answer` under `normalize(question)`, evicting the
    /// oldest-inserted key if the bound is exceeded.
    pub fn insert(&self, question: &str, answer: impl Into<String>) {
        let key = normalize(question);
        if key.is_empty() {
            return;
        }
        let evicted = self.entries().insert(key, answer.into());
        for old in evicted {
            debug!(key = %old, "Response cache evicted oldest entry");
        }
        self.mark_dirty();
    }

    /// Exact lookup on the normalized question.
    pub fn get_exact(&self, question: &str) -> Option<String> {
        self.entries().get(&normalize(question)).cloned()
    }

    /// Best fuzzy match for the question, if it clears the threshold.
    ///
    /// For each cached key, the score is the share of the query's
    /// significant words found among the key's words. The best score must be
    /// strictly above the threshold with at least one shared word. Ties go to
    /// the older entry.
    pub fn get_fuzzy(&self, question: &str) -> Option<CacheHit> {
        let normalized = normalize(question);
        let query_words = significant_words(&normalized, self.min_word_len);
        if query_words.is_empty() {
            return None;
        }

        let entries = self.entries();
        let mut best: Option<(f64, &str, &String)> = None;
        for (key, answer) in entries.iter() {
            let key_words: HashSet<&str> = key.split_whitespace().collect();
            let matches = query_words.iter().filter(|w| key_words.contains(*w)).count();
            if matches == 0 {
                continue;
            }
            let score = matches as f64 / query_words.len() as f64;
            if best.map_or(true, |(top, _, _)| score > top) {
                best = Some((score, key, answer));
            }
        }

        best.filter(|(score, _, _)| *score > self.fuzzy_threshold)
            .map(|(score, key, answer)| CacheHit {
                key: key.to_string(),
                answer: answer.clone(),
                matched: CacheMatch::Fuzzy { score },
            })
    }

    /// Exact lookup, then fuzzy lookup.
    pub fn lookup(&self, question: &str) -> Option<CacheHit> {
        let key = normalize(question);
        if let Some(answer) = self.entries().get(&key).cloned() {
            return Some(CacheHit {
                key,
                answer,
                matched: CacheMatch::Exact,
            });
        }
        self.get_fuzzy(question)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Keys from oldest to newest insertion.
    pub fn keys(&self) -> Vec<String> {
        self.entries().iter().map(|(k, _)| k.to_string()).collect()
    }

    pub fn clear(&self) {
        self.entries().clear();
        self.mark_dirty();
    }

    /// Merge the persisted cache into this one. Returns the number of
    /// entries read.
    pub fn load_from(&self, store: &dyn StateStore) -> Result<usize, TribuneError> {
        let Some(raw) = store.read(RESPONSE_CACHE_KEY)? else {
            return Ok(0);
        };
        let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&raw)?;
        let mut entries = self.entries();
        let mut loaded = 0;
        for (key, value) in object {
            if let serde_json::Value::String(answer) = value {
                entries.insert(key, answer);
                loaded += 1;
            }
        }
        debug!(loaded, "Response cache restored");
        Ok(loaded)
    }

    /// Write the cache as one JSON object in insertion order.
    pub fn persist_to(&self, store: &dyn StateStore) -> Result<(), TribuneError> {
        self.dirty.store(false, Ordering::Release);
        let object: serde_json::Map<String, serde_json::Value> = self
            .entries()
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.clone())))
            .collect();
        let raw = serde_json::to_string(&object)?;
        if let Err(e) = store.write(RESPONSE_CACHE_KEY, &raw) {
            self.dirty.store(true, Ordering::Release);
            return Err(e);
        }
        debug!(entries = object.len(), "Response cache persisted");
        Ok(())
    }

    /// Persist only if something changed since the last write.
    pub fn persist_if_dirty(&self, store: &dyn StateStore) -> Result<bool, TribuneError> {
        if !self.is_dirty() {
            return Ok(false);
        }
        self.persist_to(store)?;
        Ok(true)
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(
            DEFAULT_RESPONSE_CACHE_CAPACITY,
            DEFAULT_FUZZY_THRESHOLD,
            DEFAULT_MIN_SIGNIFICANT_WORD_LEN,
        )
    }
}
