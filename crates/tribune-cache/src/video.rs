//! Search-result and video-detail caches used by the video services.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tribune_core::config::VideoProviderConfig;
use tribune_core::types::{VideoDetail, VideoSummary};

use crate::bounded::BoundedMap;
use crate::normalize::normalize;

/// Two independent stores: search results by normalized query, details by
/// video id. Each has its own optional bound.
#[derive(Debug)]
pub struct VideoCache {
    searches: Mutex<BoundedMap<Vec<VideoSummary>>>,
    details: Mutex<BoundedMap<VideoDetail>>,
}

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl VideoCache {
    pub fn new(search_capacity: Option<usize>, detail_capacity: Option<usize>) -> Self {
        Self {
            searches: Mutex::new(BoundedMap::new(search_capacity)),
            details: Mutex::new(BoundedMap::new(detail_capacity)),
        }
    }

    pub fn from_config(config: &VideoProviderConfig) -> Self {
        Self::new(config.search_cache_capacity, config.detail_cache_capacity)
    }

    pub fn get_search(&self, query: &str) -> Option<Vec<VideoSummary>> {
        guard(&self.searches).get(&normalize(query)).cloned()
    }

    pub fn put_search(&self, query: &str, results: Vec<VideoSummary>) {
        guard(&self.searches).insert(normalize(query), results);
    }

    /// Video ids are case-sensitive and used verbatim.
    pub fn get_detail(&self, video_id: &str) -> Option<VideoDetail> {
        guard(&self.details).get(video_id).cloned()
    }

    pub fn put_detail(&self, video_id: &str, detail: VideoDetail) {
        guard(&self.details).insert(video_id.to_string(), detail);
    }

    pub fn search_len(&self) -> usize {
        guard(&self.searches).len()
    }

    pub fn detail_len(&self) -> usize {
        guard(&self.details).len()
    }

    pub fn clear(&self) {
        guard(&self.searches).clear();
        guard(&self.details).clear();
    }
}

impl Default for VideoCache {
    fn default() -> Self {
        Self::new(None, None)
    }
}
