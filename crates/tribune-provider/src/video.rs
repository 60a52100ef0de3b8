//! Video platform search and detail lookup.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use tribune_cache::VideoCache;
use tribune_core::config::VideoProviderConfig;
use tribune_core::connectivity::ConnectivityMonitor;
use tribune_core::error::{ErrorKind, ProviderError};
use tribune_core::types::{VideoDetail, VideoSummary};

use crate::offline::{offline_detail, offline_videos, placeholder_detail, TRANSCRIPT_PLACEHOLDER};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

#[derive(Debug, Default, Deserialize)]
struct ListResponse {
    #[serde(default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    id: Option<ItemId>,
    #[serde(default)]
    snippet: Snippet,
}

/// Search items carry an object id, detail items a bare string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ItemId {
    Object {
        #[serde(rename = "videoId")]
        video_id: Option<String>,
    },
    Plain(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    published_at: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

impl Thumbnails {
    fn best_url(&self) -> String {
        [&self.high, &self.medium, &self.default]
            .into_iter()
            .flatten()
            .map(|t| t.url.clone())
            .next()
            .unwrap_or_default()
    }
}

/// Provider-supplied error text (`error.message`), or the raw body.
pub(crate) fn provider_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

fn map_status(response: &HttpResponse) -> ProviderError {
    let message = provider_message(&response.body);
    match response.status {
        403 => ProviderError::new(ErrorKind::QuotaExceeded, message),
        400 => ProviderError::new(ErrorKind::InvalidApiKey, message),
        status => ProviderError::new(ErrorKind::ApiError, format!("({}) {}", status, message)),
    }
}

fn parse_list(body: &str) -> Result<ListResponse, ProviderError> {
    serde_json::from_str(body)
        .map_err(|e| ProviderError::unknown(format!("Unrecognized video response: {}", e)))
}

fn usable_key(api_key: Option<&str>) -> Result<&str, ProviderError> {
    api_key
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ProviderError::new(ErrorKind::InvalidApiKey, "Video API key is not configured"))
}

/// Finds videos for a free-text query.
pub struct VideoSearchService {
    transport: Arc<dyn HttpTransport>,
    cache: Arc<VideoCache>,
    connectivity: Arc<ConnectivityMonitor>,
    api_base: String,
    max_results: u32,
}

impl VideoSearchService {
    pub fn new(
        config: &VideoProviderConfig,
        transport: Arc<dyn HttpTransport>,
        cache: Arc<VideoCache>,
        connectivity: Arc<ConnectivityMonitor>,
    ) -> Self {
        Self {
            transport,
            cache,
            connectivity,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            max_results: config.max_results,
        }
    }

    /// Search the platform. Offline, the fixed offline dataset is returned
    /// without touching the cache or the network.
    pub async fn search(
        &self,
        api_key: Option<&str>,
        query: &str,
    ) -> Result<Vec<VideoSummary>, ProviderError> {
        if !self.connectivity.is_online() {
            debug!("Offline: serving offline video dataset");
            return Ok(offline_videos());
        }
        if let Some(cached) = self.cache.get_search(query) {
            debug!(query, results = cached.len(), "Video search cache hit");
            return Ok(cached);
        }
        let key = usable_key(api_key)?;

        let request = HttpRequest::get(format!("{}/search", self.api_base))
            .query("part", "snippet")
            .query("q", query)
            .query("maxResults", self.max_results.to_string())
            .query("type", "video")
            .query("key", key);
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            let err = map_status(&response);
            warn!(kind = %err.kind, status = response.status, "Video search failed");
            return Err(err);
        }

        let results: Vec<VideoSummary> = parse_list(&response.body)?
            .items
            .into_iter()
            .filter_map(|item| {
                let id = match item.id {
                    Some(ItemId::Object { video_id: Some(id) }) => id,
                    _ => return None,
                };
                Some(VideoSummary {
                    id,
                    thumbnail_url: item.snippet.thumbnails.best_url(),
                    title: item.snippet.title,
                    description: item.snippet.description,
                    published_at: item.snippet.published_at,
                })
            })
            .collect();

        info!(query, results = results.len(), "Video search completed");
        self.cache.put_search(query, results.clone());
        Ok(results)
    }
}

/// Fetches the details of one video. Never fails.
pub struct VideoInfoService {
    transport: Arc<dyn HttpTransport>,
    cache: Arc<VideoCache>,
    connectivity: Arc<ConnectivityMonitor>,
    api_base: String,
}

impl VideoInfoService {
    pub fn new(
        config: &VideoProviderConfig,
        transport: Arc<dyn HttpTransport>,
        cache: Arc<VideoCache>,
        connectivity: Arc<ConnectivityMonitor>,
    ) -> Self {
        Self {
            transport,
            cache,
            connectivity,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        }
    }

    pub async fn get_info(&self, api_key: Option<&str>, video_id: &str) -> VideoDetail {
        if let Some(cached) = self.cache.get_detail(video_id) {
            debug!(video_id, "Video detail cache hit");
            return cached;
        }
        if !self.connectivity.is_online() {
            return offline_detail();
        }
        match self.fetch(api_key, video_id).await {
            Ok(detail) => {
                self.cache.put_detail(video_id, detail.clone());
                detail
            }
            Err(e) => {
                warn!(video_id, kind = %e.kind, error = %e.message, "Video detail lookup failed");
                placeholder_detail(e.kind)
            }
        }
    }

    async fn fetch(&self, api_key: Option<&str>, video_id: &str) -> Result<VideoDetail, ProviderError> {
        let key = usable_key(api_key)?;
        let request = HttpRequest::get(format!("{}/videos", self.api_base))
            .query("part", "snippet")
            .query("id", video_id)
            .query("key", key);
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(map_status(&response));
        }
        let item = parse_list(&response.body)?
            .items
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::new(ErrorKind::ApiError, format!("Video {} not found", video_id)))?;
        Ok(VideoDetail {
            title: item.snippet.title,
            description: item.snippet.description,
            transcript: TRANSCRIPT_PLACEHOLDER.to_string(),
        })
    }
}
