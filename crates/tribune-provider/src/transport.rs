//! HTTP seam shared by the provider clients.
//!
//! Clients build an [`HttpRequest`] and hand it to an [`HttpTransport`].
//! Production uses [`ReqwestTransport`]; tests substitute scripted fakes.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use tribune_core::config::ChatProviderConfig;
use tribune_core::error::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A provider request, independent of the HTTP library.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            query: Vec::new(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: Some(body),
        }
    }

    pub fn query(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query.push((name.to_string(), value.into()));
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {}", token))
    }

    /// Value of a query parameter, if present.
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Status and raw body of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends provider requests.
///
/// Any HTTP status, success or not, is a completed exchange. `Err` is
/// reserved for transport failures and carries `NETWORK_ERROR`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ProviderError>;
}

/// [`HttpTransport`] backed by a shared `reqwest` client with explicit
/// request and connect timeouts.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(request_timeout: Duration, connect_timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| ProviderError::unknown(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn from_config(config: &ChatProviderConfig) -> Result<Self, ProviderError> {
        Self::new(
            Duration::from_secs(config.request_timeout_secs),
            Duration::from_secs(config.connect_timeout_secs),
        )
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ProviderError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ProviderError::network(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("Failed to read body: {}", e)))?;
        Ok(HttpResponse { status, body })
    }
}

// ---------------------------------------------------------------------------
// MockTransport - scripted responses for tests and offline demos
// ---------------------------------------------------------------------------

/// Scripted [`HttpTransport`] that records every request it receives.
///
/// Routes are matched in registration order by URL substring. A request with
/// no matching route fails with `NETWORK_ERROR`.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<Vec<(String, Result<HttpResponse, ProviderError>)>>,
    requests: Mutex<Vec<HttpRequest>>,
    delay: Option<Duration>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests whose URL contains `url_fragment`.
    pub fn respond(self, url_fragment: &str, status: u16, body: impl Into<String>) -> Self {
        self.route(url_fragment, Ok(HttpResponse::new(status, body)))
    }

    /// Fail requests whose URL contains `url_fragment`.
    pub fn fail(self, url_fragment: &str, error: ProviderError) -> Self {
        self.route(url_fragment, Err(error))
    }

    /// Sleep before answering, to exercise cancellation and timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn route(self, url_fragment: &str, outcome: Result<HttpResponse, ProviderError>) -> Self {
        if let Ok(mut routes) = self.routes.lock() {
            routes.push((url_fragment.to_string(), outcome));
        }
        self
    }

    /// Number of requests received so far.
    pub fn calls(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ProviderError> {
        let outcome = self
            .routes
            .lock()
            .ok()
            .and_then(|routes| {
                routes
                    .iter()
                    .find(|(fragment, _)| request.url.contains(fragment.as_str()))
                    .map(|(_, outcome)| outcome.clone())
            })
            .unwrap_or_else(|| Err(ProviderError::network(format!("no route for {}", request.url))));

        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        outcome
    }
}
