//! Chat-completion client with offline degradation.
//!
//! `complete` always resolves to displayable text. When the device is
//! offline, the key is missing or the provider fails, the answer comes from
//! the response cache, then the topical rules, then a generic notice.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use tribune_cache::{normalize, CacheMatch, CacheWriter, ResponseCache};
use tribune_core::config::ChatProviderConfig;
use tribune_core::connectivity::ConnectivityMonitor;
use tribune_core::error::{ErrorKind, ProviderError, TribuneError};
use tribune_storage::StateStore;

use crate::offline::{topical_answer, OFFLINE_GENERIC_ANSWER};
use crate::transport::{HttpRequest, HttpTransport};
use crate::video::provider_message;

/// Fixed instruction prepended to every request.
pub const PERSONA_PROMPT: &str =
    "Tu es l'assistant officiel du Mouvement pour la Renaissance du Cameroun (MRC). \
     Tu réponds en français, avec précision, pédagogie et respect, aux questions sur le \
     parti, son président, son histoire et son programme. Tu aides aussi les militants à \
     progresser dans leur formation.";

/// Request preset: system instruction, temperature and length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptVariant {
    /// Conversational answer.
    General,
    /// Long, structured course or plan.
    CourseGeneration,
    /// Terse extraction of an identifier, no prose.
    IdExtraction,
}

impl PromptVariant {
    pub fn temperature(&self) -> f32 {
        match self {
            PromptVariant::General => 0.7,
            PromptVariant::CourseGeneration => 0.5,
            PromptVariant::IdExtraction => 0.0,
        }
    }

    pub fn max_tokens(&self) -> u32 {
        match self {
            PromptVariant::General => 1000,
            PromptVariant::CourseGeneration => 2000,
            PromptVariant::IdExtraction => 50,
        }
    }

    pub fn system_prompt(&self) -> String {
        match self {
            PromptVariant::General => PERSONA_PROMPT.to_string(),
            PromptVariant::CourseGeneration => format!(
                "{} Structure ta réponse en modules numérotés avec, pour chacun, un objectif, \
                 les notions clés et un exercice pratique.",
                PERSONA_PROMPT
            ),
            PromptVariant::IdExtraction => format!(
                "{} Réponds uniquement par l'identifiant demandé, sans phrase ni ponctuation.",
                PERSONA_PROMPT
            ),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Resilient client for the conversational AI provider.
pub struct ChatCompletionClient {
    transport: Arc<dyn HttpTransport>,
    cache: Arc<ResponseCache>,
    connectivity: Arc<ConnectivityMonitor>,
    endpoint: String,
    model: String,
    writer: Option<CacheWriter>,
}

impl ChatCompletionClient {
    pub fn new(
        config: &ChatProviderConfig,
        transport: Arc<dyn HttpTransport>,
        cache: Arc<ResponseCache>,
        connectivity: Arc<ConnectivityMonitor>,
    ) -> Self {
        Self {
            transport,
            cache,
            connectivity,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            writer: None,
        }
    }

    /// Persist cached answers to `state` once changes have been quiet for
    /// `debounce`, and on drop. Must be called inside a tokio runtime.
    pub fn with_persistence(mut self, state: Arc<dyn StateStore>, debounce: Duration) -> Self {
        self.writer = Some(CacheWriter::spawn(Arc::clone(&self.cache), state, debounce));
        self
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Write pending cache changes now. A no-op without persistence.
    pub fn flush_cache(&self) -> Result<(), TribuneError> {
        match &self.writer {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }

    /// Answer `user_text`. Never fails.
    pub async fn complete(
        &self,
        api_key: Option<&str>,
        user_text: &str,
        variant: PromptVariant,
    ) -> String {
        self.complete_prompt(api_key, user_text, user_text, variant).await
    }

    /// Send a composed `prompt`, caching the answer under `question` and
    /// falling back on `question` when the provider cannot be used.
    pub async fn complete_prompt(
        &self,
        api_key: Option<&str>,
        question: &str,
        prompt: &str,
        variant: PromptVariant,
    ) -> String {
        if !self.connectivity.is_online() {
            debug!("Offline: answering from cache");
            return self.offline_answer(question);
        }
        let Some(key) = api_key.map(str::trim).filter(|k| !k.is_empty()) else {
            debug!("No chat key: answering from cache");
            return self.offline_answer(question);
        };

        match self.request(key, prompt, variant).await {
            Ok(answer) => {
                self.cache.insert(question, answer.clone());
                info!(variant = ?variant, chars = answer.len(), "Chat completion received");
                answer
            }
            Err(e) => {
                warn!(kind = %e.kind, error = %e.message, "Chat completion failed, using offline answer");
                self.offline_answer(question)
            }
        }
    }

    /// Send one request and extract the first choice.
    pub async fn request(
        &self,
        api_key: &str,
        user_text: &str,
        variant: PromptVariant,
    ) -> Result<String, ProviderError> {
        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: variant.system_prompt(),
                },
                ChatMessage {
                    role: "user",
                    content: user_text.to_string(),
                },
            ],
            temperature: variant.temperature(),
            max_tokens: variant.max_tokens(),
        };
        let body = serde_json::to_value(&body)
            .map_err(|e| ProviderError::unknown(format!("Failed to encode request: {}", e)))?;

        let response = self
            .transport
            .send(HttpRequest::post_json(&self.endpoint, body).bearer(api_key))
            .await?;

        if !response.is_success() {
            let kind = match response.status {
                401 | 403 => ErrorKind::InvalidApiKey,
                429 => ErrorKind::QuotaExceeded,
                _ => ErrorKind::ApiError,
            };
            return Err(ProviderError::new(
                kind,
                format!("({}) {}", response.status, provider_message(&response.body)),
            ));
        }

        let completion: ChatCompletionResponse = serde_json::from_str(&response.body)
            .map_err(|e| ProviderError::unknown(format!("Unreadable completion: {}", e)))?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ProviderError::unknown("No response from chat provider"))
    }

    /// Best answer available without the provider.
    pub fn offline_answer(&self, text: &str) -> String {
        if let Some(hit) = self.cache.lookup(text) {
            match hit.matched {
                CacheMatch::Exact => debug!(key = %hit.key, "Offline answer: exact cache hit"),
                CacheMatch::Fuzzy { score } => {
                    debug!(key = %hit.key, score, "Offline answer: fuzzy cache hit")
                }
            }
            return hit.answer;
        }
        if let Some(answer) = topical_answer(&normalize(text)) {
            debug!("Offline answer: topical rule");
            return answer.to_string();
        }
        OFFLINE_GENERIC_ANSWER.to_string()
    }
}
