//! Team-roster composition collaborator.

use std::sync::Arc;

use async_trait::async_trait;

use tribune_core::error::ProviderError;
use tribune_core::types::ApiKeys;
use tribune_provider::chat::{ChatCompletionClient, PromptVariant};

/// Builds a team proposal from the user's request.
#[async_trait]
pub trait TeamComposer: Send + Sync {
    async fn compose(&self, keys: &ApiKeys, request: &str) -> Result<String, ProviderError>;
}

/// [`TeamComposer`] that asks the chat provider for a structured plan.
pub struct ChatTeamComposer {
    client: Arc<ChatCompletionClient>,
}

impl ChatTeamComposer {
    pub fn new(client: Arc<ChatCompletionClient>) -> Self {
        Self { client }
    }
}

pub(crate) fn team_prompt(request: &str) -> String {
    format!(
        "Un responsable du MRC souhaite constituer une équipe : \"{}\"\n\
         Propose une composition avec les rôles (coordination, communication, mobilisation, \
         logistique, trésorerie), le profil attendu pour chaque rôle et une première feuille \
         de route.",
        request.trim()
    )
}

#[async_trait]
impl TeamComposer for ChatTeamComposer {
    async fn compose(&self, keys: &ApiKeys, request: &str) -> Result<String, ProviderError> {
        Ok(self
            .client
            .complete_prompt(
                keys.chat(),
                request,
                &team_prompt(request),
                PromptVariant::CourseGeneration,
            )
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tribune_cache::ResponseCache;
    use tribune_core::config::ChatProviderConfig;
    use tribune_core::connectivity::ConnectivityMonitor;
    use tribune_provider::transport::MockTransport;

    #[tokio::test]
    async fn test_chat_composer_uses_course_variant() {
        let body = serde_json::json!({"choices": [{"message": {"content": "Équipe proposée"}}]})
            .to_string();
        let mock = Arc::new(MockTransport::new().respond("chat", 200, body));
        let config = ChatProviderConfig {
            endpoint: "https://chat.test/v1".to_string(),
            ..ChatProviderConfig::default()
        };
        let client = Arc::new(ChatCompletionClient::new(
            &config,
            mock.clone(),
            Arc::new(ResponseCache::default()),
            Arc::new(ConnectivityMonitor::new(true)),
        ));
        let keys = ApiKeys {
            chat_provider_key: Some("sk".to_string()),
            video_provider_key: None,
        };

        let answer = ChatTeamComposer::new(client)
            .compose(&keys, "une équipe pour Douala")
            .await
            .unwrap();
        assert_eq!(answer, "Équipe proposée");
        let body = mock.requests()[0].body.clone().unwrap();
        assert_eq!(body["max_tokens"], PromptVariant::CourseGeneration.max_tokens());
        assert!(body["messages"][1]["content"]
            .as_str()
            .unwrap()
            .contains("une équipe pour Douala"));
    }
}
