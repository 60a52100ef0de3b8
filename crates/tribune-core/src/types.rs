use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Author of a conversation message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Which provider produced an assistant message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageSource {
    /// Built from video platform data.
    Youtube,
    /// Returned by the chat-completion provider (or its offline fallback).
    ChatProvider,
}

/// Classified purpose of a user message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Intent {
    /// The user shares quiz scores and wants coaching.
    QuizAnalysis,
    /// The user wants a team or roster composed.
    TeamGeneration,
    /// The user wants to find or watch a video.
    VideoRequest,
    /// Anything else.
    GeneralQuery,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::QuizAnalysis => "quiz-analysis",
            Intent::TeamGeneration => "team-generation",
            Intent::VideoRequest => "video-request",
            Intent::GeneralQuery => "general-query",
        }
    }
}

// =============================================================================
// Conversation
// =============================================================================

/// Optional video reference attached to an assistant message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_title: Option<String>,
}

/// One entry of the conversation log. Immutable once appended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    /// UTC instant with millisecond precision.
    #[serde(with = "timestamp_millis")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<MessageSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl Message {
    /// Create a message stamped with the current time.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: now_millis(),
            source: None,
            metadata: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn with_source(mut self, source: MessageSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_metadata(mut self, metadata: MessageMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Current UTC time truncated to whole milliseconds.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// RFC 3339 with millisecond precision, the persisted timestamp format.
pub mod timestamp_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Video
// =============================================================================

/// One search result from the video platform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    pub published_at: String,
}

/// Metadata of a single video.
///
/// `transcript` is always a placeholder: transcript extraction is not a
/// supported capability.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetail {
    pub title: String,
    pub description: String,
    pub transcript: String,
}

// =============================================================================
// Settings
// =============================================================================

/// Provider credentials written by the settings collaborator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeys {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_provider_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_provider_key: Option<String>,
}

impl ApiKeys {
    /// Chat key, ignoring blank values.
    pub fn chat(&self) -> Option<&str> {
        non_blank(self.chat_provider_key.as_deref())
    }

    /// Video key, ignoring blank values.
    pub fn video(&self) -> Option<&str> {
        non_blank(self.video_provider_key.as_deref())
    }

    /// Overlay `other` on top of `self`; set fields of `other` win.
    pub fn merged_with(&self, other: &ApiKeys) -> ApiKeys {
        ApiKeys {
            chat_provider_key: other
                .chat()
                .or(self.chat())
                .map(str::to_string),
            video_provider_key: other
                .video()
                .or(self.video())
                .map(str::to_string),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serializes_camel_case_and_millis() {
        let msg = Message::assistant("Voici la vidéo")
            .with_source(MessageSource::Youtube)
            .with_metadata(MessageMetadata {
                video_id: Some("abc123".into()),
                video_title: Some("Meeting".into()),
            });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["source"], "youtube");
        assert_eq!(json["metadata"]["videoId"], "abc123");
        let ts = json["timestamp"].as_str().unwrap();
        assert!(ts.ends_with('Z'));
        // 2024-01-01T00:00:00.000Z
        assert_eq!(ts.len(), 24);
    }

    #[test]
    fn test_message_roundtrip_preserves_timestamp() {
        let msg = Message::user("Bonjour");
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_plain_message_omits_optional_fields() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert!(json.get("source").is_none());
        assert!(json.get("metadata").is_none());
    }

    #[test]
    fn test_intent_kebab_case() {
        assert_eq!(
            serde_json::to_string(&Intent::QuizAnalysis).unwrap(),
            "\"quiz-analysis\""
        );
        assert_eq!(Intent::GeneralQuery.as_str(), "general-query");
    }

    #[test]
    fn test_api_keys_blank_is_absent() {
        let keys: ApiKeys =
            serde_json::from_str(r#"{"chatProviderKey":"  ","videoProviderKey":"yt-key"}"#)
                .unwrap();
        assert_eq!(keys.chat(), None);
        assert_eq!(keys.video(), Some("yt-key"));
    }

    #[test]
    fn test_api_keys_merge_prefers_overlay() {
        let stored = ApiKeys {
            chat_provider_key: Some("stored-chat".into()),
            video_provider_key: Some("stored-video".into()),
        };
        let overlay = ApiKeys {
            chat_provider_key: Some("cli-chat".into()),
            video_provider_key: Some("".into()),
        };
        let merged = stored.merged_with(&overlay);
        assert_eq!(merged.chat(), Some("cli-chat"));
        assert_eq!(merged.video(), Some("stored-video"));
    }
}
