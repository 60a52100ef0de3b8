//! End-to-end scenarios across the chat, provider, cache and storage crates.
//!
//! Each test builds its own services over a scripted transport, so no test
//! touches the network.

use std::sync::Arc;
use std::time::Duration;

use tribune_cache::{ResponseCache, VideoCache};
use tribune_chat::{ChatTeamComposer, ConversationStore, Orchestrator, Outcome, Services};
use tribune_core::config::{
    CacheConfig, ChatProviderConfig, ConversationConfig, VideoProviderConfig,
};
use tribune_core::connectivity::ConnectivityMonitor;
use tribune_core::events::TracingNotifier;
use tribune_core::types::{ApiKeys, Role};
use tribune_provider::chat::ChatCompletionClient;
use tribune_provider::offline::offline_videos;
use tribune_provider::transport::MockTransport;
use tribune_provider::video::{VideoInfoService, VideoSearchService};
use tribune_storage::{
    Database, MemoryStateStore, SqliteStateStore, StateStore, RESPONSE_CACHE_KEY,
};

// =============================================================================
// Helpers
// =============================================================================

struct App {
    orchestrator: Arc<Orchestrator>,
    cache: Arc<ResponseCache>,
    connectivity: Arc<ConnectivityMonitor>,
    mock: Arc<MockTransport>,
}

fn keys(chat: Option<&str>, video: Option<&str>) -> ApiKeys {
    ApiKeys {
        chat_provider_key: chat.map(str::to_string),
        video_provider_key: video.map(str::to_string),
    }
}

fn build(mock: MockTransport, online: bool, keys: ApiKeys, state: Arc<dyn StateStore>) -> App {
    let mock = Arc::new(mock);
    let connectivity = Arc::new(ConnectivityMonitor::new(online));
    let cache = Arc::new(ResponseCache::from_config(&CacheConfig::default()));
    let chat_config = ChatProviderConfig {
        endpoint: "https://chat.test/v1/chat/completions".to_string(),
        ..ChatProviderConfig::default()
    };
    let video_config = VideoProviderConfig {
        api_base: "https://video.test/v3".to_string(),
        ..VideoProviderConfig::default()
    };
    let video_cache = Arc::new(VideoCache::from_config(&video_config));

    let chat = Arc::new(
        ChatCompletionClient::new(
            &chat_config,
            mock.clone(),
            Arc::clone(&cache),
            Arc::clone(&connectivity),
        )
        .with_persistence(Arc::clone(&state), Duration::from_millis(20)),
    );
    let services = Services {
        chat: Arc::clone(&chat),
        search: VideoSearchService::new(
            &video_config,
            mock.clone(),
            Arc::clone(&video_cache),
            Arc::clone(&connectivity),
        ),
        info: VideoInfoService::new(&video_config, mock.clone(), video_cache, Arc::clone(&connectivity)),
        team: Arc::new(ChatTeamComposer::new(chat)),
    };
    let store = Arc::new(ConversationStore::new(state, &ConversationConfig::default()));
    App {
        orchestrator: Arc::new(Orchestrator::new(store, services, Arc::new(TracingNotifier), keys)),
        cache,
        connectivity,
        mock,
    }
}

fn completion(text: &str) -> String {
    serde_json::json!({"choices": [{"message": {"content": text}}]}).to_string()
}

fn search_body() -> String {
    serde_json::json!({
        "items": [
            {"id": {"videoId": "abc"}, "snippet": {"title": "MRC Cameroun", "publishedAt": "2024-01-01T00:00:00Z"}}
        ]
    })
    .to_string()
}

fn reply(outcome: Outcome) -> String {
    match outcome {
        Outcome::Replied(message) => message.content,
        other => panic!("expected a reply, got {:?}", other),
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn offline_programme_question_gets_platform_answer() {
    let app = build(
        MockTransport::new(),
        false,
        keys(Some("sk"), None),
        Arc::new(MemoryStateStore::new()),
    );
    let answer = reply(
        app.orchestrator
            .handle_user_message("Quel est le programme du MRC ?")
            .await
            .unwrap(),
    );
    assert!(answer.starts_with("Le programme du MRC"));
    assert_eq!(app.mock.calls(), 0);
}

#[tokio::test]
async fn repeated_online_search_hits_cache() {
    let app = build(
        MockTransport::new().respond("/search", 200, search_body()),
        true,
        keys(Some("sk"), Some("yt")),
        Arc::new(MemoryStateStore::new()),
    );
    for _ in 0..2 {
        let outcome = app
            .orchestrator
            .handle_user_message("vidéo MRC Cameroun")
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::VideoResults(ref r) if r.len() == 1));
    }
    assert_eq!(app.mock.calls(), 1);
}

#[tokio::test]
async fn offline_search_serves_offline_dataset() {
    let app = build(
        MockTransport::new().respond("/search", 200, search_body()),
        false,
        keys(Some("sk"), Some("yt")),
        Arc::new(MemoryStateStore::new()),
    );
    let outcome = app
        .orchestrator
        .handle_user_message("Montre-moi un discours de Kamto")
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::VideoResults(offline_videos()));
    assert_eq!(app.mock.calls(), 0);
}

#[tokio::test]
async fn chat_500_while_online_still_answers() {
    let app = build(
        MockTransport::new().respond("chat.test", 500, "{\"error\":{\"message\":\"internal\"}}"),
        true,
        keys(Some("sk"), None),
        Arc::new(MemoryStateStore::new()),
    );
    let answer = reply(
        app.orchestrator
            .handle_user_message("Raconte-moi une anecdote")
            .await
            .unwrap(),
    );
    assert!(!answer.is_empty());
    assert_eq!(app.mock.calls(), 1);
}

#[tokio::test]
async fn concurrent_sends_answer_in_arrival_order() {
    let app = build(
        MockTransport::new()
            .respond("chat.test", 500, "")
            .with_delay(Duration::from_millis(20)),
        true,
        keys(Some("sk"), None),
        Arc::new(MemoryStateStore::new()),
    );
    for i in 0..4 {
        app.cache.insert(&format!("question numero {}", i), format!("reponse {}", i));
    }

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let orchestrator = Arc::clone(&app.orchestrator);
            tokio::spawn(async move {
                orchestrator
                    .handle_user_message(&format!("Question numero {}", i))
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let log = app.orchestrator.store().snapshot();
    assert_eq!(log.len(), 9);
    let asked: Vec<&str> = log
        .iter()
        .filter(|m| m.role == Role::User)
        .map(|m| m.content.trim_start_matches("Question numero "))
        .collect();
    let answered: Vec<&str> = log[1..]
        .iter()
        .filter(|m| m.role == Role::Assistant)
        .map(|m| m.content.trim_start_matches("reponse "))
        .collect();
    assert_eq!(asked.len(), 4);
    assert_eq!(asked, answered);

    for n in asked {
        let question = log
            .iter()
            .position(|m| m.content == format!("Question numero {}", n))
            .unwrap();
        let answer = log
            .iter()
            .position(|m| m.content == format!("reponse {}", n))
            .unwrap();
        assert!(question < answer);
        assert!(log[question].timestamp <= log[answer].timestamp);
    }
}

#[tokio::test]
async fn conversation_survives_restart_on_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let db = Arc::new(Database::new(&dir.path().join("tribune.db")).unwrap());
    let state: Arc<dyn StateStore> = Arc::new(SqliteStateStore::new(db));

    let first = build(
        MockTransport::new().respond("chat.test", 200, completion("Maurice Kamto.")),
        true,
        keys(Some("sk"), None),
        Arc::clone(&state),
    );
    first
        .orchestrator
        .handle_user_message("Qui dirige le parti MRC actuellement ?")
        .await
        .unwrap();
    first.orchestrator.store().flush().unwrap();
    let before = first.orchestrator.store().snapshot();
    drop(first);

    let second = build(MockTransport::new(), false, keys(None, None), Arc::clone(&state));
    assert_eq!(second.orchestrator.store().load().unwrap(), 3);
    assert_eq!(second.cache.load_from(state.as_ref()).unwrap(), 1);
    let after = second.orchestrator.store().snapshot();
    for (a, b) in before.iter().zip(after.iter()) {
        assert_eq!((a.role, &a.content, a.timestamp), (b.role, &b.content, b.timestamp));
    }

    // The cached answer serves a reworded question while offline.
    let answer = reply(
        second
            .orchestrator
            .handle_user_message("qui dirige actuellement le parti")
            .await
            .unwrap(),
    );
    assert_eq!(answer, "Maurice Kamto.");
}

#[tokio::test]
async fn answers_are_saved_during_the_session() {
    let state: Arc<dyn StateStore> = Arc::new(MemoryStateStore::new());
    let app = build(
        MockTransport::new().respond("chat.test", 200, completion("Maurice Kamto.")),
        true,
        keys(Some("sk"), None),
        Arc::clone(&state),
    );
    app.orchestrator
        .handle_user_message("Qui préside le MRC ?")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let saved = state.read(RESPONSE_CACHE_KEY).unwrap().expect("cache not saved");
    assert!(saved.contains("Maurice Kamto."));
    let restored = ResponseCache::from_config(&CacheConfig::default());
    assert_eq!(restored.load_from(state.as_ref()).unwrap(), 1);
}

#[tokio::test]
async fn going_offline_mid_session_degrades_to_cache() {
    let app = build(
        MockTransport::new().respond("chat.test", 200, completion("Le MRC a été créé en 2012.")),
        true,
        keys(Some("sk"), None),
        Arc::new(MemoryStateStore::new()),
    );
    app.orchestrator
        .handle_user_message("Quand le MRC a-t-il été créé ?")
        .await
        .unwrap();
    app.connectivity.set_online(false);

    let answer = reply(
        app.orchestrator
            .handle_user_message("quand le mrc a t il été créé")
            .await
            .unwrap(),
    );
    assert_eq!(answer, "Le MRC a été créé en 2012.");
    assert_eq!(app.mock.calls(), 1);
}
