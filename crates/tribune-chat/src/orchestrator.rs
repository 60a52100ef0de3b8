//! Root coordinator: routes each user message through classification and
//! the downstream services, and appends results to the conversation log in
//! a deterministic order.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tribune_core::connectivity::ConnectivityMonitor;
use tribune_core::error::{ErrorKind, ProviderError};
use tribune_core::events::{Notification, Notifier};
use tribune_core::types::{
    ApiKeys, Intent, Message, MessageMetadata, MessageSource, VideoSummary,
};
use tribune_provider::chat::{ChatCompletionClient, PromptVariant};
use tribune_provider::video::{VideoInfoService, VideoSearchService};

use crate::classifier::{strip_video_keywords, IntentClassifier};
use crate::error::ChatError;
use crate::prompts::{quiz_analysis_prompt, video_summary_prompt};
use crate::store::ConversationStore;
use crate::team::TeamComposer;

/// Maximum message length in characters.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Appended when an in-flight request is cancelled.
pub const CANCELLED_NOTICE: &str = "Demande annulée.";

/// Result of handling one user message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Outcome {
    /// An assistant message was appended to the log.
    Replied(Message),
    /// Search results for the caller to present; nothing was appended.
    VideoResults(Vec<VideoSummary>),
}

/// What a route produced, before it is appended.
enum Routed {
    Reply(Message),
    Videos(Vec<VideoSummary>),
}

/// Services the orchestrator drives.
pub struct Services {
    pub chat: Arc<ChatCompletionClient>,
    pub search: VideoSearchService,
    pub info: VideoInfoService,
    pub team: Arc<dyn TeamComposer>,
}

/// Serves turns one at a time, in the order tickets were issued.
struct Lane {
    issued: Mutex<LaneState>,
    serving: watch::Sender<u64>,
}

#[derive(Default)]
struct LaneState {
    next: u64,
    /// Tickets whose holder gave up before being served.
    abandoned: HashSet<u64>,
}

impl Lane {
    fn new() -> Self {
        let (serving, _) = watch::channel(0);
        Self {
            issued: Mutex::new(LaneState::default()),
            serving,
        }
    }

    /// Issue the next ticket, running `on_issue` under the same lock so
    /// that whatever it records is ordered like the tickets.
    fn enter(&self, on_issue: impl FnOnce()) -> Turn<'_> {
        let mut state = lock(&self.issued);
        on_issue();
        let ticket = state.next;
        state.next += 1;
        Turn { lane: self, ticket }
    }

    fn release(&self, ticket: u64) {
        let mut state = lock(&self.issued);
        if *self.serving.borrow() != ticket {
            state.abandoned.insert(ticket);
            return;
        }
        let mut next = ticket + 1;
        while state.abandoned.remove(&next) {
            next += 1;
        }
        self.serving.send_replace(next);
    }
}

/// A place in the lane. Dropping it passes the lane on, whether or not the
/// turn was served.
struct Turn<'a> {
    lane: &'a Lane,
    ticket: u64,
}

impl Turn<'_> {
    async fn ready(&self) {
        let mut serving = self.lane.serving.subscribe();
        // The sender lives as long as the lane, so this cannot fail.
        let _ = serving.wait_for(|now| *now == self.ticket).await;
    }
}

impl Drop for Turn<'_> {
    fn drop(&mut self) {
        self.lane.release(self.ticket);
    }
}

/// Clears the loading indicator when the request ends, however it ends.
struct LoadingGuard<'a>(&'a watch::Sender<bool>);

impl<'a> LoadingGuard<'a> {
    fn start(tx: &'a watch::Sender<bool>) -> Self {
        tx.send_replace(true);
        Self(tx)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_replace(false);
    }
}

pub struct Orchestrator {
    store: Arc<ConversationStore>,
    services: Services,
    notifier: Arc<dyn Notifier>,
    keys: RwLock<ApiKeys>,
    lane: Lane,
    in_flight: Mutex<Option<CancellationToken>>,
    loading: watch::Sender<bool>,
    missing_key_notified: AtomicBool,
    last_results: Mutex<Vec<VideoSummary>>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<ConversationStore>,
        services: Services,
        notifier: Arc<dyn Notifier>,
        keys: ApiKeys,
    ) -> Self {
        let (loading, _) = watch::channel(false);
        Self {
            store,
            services,
            notifier,
            keys: RwLock::new(keys),
            lane: Lane::new(),
            in_flight: Mutex::new(None),
            loading,
            missing_key_notified: AtomicBool::new(false),
            last_results: Mutex::new(Vec::new()),
        }
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    pub fn api_keys(&self) -> ApiKeys {
        self.keys.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replace the provider keys. A newly configured chat key re-arms the
    /// missing-key notification.
    pub fn set_api_keys(&self, keys: ApiKeys) {
        if keys.chat().is_some() {
            self.missing_key_notified.store(false, Ordering::Release);
        }
        *self.keys.write().unwrap_or_else(PoisonError::into_inner) = keys;
    }

    /// Receiver tracking whether a request is in progress.
    pub fn loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    /// Classify with the current key set.
    pub fn classify(&self, text: &str) -> Intent {
        IntentClassifier::new(self.api_keys().video().is_some()).classify(text)
    }

    /// Results of the most recent successful video search.
    pub fn last_video_results(&self) -> Vec<VideoSummary> {
        lock(&self.last_results).clone()
    }

    /// Cancel the request currently in progress. Returns `false` when
    /// nothing was in flight.
    pub fn cancel_in_flight(&self) -> bool {
        match lock(&self.in_flight).as_ref() {
            Some(token) => {
                token.cancel();
                info!("In-flight request cancelled");
                true
            }
            None => false,
        }
    }

    /// Handle one message typed by the user.
    ///
    /// The user message is appended at once, even while an earlier request
    /// is still in flight. Requests are then served one at a time in the
    /// order their user messages were appended.
    pub async fn handle_user_message(&self, text: &str) -> Result<Outcome, ChatError> {
        validate(text)?;
        let turn = self.lane.enter(|| self.store.append(Message::user(text)));
        turn.ready().await;
        let token = self.begin();
        let _loading = LoadingGuard::start(&self.loading);

        let keys = self.api_keys();
        let intent = IntentClassifier::new(keys.video().is_some()).classify(text);
        info!(intent = %intent.as_str(), "Message routed");

        let routed = tokio::select! {
            _ = token.cancelled() => None,
            routed = self.route(intent, text, &keys) => Some(routed),
        };
        let outcome = self.finish(routed);
        self.end();
        Ok(outcome)
    }

    /// Summarize a video picked from search results and append the summary.
    pub async fn select_video(&self, video_id: &str) -> Result<Outcome, ChatError> {
        let video_id = video_id.trim();
        if video_id.is_empty() {
            return Err(ChatError::UnknownVideo(String::new()));
        }
        let turn = self.lane.enter(|| ());
        turn.ready().await;
        let token = self.begin();
        let _loading = LoadingGuard::start(&self.loading);

        let keys = self.api_keys();
        let routed = tokio::select! {
            _ = token.cancelled() => None,
            reply = self.summarize_video(&keys, video_id) => Some(Routed::Reply(reply)),
        };
        let outcome = self.finish(routed);
        self.end();
        Ok(outcome)
    }

    /// Emit a notification on every online/offline transition until the
    /// returned task is aborted.
    pub fn watch_connectivity(&self, monitor: &ConnectivityMonitor) -> JoinHandle<()> {
        let mut rx = monitor.subscribe();
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let online = *rx.borrow_and_update();
                notifier.notify(connectivity_notification(online));
            }
        })
    }

    fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *lock(&self.in_flight) = Some(token.clone());
        token
    }

    fn end(&self) {
        *lock(&self.in_flight) = None;
    }

    /// Append the routed reply, or a cancellation notice.
    fn finish(&self, routed: Option<Routed>) -> Outcome {
        match routed {
            Some(Routed::Reply(message)) => {
                self.store.append(message.clone());
                Outcome::Replied(message)
            }
            Some(Routed::Videos(results)) => {
                *lock(&self.last_results) = results.clone();
                Outcome::VideoResults(results)
            }
            None => {
                let notice = Message::assistant(CANCELLED_NOTICE);
                self.store.append(notice.clone());
                Outcome::Replied(notice)
            }
        }
    }

    async fn route(&self, intent: Intent, text: &str, keys: &ApiKeys) -> Routed {
        match intent {
            Intent::QuizAnalysis => {
                self.check_chat_key(keys);
                let answer = self
                    .services
                    .chat
                    .complete_prompt(keys.chat(), text, &quiz_analysis_prompt(text), PromptVariant::General)
                    .await;
                Routed::Reply(chat_reply(answer))
            }
            Intent::TeamGeneration => {
                self.check_chat_key(keys);
                let answer = match self.services.team.compose(keys, text).await {
                    Ok(answer) => answer,
                    Err(e) => {
                        warn!(kind = %e.kind, error = %e.message, "Team composition failed");
                        self.services.chat.offline_answer(text)
                    }
                };
                Routed::Reply(chat_reply(answer))
            }
            Intent::VideoRequest => {
                let query = strip_video_keywords(text);
                debug!(query = %query, "Searching videos");
                match self.services.search.search(keys.video(), &query).await {
                    Ok(results) => Routed::Videos(results),
                    Err(e) => {
                        let notification = search_failure_notification(&e);
                        let notice = format!(
                            "Je n'ai pas pu rechercher de vidéos. {}",
                            notification.description
                        );
                        self.notifier.notify(notification);
                        Routed::Reply(Message::assistant(notice))
                    }
                }
            }
            Intent::GeneralQuery => {
                self.check_chat_key(keys);
                let answer = self
                    .services
                    .chat
                    .complete(keys.chat(), text, PromptVariant::General)
                    .await;
                Routed::Reply(chat_reply(answer))
            }
        }
    }

    async fn summarize_video(&self, keys: &ApiKeys, video_id: &str) -> Message {
        let detail = self.services.info.get_info(keys.video(), video_id).await;
        let title = lock(&self.last_results)
            .iter()
            .find(|v| v.id == video_id)
            .map(|v| v.title.clone())
            .unwrap_or_else(|| detail.title.clone());

        self.check_chat_key(keys);
        let summary = self
            .services
            .chat
            .complete_prompt(
                keys.chat(),
                &format!("résumé vidéo {}", title),
                &video_summary_prompt(&detail),
                PromptVariant::General,
            )
            .await;

        Message::assistant(summary)
            .with_source(MessageSource::Youtube)
            .with_metadata(MessageMetadata {
                video_id: Some(video_id.to_string()),
                video_title: Some(title),
            })
    }

    /// Raise the missing-key notification once per session.
    fn check_chat_key(&self, keys: &ApiKeys) {
        if keys.chat().is_none() && !self.missing_key_notified.swap(true, Ordering::AcqRel) {
            self.notifier.notify(Notification::warning(
                "Clé API manquante",
                "Aucune clé du fournisseur de conversation n'est configurée. Les réponses \
                 proviennent du mode hors ligne. Ajoutez votre clé dans les paramètres.",
            ));
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn validate(text: &str) -> Result<(), ChatError> {
    if text.trim().is_empty() {
        return Err(ChatError::EmptyMessage);
    }
    if text.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(ChatError::MessageTooLong(MAX_MESSAGE_LENGTH));
    }
    Ok(())
}

fn chat_reply(answer: String) -> Message {
    Message::assistant(answer).with_source(MessageSource::ChatProvider)
}

/// User-facing remediation for a failed video search.
pub fn search_failure_notification(err: &ProviderError) -> Notification {
    match err.kind {
        ErrorKind::QuotaExceeded => Notification::warning(
            "Quota vidéo atteint",
            "Le quota quotidien de recherche vidéo est épuisé. Réessayez demain.",
        ),
        ErrorKind::InvalidApiKey => Notification::error(
            "Clé API vidéo invalide",
            "Vérifiez la clé du fournisseur vidéo dans les paramètres.",
        ),
        ErrorKind::NetworkError => Notification::warning(
            "Connexion impossible",
            "La plateforme vidéo est injoignable. Vérifiez votre connexion internet.",
        ),
        _ => Notification::error(
            "Erreur de la plateforme vidéo",
            format!("La recherche a échoué : {}", err.message),
        ),
    }
}

fn connectivity_notification(online: bool) -> Notification {
    if online {
        Notification::info(
            "Connexion rétablie",
            "Vous êtes de nouveau en ligne. Les réponses complètes sont disponibles.",
        )
    } else {
        Notification::warning(
            "Mode hors ligne",
            "Connexion perdue. Les réponses proviennent du cache et du contenu hors ligne.",
        )
    }
}
