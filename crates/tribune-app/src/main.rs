//! Tribune application binary - composition root.
//!
//! 1. Load configuration from TOML, apply CLI overrides
//! 2. Open the SQLite state store and read the provider keys
//! 3. Build caches, provider services and the orchestrator
//! 4. Start the connectivity probe and the notification printer
//! 5. Run the terminal conversation loop

mod cli;
mod repl;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use tribune_cache::{ResponseCache, VideoCache};
use tribune_chat::{ChatError, ChatTeamComposer, ConversationStore, Orchestrator, Outcome, Services};
use tribune_core::config::TribuneConfig;
use tribune_core::connectivity::ConnectivityMonitor;
use tribune_core::events::{ChannelNotifier, Severity};
use tribune_provider::{
    ChatCompletionClient, ConnectivityProbe, ReqwestTransport, VideoInfoService,
    VideoSearchService,
};
use tribune_storage::{load_api_keys_or_default, Database, SqliteStateStore, StateStore};

use cli::CliArgs;
use repl::{parse_command, render_message, render_results, Command, HELP};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = TribuneConfig::load_or_default(&config_file);
    if let Some(dir) = args.resolve_data_dir() {
        config.general.data_dir = dir;
    }
    let log_level = args.resolve_log_level(&config.general.log_level);

    // Tracing.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .init();

    tracing::info!("Starting Tribune v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration resolved");

    // Storage.
    let data_dir = config.data_dir();
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }
    let db_path = data_dir.join("tribune.db");
    let db = Arc::new(Database::new(&db_path)?);
    let state: Arc<dyn StateStore> = Arc::new(SqliteStateStore::new(db));
    tracing::info!(path = %db_path.display(), "State database opened");

    let keys = args.resolve_api_keys(&load_api_keys_or_default(state.as_ref()));
    tracing::info!(
        chat_key = keys.chat().is_some(),
        video_key = keys.video().is_some(),
        "Provider keys resolved"
    );

    // Caches and services.
    let transport = Arc::new(ReqwestTransport::from_config(&config.chat)?);
    let connectivity = Arc::new(ConnectivityMonitor::new(!args.offline));

    let response_cache = Arc::new(ResponseCache::from_config(&config.cache));
    match response_cache.load_from(state.as_ref()) {
        Ok(n) => tracing::info!(entries = n, "Response cache restored"),
        Err(e) => tracing::warn!(error = %e, "Response cache not restored"),
    }
    let video_cache = Arc::new(VideoCache::from_config(&config.video));

    let chat = Arc::new(
        ChatCompletionClient::new(
            &config.chat,
            transport.clone(),
            Arc::clone(&response_cache),
            Arc::clone(&connectivity),
        )
        .with_persistence(
            Arc::clone(&state),
            Duration::from_millis(config.cache.persist_debounce_ms),
        ),
    );
    let services = Services {
        chat: Arc::clone(&chat),
        search: VideoSearchService::new(
            &config.video,
            transport.clone(),
            Arc::clone(&video_cache),
            Arc::clone(&connectivity),
        ),
        info: VideoInfoService::new(
            &config.video,
            transport.clone(),
            video_cache,
            Arc::clone(&connectivity),
        ),
        team: Arc::new(ChatTeamComposer::new(Arc::clone(&chat))),
    };

    let store = Arc::new(ConversationStore::new(Arc::clone(&state), &config.conversation));
    if let Err(e) = store.load() {
        tracing::warn!(error = %e, "Conversation not restored, starting fresh");
    }

    let (notifier, mut notifications) = ChannelNotifier::new();
    let orchestrator = Orchestrator::new(Arc::clone(&store), services, Arc::new(notifier), keys);

    // === Background tasks ===

    let watcher = orchestrator.watch_connectivity(&connectivity);
    let probe = if args.offline {
        tracing::info!("Offline mode forced, connectivity probe disabled");
        None
    } else {
        let probe = ConnectivityProbe::new(
            &config.connectivity,
            transport.clone(),
            Arc::clone(&connectivity),
        );
        Some(probe.spawn(Duration::from_secs(config.connectivity.probe_interval_secs.max(1))))
    };
    let printer = tokio::spawn(async move {
        while let Some(n) = notifications.recv().await {
            let tag = match n.severity {
                Severity::Info => "info",
                Severity::Warning => "attention",
                Severity::Error => "erreur",
            };
            eprintln!("({}) {} : {}", tag, n.title, n.description);
        }
    });

    // === Conversation loop ===

    for message in store.snapshot() {
        println!("{}", render_message(&message));
    }
    println!("(tapez /help pour la liste des commandes, Ctrl-C pour quitter)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        // Ctrl-C at the prompt quits through the shutdown path below.
        let line = tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => line,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };
        let outcome = match parse_command(&line) {
            Command::Quit => break,
            Command::Empty => continue,
            Command::Help => {
                println!("{}", HELP);
                continue;
            }
            Command::Invalid(reason) => {
                println!("{}", reason);
                continue;
            }
            Command::Clear => {
                store.clear();
                if let Some(greeting) = store.last() {
                    println!("{}", render_message(&greeting));
                }
                continue;
            }
            Command::History => {
                for message in store.snapshot() {
                    println!("{}", render_message(&message));
                }
                continue;
            }
            Command::Watch(n) => {
                let Some(video) = orchestrator.last_video_results().get(n - 1).cloned() else {
                    println!("Aucun résultat numéro {}.", n);
                    continue;
                };
                run_cancellable(&orchestrator, orchestrator.select_video(&video.id)).await
            }
            Command::Send(text) => {
                run_cancellable(&orchestrator, orchestrator.handle_user_message(&text)).await
            }
        };

        match outcome {
            Ok(Outcome::Replied(message)) => println!("{}", render_message(&message)),
            Ok(Outcome::VideoResults(results)) => {
                println!("{}", render_results(&results));
                if !results.is_empty() {
                    println!("(/watch N pour obtenir un résumé)");
                }
            }
            Err(e) => println!("{}", e),
        }
    }

    // === Shutdown ===

    watcher.abort();
    printer.abort();
    if let Some(probe) = probe {
        probe.abort();
    }
    if let Err(e) = store.flush() {
        tracing::warn!(error = %e, "Failed to save conversation");
    }
    if let Err(e) = chat.flush_cache() {
        tracing::warn!(error = %e, "Failed to save response cache");
    }
    tracing::info!("Tribune stopped");
    Ok(())
}

/// Await `request`, cancelling it on Ctrl-C. The request then settles with
/// its cancellation notice.
async fn run_cancellable<F>(orchestrator: &Orchestrator, request: F) -> Result<Outcome, ChatError>
where
    F: std::future::Future<Output = Result<Outcome, ChatError>>,
{
    tokio::pin!(request);
    loop {
        tokio::select! {
            result = &mut request => return result,
            _ = tokio::signal::ctrl_c() => {
                orchestrator.cancel_in_flight();
            }
        }
    }
}
