//! Terminal commands and rendering.

use chrono::Local;

use tribune_core::types::{Message, Role, VideoSummary};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    Clear,
    History,
    /// 1-based index into the last search results.
    Watch(usize),
    Help,
    Send(String),
    Empty,
    Invalid(String),
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Send(line.to_string());
    };
    let mut parts = rest.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("quit" | "exit"), None) => Command::Quit,
        (Some("clear"), None) => Command::Clear,
        (Some("history"), None) => Command::History,
        (Some("help"), None) => Command::Help,
        (Some("watch"), Some(n)) => match n.parse::<usize>() {
            Ok(n) if n > 0 => Command::Watch(n),
            _ => Command::Invalid(format!("not a result number: {}", n)),
        },
        _ => Command::Invalid(format!("unknown command: /{}", rest)),
    }
}

pub const HELP: &str = "\
/watch N   résumer la vidéo N des derniers résultats
/history   afficher la conversation
/clear     effacer la conversation
/quit      quitter (ou Ctrl-C à l'invite)";

pub fn render_message(message: &Message) -> String {
    let who = match message.role {
        Role::User => "vous",
        Role::Assistant => "tribune",
    };
    format!(
        "[{}] {}> {}",
        message.timestamp.with_timezone(&Local).format("%H:%M"),
        who,
        message.content
    )
}

pub fn render_results(results: &[VideoSummary]) -> String {
    if results.is_empty() {
        return "Aucune vidéo trouvée.".to_string();
    }
    results
        .iter()
        .enumerate()
        .map(|(i, v)| format!("{:>2}. {} ({})", i + 1, v.title, v.published_at))
        .collect::<Vec<_>>()
        .join("\n")
}
