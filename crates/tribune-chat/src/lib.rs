//! Message pipeline for the Tribune assistant.
//!
//! Classifies user messages, routes them to the provider services, and
//! keeps the conversation log ordered and persisted.

pub mod classifier;
pub mod error;
pub mod orchestrator;
pub mod prompts;
pub mod store;
pub mod team;

pub use classifier::{strip_video_keywords, IntentClassifier};
pub use error::ChatError;
pub use orchestrator::{Orchestrator, Outcome, Services, MAX_MESSAGE_LENGTH};
pub use store::{ConversationChange, ConversationStore};
pub use team::{ChatTeamComposer, TeamComposer};
