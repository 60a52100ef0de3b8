//! Network-facing services: chat completion, video search and details, and
//! the connectivity probe. Every service degrades to offline content rather
//! than leaving the user without an answer.

pub mod chat;
pub mod offline;
pub mod probe;
pub mod transport;
pub mod video;

pub use chat::{ChatCompletionClient, PromptVariant};
pub use probe::ConnectivityProbe;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, MockTransport, ReqwestTransport};
pub use video::{VideoInfoService, VideoSearchService};
