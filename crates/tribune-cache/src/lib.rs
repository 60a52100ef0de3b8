//! In-process caches backing offline and degraded answers.
//!
//! Caches are plain objects constructed once by the host and shared by
//! `Arc` with the services that need them.

pub mod bounded;
pub mod normalize;
pub mod response;
pub mod video;
pub mod writer;

pub use bounded::BoundedMap;
pub use normalize::{normalize, significant_words};
pub use response::{CacheHit, CacheMatch, ResponseCache};
pub use video::VideoCache;
pub use writer::CacheWriter;
