use async_trait::async_trait;

use crate::error::ReplayResult;
use crate::types::ChatEvent;

/// One page of a paginated chat log.
#[derive(Clone, Debug, Default)]
pub struct ChatPage {
    /// Messages in non-decreasing `offset_seconds` order, as the backend
    /// returns them. Pages are appended, never reordered.
    pub messages: Vec<ChatEvent>,
    /// Opaque continuation for the next page.
    pub cursor: Option<String>,
    pub has_next_page: bool,
}

/// Paginated chat-log fetch, bound to one video. Implemented by the data
/// layer (GraphQL/HTTP); the replay engine only sees typed pages.
#[async_trait]
pub trait ChatSource: Send + Sync + 'static {
    /// First page at or after the given offset into the video.
    async fn load(&self, offset_seconds: f64) -> ReplayResult<ChatPage>;

    /// Page following an opaque cursor from a previous fetch.
    async fn next_page(&self, cursor: &str) -> ReplayResult<ChatPage>;
}

/// Read-only view of the external media clock. The replay engine polls this;
/// it never mutates playback.
pub trait PlaybackClock: Send + Sync + 'static {
    fn position_ms(&self) -> i64;
}
