/// A renderer playback failure, surfaced for classification by the session
/// layer. The HTTP status is present when the underlying transport error
/// wrapped a response code.
#[derive(Clone, Debug)]
pub struct PlayerFault {
    pub message: String,
    pub http_status: Option<u16>,
}

impl PlayerFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            http_status: None,
        }
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }
}

/// Change notifications from the renderer. The payloads stay on the player
/// (`current_manifest()`), mirroring how renderers expose a snapshot to be
/// queried after the notification.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum PlayerEvent {
    /// The manifest/timeline changed: new variant list, appended segments,
    /// interstitial updates.
    TimelineChanged,
    /// Active track selections changed.
    TracksChanged,
    Error(PlayerFault),
}
