/// An emote occurrence inside a chat message body.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Emote {
    pub id: String,
    pub begin: usize,
    pub end: usize,
}

/// A badge shown next to the author name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Badge {
    pub set_id: String,
    pub version: String,
}

/// One replayed chat entry, already parsed by the data layer.
///
/// `offset_seconds == None` means the entry is not time-anchored (system or
/// administrative text); such entries are delivered immediately instead of
/// being scheduled.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChatEvent {
    pub id: String,
    pub user_id: Option<String>,
    pub user_login: Option<String>,
    pub user_name: Option<String>,
    pub message: String,
    pub color: Option<String>,
    pub emotes: Vec<Emote>,
    pub badges: Vec<Badge>,
    pub offset_seconds: Option<f64>,
}

impl ChatEvent {
    /// Target position on the media timeline, in milliseconds.
    pub fn offset_ms(&self) -> Option<i64> {
        self.offset_seconds.map(|s| (s * 1000.0).round() as i64)
    }
}

/// What a replay cursor emits to its consumer. `Clear` fires whenever a
/// resync discards the current buffer; the consumer drops everything it has
/// displayed so far.
#[derive(Clone, Debug, PartialEq)]
pub enum ReplayEvent {
    Message(ChatEvent),
    Clear,
}
