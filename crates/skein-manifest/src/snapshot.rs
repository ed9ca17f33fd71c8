use crate::variant::RawVariant;

/// One media segment as reported by the latest manifest refresh.
#[derive(Clone, Debug, Default)]
pub struct SegmentInfo {
    /// Segment title text, when the playlist carries one.
    pub title: Option<String>,
    /// Computed start time on the stream timeline.
    pub start_time_us: i64,
    pub duration_us: i64,
}

/// A manifest-declared insertion window, distinct from regular segments.
#[derive(Clone, Debug, Default)]
pub struct Interstitial {
    pub id: String,
    pub start_time_us: i64,
    /// Explicit end time; when absent the window end is derived from
    /// `duration_us`, then `planned_duration_us`, else left open.
    pub end_time_us: Option<i64>,
    pub duration_us: Option<i64>,
    pub planned_duration_us: Option<i64>,
    /// Custom `X-` attributes, kept as raw key/value pairs.
    pub attributes: Vec<(String, String)>,
}

impl Interstitial {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// Typed view of the manifest at one timeline-changed notification.
///
/// Ephemeral: recomputed wholesale on every refresh, never persisted.
#[derive(Clone, Debug, Default)]
pub struct ManifestSnapshot {
    pub live: bool,
    pub variants: Vec<RawVariant>,
    pub segments: Vec<SegmentInfo>,
    pub interstitials: Vec<Interstitial>,
}

impl ManifestSnapshot {
    /// The most recently appended media segment, the one ad detection keys on.
    pub fn newest_segment(&self) -> Option<&SegmentInfo> {
        self.segments.last()
    }

    /// Title tag of the newest segment, exposed to collaborators for
    /// diagnostics.
    pub fn last_segment_tag(&self) -> Option<&str> {
        self.newest_segment().and_then(|s| s.title.as_deref())
    }
}
