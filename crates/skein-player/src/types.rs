use url::Url;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrackType {
    Video,
    Audio,
}

/// Track override handed to the renderer: a fixed rendition index, or back
/// to adaptive selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrackSelection {
    Auto,
    Index(usize),
}

/// Live-edge tuning passed through to the renderer untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LiveConfig {
    pub target_offset_ms: Option<i64>,
    pub min_playback_speed: Option<f32>,
    pub max_playback_speed: Option<f32>,
}

/// What to load. `live` carries live-edge tuning for live manifests only.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceSpec {
    pub url: Url,
    pub mime_type: Option<String>,
    pub live: Option<LiveConfig>,
}

impl SourceSpec {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            mime_type: None,
            live: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_live(mut self, live: LiveConfig) -> Self {
        self.live = Some(live);
        self
    }
}
