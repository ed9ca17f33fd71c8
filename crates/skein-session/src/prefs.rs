/// Key under which the remembered quality label is saved.
pub const QUALITY_KEY: &str = "player_quality";
/// Key under which the playback position is saved when backgrounding stops
/// playback.
pub const POSITION_KEY: &str = "player_position";

/// How the session picks a quality when a new catalog arrives.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DefaultQuality {
    /// Remember and reapply whatever the user selected last.
    #[default]
    UseLast,
    /// Always start from this label.
    Fixed(String),
    /// Always start adaptive.
    Auto,
}

/// What backgrounding the app does to playback.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BackgroundPolicy {
    /// Keep audio running, drop video.
    #[default]
    AudioOnly,
    /// Save the position and stop playback entirely.
    Stop,
}

#[derive(Clone, Debug, Default)]
pub struct PlayerPrefs {
    pub default_quality: DefaultQuality,
    pub background: BackgroundPolicy,
}

/// Simple key-value save/load surface backing user-visible player state.
/// The actual persistence (database, preferences file) lives outside this
/// core.
pub trait SettingsStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> Option<String>;
    fn put(&self, key: &str, value: &str);
}
