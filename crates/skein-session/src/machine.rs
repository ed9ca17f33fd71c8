use std::sync::Arc;

use skein_manifest::{QualityCatalog, QualityEntry, QualityKind};
use skein_player::{Player, SourceSpec, TrackSelection, TrackType};
use tracing::{debug, warn};
use url::Url;

use crate::error::{SessionError, SessionResult};
use crate::prefs::{BackgroundPolicy, DefaultQuality, PlayerPrefs, SettingsStore, POSITION_KEY, QUALITY_KEY};

/// The active quality choice inside `Normal` mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QualitySelection {
    Auto,
    Index(usize),
}

/// Finite playback mode. The reduced modes remember where playback was so a
/// later restore lands exactly where the user left off.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackMode {
    Normal { selected: QualitySelection },
    AudioOnly { previous: QualitySelection },
    /// Video fully stopped, chat keeps running ("chat only", live streams).
    Disabled { previous: QualitySelection },
}

/// Quality/track state machine for one playback session.
///
/// Single writer: every mutation comes through the context that receives
/// renderer callbacks. The renderer itself is shared and externally owned.
pub struct PlaybackModeMachine {
    player: Arc<dyn Player>,
    store: Arc<dyn SettingsStore>,
    prefs: PlayerPrefs,
    catalog: QualityCatalog,
    mode: PlaybackMode,
    /// URL of the most recently attached full (audio+video) source.
    active_url: Option<Url>,
    /// Whether entering audio-only swapped the source to an audio rendition
    /// (as opposed to merely disabling the video track).
    swapped_to_audio: bool,
    default_applied: bool,
}

impl PlaybackModeMachine {
    pub fn new(
        player: Arc<dyn Player>,
        store: Arc<dyn SettingsStore>,
        prefs: PlayerPrefs,
    ) -> Self {
        Self {
            player,
            store,
            prefs,
            catalog: QualityCatalog::default(),
            mode: PlaybackMode::Normal {
                selected: QualitySelection::Auto,
            },
            active_url: None,
            swapped_to_audio: false,
            default_applied: false,
        }
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn catalog(&self) -> &QualityCatalog {
        &self.catalog
    }

    /// Record the full source the session attached, the restore target for
    /// reduced modes.
    pub fn set_active_url(&mut self, url: Url) {
        self.active_url = Some(url);
    }

    /// Install the catalog built from the latest manifest. Applies the
    /// remembered/default quality the first time a non-empty catalog lands.
    pub fn install_catalog(&mut self, catalog: QualityCatalog) {
        self.catalog = catalog;

        // A shrunken catalog can orphan a remembered index.
        if let PlaybackMode::Normal {
            selected: QualitySelection::Index(i),
        } = self.mode
        {
            if i >= self.catalog.len() {
                warn!(index = i, len = self.catalog.len(), "selected quality vanished, back to auto");
                self.mode = PlaybackMode::Normal {
                    selected: QualitySelection::Auto,
                };
            }
        }

        if !self.default_applied && !self.catalog.is_empty() {
            self.default_applied = true;
            let label = match &self.prefs.default_quality {
                DefaultQuality::Fixed(label) => Some(label.clone()),
                DefaultQuality::UseLast => self.store.get(QUALITY_KEY),
                DefaultQuality::Auto => None,
            };
            if let Some(label) = label {
                if let Some(index) = self.catalog.index_of(&label) {
                    debug!(label = %label, index, "applying remembered default quality");
                    if let Err(e) = self.select_quality(index) {
                        warn!(error = %e, "remembered quality no longer selectable");
                    }
                }
            }
        }
    }

    /// Labels in display order plus the index matching the current mode.
    pub fn qualities(&self) -> (Vec<String>, Option<usize>) {
        (self.catalog.labels(), self.selected_index())
    }

    pub fn selected_index(&self) -> Option<usize> {
        match self.mode {
            PlaybackMode::Normal {
                selected: QualitySelection::Index(i),
            } => Some(i),
            PlaybackMode::Normal {
                selected: QualitySelection::Auto,
            } => self.catalog.index_of(skein_manifest::catalog::AUTO_LABEL),
            PlaybackMode::AudioOnly { .. } => {
                self.catalog.index_of(skein_manifest::catalog::AUDIO_ONLY_LABEL)
            }
            PlaybackMode::Disabled { .. } => {
                self.catalog.index_of(skein_manifest::catalog::CHAT_ONLY_LABEL)
            }
        }
    }

    /// Apply the catalog entry at `index`: a rendition or auto re-enables
    /// video (restoring from a reduced mode first), the audio entry drops
    /// video, the chat-only entry stops media entirely.
    pub fn select_quality(&mut self, index: usize) -> SessionResult<()> {
        let entry = self
            .catalog
            .get(index)
            .cloned()
            .ok_or(SessionError::InvalidQualityIndex(index))?;

        debug!(index, label = %entry.label, kind = ?entry.kind, "quality selected");

        match entry.kind {
            QualityKind::Auto => {
                self.restore_normal();
                self.player
                    .set_track_override(TrackType::Video, TrackSelection::Auto);
                self.mode = PlaybackMode::Normal {
                    selected: QualitySelection::Auto,
                };
                self.remember(&entry);
            }
            QualityKind::Rendition => {
                self.restore_normal();
                self.player.set_track_disabled(TrackType::Video, false);
                self.player.set_track_override(
                    TrackType::Video,
                    TrackSelection::Index(self.rendition_ordinal(index)),
                );
                if let Some(url) = &entry.url {
                    self.active_url = Some(url.clone());
                }
                self.mode = PlaybackMode::Normal {
                    selected: QualitySelection::Index(index),
                };
                self.remember(&entry);
            }
            QualityKind::AudioOnly => self.enter_audio_only(),
            QualityKind::ChatOnly => {
                let previous = self.current_selection();
                self.player.stop();
                self.mode = PlaybackMode::Disabled { previous };
            }
        }

        Ok(())
    }

    /// Keep audio, drop video, remembering where we were for restoration.
    pub fn enter_audio_only(&mut self) {
        if matches!(self.mode, PlaybackMode::AudioOnly { .. }) {
            return;
        }
        let previous = self.current_selection();

        let audio_url = self
            .catalog
            .index_of(skein_manifest::catalog::AUDIO_ONLY_LABEL)
            .and_then(|i| self.catalog.get(i))
            .and_then(|e: &QualityEntry| e.url.clone());

        match audio_url {
            Some(url) => {
                debug!(url = %url, "switching to the audio rendition");
                self.player.set_source(SourceSpec::new(url));
                self.player.prepare();
                self.player.play(true);
                self.swapped_to_audio = true;
            }
            None => {
                // The audio entry was never populated. Fall back: keep the
                // previously active source, else attach the first available
                // URL, else leave playback untouched; in every case drop the
                // video track.
                if self.active_url.is_none() {
                    if let Some(url) = self.catalog.first_playable_url().cloned() {
                        warn!(url = %url, "audio rendition missing, falling back to first variant");
                        self.player.set_source(SourceSpec::new(url.clone()));
                        self.player.prepare();
                        self.player.play(true);
                        self.active_url = Some(url);
                    } else {
                        warn!("audio rendition missing and no fallback URL, keeping current source");
                    }
                }
                self.player.set_track_disabled(TrackType::Video, true);
            }
        }

        self.mode = PlaybackMode::AudioOnly { previous };
    }

    /// Toggle between audio-only and whatever was active before it.
    pub fn switch_audio_mode(&mut self) -> SessionResult<()> {
        match self.mode {
            PlaybackMode::AudioOnly { previous } => match previous {
                QualitySelection::Index(index) => self.select_quality(index),
                QualitySelection::Auto => {
                    self.restore_normal();
                    self.player
                        .set_track_override(TrackType::Video, TrackSelection::Auto);
                    self.mode = PlaybackMode::Normal {
                        selected: QualitySelection::Auto,
                    };
                    Ok(())
                }
            },
            _ => {
                self.enter_audio_only();
                Ok(())
            }
        }
    }

    /// App went to background: force audio-only, or save-and-stop per the
    /// user's policy.
    pub fn move_to_background(&mut self) {
        match self.prefs.background {
            BackgroundPolicy::AudioOnly => self.enter_audio_only(),
            BackgroundPolicy::Stop => {
                let position = self.player.position_ms();
                self.store.put(POSITION_KEY, &position.to_string());
                debug!(position, "background stop, position saved");
                self.player.stop();
            }
        }
    }

    /// App came back: restore video without re-selecting a specific
    /// rendition; the next manifest scan settles the exact quality.
    pub fn move_to_foreground(&mut self) {
        if let PlaybackMode::AudioOnly { previous } = self.mode {
            self.player.set_track_disabled(TrackType::Video, false);
            if self.swapped_to_audio {
                self.reattach_active_source();
                self.swapped_to_audio = false;
            }
            self.mode = PlaybackMode::Normal { selected: previous };
        }
    }

    fn current_selection(&self) -> QualitySelection {
        match self.mode {
            PlaybackMode::Normal { selected } => selected,
            PlaybackMode::AudioOnly { previous } | PlaybackMode::Disabled { previous } => previous,
        }
    }

    /// Leave a reduced mode: re-enable video and, where the source itself
    /// was swapped out or stopped, reattach the full-quality source.
    fn restore_normal(&mut self) {
        match self.mode {
            PlaybackMode::Normal { .. } => {}
            PlaybackMode::AudioOnly { previous } => {
                self.player.set_track_disabled(TrackType::Video, false);
                if self.swapped_to_audio {
                    self.reattach_active_source();
                    self.swapped_to_audio = false;
                }
                self.mode = PlaybackMode::Normal { selected: previous };
            }
            PlaybackMode::Disabled { previous } => {
                self.player.set_track_disabled(TrackType::Video, false);
                self.reattach_active_source();
                self.mode = PlaybackMode::Normal { selected: previous };
            }
        }
    }

    fn reattach_active_source(&self) {
        if let Some(url) = &self.active_url {
            debug!(url = %url, "reattaching full-quality source");
            self.player.set_source(SourceSpec::new(url.clone()));
            self.player.prepare();
            self.player.play(true);
        } else {
            warn!("no full-quality source recorded to reattach");
        }
    }

    /// Persist the selection as the remembered default, but only when the
    /// user's preference is "use last selected".
    fn remember(&self, entry: &QualityEntry) {
        if self.prefs.default_quality == DefaultQuality::UseLast {
            self.store.put(QUALITY_KEY, &entry.label);
        }
    }

    /// Renderer-side track index for a catalog entry: renditions counted
    /// without the synthetic entries surrounding them.
    fn rendition_ordinal(&self, index: usize) -> usize {
        self.catalog.entries()[..index]
            .iter()
            .filter(|e| e.kind == QualityKind::Rendition)
            .count()
    }
}
