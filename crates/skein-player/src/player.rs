use skein_manifest::ManifestSnapshot;
use tokio::sync::broadcast;

use crate::events::PlayerEvent;
use crate::types::{SourceSpec, TrackSelection, TrackType};

/// The renderer capability consumed by the orchestration core.
///
/// Implementations wrap the platform media stack. Methods are infallible by
/// design: renderers report failures asynchronously through
/// [`PlayerEvent::Error`], never as call-site errors. The core only ever
/// holds this behind `Arc<dyn Player>`; the renderer is a shared,
/// externally-owned resource.
pub trait Player: Send + Sync + 'static {
    // -- source lifecycle --

    fn set_source(&self, source: SourceSpec);

    fn prepare(&self);

    fn play(&self, play_when_ready: bool);

    /// Fully stop and release the current media source.
    fn stop(&self);

    // -- transport --

    fn seek_to(&self, position_ms: i64);

    fn position_ms(&self) -> i64;

    fn buffered_position_ms(&self) -> i64;

    fn playback_speed(&self) -> f32;

    fn set_playback_speed(&self, speed: f32);

    // -- audio --

    fn volume(&self) -> f32;

    fn set_volume(&self, volume: f32);

    // -- track selection --

    /// Pin a track type to one rendition, or hand it back to adaptive
    /// selection with [`TrackSelection::Auto`].
    fn set_track_override(&self, track: TrackType, selection: TrackSelection);

    fn set_track_disabled(&self, track: TrackType, disabled: bool);

    // -- manifest --

    /// Typed snapshot of the manifest behind the current timeline, if one is
    /// loaded. Queried after a [`PlayerEvent::TimelineChanged`].
    fn current_manifest(&self) -> Option<ManifestSnapshot>;

    // -- notifications --

    fn subscribe(&self) -> broadcast::Receiver<PlayerEvent>;
}
