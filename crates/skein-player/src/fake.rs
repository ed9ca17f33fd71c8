//! Instrumented in-memory player for tests.
//!
//! Records every command it receives and lets tests drive position, speed,
//! manifest snapshots and event notifications by hand.

use std::sync::Arc;

use parking_lot::Mutex;
use skein_manifest::ManifestSnapshot;
use tokio::sync::broadcast;

use crate::events::PlayerEvent;
use crate::player::Player;
use crate::types::{SourceSpec, TrackSelection, TrackType};

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    SetSource(SourceSpec),
    Prepare,
    Play(bool),
    Stop,
    SeekTo(i64),
    SetPlaybackSpeed(f32),
    SetVolume(f32),
    SetTrackOverride(TrackType, TrackSelection),
    SetTrackDisabled(TrackType, bool),
}

#[derive(Default)]
struct FakeState {
    commands: Vec<Command>,
    position_ms: i64,
    buffered_ms: i64,
    speed: f32,
    volume: f32,
    manifest: Option<ManifestSnapshot>,
}

#[derive(Clone)]
pub struct FakePlayer {
    state: Arc<Mutex<FakeState>>,
    events: broadcast::Sender<PlayerEvent>,
}

impl Default for FakePlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePlayer {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        let state = FakeState {
            speed: 1.0,
            volume: 1.0,
            ..FakeState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            events,
        }
    }

    // -- test-side controls --

    pub fn set_position_ms(&self, position_ms: i64) {
        self.state.lock().position_ms = position_ms;
    }

    pub fn set_manifest(&self, manifest: ManifestSnapshot) {
        self.state.lock().manifest = Some(manifest);
    }

    /// Install a manifest and notify subscribers, the way a renderer reacts
    /// to a playlist refresh.
    pub fn push_timeline(&self, manifest: ManifestSnapshot) {
        self.set_manifest(manifest);
        let _ = self.events.send(PlayerEvent::TimelineChanged);
    }

    pub fn push_event(&self, event: PlayerEvent) {
        let _ = self.events.send(event);
    }

    // -- test-side assertions --

    pub fn commands(&self) -> Vec<Command> {
        self.state.lock().commands.clone()
    }

    pub fn clear_commands(&self) {
        self.state.lock().commands.clear();
    }

    pub fn last_source(&self) -> Option<SourceSpec> {
        self.state.lock().commands.iter().rev().find_map(|c| match c {
            Command::SetSource(s) => Some(s.clone()),
            _ => None,
        })
    }

    fn record(&self, command: Command) {
        self.state.lock().commands.push(command);
    }
}

impl Player for FakePlayer {
    fn set_source(&self, source: SourceSpec) {
        self.record(Command::SetSource(source));
    }

    fn prepare(&self) {
        self.record(Command::Prepare);
    }

    fn play(&self, play_when_ready: bool) {
        self.record(Command::Play(play_when_ready));
    }

    fn stop(&self) {
        self.record(Command::Stop);
    }

    fn seek_to(&self, position_ms: i64) {
        self.state.lock().position_ms = position_ms;
        self.record(Command::SeekTo(position_ms));
    }

    fn position_ms(&self) -> i64 {
        self.state.lock().position_ms
    }

    fn buffered_position_ms(&self) -> i64 {
        self.state.lock().buffered_ms
    }

    fn playback_speed(&self) -> f32 {
        self.state.lock().speed
    }

    fn set_playback_speed(&self, speed: f32) {
        self.state.lock().speed = speed;
        self.record(Command::SetPlaybackSpeed(speed));
    }

    fn volume(&self) -> f32 {
        self.state.lock().volume
    }

    fn set_volume(&self, volume: f32) {
        self.state.lock().volume = volume;
        self.record(Command::SetVolume(volume));
    }

    fn set_track_override(&self, track: TrackType, selection: TrackSelection) {
        self.record(Command::SetTrackOverride(track, selection));
    }

    fn set_track_disabled(&self, track: TrackType, disabled: bool) {
        self.record(Command::SetTrackDisabled(track, disabled));
    }

    fn current_manifest(&self) -> Option<ManifestSnapshot> {
        self.state.lock().manifest.clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_commands_in_order() {
        let player = FakePlayer::new();
        player.prepare();
        player.play(true);
        player.set_track_disabled(TrackType::Video, true);

        assert_eq!(
            player.commands(),
            vec![
                Command::Prepare,
                Command::Play(true),
                Command::SetTrackDisabled(TrackType::Video, true),
            ]
        );
    }

    #[tokio::test]
    async fn push_timeline_notifies_subscribers() {
        let player = FakePlayer::new();
        let mut rx = player.subscribe();
        player.push_timeline(ManifestSnapshot::default());

        assert!(matches!(rx.recv().await, Ok(PlayerEvent::TimelineChanged)));
        assert!(player.current_manifest().is_some());
    }
}
