
use std::sync::Arc;

use skein_manifest::{CatalogStrings, QualityCatalog};
use skein_player::fake::{Command, FakePlayer};
use skein_player::{TrackSelection, TrackType};
use skein_session::{
    BackgroundPolicy, DefaultQuality, PlaybackMode, PlaybackModeMachine, PlayerPrefs,
    QualitySelection, SettingsStore, QUALITY_KEY,
};

use fixture::{live_variants, variant, variant_url, MemoryStore};

fn live_catalog() -> QualityCatalog {
    QualityCatalog::build(&live_variants(), true, true, &CatalogStrings::default())
}

fn machine_with(
    player: &FakePlayer,
    store: Arc<MemoryStore>,
    prefs: PlayerPrefs,
) -> PlaybackModeMachine {
    PlaybackModeMachine::new(Arc::new(player.clone()), store, prefs)
}

// Catalog index map for `live_catalog()`:
// 0 auto, 1 720p60, 2 480p, 3 audio only, 4 chat only.

#[test]
fn audio_round_trip_restores_the_selected_rendition() {
    let player = FakePlayer::new();
    let mut machine = machine_with(&player, Arc::new(MemoryStore::default()), PlayerPrefs::default());
    machine.install_catalog(live_catalog());

    machine.select_quality(1).unwrap();
    assert_eq!(machine.selected_index(), Some(1));
    assert!(player
        .commands()
        .contains(&Command::SetTrackOverride(TrackType::Video, TrackSelection::Index(0))));

    player.clear_commands();
    machine.switch_audio_mode().unwrap();
    assert_eq!(
        machine.mode(),
        PlaybackMode::AudioOnly {
            previous: QualitySelection::Index(1)
        }
    );
    // The audio rendition carries a URL, so the source is swapped.
    assert_eq!(player.last_source().unwrap().url, variant_url("audio_only"));

    player.clear_commands();
    machine.switch_audio_mode().unwrap();
    assert_eq!(machine.selected_index(), Some(1));
    // Restoration reattaches the full source, then re-pins the rendition.
    assert_eq!(player.last_source().unwrap().url, variant_url("720p60"));
    assert!(player
        .commands()
        .contains(&Command::SetTrackOverride(TrackType::Video, TrackSelection::Index(0))));
}

#[test]
fn chat_only_stops_media_and_reselect_reattaches() {
    let player = FakePlayer::new();
    let mut machine = machine_with(&player, Arc::new(MemoryStore::default()), PlayerPrefs::default());
    machine.install_catalog(live_catalog());
    machine.set_active_url(variant_url("720p60"));

    machine.select_quality(4).unwrap();
    assert!(player.commands().contains(&Command::Stop));
    assert_eq!(
        machine.mode(),
        PlaybackMode::Disabled {
            previous: QualitySelection::Auto
        }
    );

    player.clear_commands();
    machine.select_quality(1).unwrap();
    assert_eq!(player.last_source().unwrap().url, variant_url("720p60"));
    assert_eq!(machine.selected_index(), Some(1));
}

#[test]
fn use_last_persists_and_reapplies_across_machines() {
    let player = FakePlayer::new();
    let store = Arc::new(MemoryStore::default());
    let mut machine = machine_with(&player, store.clone(), PlayerPrefs::default());
    machine.install_catalog(live_catalog());

    machine.select_quality(2).unwrap();
    assert_eq!(store.get(QUALITY_KEY).as_deref(), Some("480p"));

    // A fresh machine over the same store resumes at the remembered label.
    let player2 = FakePlayer::new();
    let mut machine2 = machine_with(&player2, store, PlayerPrefs::default());
    machine2.install_catalog(live_catalog());
    assert_eq!(machine2.selected_index(), Some(2));
}

#[test]
fn fixed_default_applies_without_touching_the_store() {
    let player = FakePlayer::new();
    let store = Arc::new(MemoryStore::default());
    let prefs = PlayerPrefs {
        default_quality: DefaultQuality::Fixed("480p".to_owned()),
        ..PlayerPrefs::default()
    };
    let mut machine = machine_with(&player, store.clone(), prefs);
    machine.install_catalog(live_catalog());

    assert_eq!(machine.selected_index(), Some(2));
    assert_eq!(store.get(QUALITY_KEY), None);
}

#[test]
fn audio_entry_without_url_only_disables_video() {
    let player = FakePlayer::new();
    let mut machine = machine_with(&player, Arc::new(MemoryStore::default()), PlayerPrefs::default());
    // No audio rendition in the manifest: "audio only" is synthesized empty.
    let variants = [
        variant("720p60", Some(720), Some(60.0)),
        variant("480p", Some(480), Some(30.0)),
    ];
    machine.install_catalog(QualityCatalog::build(&variants, true, true, &CatalogStrings::default()));
    machine.set_active_url(variant_url("720p60"));

    player.clear_commands();
    machine.enter_audio_only();

    assert_eq!(
        player.commands(),
        vec![Command::SetTrackDisabled(TrackType::Video, true)]
    );
    assert!(matches!(machine.mode(), PlaybackMode::AudioOnly { .. }));
}

#[test]
fn background_audio_policy_round_trips_through_foreground() {
    let player = FakePlayer::new();
    let mut machine = machine_with(&player, Arc::new(MemoryStore::default()), PlayerPrefs::default());
    machine.install_catalog(live_catalog());
    machine.select_quality(1).unwrap();

    machine.move_to_background();
    assert_eq!(player.last_source().unwrap().url, variant_url("audio_only"));

    player.clear_commands();
    machine.move_to_foreground();
    assert_eq!(player.last_source().unwrap().url, variant_url("720p60"));
    assert_eq!(
        machine.mode(),
        PlaybackMode::Normal {
            selected: QualitySelection::Index(1)
        }
    );
}

#[test]
fn background_stop_policy_saves_position() {
    let player = FakePlayer::new();
    let store = Arc::new(MemoryStore::default());
    let prefs = PlayerPrefs {
        background: BackgroundPolicy::Stop,
        ..PlayerPrefs::default()
    };
    let mut machine = machine_with(&player, store.clone(), prefs);
    machine.install_catalog(live_catalog());
    player.set_position_ms(123_456);

    machine.move_to_background();

    assert_eq!(store.get("player_position").as_deref(), Some("123456"));
    assert!(player.commands().contains(&Command::Stop));
}

#[test]
fn shrunken_catalog_drops_a_stale_index_back_to_auto() {
    let player = FakePlayer::new();
    let mut machine = machine_with(&player, Arc::new(MemoryStore::default()), PlayerPrefs::default());
    machine.install_catalog(live_catalog());
    machine.select_quality(2).unwrap();

    let small = QualityCatalog::build(
        &[variant("240p", Some(240), Some(30.0))],
        false,
        false,
        &CatalogStrings::default(),
    );
    machine.install_catalog(small);

    assert_eq!(
        machine.mode(),
        PlaybackMode::Normal {
            selected: QualitySelection::Auto
        }
    );
}
