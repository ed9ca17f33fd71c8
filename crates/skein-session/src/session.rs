use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use skein_manifest::{AdRules, CatalogStrings, QualityCatalog};
use skein_player::{Player, PlayerEvent, SourceSpec};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ads::{AdGuard, AdGuardConfig, PlaylistProxy};
use crate::error::{classify_fault, PlaybackErrorKind, RecoveryAction, SessionResult};
use crate::events::{SessionEvent, SessionEvents};
use crate::machine::PlaybackModeMachine;
use crate::prefs::{PlayerPrefs, SettingsStore};

#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Live stream vs VOD; decides fault recovery and chat-only eligibility.
    pub live: bool,
    /// Whether adaptive selection is offered as a quality entry.
    pub auto_available: bool,
    pub strings: CatalogStrings,
    pub prefs: PlayerPrefs,
    pub ad_rules: AdRules,
    pub ad_guard: AdGuardConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            live: true,
            auto_available: true,
            strings: CatalogStrings::default(),
            prefs: PlayerPrefs::default(),
            ad_rules: AdRules::default(),
            ad_guard: AdGuardConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn with_live(mut self, live: bool) -> Self {
        self.live = live;
        self
    }

    pub fn with_auto_available(mut self, auto: bool) -> Self {
        self.auto_available = auto;
        self
    }

    pub fn with_strings(mut self, strings: CatalogStrings) -> Self {
        self.strings = strings;
        self
    }

    pub fn with_prefs(mut self, prefs: PlayerPrefs) -> Self {
        self.prefs = prefs;
        self
    }

    pub fn with_ad_rules(mut self, rules: AdRules) -> Self {
        self.ad_rules = rules;
        self
    }

    pub fn with_ad_guard(mut self, guard: AdGuardConfig) -> Self {
        self.ad_guard = guard;
        self
    }
}

struct SessionInner {
    player: Arc<dyn Player>,
    config: SessionConfig,
    machine: Mutex<PlaybackModeMachine>,
    guard: AdGuard,
    events: SessionEvents,
    last_error: Mutex<Option<PlaybackErrorKind>>,
    token_downgraded: AtomicBool,
    shutdown: CancellationToken,
}

/// One playback session: quality machine, ad guard, and fault recovery,
/// driven by the renderer's notification stream.
///
/// Cheap to clone; typically one clone drives [`PlaybackSession::run`] while
/// others serve UI calls.
#[derive(Clone)]
pub struct PlaybackSession {
    inner: Arc<SessionInner>,
}

impl PlaybackSession {
    pub fn new(
        player: Arc<dyn Player>,
        store: Arc<dyn SettingsStore>,
        config: SessionConfig,
        proxy: Option<Arc<dyn PlaylistProxy>>,
    ) -> Self {
        let events = SessionEvents::default();
        let machine =
            PlaybackModeMachine::new(player.clone(), store, config.prefs.clone());
        let guard = AdGuard::new(
            player.clone(),
            config.ad_rules.clone(),
            config.ad_guard.clone(),
            proxy,
            events.clone(),
        );

        Self {
            inner: Arc::new(SessionInner {
                player,
                config,
                machine: Mutex::new(machine),
                guard,
                events,
                last_error: Mutex::new(None),
                token_downgraded: AtomicBool::new(false),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Attach and start a source. The URL is remembered as the direct
    /// (un-proxied, full-quality) restore target.
    pub fn load(&self, source: SourceSpec) {
        info!(url = %source.url, live = self.inner.config.live, "loading source");
        self.inner.machine.lock().set_active_url(source.url.clone());
        self.inner.guard.set_direct_source(source.clone());
        self.inner.player.set_source(source);
        self.inner.player.prepare();
        self.inner.player.play(true);
    }

    /// Drive the session off the renderer's notifications until [`stop`] is
    /// called or the renderer drops its event channel.
    ///
    /// [`stop`]: PlaybackSession::stop
    pub async fn run(&self) {
        let mut rx = self.inner.player.subscribe();
        loop {
            let event = tokio::select! {
                _ = self.inner.shutdown.cancelled() => break,
                event = rx.recv() => event,
            };
            match event {
                Ok(PlayerEvent::TimelineChanged) => self.handle_timeline(),
                Ok(PlayerEvent::TracksChanged) => {
                    debug!("renderer track set changed");
                }
                Ok(PlayerEvent::Error(fault)) => self.handle_fault(fault).await,
                // `PlayerEvent` is non-exhaustive; renderer additions are
                // ignored until the session learns about them.
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "renderer event stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        debug!("session event loop exited");
    }

    fn handle_timeline(&self) {
        let Some(snapshot) = self.inner.player.current_manifest() else {
            debug!("timeline changed with no manifest loaded");
            return;
        };

        let catalog = QualityCatalog::build(
            &snapshot.variants,
            snapshot.live,
            self.inner.config.auto_available,
            &self.inner.config.strings,
        );
        self.inner.machine.lock().install_catalog(catalog);
        self.inner.events.emit_qualities_changed();

        self.inner.guard.on_timeline_changed(&snapshot);
    }

    async fn handle_fault(&self, fault: skein_player::PlayerFault) {
        let (kind, action) = classify_fault(
            &fault,
            self.inner.config.live,
            self.inner.token_downgraded.load(Ordering::Acquire),
        );
        warn!(message = %fault.message, ?kind, ?action, "renderer fault");
        *self.inner.last_error.lock() = Some(kind);
        self.inner.events.emit_playback_error(kind, action);

        match action {
            RecoveryAction::RestartAfter(delay) => {
                tokio::time::sleep(delay).await;
                if self.inner.shutdown.is_cancelled() {
                    return;
                }
                info!("restarting live source after fault");
                self.inner.player.prepare();
                self.inner.player.play(true);
            }
            RecoveryAction::DowngradeToken => {
                // The embedding app swaps the access token and reloads; the
                // session just ensures the downgrade is spent only once.
                self.inner.token_downgraded.store(true, Ordering::Release);
            }
            RecoveryAction::Remediate | RecoveryAction::Surface => {}
        }
    }

    /// Quality labels in display order plus the currently selected index.
    pub fn get_qualities(&self) -> (Vec<String>, Option<usize>) {
        self.inner.machine.lock().qualities()
    }

    pub fn change_quality(&self, index: usize) -> SessionResult<()> {
        let label = {
            let mut machine = self.inner.machine.lock();
            machine.select_quality(index)?;
            machine
                .catalog()
                .get(index)
                .map(|e| e.label.clone())
        };
        if let Some(label) = label {
            self.inner.events.emit_quality_selected(&label);
        }
        Ok(())
    }

    pub fn start_audio_only(&self) {
        self.inner.machine.lock().enter_audio_only();
    }

    /// Toggle between audio-only and the mode active before it.
    pub fn switch_audio_mode(&self) -> SessionResult<()> {
        self.inner.machine.lock().switch_audio_mode()
    }

    pub fn move_to_background(&self) {
        self.inner.machine.lock().move_to_background();
    }

    pub fn move_to_foreground(&self) {
        self.inner.machine.lock().move_to_foreground();
    }

    /// Title tag of the newest manifest segment, for diagnostics overlays.
    pub fn last_segment_tag(&self) -> Option<String> {
        self.inner.guard.last_segment_tag()
    }

    /// Numeric code of the most recent playback error, where one exists.
    pub fn error_code(&self) -> Option<i32> {
        (*self.inner.last_error.lock()).and_then(|kind| kind.code())
    }

    /// Tear the session down: close any proxy window, stop the renderer,
    /// end the event loop.
    pub fn stop(&self) {
        info!("stopping session");
        self.inner.shutdown.cancel();
        self.inner.guard.stop_proxy();
        self.inner.player.stop();
    }
}
