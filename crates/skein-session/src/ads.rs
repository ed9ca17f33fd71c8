use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use skein_manifest::{AdRules, ManifestSnapshot};
use skein_player::{Player, SourceSpec, TrackType};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::error::SessionResult;
use crate::events::SessionEvents;

/// How an active ad window is being mitigated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdMitigationKind {
    /// Playback was rerouted through an ad-free proxy playlist.
    Proxy,
    /// No proxy available (or suppressed); the ad plays muted.
    Mute,
}

/// Ad-free playlist escape hatch. The embedding app supplies the transport;
/// the guard only drives the window lifecycle.
#[async_trait]
pub trait PlaylistProxy: Send + Sync + 'static {
    /// Resolve the proxied (ad-free) playlist for the current stream.
    async fn proxied_playlist(&self) -> SessionResult<Url>;

    /// Probe whether the direct playlist is serving content again. `true`
    /// means clean, no ad markers.
    async fn probe_direct(&self) -> SessionResult<bool>;
}

#[derive(Clone, Debug)]
pub struct AdGuardConfig {
    /// How many direct-playlist probes one proxy window may spend.
    pub probe_budget: u32,
    pub probe_interval: Duration,
    /// Mute the renderer while an ad plays without a proxy.
    pub mute_on_ad: bool,
    /// Also blank the video track during a muted ad.
    pub hide_video_on_ad: bool,
}

impl Default for AdGuardConfig {
    fn default() -> Self {
        Self {
            probe_budget: 10,
            probe_interval: Duration::from_secs(10),
            mute_on_ad: true,
            hide_video_on_ad: false,
        }
    }
}

impl AdGuardConfig {
    pub fn with_probe_budget(mut self, budget: u32) -> Self {
        self.probe_budget = budget;
        self
    }

    pub fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }

    pub fn with_mute_on_ad(mut self, mute: bool) -> Self {
        self.mute_on_ad = mute;
        self
    }

    pub fn with_hide_video_on_ad(mut self, hide: bool) -> Self {
        self.hide_video_on_ad = hide;
        self
    }
}

enum Mitigation {
    None,
    Muted {
        previous_volume: f32,
        video_disabled: bool,
    },
    Proxy {
        cancel: CancellationToken,
    },
}

struct GuardState {
    /// Level-trigger memory: whether the previous timeline scan saw an ad.
    was_ad: bool,
    mitigation: Mitigation,
    /// Set once a proxy window ends without the direct playlist coming back
    /// clean; no further proxy windows are opened for this session.
    proxy_suppressed: bool,
    last_segment_tag: Option<String>,
    direct_source: Option<SourceSpec>,
}

struct GuardInner {
    player: Arc<dyn Player>,
    rules: AdRules,
    config: AdGuardConfig,
    proxy: Option<Arc<dyn PlaylistProxy>>,
    events: SessionEvents,
    state: Mutex<GuardState>,
}

/// Level-triggered ad detector plus mitigation driver.
///
/// Fed the manifest snapshot on every timeline change; reacts only to the
/// ad/no-ad edges. Cheap to clone, all clones share the window state.
#[derive(Clone)]
pub struct AdGuard {
    inner: Arc<GuardInner>,
}

impl AdGuard {
    pub fn new(
        player: Arc<dyn Player>,
        rules: AdRules,
        config: AdGuardConfig,
        proxy: Option<Arc<dyn PlaylistProxy>>,
        events: SessionEvents,
    ) -> Self {
        Self {
            inner: Arc::new(GuardInner {
                player,
                rules,
                config,
                proxy,
                events,
                state: Mutex::new(GuardState {
                    was_ad: false,
                    mitigation: Mitigation::None,
                    proxy_suppressed: false,
                    last_segment_tag: None,
                    direct_source: None,
                }),
            }),
        }
    }

    /// Remember the source the session attached directly, the restore target
    /// when a proxy window closes.
    pub fn set_direct_source(&self, source: SourceSpec) {
        self.inner.state.lock().direct_source = Some(source);
    }

    /// Title tag of the newest segment seen, for diagnostics.
    pub fn last_segment_tag(&self) -> Option<String> {
        self.inner.state.lock().last_segment_tag.clone()
    }

    /// Scan one manifest snapshot. Ads are only mitigated on live streams;
    /// VOD timelines just refresh the segment tag.
    pub fn on_timeline_changed(&self, snapshot: &ManifestSnapshot) {
        self.inner.state.lock().last_segment_tag =
            snapshot.last_segment_tag().map(str::to_owned);

        if !snapshot.live {
            return;
        }

        let is_ad = self.inner.rules.detect(snapshot).is_some();
        let was_ad = {
            let mut state = self.inner.state.lock();
            std::mem::replace(&mut state.was_ad, is_ad)
        };

        match (was_ad, is_ad) {
            (false, true) => self.ad_started(),
            (true, false) => self.ad_ended(),
            _ => {}
        }
    }

    /// Abort an open proxy window on user request. The window counts as
    /// unsuccessful, so later ads fall back to muting.
    pub fn stop_proxy(&self) {
        let cancel = {
            let mut state = self.inner.state.lock();
            match &state.mitigation {
                Mitigation::Proxy { cancel } => {
                    let cancel = cancel.clone();
                    state.mitigation = Mitigation::None;
                    state.proxy_suppressed = true;
                    Some(cancel)
                }
                _ => None,
            }
        };

        if let Some(cancel) = cancel {
            debug!("proxy window stopped by user");
            cancel.cancel();
            self.restore_direct();
            self.inner.events.emit_proxy_window_ended(true);
        }
    }

    fn ad_started(&self) {
        let open_proxy = {
            let state = self.inner.state.lock();
            self.inner.proxy.is_some() && !state.proxy_suppressed
        };

        if open_proxy {
            debug!("ad window opened, rerouting through proxy playlist");
            let cancel = CancellationToken::new();
            self.inner.state.lock().mitigation = Mitigation::Proxy {
                cancel: cancel.clone(),
            };
            self.inner.events.emit_ad_started(AdMitigationKind::Proxy);

            let guard = self.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = guard.run_proxy_window() => {}
                }
            });
        } else {
            self.start_mute();
        }
    }

    fn ad_ended(&self) {
        let muted = {
            let mut state = self.inner.state.lock();
            match state.mitigation {
                Mitigation::Muted {
                    previous_volume,
                    video_disabled,
                } => {
                    state.mitigation = Mitigation::None;
                    Some((previous_volume, video_disabled))
                }
                // A proxy window outlives the manifest's ad markers; the
                // probe loop decides when to return to the direct playlist.
                _ => None,
            }
        };

        // Only a mute is undone here; a proxy window signals its own end
        // (`ProxyWindowEnded`) once the probe loop closes it.
        if let Some((previous_volume, video_disabled)) = muted {
            debug!("ad window closed, unmuting");
            if self.inner.config.mute_on_ad {
                self.inner.player.set_volume(previous_volume);
            }
            if video_disabled {
                self.inner.player.set_track_disabled(TrackType::Video, false);
            }
            self.inner.events.emit_ad_ended();
        }
    }

    async fn run_proxy_window(&self) {
        let Some(proxy) = self.inner.proxy.clone() else {
            return;
        };

        let proxied = match proxy.proxied_playlist().await {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "proxied playlist unavailable, falling back to mute");
                self.inner.state.lock().proxy_suppressed = true;
                self.start_mute();
                return;
            }
        };

        self.inner.player.set_source(SourceSpec::new(proxied));
        self.inner.player.prepare();
        self.inner.player.play(true);

        for attempt in 1..=self.inner.config.probe_budget {
            tokio::time::sleep(self.inner.config.probe_interval).await;
            match proxy.probe_direct().await {
                Ok(true) => {
                    debug!(attempt, "direct playlist clean, closing proxy window");
                    self.finish_proxy(false);
                    return;
                }
                Ok(false) => {}
                Err(e) => warn!(attempt, error = %e, "direct playlist probe failed"),
            }
        }

        warn!(
            budget = self.inner.config.probe_budget,
            "probe budget exhausted, suppressing proxy for this session"
        );
        self.finish_proxy(true);
    }

    fn start_mute(&self) {
        debug!("ad window opened, muting");
        let previous_volume = self.inner.player.volume();
        if self.inner.config.mute_on_ad {
            self.inner.player.set_volume(0.0);
        }
        let video_disabled = self.inner.config.hide_video_on_ad;
        if video_disabled {
            self.inner.player.set_track_disabled(TrackType::Video, true);
        }
        self.inner.state.lock().mitigation = Mitigation::Muted {
            previous_volume,
            video_disabled,
        };
        self.inner.events.emit_ad_started(AdMitigationKind::Mute);
    }

    fn finish_proxy(&self, suppressed: bool) {
        {
            let mut state = self.inner.state.lock();
            state.mitigation = Mitigation::None;
            if suppressed {
                state.proxy_suppressed = true;
            }
        }
        self.restore_direct();
        self.inner.events.emit_proxy_window_ended(suppressed);
    }

    fn restore_direct(&self) {
        let direct = self.inner.state.lock().direct_source.clone();
        match direct {
            Some(source) => {
                self.inner.player.set_source(source);
                self.inner.player.prepare();
                self.inner.player.play(true);
            }
            None => warn!("no direct source recorded to restore after proxy window"),
        }
    }
}
