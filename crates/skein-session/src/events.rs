use tokio::sync::broadcast;

use crate::ads::AdMitigationKind;
use crate::error::{PlaybackErrorKind, RecoveryAction};

#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum SessionEvent {
    /// A new quality catalog was built from the latest manifest.
    QualitiesChanged,
    QualitySelected {
        label: String,
    },
    AdStarted {
        mitigation: AdMitigationKind,
    },
    AdEnded,
    /// A proxy window closed, either cleanly or by exhausting its probes.
    ProxyWindowEnded {
        suppressed: bool,
    },
    PlaybackError {
        kind: PlaybackErrorKind,
        action: RecoveryAction,
    },
}

#[derive(Clone)]
pub struct SessionEvents {
    tx: broadcast::Sender<SessionEvent>,
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new(64)
    }
}

impl SessionEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub fn emit_qualities_changed(&self) {
        let _ = self.tx.send(SessionEvent::QualitiesChanged);
    }

    pub fn emit_quality_selected(&self, label: &str) {
        let _ = self.tx.send(SessionEvent::QualitySelected {
            label: label.to_owned(),
        });
    }

    pub fn emit_ad_started(&self, mitigation: AdMitigationKind) {
        let _ = self.tx.send(SessionEvent::AdStarted { mitigation });
    }

    pub fn emit_ad_ended(&self) {
        let _ = self.tx.send(SessionEvent::AdEnded);
    }

    pub fn emit_proxy_window_ended(&self, suppressed: bool) {
        let _ = self.tx.send(SessionEvent::ProxyWindowEnded { suppressed });
    }

    pub fn emit_playback_error(&self, kind: PlaybackErrorKind, action: RecoveryAction) {
        let _ = self.tx.send(SessionEvent::PlaybackError { kind, action });
    }
}
