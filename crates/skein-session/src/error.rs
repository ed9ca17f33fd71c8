use std::time::Duration;

use skein_player::PlayerFault;
use thiserror::Error;

/// Distinguished error text reported by the platform's anti-abuse check.
/// It short-circuits normal retry and requests out-of-band remediation.
pub const INTEGRITY_FAILURE_MARKER: &str = "failed integrity check";

/// Delay before a live source is restarted after a renderer fault.
pub const LIVE_RESTART_DELAY: Duration = Duration::from_millis(1500);

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("quality index {0} out of range")]
    InvalidQualityIndex(usize),

    #[error("playlist proxy: {0}")]
    Proxy(String),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Classified cause of a renderer playback error, surfaced to the UI layer
/// as a small enum instead of a raw exception chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackErrorKind {
    /// The transport wrapped an HTTP response code.
    Http(u16),
    /// Anti-abuse integrity failure; see [`INTEGRITY_FAILURE_MARKER`].
    Integrity,
    /// Anything else the renderer reported.
    Renderer,
}

impl PlaybackErrorKind {
    /// Numeric code for collaborators that only want an int.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Http(status) => Some(i32::from(*status)),
            Self::Integrity | Self::Renderer => None,
        }
    }
}

/// What the session does about a classified fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Live sources restart after a short fixed delay.
    RestartAfter(Duration),
    /// VODs first retry with a degraded access-token strategy.
    DowngradeToken,
    /// Integrity failures need an out-of-band remediation step before any
    /// retry may resume.
    Remediate,
    /// Give up and show the user a playback error.
    Surface,
}

/// Map a renderer fault to its kind and the recovery the session takes.
///
/// `token_downgraded` says whether the degraded-token retry was already
/// spent for this session.
pub fn classify_fault(
    fault: &PlayerFault,
    live: bool,
    token_downgraded: bool,
) -> (PlaybackErrorKind, RecoveryAction) {
    if fault.message.contains(INTEGRITY_FAILURE_MARKER) {
        return (PlaybackErrorKind::Integrity, RecoveryAction::Remediate);
    }

    let kind = fault
        .http_status
        .map(PlaybackErrorKind::Http)
        .unwrap_or(PlaybackErrorKind::Renderer);

    let action = if live {
        RecoveryAction::RestartAfter(LIVE_RESTART_DELAY)
    } else if !token_downgraded {
        RecoveryAction::DowngradeToken
    } else {
        RecoveryAction::Surface
    };

    (kind, action)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn integrity_marker_short_circuits_retry() {
        let fault = PlayerFault::new("request failed integrity check").with_http_status(403);
        let (kind, action) = classify_fault(&fault, false, false);
        assert_eq!(kind, PlaybackErrorKind::Integrity);
        assert_eq!(action, RecoveryAction::Remediate);
    }

    #[rstest]
    #[case(true, false, RecoveryAction::RestartAfter(LIVE_RESTART_DELAY))]
    #[case(true, true, RecoveryAction::RestartAfter(LIVE_RESTART_DELAY))]
    #[case(false, false, RecoveryAction::DowngradeToken)]
    #[case(false, true, RecoveryAction::Surface)]
    fn recovery_follows_liveness_and_token_state(
        #[case] live: bool,
        #[case] token_downgraded: bool,
        #[case] expected: RecoveryAction,
    ) {
        let fault = PlayerFault::new("source error").with_http_status(404);
        let (kind, action) = classify_fault(&fault, live, token_downgraded);
        assert_eq!(kind, PlaybackErrorKind::Http(404));
        assert_eq!(action, expected);
    }

    #[test]
    fn renderer_fault_without_status_has_no_code() {
        let fault = PlayerFault::new("decoder died");
        let (kind, _) = classify_fault(&fault, false, true);
        assert_eq!(kind, PlaybackErrorKind::Renderer);
        assert_eq!(kind.code(), None);
    }
}
