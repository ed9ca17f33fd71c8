#![forbid(unsafe_code)]

//! Playback orchestration for one streaming session.
//!
//! Owns the quality/track state machine ([`PlaybackModeMachine`]), the
//! level-triggered ad detector with its mitigation windows ([`AdGuard`]),
//! and the session facade wiring both to renderer notifications
//! ([`PlaybackSession`]). All state lives in one owned session object whose
//! lifecycle is a single active playback, never process-wide.

pub mod ads;
pub mod error;
pub mod events;
pub mod machine;
pub mod prefs;
pub mod session;

pub use ads::{AdGuard, AdGuardConfig, AdMitigationKind, PlaylistProxy};
pub use error::{
    classify_fault, PlaybackErrorKind, RecoveryAction, SessionError, SessionResult,
    INTEGRITY_FAILURE_MARKER,
};
pub use events::{SessionEvent, SessionEvents};
pub use machine::{PlaybackMode, PlaybackModeMachine, QualitySelection};
pub use prefs::{BackgroundPolicy, DefaultQuality, PlayerPrefs, SettingsStore, QUALITY_KEY};
pub use session::{PlaybackSession, SessionConfig};
