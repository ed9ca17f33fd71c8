#![forbid(unsafe_code)]

//! Time-synchronized chat replay.
//!
//! A replay cursor delivers chat events at the simulated wall-clock offset
//! matching an arbitrarily seekable, speed-scaled media timeline. The media
//! clock is external and read-only; the cursor polls it, schedules each
//! buffered message against it, and rebuilds its buffer wholesale whenever
//! the observed position drifts outside tolerance.
//!
//! Two variants share the same contract: [`ChatReplayCursor`] feeds from a
//! paginated, rate-limited network source (VODs); [`LocalChatReplay`] feeds
//! from a fully materialized in-memory list (downloaded recordings) and
//! additionally scales pending waits by a live speed factor.

pub mod config;
pub mod error;
pub mod local;
pub mod remote;
pub mod source;
pub mod types;

pub use config::ReplayConfig;
pub use error::{ReplayError, ReplayResult};
pub use local::LocalChatReplay;
pub use remote::ChatReplayCursor;
pub use source::{ChatPage, ChatSource, PlaybackClock};
pub use types::{Badge, ChatEvent, Emote, ReplayEvent};
