#![forbid(unsafe_code)]

//! The renderer capability surface.
//!
//! The orchestration core treats the underlying media renderer as a black
//! box: load a source, play/pause/seek, query position and speed, override
//! or disable track selections, and observe change notifications. Nothing
//! here decodes media or touches the network.

pub mod events;
pub mod player;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod fake;

pub use events::{PlayerEvent, PlayerFault};
pub use player::Player;
pub use types::{LiveConfig, SourceSpec, TrackSelection, TrackType};
