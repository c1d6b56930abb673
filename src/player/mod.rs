//! Resilient playback
//!
//! [`PlayerController`] is a single state machine parameterized by three
//! injected capabilities: a [`Clock`] for deadlines, a [`PlaybackEngine`]
//! that tries to buffer the media and a [`FallbackOpener`] that opens the
//! original URL when automated playback gives up. [`PlayerSession`] runs a
//! controller on a Tokio task for the command line; the browser page runs the
//! same machine in `static/player.js`, configured from [`PlayerConfig`].
//!
//! [`PlayerConfig`]: crate::config::PlayerConfig

pub mod attempt;
pub mod cache_bust;
pub mod clock;
pub mod controller;
pub mod engine;
pub mod fallback;
pub mod session;

pub use attempt::{PlaybackAttempt, PlaybackState};
pub use cache_bust::CacheBuster;
pub use clock::{Clock, ManualClock, Timer, TimerHandle, TimerKind, TokioClock};
pub use controller::PlayerController;
pub use engine::{EngineEvent, EngineReport, HttpProbeEngine, LoadTicket, PlaybackEngine};
pub use fallback::{CommandOpener, FallbackOpener};
pub use session::{PlaybackOutcome, PlayerCommand, PlayerSession};
