//! Playback attempt record and its state set.

use serde::Serialize;
use std::fmt;

/// Where a playback attempt currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Idle,
    Attempting,
    Buffering,
    Playing,
    /// Transient: immediately followed by a retry or an escalation
    Failed,
    Escalating,
    Redirected,
}

impl PlaybackState {
    /// `Playing` and `Redirected` end an attempt; nothing may move it afterwards
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Playing | Self::Redirected)
    }

    /// Still waiting for the engine to start (deadlines are meaningful)
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Attempting | Self::Buffering | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Attempting => "attempting",
            Self::Buffering => "buffering",
            Self::Playing => "playing",
            Self::Failed => "failed",
            Self::Escalating => "escalating",
            Self::Redirected => "redirected",
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable record of one end-to-end effort to play a source URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackAttempt {
    /// Identity of this attempt; bumped on every `start` and on `cancel`
    pub generation: u64,
    /// Decoded target URL exactly as received
    pub source_url: String,
    /// URL last handed to the engine, possibly carrying a cache-busting token
    pub attempt_url: String,
    pub state: PlaybackState,
    pub retry_count: u32,
    pub has_escalated: bool,
}

impl PlaybackAttempt {
    pub fn new(generation: u64, source_url: impl Into<String>, attempt_url: impl Into<String>) -> Self {
        Self {
            generation,
            source_url: source_url.into(),
            attempt_url: attempt_url.into(),
            state: PlaybackState::Idle,
            retry_count: 0,
            has_escalated: false,
        }
    }
}
