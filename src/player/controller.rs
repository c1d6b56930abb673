//! Resilient player controller
//!
//! Drives one playback attempt at a time to either `Playing` or a single
//! escalation that opens the original URL through the fallback channel.
//!
//! Engines may stay silent forever on cross-origin or DRM-restricted media,
//! so termination never depends on engine events: a stall deadline (re-armed
//! on every automatic retry) and a hard deadline (absolute from `start`) race
//! against the engine, and whichever side loses is ignored.
//!
//! Every timer and engine report carries the identity of the attempt and load
//! it was created for. Handlers drop anything that does not match the current
//! attempt, which is what makes `cancel` and `Playing` final even when a timer
//! fired just before it was cancelled.

use std::time::Duration;
use tracing::{debug, info, trace, warn};

use crate::config::PlayerConfig;

use super::{
    attempt::{PlaybackAttempt, PlaybackState},
    cache_bust::CacheBuster,
    clock::{Clock, ManualClock, Timer, TimerHandle, TimerKind},
    engine::{EngineEvent, EngineReport, LoadTicket, PlaybackEngine},
    fallback::FallbackOpener,
};

const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy)]
struct Armed {
    handle: TimerHandle,
    seq: u64,
}

pub struct PlayerController<C, E, F> {
    config: PlayerConfig,
    clock: C,
    engine: E,
    opener: F,
    buster: CacheBuster,
    attempt: Option<PlaybackAttempt>,
    generation: u64,
    next_seq: u64,
    next_ticket: u64,
    current_ticket: Option<LoadTicket>,
    stall: Option<Armed>,
    hard: Option<Armed>,
    countdown: Option<Armed>,
    countdown_remaining: u32,
    cancelled: bool,
}

impl<C: Clock, E: PlaybackEngine, F: FallbackOpener> PlayerController<C, E, F> {
    pub fn new(config: PlayerConfig, clock: C, engine: E, opener: F) -> Self {
        let buster = CacheBuster::new(config.cache_bust_param.clone());
        Self {
            config,
            clock,
            engine,
            opener,
            buster,
            attempt: None,
            generation: 0,
            next_seq: 0,
            next_ticket: 0,
            current_ticket: None,
            stall: None,
            hard: None,
            countdown: None,
            countdown_remaining: 0,
            cancelled: false,
        }
    }

    /// Begin a fresh attempt for `source_url`. The caller guarantees the URL
    /// is non-empty; the page boundary rejects empty ones with a 400.
    pub fn start(&mut self, source_url: &str) {
        info!("Starting playback attempt for {}", source_url);
        self.begin_attempt(source_url.to_string(), source_url.to_string());
    }

    /// User asked to try again from the escalation overlay: new attempt,
    /// retry budget restored, fresh cache-busting token.
    pub fn manual_retry(&mut self) {
        if self.cancelled {
            return;
        }
        let Some(source_url) = self.attempt.as_ref().map(|a| a.source_url.clone()) else {
            return;
        };
        info!("Manual retry requested");
        self.opener.dismiss();
        let attempt_url = self.buster.bust(&source_url);
        self.begin_attempt(source_url, attempt_url);
    }

    /// Report from an engine; dropped when it belongs to an earlier load
    pub fn on_engine_report(&mut self, report: EngineReport) {
        if self.current_ticket != Some(report.ticket) {
            trace!(?report, "Dropping stale engine report");
            return;
        }
        self.on_engine_event(report.event);
    }

    pub fn on_engine_event(&mut self, event: EngineEvent) {
        if self.cancelled {
            return;
        }
        let Some(state) = self.state() else {
            return;
        };
        match event {
            EngineEvent::Loaded | EngineEvent::Playing => self.mark_playing(),
            EngineEvent::Buffering => {
                if state == PlaybackState::Attempting {
                    self.transition(PlaybackState::Buffering);
                }
            }
            EngineEvent::Error => {
                if state.is_pending() {
                    self.handle_failure();
                } else {
                    debug!(%state, "Ignoring engine error");
                }
            }
        }
    }

    /// Retry with a fresh cache-busting token while the budget lasts, else escalate
    pub fn handle_failure(&mut self) {
        if self.cancelled {
            return;
        }
        let max_retries = self.config.max_retries;
        let Some(attempt) = self.attempt.as_mut() else {
            return;
        };
        if !attempt.state.is_pending() {
            return;
        }
        attempt.state = PlaybackState::Failed;

        if attempt.retry_count >= max_retries {
            debug!(retries = attempt.retry_count, "Retry budget exhausted");
            self.escalate();
            return;
        }

        attempt.retry_count += 1;
        attempt.attempt_url = self.buster.bust(&attempt.source_url);
        warn!(
            retry = attempt.retry_count,
            max_retries,
            url = %attempt.attempt_url,
            "Playback failed, retrying"
        );
        attempt.state = PlaybackState::Attempting;
        self.load_engine();
        // The hard deadline keeps running from `start`.
        self.arm(TimerKind::Stall, self.config.stall_deadline);
    }

    pub fn on_stall_deadline(&mut self) {
        if self.cancelled {
            return;
        }
        if let Some(state) = self.state()
            && state != PlaybackState::Playing
        {
            debug!(%state, "Stall deadline reached");
            self.escalate();
        }
    }

    pub fn on_hard_deadline(&mut self) {
        if self.cancelled {
            return;
        }
        if let Some(state) = self.state()
            && state != PlaybackState::Playing
        {
            debug!(%state, "Hard deadline reached");
            self.escalate();
        }
    }

    /// Show the countdown and open the source URL when it runs out.
    /// Fires at most once per attempt.
    pub fn escalate(&mut self) {
        if self.cancelled {
            return;
        }
        let Some(attempt) = self.attempt.as_mut() else {
            return;
        };
        if attempt.has_escalated || attempt.state.is_terminal() {
            return;
        }
        attempt.has_escalated = true;
        warn!(
            retries = attempt.retry_count,
            "Playback did not start, escalating to fallback"
        );
        self.transition(PlaybackState::Escalating);
        self.disarm(TimerKind::Stall);
        self.disarm(TimerKind::Hard);

        let countdown = self.config.escalation_countdown;
        let whole_secs = countdown.as_millis().div_ceil(1000);
        self.countdown_remaining = u32::try_from(whole_secs).unwrap_or(u32::MAX);
        if self.countdown_remaining == 0 {
            self.redirect();
            return;
        }
        self.opener.countdown(self.countdown_remaining);
        // First tick absorbs any sub-second remainder so the last tick lands on the deadline.
        let first_tick = countdown.saturating_sub(COUNTDOWN_TICK * (self.countdown_remaining - 1));
        self.arm(TimerKind::Countdown, first_tick);
    }

    /// User pre-empted the countdown
    pub fn open_now(&mut self) {
        if self.cancelled {
            return;
        }
        if self.state() == Some(PlaybackState::Escalating) {
            info!("Opening source immediately");
            self.redirect();
        }
    }

    /// Page teardown: every pending timer and engine report becomes inert
    pub fn cancel(&mut self) {
        self.disarm_all();
        self.engine.stop();
        self.current_ticket = None;
        self.generation += 1;
        self.cancelled = true;
        debug!("Player controller cancelled");
    }

    /// Entry point for fired timers; stale ones are dropped
    pub fn on_timer(&mut self, timer: Timer) {
        if self.cancelled || timer.generation != self.generation {
            trace!(?timer, "Dropping timer from another attempt");
            return;
        }
        let slot = self.slot_mut(timer.kind);
        match *slot {
            Some(armed) if armed.seq == timer.seq => {
                *slot = None;
                self.clock.cancel(armed.handle);
            }
            _ => {
                trace!(?timer, "Dropping superseded timer");
                return;
            }
        }
        match timer.kind {
            TimerKind::Stall => self.on_stall_deadline(),
            TimerKind::Hard => self.on_hard_deadline(),
            TimerKind::Countdown => self.on_countdown_tick(),
        }
    }

    pub fn state(&self) -> Option<PlaybackState> {
        self.attempt.as_ref().map(|a| a.state)
    }

    pub fn attempt(&self) -> Option<&PlaybackAttempt> {
        self.attempt.as_ref()
    }

    pub fn retry_count(&self) -> u32 {
        self.attempt.as_ref().map_or(0, |a| a.retry_count)
    }

    pub fn has_escalated(&self) -> bool {
        self.attempt.as_ref().is_some_and(|a| a.has_escalated)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Seconds left on the escalation countdown, 0 when none is running
    pub fn countdown_remaining(&self) -> u32 {
        if self.countdown.is_some() {
            self.countdown_remaining
        } else {
            0
        }
    }

    pub fn armed_timers(&self) -> usize {
        [self.stall, self.hard, self.countdown]
            .iter()
            .filter(|slot| slot.is_some())
            .count()
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn opener(&self) -> &F {
        &self.opener
    }

    fn begin_attempt(&mut self, source_url: String, attempt_url: String) {
        self.disarm_all();
        self.cancelled = false;
        self.generation += 1;
        self.countdown_remaining = 0;
        self.attempt = Some(PlaybackAttempt::new(
            self.generation,
            source_url,
            attempt_url,
        ));
        self.transition(PlaybackState::Attempting);
        self.load_engine();
        self.arm(TimerKind::Stall, self.config.stall_deadline);
        self.arm(TimerKind::Hard, self.config.hard_deadline);
    }

    fn mark_playing(&mut self) {
        let Some(state) = self.state() else {
            return;
        };
        if state.is_terminal() {
            return;
        }
        self.disarm_all();
        self.transition(PlaybackState::Playing);
        if state == PlaybackState::Escalating {
            self.opener.dismiss();
        }
        info!(retries = self.retry_count(), "Playback started");
    }

    fn on_countdown_tick(&mut self) {
        if self.state() != Some(PlaybackState::Escalating) {
            return;
        }
        self.countdown_remaining = self.countdown_remaining.saturating_sub(1);
        self.opener.countdown(self.countdown_remaining);
        if self.countdown_remaining == 0 {
            self.redirect();
        } else {
            self.arm(TimerKind::Countdown, COUNTDOWN_TICK);
        }
    }

    /// Open the untouched source URL; the cache-busting token never leaks here
    fn redirect(&mut self) {
        self.disarm_all();
        self.engine.stop();
        self.current_ticket = None;
        let Some(source_url) = self.attempt.as_ref().map(|a| a.source_url.clone()) else {
            return;
        };
        self.opener.open(&source_url);
        self.transition(PlaybackState::Redirected);
        info!("Redirected to fallback: {}", source_url);
    }

    fn load_engine(&mut self) {
        let Some(url) = self.attempt.as_ref().map(|a| a.attempt_url.clone()) else {
            return;
        };
        self.next_ticket += 1;
        let ticket = LoadTicket(self.next_ticket);
        self.current_ticket = Some(ticket);
        self.engine.load(ticket, &url);
    }

    fn transition(&mut self, to: PlaybackState) {
        if let Some(attempt) = self.attempt.as_mut() {
            debug!(
                generation = attempt.generation,
                from = %attempt.state,
                %to,
                "Playback state transition"
            );
            attempt.state = to;
        }
    }

    fn slot_mut(&mut self, kind: TimerKind) -> &mut Option<Armed> {
        match kind {
            TimerKind::Stall => &mut self.stall,
            TimerKind::Hard => &mut self.hard,
            TimerKind::Countdown => &mut self.countdown,
        }
    }

    fn arm(&mut self, kind: TimerKind, after: Duration) {
        self.disarm(kind);
        self.next_seq += 1;
        let timer = Timer {
            kind,
            generation: self.generation,
            seq: self.next_seq,
        };
        let handle = self.clock.schedule(after, timer);
        *self.slot_mut(kind) = Some(Armed {
            handle,
            seq: timer.seq,
        });
    }

    fn disarm(&mut self, kind: TimerKind) {
        if let Some(armed) = self.slot_mut(kind).take() {
            self.clock.cancel(armed.handle);
        }
    }

    fn disarm_all(&mut self) {
        self.disarm(TimerKind::Stall);
        self.disarm(TimerKind::Hard);
        self.disarm(TimerKind::Countdown);
    }
}

impl<E: PlaybackEngine, F: FallbackOpener> PlayerController<ManualClock, E, F> {
    /// Move simulated time forward, firing every timer that falls due on the
    /// way (including ones scheduled by handlers along the way)
    pub fn advance(&mut self, by: Duration) {
        let until = self.clock.now() + by;
        while let Some(timer) = self.clock.pop_due(until) {
            self.on_timer(timer);
        }
        self.clock.set_now(until);
    }
}
