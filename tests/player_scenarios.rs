use dramashort::config::PlayerConfig;
use dramashort::player::{
    Clock, EngineEvent, FallbackOpener, LoadTicket, ManualClock, PlaybackEngine, PlaybackState,
    PlayerController,
};
use proptest::prelude::*;
use std::time::Duration;

#[derive(Default)]
struct RecordingEngine {
    loads: Vec<String>,
    stops: usize,
}

impl PlaybackEngine for RecordingEngine {
    fn load(&mut self, _ticket: LoadTicket, url: &str) {
        self.loads.push(url.to_string());
    }

    fn stop(&mut self) {
        self.stops += 1;
    }
}

#[derive(Default)]
struct RecordingOpener {
    opened: Vec<String>,
    ticks: Vec<u32>,
    dismissed: usize,
}

impl FallbackOpener for RecordingOpener {
    fn open(&mut self, url: &str) {
        self.opened.push(url.to_string());
    }

    fn countdown(&mut self, remaining_secs: u32) {
        self.ticks.push(remaining_secs);
    }

    fn dismiss(&mut self) {
        self.dismissed += 1;
    }
}

type TestController = PlayerController<ManualClock, RecordingEngine, RecordingOpener>;

const SOURCE: &str = "https://cdn.example/drama/ep1.m3u8?sig=abc%2Fdef";

fn controller(config: PlayerConfig) -> TestController {
    PlayerController::new(
        config,
        ManualClock::new(),
        RecordingEngine::default(),
        RecordingOpener::default(),
    )
}

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

#[test]
fn transient_failure_recovers_with_one_retry() {
    let mut ctrl = controller(PlayerConfig::default());
    ctrl.start(SOURCE);

    ctrl.advance(Duration::from_millis(500));
    ctrl.on_engine_event(EngineEvent::Error);
    assert_eq!(ctrl.retry_count(), 1);
    assert_eq!(ctrl.state(), Some(PlaybackState::Attempting));

    ctrl.advance(Duration::from_millis(500));
    ctrl.on_engine_event(EngineEvent::Loaded);
    assert_eq!(ctrl.state(), Some(PlaybackState::Playing));
    assert_eq!(ctrl.armed_timers(), 0);

    ctrl.advance(secs(60));
    assert_eq!(ctrl.state(), Some(PlaybackState::Playing));
    assert!(ctrl.opener().opened.is_empty());
    assert!(ctrl.opener().ticks.is_empty());

    let loads = &ctrl.engine().loads;
    assert_eq!(loads.len(), 2);
    assert_eq!(loads[0], SOURCE);
    assert!(loads[1].starts_with("https://cdn.example/drama/ep1.m3u8?sig=abc%2Fdef&_cb="));
}

#[test]
fn silent_engine_escalates_then_opens_source() {
    let mut ctrl = controller(PlayerConfig::default());
    ctrl.start(SOURCE);

    ctrl.advance(Duration::from_millis(3999));
    assert_eq!(ctrl.state(), Some(PlaybackState::Attempting));

    ctrl.advance(Duration::from_millis(1));
    assert_eq!(ctrl.state(), Some(PlaybackState::Escalating));
    assert!(ctrl.has_escalated());
    assert_eq!(ctrl.countdown_remaining(), 3);
    assert!(ctrl.opener().opened.is_empty());

    ctrl.advance(Duration::from_millis(2999));
    assert!(ctrl.opener().opened.is_empty());

    ctrl.advance(Duration::from_millis(1));
    assert_eq!(ctrl.opener().opened, [SOURCE]);
    assert_eq!(ctrl.opener().ticks, [3, 2, 1, 0]);
    assert_eq!(ctrl.state(), Some(PlaybackState::Redirected));
    assert_eq!(ctrl.clock().now(), secs(7));

    ctrl.advance(secs(60));
    assert_eq!(ctrl.opener().opened.len(), 1);
}

#[test]
fn hard_deadline_bounds_a_slowly_failing_engine() {
    // Each error comes just before the stall deadline, so only the hard one can end it.
    let config = PlayerConfig {
        max_retries: 10,
        ..PlayerConfig::default()
    };
    let mut ctrl = controller(config);
    ctrl.start(SOURCE);

    for _ in 0..3 {
        ctrl.advance(Duration::from_millis(3500));
        if ctrl.state() == Some(PlaybackState::Attempting) {
            ctrl.on_engine_event(EngineEvent::Error);
        }
    }
    assert_eq!(ctrl.state(), Some(PlaybackState::Escalating));
    assert_eq!(ctrl.retry_count(), 2);
    ctrl.advance(secs(3));
    assert_eq!(ctrl.opener().opened, [SOURCE]);
}

#[test]
fn exhausted_retries_escalate_without_waiting_for_deadlines() {
    let mut ctrl = controller(PlayerConfig::default());
    ctrl.start(SOURCE);
    for _ in 0..3 {
        ctrl.on_engine_event(EngineEvent::Error);
    }
    assert_eq!(ctrl.retry_count(), 2);
    assert_eq!(ctrl.state(), Some(PlaybackState::Escalating));
    assert_eq!(ctrl.engine().loads.len(), 3);
    assert_eq!(ctrl.clock().now(), Duration::ZERO);
}

#[test]
fn engine_error_after_playing_is_ignored() {
    let mut ctrl = controller(PlayerConfig::default());
    ctrl.start(SOURCE);
    ctrl.on_engine_event(EngineEvent::Playing);
    ctrl.on_engine_event(EngineEvent::Error);
    ctrl.on_engine_event(EngineEvent::Buffering);
    assert_eq!(ctrl.state(), Some(PlaybackState::Playing));
    assert_eq!(ctrl.retry_count(), 0);
    assert_eq!(ctrl.engine().loads.len(), 1);
}

#[test]
fn escalation_opens_at_most_once() {
    let mut ctrl = controller(PlayerConfig::default());
    ctrl.start(SOURCE);
    ctrl.escalate();
    ctrl.escalate();
    ctrl.on_stall_deadline();
    ctrl.on_hard_deadline();
    ctrl.advance(secs(3));
    ctrl.escalate();
    ctrl.open_now();
    ctrl.advance(secs(30));
    assert_eq!(ctrl.opener().opened, [SOURCE]);
    assert_eq!(ctrl.opener().ticks, [3, 2, 1, 0]);
}

#[test]
fn open_now_pre_empts_countdown() {
    let mut ctrl = controller(PlayerConfig::default());
    ctrl.start(SOURCE);
    ctrl.advance(secs(4));
    ctrl.advance(secs(1));
    ctrl.open_now();
    assert_eq!(ctrl.opener().opened, [SOURCE]);
    assert_eq!(ctrl.state(), Some(PlaybackState::Redirected));
    assert_eq!(ctrl.armed_timers(), 0);
    ctrl.advance(secs(10));
    assert_eq!(ctrl.opener().opened.len(), 1);
}

#[test]
fn open_now_outside_escalation_does_nothing() {
    let mut ctrl = controller(PlayerConfig::default());
    ctrl.start(SOURCE);
    ctrl.open_now();
    assert_eq!(ctrl.state(), Some(PlaybackState::Attempting));
    assert!(ctrl.opener().opened.is_empty());
}

#[test]
fn fallback_opens_the_untouched_source_after_retries() {
    let mut ctrl = controller(PlayerConfig::default());
    ctrl.start(SOURCE);
    ctrl.on_engine_event(EngineEvent::Error);
    ctrl.on_engine_event(EngineEvent::Error);
    assert!(ctrl.attempt().unwrap().attempt_url.contains("_cb="));
    ctrl.advance(secs(20));
    assert_eq!(ctrl.opener().opened, [SOURCE]);
}

#[test]
fn manual_retry_restores_budget_and_deadlines() {
    let mut ctrl = controller(PlayerConfig::default());
    ctrl.start(SOURCE);
    for _ in 0..3 {
        ctrl.on_engine_event(EngineEvent::Error);
    }
    assert_eq!(ctrl.state(), Some(PlaybackState::Escalating));

    ctrl.advance(secs(1));
    ctrl.manual_retry();
    assert_eq!(ctrl.state(), Some(PlaybackState::Attempting));
    assert_eq!(ctrl.retry_count(), 0);
    assert!(!ctrl.has_escalated());
    assert_eq!(ctrl.opener().dismissed, 1);
    assert_eq!(ctrl.armed_timers(), 2);

    let attempt = ctrl.attempt().unwrap();
    assert_eq!(attempt.source_url, SOURCE);
    assert_ne!(attempt.attempt_url, SOURCE);

    // The old countdown must not fire into the new attempt.
    ctrl.advance(Duration::from_millis(3999));
    assert!(ctrl.opener().opened.is_empty());
    assert_eq!(ctrl.state(), Some(PlaybackState::Attempting));

    ctrl.on_engine_event(EngineEvent::Playing);
    ctrl.advance(secs(60));
    assert!(ctrl.opener().opened.is_empty());
}

#[test]
fn cancel_makes_everything_inert() {
    let mut ctrl = controller(PlayerConfig::default());
    ctrl.start(SOURCE);
    ctrl.advance(secs(5));
    assert_eq!(ctrl.state(), Some(PlaybackState::Escalating));
    let ticks_before = ctrl.opener().ticks.len();

    ctrl.cancel();
    ctrl.advance(secs(60));
    ctrl.on_engine_event(EngineEvent::Error);
    ctrl.escalate();
    ctrl.open_now();
    ctrl.manual_retry();

    assert!(ctrl.opener().opened.is_empty());
    assert_eq!(ctrl.opener().ticks.len(), ticks_before);
    assert_eq!(ctrl.engine().loads.len(), 1);
    assert_eq!(ctrl.engine().stops, 1);
    assert_eq!(ctrl.armed_timers(), 0);
    assert_eq!(ctrl.clock().pending_count(), 0);
}

proptest! {
    #[test]
    fn playback_before_stall_deadline_never_falls_back(
        path in "[a-z0-9/]{1,24}",
        query in proptest::option::of("[a-z]{1,6}=[a-zA-Z0-9%]{0,12}"),
        started_after_ms in 0u64..4000,
    ) {
        let source = match query {
            Some(q) => format!("https://cdn.example/{path}?{q}"),
            None => format!("https://cdn.example/{path}"),
        };
        let mut ctrl = controller(PlayerConfig::default());
        ctrl.start(&source);
        ctrl.advance(Duration::from_millis(started_after_ms));
        ctrl.on_engine_event(EngineEvent::Playing);
        ctrl.advance(secs(120));

        prop_assert_eq!(ctrl.state(), Some(PlaybackState::Playing));
        prop_assert!(ctrl.opener().opened.is_empty());
        prop_assert!(!ctrl.has_escalated());
    }

    #[test]
    fn every_retry_loads_a_distinct_url(max_retries in 1u32..8) {
        let config = PlayerConfig { max_retries, ..PlayerConfig::default() };
        let mut ctrl = controller(config);
        ctrl.start(SOURCE);
        for _ in 0..=max_retries {
            ctrl.on_engine_event(EngineEvent::Error);
        }

        let loads = &ctrl.engine().loads;
        prop_assert_eq!(loads.len(), max_retries as usize + 1);
        let mut unique = loads.clone();
        unique.sort();
        unique.dedup();
        prop_assert_eq!(unique.len(), loads.len());
        prop_assert_eq!(ctrl.state(), Some(PlaybackState::Escalating));
    }

    #[test]
    fn deadlines_always_terminate(
        stall_ms in 1u64..10_000,
        extra_ms in 0u64..10_000,
        countdown_ms in 0u64..5_000,
    ) {
        let config = PlayerConfig {
            stall_deadline: Duration::from_millis(stall_ms),
            hard_deadline: Duration::from_millis(stall_ms + extra_ms),
            escalation_countdown: Duration::from_millis(countdown_ms),
            ..PlayerConfig::default()
        };
        let mut ctrl = controller(config);
        ctrl.start(SOURCE);
        ctrl.advance(Duration::from_millis(stall_ms + countdown_ms));

        prop_assert_eq!(ctrl.state(), Some(PlaybackState::Redirected));
        prop_assert_eq!(ctrl.opener().opened.len(), 1);
        prop_assert_eq!(ctrl.clock().pending_count(), 0);
    }
}
