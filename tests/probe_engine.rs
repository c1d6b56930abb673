use axum::{Router, http::header, response::IntoResponse, routing::get};
use dramashort::config::PlayerConfig;
use dramashort::player::{
    EngineEvent, FallbackOpener, HttpProbeEngine, LoadTicket, PlaybackEngine, PlaybackOutcome,
    PlayerController, PlayerSession, TokioClock,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

async fn media() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "video/mp4")], vec![0u8; 64])
}

async fn manifest() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], "#EXTM3U\n")
}

async fn html_page() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/html")], "<html></html>")
}

async fn spawn_media_server() -> String {
    let app = Router::new()
        .route("/ep1.mp4", get(media))
        .route("/ep1.m3u8", get(manifest))
        .route("/blocked.mp4", get(html_page));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn probe(url: &str) -> Vec<EngineEvent> {
    let (mut engine, mut reports) = HttpProbeEngine::channel(reqwest::Client::new());
    engine.load(LoadTicket(7), url);
    let mut events = Vec::new();
    for _ in 0..2 {
        let report = tokio::time::timeout(Duration::from_secs(5), reports.recv())
            .await
            .expect("probe timed out")
            .expect("engine dropped");
        assert_eq!(report.ticket, LoadTicket(7));
        events.push(report.event);
    }
    events
}

#[tokio::test]
async fn media_response_is_loaded() {
    let base = spawn_media_server().await;
    assert_eq!(
        probe(&format!("{base}/ep1.mp4")).await,
        [EngineEvent::Buffering, EngineEvent::Loaded]
    );
}

#[tokio::test]
async fn plain_text_manifest_is_loaded() {
    let base = spawn_media_server().await;
    assert_eq!(
        probe(&format!("{base}/ep1.m3u8?_cb=abc")).await,
        [EngineEvent::Buffering, EngineEvent::Loaded]
    );
}

#[tokio::test]
async fn html_and_missing_resources_are_errors() {
    let base = spawn_media_server().await;
    assert_eq!(
        probe(&format!("{base}/blocked.mp4")).await,
        [EngineEvent::Buffering, EngineEvent::Error]
    );
    assert_eq!(
        probe(&format!("{base}/missing.mp4")).await,
        [EngineEvent::Buffering, EngineEvent::Error]
    );
}

#[derive(Clone, Default)]
struct SharedOpener(Arc<Mutex<Vec<String>>>);

impl FallbackOpener for SharedOpener {
    fn open(&mut self, url: &str) {
        self.0.lock().unwrap().push(url.to_string());
    }
}

async fn run_session(url: String, config: PlayerConfig) -> (PlaybackOutcome, Vec<String>) {
    let opener = SharedOpener::default();
    let (clock, timers) = TokioClock::channel();
    let (engine, reports) = HttpProbeEngine::channel(reqwest::Client::new());
    let controller = PlayerController::new(config, clock, engine, opener.clone());
    let session = PlayerSession::spawn(url, controller, timers, reports);
    let outcome = tokio::time::timeout(Duration::from_secs(10), session.wait())
        .await
        .expect("session did not finish")
        .unwrap();
    let opened = opener.0.lock().unwrap().clone();
    (outcome, opened)
}

#[tokio::test]
async fn session_plays_reachable_media() {
    let base = spawn_media_server().await;
    let url = format!("{base}/ep1.mp4");
    let (outcome, opened) = run_session(url.clone(), PlayerConfig::default()).await;
    assert_eq!(
        outcome,
        PlaybackOutcome::Playing {
            attempt_url: url,
            retries: 0
        }
    );
    assert!(opened.is_empty());
}

#[tokio::test]
async fn session_retries_then_falls_back_for_unplayable_media() {
    let base = spawn_media_server().await;
    let url = format!("{base}/blocked.mp4");
    let config = PlayerConfig {
        escalation_countdown: Duration::ZERO,
        ..PlayerConfig::default()
    };
    let (outcome, opened) = run_session(url.clone(), config).await;
    assert_eq!(outcome, PlaybackOutcome::Redirected { url: url.clone() });
    assert_eq!(opened, [url]);
}
