//! Playback engine capability.
//!
//! In a browser this is the media element (or an HLS library); here it is a
//! trait so the controller can be driven by anything that reports the same
//! four events. [`HttpProbeEngine`] is the server-side implementation used by
//! `dramashort watch`: it asks the upstream for the first bytes of the
//! resource and classifies the answer.

use reqwest::header::{CONTENT_TYPE, RANGE};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Events a playback engine reports, in no guaranteed order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineEvent {
    Loaded,
    Playing,
    Buffering,
    Error,
}

/// Identifies one `load` call; reports carrying an older ticket are stale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct LoadTicket(pub u64);

/// An engine event together with the load it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineReport {
    pub ticket: LoadTicket,
    pub event: EngineEvent,
}

pub trait PlaybackEngine {
    /// Start buffering `url`, replacing whatever was loaded before
    fn load(&mut self, ticket: LoadTicket, url: &str);

    /// Drop the current source and stop reporting for it
    fn stop(&mut self);
}

const PROBE_RANGE: &str = "bytes=0-1023";

/// Probes media URLs over HTTP and reports the result as engine events
#[derive(Debug)]
pub struct HttpProbeEngine {
    client: reqwest::Client,
    reports: mpsc::UnboundedSender<EngineReport>,
    probe: Option<JoinHandle<()>>,
}

impl HttpProbeEngine {
    pub fn new(client: reqwest::Client, reports: mpsc::UnboundedSender<EngineReport>) -> Self {
        Self {
            client,
            reports,
            probe: None,
        }
    }

    /// Engine plus the receiving end of its reports
    pub fn channel(client: reqwest::Client) -> (Self, mpsc::UnboundedReceiver<EngineReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(client, tx), rx)
    }
}

impl PlaybackEngine for HttpProbeEngine {
    fn load(&mut self, ticket: LoadTicket, url: &str) {
        self.stop();
        let client = self.client.clone();
        let reports = self.reports.clone();
        let url = url.to_string();
        self.probe = Some(tokio::spawn(async move {
            let _ = reports.send(EngineReport {
                ticket,
                event: EngineEvent::Buffering,
            });
            let event = probe(&client, &url).await;
            let _ = reports.send(EngineReport { ticket, event });
        }));
    }

    fn stop(&mut self) {
        if let Some(probe) = self.probe.take() {
            probe.abort();
        }
    }
}

impl Drop for HttpProbeEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn probe(client: &reqwest::Client, url: &str) -> EngineEvent {
    let response = match client.get(url).header(RANGE, PROBE_RANGE).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!("Probe request failed: {}", e);
            return EngineEvent::Error;
        }
    };

    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    if !status.is_success() {
        debug!(%status, "Probe rejected by upstream");
        return EngineEvent::Error;
    }
    if !looks_playable(content_type.as_deref(), url) {
        debug!(?content_type, "Probe returned non-media content");
        return EngineEvent::Error;
    }
    EngineEvent::Loaded
}

/// Whether a response with this content type can be handed to a media player.
/// HLS manifests are often served as `text/plain`, so the URL extension is
/// consulted for text types.
pub fn looks_playable(content_type: Option<&str>, url: &str) -> bool {
    let Some(content_type) = content_type else {
        return true;
    };
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if mime.starts_with("video/") || mime.starts_with("audio/") {
        return true;
    }
    match mime.as_str() {
        "application/vnd.apple.mpegurl"
        | "application/x-mpegurl"
        | "application/dash+xml"
        | "application/octet-stream"
        | "binary/octet-stream" => true,
        "text/plain" => is_manifest_url(url),
        _ => false,
    }
}

fn is_manifest_url(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let lower = path.to_ascii_lowercase();
    lower.ends_with(".m3u8") || lower.ends_with(".mpd")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("video/mp4"), "https://x/a.mp4", true)]
    #[case(Some("application/vnd.apple.mpegURL"), "https://x/a.m3u8", true)]
    #[case(Some("application/octet-stream"), "https://x/a", true)]
    #[case(Some("text/plain; charset=utf-8"), "https://x/a.m3u8?sig=1", true)]
    #[case(Some("text/plain"), "https://x/a.txt", false)]
    #[case(Some("text/html"), "https://x/a.mp4", false)]
    #[case(Some("application/json"), "https://x/a.mp4", false)]
    #[case(None, "https://x/a", true)]
    fn classifies_content_types(
        #[case] content_type: Option<&str>,
        #[case] url: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(looks_playable(content_type, url), expected);
    }

    #[test]
    fn engine_events_use_lowercase_names() {
        let json = serde_json::to_string(&EngineEvent::Buffering).unwrap();
        assert_eq!(json, "\"buffering\"");
        let parsed: EngineEvent = serde_json::from_str("\"playing\"").unwrap();
        assert_eq!(parsed, EngineEvent::Playing);
    }
}
