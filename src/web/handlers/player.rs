//! Player page boundary
//!
//! `/player?url=<percent-encoded>` validates the target and hands it, with the
//! controller tunables, to the browser player. A missing target is rejected
//! here so no controller is ever started without one.

use askama::Template;
use axum::{
    extract::{Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{config::PlayerConfig, errors::AppResult, web::AppState};

pub const MISSING_URL: &str = "Missing video URL";

#[derive(Debug, Default, Deserialize)]
pub struct PlayerQuery {
    pub url: Option<String>,
}

/// Settings the browser controller starts with
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerBootstrap<'a> {
    pub source_url: &'a str,
    pub max_retries: u32,
    pub stall_deadline_ms: u64,
    pub hard_deadline_ms: u64,
    pub escalation_countdown_ms: u64,
    pub cache_bust_param: &'a str,
}

impl<'a> PlayerBootstrap<'a> {
    pub fn new(source_url: &'a str, config: &'a PlayerConfig) -> Self {
        Self {
            source_url,
            max_retries: config.max_retries,
            stall_deadline_ms: millis(config.stall_deadline),
            hard_deadline_ms: millis(config.hard_deadline),
            escalation_countdown_ms: millis(config.escalation_countdown),
            cache_bust_param: &config.cache_bust_param,
        }
    }

    /// JSON safe to place inside a `<script>` element
    pub fn to_script_json(&self) -> AppResult<String> {
        let json = serde_json::to_string(self)?;
        Ok(json
            .replace('<', "\\u003c")
            .replace('>', "\\u003e")
            .replace('&', "\\u0026"))
    }
}

fn millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[derive(Template)]
#[template(path = "player.html")]
struct PlayerPage<'a> {
    source_url: &'a str,
    bootstrap: String,
}

pub async fn player_page(
    State(state): State<AppState>,
    Query(query): Query<PlayerQuery>,
) -> AppResult<Response> {
    let Some(source_url) = query.url.filter(|url| !url.trim().is_empty()) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            MISSING_URL,
        )
            .into_response());
    };

    let player = &state.config.player;
    if let Some(external) = player.external_player_url.as_deref() {
        let location = external_player_location(external, &source_url);
        debug!("Redirecting player request to {}", location);
        return Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response());
    }

    let page = PlayerPage {
        source_url: &source_url,
        bootstrap: PlayerBootstrap::new(&source_url, player).to_script_json()?,
    };
    Ok(Html(page.render()?).into_response())
}

/// `{external}?file=<encoded url>`, appending to an existing query if there is one
pub fn external_player_location(external: &str, source_url: &str) -> String {
    let separator = if external.contains('?') { '&' } else { '?' };
    format!(
        "{external}{separator}file={}",
        urlencoding::encode(source_url)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn bootstrap_escapes_script_breakers() {
        let config = PlayerConfig::default();
        let json = PlayerBootstrap::new("https://x/v.mp4?a=1&b=</script>", &config)
            .to_script_json()
            .unwrap();
        assert!(!json.contains("</script>"));
        assert!(!json.contains('&'));
        let decoded: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded["source_url"], "https://x/v.mp4?a=1&b=</script>");
    }

    #[test]
    fn bootstrap_carries_deadlines_in_millis() {
        let config = PlayerConfig {
            stall_deadline: Duration::from_millis(2500),
            ..PlayerConfig::default()
        };
        let bootstrap = PlayerBootstrap::new("u", &config);
        assert_eq!(bootstrap.stall_deadline_ms, 2500);
        assert_eq!(bootstrap.max_retries, config.max_retries);
    }

    #[test]
    fn external_location_encodes_target() {
        assert_eq!(
            external_player_location("https://p.example/player.html", "https://x/v.mp4?s=1"),
            "https://p.example/player.html?file=https%3A%2F%2Fx%2Fv.mp4%3Fs%3D1"
        );
        assert_eq!(
            external_player_location("https://p.example/p?theme=dark", "u"),
            "https://p.example/p?theme=dark&file=u"
        );
    }
}
