//! Normalized catalog types and the per-source reshaping into them.
//!
//! Upstream bodies are handled as `serde_json::Value`: none of the three APIs
//! publishes a contract, fields come and go, and numbers are sometimes
//! strings. Anything that does not match the expected envelope becomes an
//! "Invalid response" page instead of an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use super::CatalogSource;

pub const INVALID_RESPONSE: &str = "Invalid response";

/// One drama as rendered by the catalog UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DramaCard {
    pub id: String,
    pub title: String,
    pub author: String,
    pub intro: String,
    pub episodes: u64,
    pub cover: String,
    /// Link to the detail page for this drama
    pub watch_url: String,
    pub source: CatalogSource,
    pub is_dubbing: bool,
    pub tags: Vec<String>,
    pub play_count: String,
}

/// Envelope returned by `/api/catalog/{source}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogPage {
    /// 0 on success, -1 otherwise
    pub code: i32,
    pub success: bool,
    pub data: Vec<DramaCard>,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CatalogPage {
    /// Failed page; treated by consumers as an empty result set
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            code: -1,
            success: false,
            data: Vec::new(),
            has_more: false,
            next_offset: None,
            next_page: None,
            total: None,
            error: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DramaDetail {
    #[serde(flatten)]
    pub card: DramaCard,
    /// Playable http(s) URLs found anywhere in the upstream detail
    pub streams: Vec<String>,
}

/// Envelope returned by `/api/catalog/{source}/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDetail {
    pub code: i32,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<DramaDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Option<DramaDetail>> for CatalogDetail {
    fn from(detail: Option<DramaDetail>) -> Self {
        match detail {
            Some(detail) => Self {
                code: 0,
                success: true,
                data: Some(detail),
                error: None,
            },
            None => Self {
                code: -1,
                success: false,
                data: None,
                error: Some(INVALID_RESPONSE.to_string()),
            },
        }
    }
}

/// Reshape a listing body.
///
/// `offset` and `page` are the request position; `count` is the page size
/// that was asked for.
pub fn normalize_page(
    source: CatalogSource,
    body: &Value,
    offset: u64,
    page: u32,
    count: u32,
    default_cover: &str,
) -> CatalogPage {
    match source {
        CatalogSource::Melolo => {
            let Some(items) = body.get("data").and_then(Value::as_array) else {
                return CatalogPage::failed(INVALID_RESPONSE);
            };
            if body.get("code").and_then(Value::as_i64) != Some(0) {
                return CatalogPage::failed(INVALID_RESPONSE);
            }
            let data = cards(source, items, default_cover);
            let next_offset = count_of(body, &["next_offset"])
                .filter(|next| *next > 0)
                .unwrap_or_else(|| offset.saturating_add(data.len() as u64));
            CatalogPage {
                code: 0,
                success: true,
                has_more: body.get("has_more").is_some_and(truthy),
                next_offset: Some(next_offset),
                next_page: None,
                total: None,
                error: None,
                data,
            }
        }
        CatalogSource::Dramabox => {
            let list = body.get("recommendList");
            let Some(items) = list
                .and_then(|l| l.get("records"))
                .and_then(Value::as_array)
            else {
                return CatalogPage::failed(INVALID_RESPONSE);
            };
            let current = list.and_then(|l| count_of(l, &["current"])).unwrap_or(0);
            let total = list.and_then(|l| count_of(l, &["total"]));
            CatalogPage {
                code: 0,
                success: true,
                data: cards(source, items, default_cover),
                has_more: total.is_some_and(|total| current < total),
                next_offset: None,
                next_page: Some(page.saturating_add(1)),
                total,
                error: None,
            }
        }
        CatalogSource::Netshort => {
            let data = body.get("data");
            let Some(items) = data
                .and_then(|d| d.get("result"))
                .and_then(Value::as_array)
            else {
                return CatalogPage::failed(INVALID_RESPONSE);
            };
            if !body.get("success").is_some_and(truthy) {
                return CatalogPage::failed(INVALID_RESPONSE);
            }
            let is_end = data.and_then(|d| d.get("isEnd")).is_some_and(truthy);
            let next_offset = data
                .and_then(|d| count_of(d, &["next"]))
                .filter(|next| *next > 0)
                .unwrap_or_else(|| offset.saturating_add(u64::from(count)));
            CatalogPage {
                code: 0,
                success: true,
                data: cards(source, items, default_cover),
                has_more: !is_end,
                next_offset: Some(next_offset),
                next_page: None,
                total: None,
                error: None,
            }
        }
    }
}

/// Reshape a detail body, `None` when it is not the shape `source` answers with
pub fn normalize_detail(
    source: CatalogSource,
    id: &str,
    body: &Value,
    default_cover: &str,
) -> Option<DramaDetail> {
    let item = match source {
        CatalogSource::Melolo => {
            if let Some(code) = body.get("code").and_then(Value::as_i64)
                && code != 0
            {
                return None;
            }
            body.get("data").filter(|d| d.is_object()).unwrap_or(body)
        }
        CatalogSource::Dramabox => {
            body.get("bookId").filter(|id| truthy(id))?;
            body
        }
        CatalogSource::Netshort => {
            if !body.get("success").is_some_and(truthy) {
                return None;
            }
            body.get("data").filter(|d| d.is_object())?
        }
    };

    let mut card = card(source, item, default_cover);
    if card.id.is_empty() {
        card.id = id.to_string();
        card.watch_url = watch_url(source, id);
    }
    Some(DramaDetail {
        card,
        streams: extract_streams(body),
    })
}

fn cards(source: CatalogSource, items: &[Value], default_cover: &str) -> Vec<DramaCard> {
    items
        .iter()
        .filter(|item| item.is_object())
        .map(|item| card(source, item, default_cover))
        .collect()
}

/// Build a card with the per-source field names and fallbacks
pub fn card(source: CatalogSource, item: &Value, default_cover: &str) -> DramaCard {
    let (title, author, intro, episodes, cover, id, tags, play_count) = match source {
        CatalogSource::Melolo => (
            text(item, &["name", "title"]).unwrap_or_else(|| "Untitled Drama".into()),
            text(item, &["author"]).unwrap_or_else(|| "Unknown Author".into()),
            text(item, &["intro", "abstract"]).unwrap_or_else(|| "No description.".into()),
            count_of(item, &["episodes", "episode_count"]).unwrap_or(0),
            text(item, &["cover"]),
            text(item, &["id", "book_id"]),
            strings(item.get("tags")),
            text(item, &["play_count"]).unwrap_or_default(),
        ),
        CatalogSource::Dramabox => (
            text(item, &["bookName", "title"]).unwrap_or_else(|| "Drama".into()),
            source.display_name().to_string(),
            text(item, &["introduction"]).unwrap_or_else(|| "Drama from DramaBox".into()),
            count_of(item, &["chapterCount"]).unwrap_or(0),
            text(item, &["cover", "coverWap"]),
            text(item, &["bookId", "id"]),
            strings(item.get("tags")),
            text(item, &["playCount"]).unwrap_or_else(|| "0".into()),
        ),
        CatalogSource::Netshort => {
            let labels = strings(item.get("labelArray"));
            let intro = if item.get("labelArray").is_some() {
                labels.join(", ")
            } else {
                "Short drama".to_string()
            };
            (
                text(item, &["name", "shortPlayName"]).unwrap_or_else(|| "NetShort Drama".into()),
                source.display_name().to_string(),
                intro,
                count_of(item, &["totalEpisode", "episodes"]).unwrap_or(1),
                text(item, &["shortPlayCover", "cover"]),
                text(item, &["shortPlayId", "id"]),
                labels,
                text(item, &["heatScore", "playCount"]).unwrap_or_default(),
            )
        }
    };

    let id = id.unwrap_or_default();
    DramaCard {
        watch_url: watch_url(source, &id),
        is_dubbing: is_dubbed(&title),
        cover: cover.unwrap_or_else(|| default_cover.to_string()),
        id,
        title,
        author,
        intro,
        episodes,
        source,
        tags,
        play_count,
    }
}

pub fn watch_url(source: CatalogSource, id: &str) -> String {
    format!(
        "/drama.html?source={}&id={}",
        source,
        urlencoding::encode(id)
    )
}

/// Indonesian dubbed releases carry "(Sulih Suara)" in the title
pub fn is_dubbed(title: &str) -> bool {
    title.to_lowercase().contains("sulih suara")
}

/// Collect playable URLs anywhere in `body`, in document order, without duplicates
pub fn extract_streams(body: &Value) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut streams = Vec::new();
    collect_streams(body, None, &mut seen, &mut streams);
    streams
}

fn collect_streams(
    value: &Value,
    key: Option<&str>,
    seen: &mut HashSet<String>,
    out: &mut Vec<String>,
) {
    match value {
        Value::String(s) => {
            if is_stream_url(key, s) && seen.insert(s.clone()) {
                out.push(s.clone());
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_streams(item, key, seen, out);
            }
        }
        Value::Object(map) => {
            for (k, v) in map {
                collect_streams(v, Some(k), seen, out);
            }
        }
        _ => {}
    }
}

fn is_stream_url(key: Option<&str>, value: &str) -> bool {
    let lower = value.trim().to_ascii_lowercase();
    if !(lower.starts_with("http://") || lower.starts_with("https://")) {
        return false;
    }
    let path = lower.split(['?', '#']).next().unwrap_or_default();
    if path.ends_with(".mp4") || path.ends_with(".m3u8") {
        return true;
    }
    const IMAGE_EXTENSIONS: [&str; 5] = [".jpg", ".jpeg", ".png", ".webp", ".gif"];
    if IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return false;
    }
    key.map(str::to_ascii_lowercase)
        .is_some_and(|k| k.contains("video") || k.contains("play"))
}

/// First key holding a non-empty string or a number, as text
fn text(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match item.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// First key holding a non-negative number or a numeric string
fn count_of(item: &Value, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|key| match item.get(*key)? {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Strings of an array, also accepting `{tagName|name: ..}` objects
fn strings(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Object(_) => text(item, &["tagName", "name"]),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// JavaScript-style truthiness, which is what the upstreams are written against
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
