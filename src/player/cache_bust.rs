//! Cache-busting tokens appended to retried playback URLs.
//!
//! Some CDNs keep serving a cached failure for a URL; a fresh query value
//! forces revalidation. The existing query string is preserved byte for byte
//! because signed media URLs stop validating when re-encoded.

use rand::{Rng, distr::Alphanumeric};

const RANDOM_LEN: usize = 8;

/// Produces distinct tokens and applies them to URLs
#[derive(Debug, Clone)]
pub struct CacheBuster {
    param: String,
    sequence: u64,
}

impl CacheBuster {
    pub fn new(param: impl Into<String>) -> Self {
        Self {
            param: param.into(),
            sequence: 0,
        }
    }

    pub fn param(&self) -> &str {
        &self.param
    }

    /// Random part, wall-clock millis and a per-buster sequence number.
    /// The sequence keeps consecutive tokens distinct even within one millisecond.
    pub fn next_token(&mut self) -> String {
        self.sequence += 1;
        let random: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(RANDOM_LEN)
            .map(char::from)
            .collect();
        let millis = chrono::Utc::now().timestamp_millis();
        format!("{random}-{millis}-{}", self.sequence)
    }

    /// `source` with a fresh token in the cache-busting parameter
    pub fn bust(&mut self, source: &str) -> String {
        let token = self.next_token();
        with_token(source, &self.param, &token)
    }
}

/// Replace (or add) `param=token` in `url`, keeping the rest of the query and
/// any fragment untouched.
pub fn with_token(url: &str, param: &str, token: &str) -> String {
    let (without_fragment, fragment) = match url.split_once('#') {
        Some((head, frag)) => (head, Some(frag)),
        None => (url, None),
    };
    let (base, query) = match without_fragment.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (without_fragment, None),
    };

    let mut segments: Vec<&str> = query
        .map(|q| {
            q.split('&')
                .filter(|segment| !segment.is_empty())
                .filter(|segment| segment.split('=').next() != Some(param))
                .collect()
        })
        .unwrap_or_default();
    let busting = format!(
        "{}={}",
        urlencoding::encode(param),
        urlencoding::encode(token)
    );
    segments.push(&busting);

    let mut out = format!("{base}?{}", segments.join("&"));
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}
