//! HTTP client for the upstream catalog APIs

use bytes::Bytes;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::config::CatalogConfig;
use crate::errors::{AppError, AppResult, SourceError};

use super::{
    CatalogSource,
    models::{self, CatalogDetail, CatalogPage},
};

const USER_AGENT: &str = concat!("dramashort/", env!("CARGO_PKG_VERSION"));

/// Fetches upstream catalog bodies; no retries and no caching
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    config: CatalogConfig,
}

impl CatalogClient {
    pub fn new(config: CatalogConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.upstream_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    pub fn with_client(http: reqwest::Client, config: CatalogConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Shared connection pool, also used for probing media URLs
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Melolo listing; parameters are forwarded as received
    pub fn home_url(&self, offset: &str, count: &str, lang: &str) -> AppResult<Url> {
        endpoint(
            &self.config.melolo_base_url,
            "home",
            &[("offset", offset), ("count", count), ("lang", lang)],
        )
    }

    pub fn detail_url(&self, id: &str, lang: &str) -> AppResult<Url> {
        let path = format!("detail/{}", urlencoding::encode(id));
        endpoint(&self.config.melolo_base_url, &path, &[("lang", lang)])
    }

    pub fn video_url(&self, id: &str, lang: &str) -> AppResult<Url> {
        let path = format!("video/{}", urlencoding::encode(id));
        endpoint(&self.config.melolo_base_url, &path, &[("lang", lang)])
    }

    /// Listing endpoint of `source` at the given position
    pub fn listing_url(
        &self,
        source: CatalogSource,
        offset: u64,
        page: u32,
        count: u32,
    ) -> AppResult<Url> {
        let offset = offset.to_string();
        let count = count.to_string();
        match source {
            CatalogSource::Melolo => self.home_url(&offset, &count, "id"),
            CatalogSource::Dramabox => endpoint(
                &self.config.dramabox_base_url,
                &format!("recommend/{}", page.max(1)),
                &[("lang", "in")],
            ),
            CatalogSource::Netshort => endpoint(
                &self.config.netshort_base_url,
                "drama/explore",
                &[
                    ("lang", "id_ID"),
                    ("offset", offset.as_str()),
                    ("limit", count.as_str()),
                ],
            ),
        }
    }

    /// Detail endpoint of one drama on `source`
    pub fn item_url(&self, source: CatalogSource, id: &str) -> AppResult<Url> {
        let encoded = urlencoding::encode(id);
        match source {
            CatalogSource::Melolo => self.detail_url(id, "id"),
            CatalogSource::Dramabox => endpoint(
                &self.config.dramabox_base_url,
                &format!("drama/{encoded}"),
                &[("lang", "in")],
            ),
            CatalogSource::Netshort => endpoint(
                &self.config.netshort_base_url,
                &format!("drama/info/{encoded}"),
                &[],
            ),
        }
    }

    /// GET `url` and decode the body as JSON.
    ///
    /// Network failures, non-2xx statuses and undecodable bodies are all errors.
    pub async fn fetch_json(&self, url: Url) -> AppResult<Value> {
        let bytes = self.fetch_body(&url).await?;
        decode(&url, &bytes)
    }

    /// Like [`Self::fetch_json`], but hands back the body exactly as upstream
    /// sent it once it is known to be JSON
    pub async fn fetch_raw_json(&self, url: Url) -> AppResult<Bytes> {
        let bytes = self.fetch_body(&url).await?;
        decode::<IgnoredAny>(&url, &bytes)?;
        Ok(bytes)
    }

    async fn fetch_body(&self, url: &Url) -> AppResult<Bytes> {
        debug!("Fetching upstream {}", url);
        let response = self.http.get(url.clone()).send().await.map_err(|e| {
            warn!("Upstream request to {} failed: {}", url, e);
            AppError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Upstream {} answered {}", url, status);
            return Err(SourceError::Http {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            }
            .into());
        }

        Ok(response.bytes().await?)
    }

    /// Normalized listing page. Upstream failures are errors; unexpected
    /// shapes are an `Invalid response` page.
    pub async fn page(
        &self,
        source: CatalogSource,
        offset: u64,
        page: u32,
        count: u32,
    ) -> AppResult<CatalogPage> {
        let url = self.listing_url(source, offset, page, count)?;
        let body = self.fetch_json(url).await?;
        Ok(models::normalize_page(
            source,
            &body,
            offset,
            page,
            count,
            &self.config.default_cover,
        ))
    }

    pub async fn detail(&self, source: CatalogSource, id: &str) -> AppResult<CatalogDetail> {
        let url = self.item_url(source, id)?;
        let body = self.fetch_json(url).await?;
        Ok(models::normalize_detail(source, id, &body, &self.config.default_cover).into())
    }
}

fn decode<T: DeserializeOwned>(url: &Url, bytes: &[u8]) -> AppResult<T> {
    serde_json::from_slice(bytes).map_err(|e| {
        warn!("Upstream {} returned invalid JSON: {}", url, e);
        SourceError::parse("json", e.to_string()).into()
    })
}

fn endpoint(base: &str, path: &str, query: &[(&str, &str)]) -> AppResult<Url> {
    let raw = format!("{}/{}", base.trim_end_matches('/'), path);
    let mut url = Url::parse(&raw)
        .map_err(|e| AppError::configuration(format!("invalid upstream URL '{raw}': {e}")))?;
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}
