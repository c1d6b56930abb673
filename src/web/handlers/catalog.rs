//! Catalog proxy handlers
//!
//! `/api/home`, `/api/detail/{id}` and `/api/video/{id}` relay Melolo
//! verbatim; `/api/catalog/...` returns normalized cards for any source.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::str::FromStr;
use url::Url;

use crate::{
    catalog::{CatalogDetail, CatalogPage, CatalogSource},
    errors::{AppResult, WebError},
    web::AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct HomeQuery {
    pub offset: Option<String>,
    pub count: Option<String>,
    pub lang: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LangQuery {
    pub lang: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub offset: Option<String>,
    pub page: Option<String>,
    pub count: Option<String>,
}

pub async fn proxy_home(
    State(state): State<AppState>,
    Query(query): Query<HomeQuery>,
) -> AppResult<Response> {
    let config = state.catalog.config();
    let offset = non_blank(query.offset).unwrap_or_else(|| "0".to_string());
    let count = non_blank(query.count).unwrap_or_else(|| config.proxy_count.to_string());
    let lang = non_blank(query.lang).unwrap_or_else(|| config.default_lang.clone());

    let url = state.catalog.home_url(&offset, &count, &lang)?;
    relay(&state, url).await
}

pub async fn proxy_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LangQuery>,
) -> AppResult<Response> {
    let lang = non_blank(query.lang).unwrap_or_else(|| state.catalog.config().default_lang.clone());
    let url = state.catalog.detail_url(&id, &lang)?;
    relay(&state, url).await
}

pub async fn proxy_video(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LangQuery>,
) -> AppResult<Response> {
    let lang = non_blank(query.lang).unwrap_or_else(|| state.catalog.config().default_lang.clone());
    let url = state.catalog.video_url(&id, &lang)?;
    relay(&state, url).await
}

/// Any other `/api/...` path
pub async fn api_not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}

/// Normalized listing for one source
pub async fn catalog_page(
    State(state): State<AppState>,
    Path(source): Path<String>,
    Query(query): Query<CatalogQuery>,
) -> AppResult<Json<CatalogPage>> {
    let source: CatalogSource = source.parse()?;
    let offset = parse_param::<u64>(query.offset, "offset")?.unwrap_or(0);
    let page = parse_param::<u32>(query.page, "page")?.unwrap_or(1).max(1);
    let count = parse_param::<u32>(query.count, "count")?
        .unwrap_or(state.catalog.config().items_per_page)
        .max(1);

    let page = state.catalog.page(source, offset, page, count).await?;
    Ok(Json(page))
}

pub async fn catalog_detail(
    State(state): State<AppState>,
    Path((source, id)): Path<(String, String)>,
) -> AppResult<Json<CatalogDetail>> {
    let source: CatalogSource = source.parse()?;
    let detail = state.catalog.detail(source, &id).await?;
    Ok(Json(detail))
}

/// Relay an upstream JSON body byte for byte with a permissive CORS header
async fn relay(state: &AppState, url: Url) -> AppResult<Response> {
    let body = state.catalog.fetch_raw_json(url).await?;
    Ok((
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::CONTENT_TYPE, "application/json"),
        ],
        body,
    )
        .into_response())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_param<T: FromStr>(value: Option<String>, name: &str) -> AppResult<Option<T>> {
    match non_blank(value) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            WebError::InvalidRequest {
                field: name.to_string(),
                message: format!("'{raw}' is not a valid non-negative number"),
            }
            .into()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;

    #[test]
    fn blank_params_are_absent() {
        assert_eq!(parse_param::<u64>(Some("  ".into()), "offset").unwrap(), None);
        assert_eq!(parse_param::<u64>(Some("24".into()), "offset").unwrap(), Some(24));
    }

    #[test]
    fn malformed_params_are_rejected() {
        let err = parse_param::<u32>(Some("-1".into()), "page").unwrap_err();
        assert!(matches!(
            err,
            AppError::Web(WebError::InvalidRequest { ref field, .. }) if field == "page"
        ));
    }
}
