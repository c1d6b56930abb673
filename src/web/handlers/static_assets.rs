//! Static asset handlers
//!
//! Serves the embedded front-end. Unknown paths are a plain 404.

use axum::{
    http::{HeaderValue, StatusCode, Uri, header},
    response::{Html, IntoResponse, Response},
};

use crate::assets::StaticAssets;

/// Serve the catalog page
pub async fn index() -> Response {
    match StaticAssets::get_asset("static/index.html") {
        Some(file) => Html(String::from_utf8_lossy(&file.data).into_owned()).into_response(),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html("<h1>500 Internal Server Error</h1><p>Front-end not found</p>".to_string()),
        )
            .into_response(),
    }
}

/// Fallback: `/{path}` is looked up as `static/{path}`
pub async fn serve_embedded_asset(uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');
    if path.is_empty() || path.contains("..") {
        return not_found();
    }

    match StaticAssets::get_asset(&format!("static/{path}")) {
        Some(file) => {
            let mut response = file.data.into_owned().into_response();
            let headers = response.headers_mut();
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static(StaticAssets::get_content_type(path)),
            );
            headers.insert(
                header::CACHE_CONTROL,
                HeaderValue::from_static("public, max-age=3600"),
            );
            response
        }
        None => not_found(),
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}
