//! Download proxy for signed links.
//!
//! Every rejection (bad token, wrong signature, unknown indexer) gets the
//! same 404 so a client learns nothing about why.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use nabgate_core::DownloadToken;
use tracing::{debug, warn};

use crate::metrics::DOWNLOADS_TOTAL;
use crate::state::AppState;

/// `GET|HEAD /d/{token}/{filename}` and `/download/{token}/{filename}`.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path((token, filename)): Path<(String, String)>,
) -> Response {
    let token = match DownloadToken::decode(&token, state.secrets().shared_secret()) {
        Ok(token) => token,
        Err(e) => {
            debug!(error = %e, "Rejected download token");
            return not_found();
        }
    };

    let Some(indexer) = state.registry().get(&token.indexer) else {
        debug!(indexer = %token.indexer, "Download token names unknown indexer");
        return not_found();
    };

    let download = match indexer.download(&token.source_link).await {
        Ok(download) => download,
        Err(e) => {
            warn!(indexer = %token.indexer, error = %e, "Upstream download failed");
            DOWNLOADS_TOTAL.with_label_values(&["upstream_error"]).inc();
            return (StatusCode::BAD_GATEWAY, "Upstream download failed").into_response();
        }
    };

    DOWNLOADS_TOTAL.with_label_values(&["ok"]).inc();
    debug!(indexer = %token.indexer, filename = %filename, "Streaming download");

    let mut response = Response::new(Body::from_stream(download.body));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/x-bittorrent"),
    );
    headers.insert(
        "content-transfer-encoding",
        HeaderValue::from_static("binary"),
    );
    if let Ok(value) = HeaderValue::from_str(&content_disposition(&filename)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    if let Some(length) = download.content_length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }
    response
}

fn not_found() -> Response {
    DOWNLOADS_TOTAL.with_label_values(&["rejected"]).inc();
    (StatusCode::NOT_FOUND, "Not found").into_response()
}

/// `attachment` with an ASCII fallback name plus the exact name in
/// RFC 5987 form.
fn content_disposition(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    if ascii == filename {
        format!("attachment; filename=\"{}\"", ascii)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            ascii,
            urlencoding::encode(filename)
        )
    }
}
