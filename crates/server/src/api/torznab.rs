//! Torznab endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use nabgate_core::{TorznabError, TorznabOutcome, TorznabRequest};

use super::middleware::HeaderApiKey;
use crate::state::AppState;

const XML: &str = "application/xml; charset=utf-8";

/// `GET /torznab/{indexes}` and `/torznab/{indexes}/api`.
pub async fn torznab(
    State(state): State<Arc<AppState>>,
    Path(indexes): Path<String>,
    HeaderApiKey(header_key): HeaderApiKey,
    Query(mut request): Query<TorznabRequest>,
) -> Response {
    if request.apikey.as_deref().is_none_or(str::is_empty) {
        request.apikey = header_key;
    }

    outcome_response(state.responder().respond(&indexes, &request).await)
}

/// `GET /torznab/caps/{indexes}`.
pub async fn caps(State(state): State<Arc<AppState>>, Path(indexes): Path<String>) -> Response {
    outcome_response(state.responder().caps(&indexes))
}

fn outcome_response(outcome: TorznabOutcome) -> Response {
    match outcome {
        TorznabOutcome::Redirect(location) => Redirect::temporary(&location).into_response(),
        TorznabOutcome::Caps(xml) => {
            (StatusCode::OK, [(header::CONTENT_TYPE, XML)], xml).into_response()
        }
        TorznabOutcome::Feed(feed) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, feed.content_type)],
            feed.body,
        )
            .into_response(),
        TorznabOutcome::Error(error) => error_response(&error),
    }
}

fn error_response(error: &TorznabError) -> Response {
    let status = StatusCode::from_u16(error.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, XML)], error.to_xml()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nabgate_core::EncodedFeed;

    #[test]
    fn test_error_status_follows_code() {
        let response = outcome_response(TorznabOutcome::Error(
            TorznabError::insufficient_privileges(),
        ));
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::CONTENT_TYPE], XML);

        let response = outcome_response(TorznabOutcome::Error(TorznabError::unknown("x")));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_redirect_and_feed() {
        let response = outcome_response(TorznabOutcome::Redirect("/torznab/caps/a".to_string()));
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()[header::LOCATION], "/torznab/caps/a");

        let response = outcome_response(TorznabOutcome::Feed(EncodedFeed {
            content_type: "application/json",
            body: "{}".to_string(),
        }));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    }
}
