use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::middleware::RequestStart;
use crate::clicks::client_signature;
use crate::config::{ClickConfig, RedirectMode};
use crate::models::LinkRef;
use crate::storage::{ErrorKind, SharedStore};

pub struct RedirectState {
    pub store: SharedStore,
    pub clicks: ClickConfig,
    pub redirect_status: RedirectMode,
}

#[derive(Debug, Deserialize)]
pub struct RedirectQuery {
    /// Overrides the configured source label for this click
    pub source: Option<String>,
}

/// Redirect to the original URL, recording the click
pub async fn redirect_url(
    State(state): State<Arc<RedirectState>>,
    Path(code): Path<String>,
    Query(query): Query<RedirectQuery>,
    Extension(RequestStart(request_start)): Extension<RequestStart>,
    headers: HeaderMap,
) -> Response {
    let signature = client_signature(
        headers
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok()),
        state.clicks.client_signature_max_len,
    );
    let source = query
        .source
        .filter(|source| !source.is_empty())
        .unwrap_or_else(|| state.clicks.default_source_label.clone());

    let result = state
        .store
        .visit(&LinkRef::Shortcode(code), Utc::now(), &signature, &source)
        .await;

    match result {
        Ok(original_url) => {
            let Ok(location) = HeaderValue::from_str(&original_url) else {
                tracing::error!(url = %original_url, "stored URL is not a valid Location header");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response();
            };

            let mut response_headers = HeaderMap::new();
            response_headers.insert(header::LOCATION, location);
            response_headers.insert(
                "x-shortlinks-timing-total-ms",
                HeaderValue::from(request_start.elapsed().as_millis() as u64),
            );

            (state.redirect_status.status_code(), response_headers).into_response()
        }
        Err(ErrorKind::Expired) => (StatusCode::GONE, "This link has expired").into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "URL not found").into_response(),
    }
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    #[derive(Serialize)]
    struct HealthResponse {
        status: String,
    }

    Json(HealthResponse {
        status: "OK".to_string(),
    })
}
