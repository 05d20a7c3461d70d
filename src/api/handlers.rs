use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::clicks::client_signature;
use crate::config::Config;
use crate::models::{LinkEntryRequest, LinkId, LinkRef, LinkState, ShortLink};
use crate::storage::{ErrorKind, SharedStore, SubmitError};

pub struct AppState {
    pub store: SharedStore,
    pub config: Arc<Config>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

/// A link as handed to clients, with its public URL and current expiry state
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkView {
    #[serde(flatten)]
    pub link: ShortLink,
    pub short_url: String,
    pub expired: bool,
}

impl LinkView {
    fn new(link: ShortLink, config: &Config, now: DateTime<Utc>) -> Self {
        Self {
            short_url: config.short_url(link.shortcode()),
            expired: link.is_expired_at(now),
            link,
        }
    }
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub state: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitRequest {
    pub source_label: Option<String>,
    pub client_signature: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitResponse {
    pub original_url: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: code.to_string(),
        }),
    )
}

fn not_found() -> ApiError {
    api_error(StatusCode::NOT_FOUND, ErrorKind::NotFound)
}

/// Shorten a batch of URLs; nothing is created unless every entry is accepted
pub async fn create_links(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Vec<LinkEntryRequest>>, JsonRejection>,
) -> Response {
    let requests = match payload {
        Ok(Json(requests)) => requests,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "unreadable link batch");
            return api_error(StatusCode::BAD_REQUEST, "invalid_body").into_response();
        }
    };

    let now = Utc::now();
    match state.store.submit(requests, now).await {
        Ok(links) => {
            let views: Vec<LinkView> = links
                .into_iter()
                .map(|link| LinkView::new(link, &state.config, now))
                .collect();
            (StatusCode::CREATED, Json(views)).into_response()
        }
        Err(SubmitError::Rejected(rejection)) => {
            (StatusCode::BAD_REQUEST, Json(rejection)).into_response()
        }
        Err(SubmitError::EmptyBatch) => {
            api_error(StatusCode::BAD_REQUEST, ErrorKind::EmptyBatch).into_response()
        }
        Err(SubmitError::BatchTooLarge { .. }) => {
            api_error(StatusCode::BAD_REQUEST, ErrorKind::BatchTooLarge).into_response()
        }
    }
}

/// List links, optionally narrowed to `active` or `expired`
pub async fn list_links(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<LinkView>>, ApiError> {
    let filter = match query.state.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(
            raw.parse::<LinkState>()
                .map_err(|_| api_error(StatusCode::BAD_REQUEST, "invalid_state"))?,
        ),
    };

    let now = Utc::now();
    let links = state.store.list(filter, now).await;
    Ok(Json(
        links
            .into_iter()
            .map(|link| LinkView::new(link, &state.config, now))
            .collect(),
    ))
}

/// Get one link with its click history
pub async fn get_link(
    State(state): State<Arc<AppState>>,
    Path(link): Path<String>,
) -> Result<Json<LinkView>, ApiError> {
    let id = link.parse::<LinkId>().map_err(|_| not_found())?;
    match state.store.get(id).await {
        Some(found) => Ok(Json(LinkView::new(found, &state.config, Utc::now()))),
        None => Err(not_found()),
    }
}

/// Delete a link, releasing its shortcode
pub async fn delete_link(
    State(state): State<Arc<AppState>>,
    Path(link): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = link.parse::<LinkId>().map_err(|_| not_found())?;
    if state.store.delete(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found())
    }
}

/// Record a click without redirecting; the caller opens the returned URL itself
pub async fn visit_link(
    State(state): State<Arc<AppState>>,
    Path(shortcode): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<VisitResponse>, ApiError> {
    let request: VisitRequest = if body.is_empty() {
        VisitRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|_| api_error(StatusCode::BAD_REQUEST, "invalid_body"))?
    };

    let clicks = &state.config.clicks;
    let signature = client_signature(
        request.client_signature.as_deref().or_else(|| {
            headers
                .get(header::USER_AGENT)
                .and_then(|value| value.to_str().ok())
        }),
        clicks.client_signature_max_len,
    );
    let source = request
        .source_label
        .unwrap_or_else(|| clicks.default_source_label.clone());

    match state
        .store
        .visit(&LinkRef::Shortcode(shortcode), Utc::now(), &signature, &source)
        .await
    {
        Ok(original_url) => Ok(Json(VisitResponse { original_url })),
        Err(ErrorKind::Expired) => Err(api_error(StatusCode::GONE, ErrorKind::Expired)),
        Err(kind) => Err(api_error(StatusCode::NOT_FOUND, kind)),
    }
}

/// Health check endpoint
pub async fn health_check() -> Json<SuccessResponse> {
    Json(SuccessResponse {
        message: "OK".to_string(),
    })
}
