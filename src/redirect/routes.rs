use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::storage::SharedStore;

use super::handlers::{health_check, redirect_url, RedirectState};
use super::middleware::record_request_start;

pub fn create_redirect_router(store: SharedStore, config: &Config) -> Router {
    let state = Arc::new(RedirectState {
        store,
        clicks: config.clicks.clone(),
        redirect_status: config.redirect_status,
    });

    Router::new()
        .route("/", get(health_check))
        .route("/{code}", get(redirect_url))
        .layer(middleware::from_fn(record_request_start))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
