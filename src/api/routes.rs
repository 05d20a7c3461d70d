use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{Config, CorsConfig};
use crate::storage::SharedStore;

use super::handlers::{
    create_links, delete_link, get_link, health_check, list_links, visit_link, AppState,
};

pub fn create_api_router(store: SharedStore, config: Arc<Config>) -> Router {
    let cors = cors_layer(&config.cors);
    let state = Arc::new(AppState { store, config });

    Router::new()
        .route("/health", get(health_check))
        .route("/links", post(create_links).get(list_links))
        .route("/links/{link}", get(get_link).delete(delete_link))
        .route("/links/{link}/visit", post(visit_link))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if config.allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}
