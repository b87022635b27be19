use crate::api::{handlers, AppState};
use crate::metrics::MetricsLayer;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        // Authentication
        .route("/auth/token", post(handlers::login))
        .route("/register", post(handlers::register))
        .route("/", get(handlers::root))
        // Series search
        .route(
            "/series/:series_id",
            get(handlers::search_series).post(handlers::search_series_with_fields),
        )
        // Add state
        .with_state(state)
        // Add middleware
        .layer(MetricsLayer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(false))
                .on_response(DefaultOnResponse::new().include_headers(false)),
        )
        .layer(CorsLayer::permissive())
}
