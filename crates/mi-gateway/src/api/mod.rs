pub mod auth;
pub mod market_insight;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the full API router. Routes are split into **public** (health
/// probe, no auth) and **protected** (`/api/v2/market-insight/*`, gated
/// behind the bearer-token middleware), matching the teacher's
/// public/protected split in `api/mod.rs`.
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new().route("/health", get(market_insight::health));

    let protected = Router::new()
        .route("/api/v2/market-insight/stream", post(market_insight::stream))
        .route("/api/v2/market-insight/generate", post(market_insight::generate))
        .route("/api/v2/market-insight/status/:session_id", get(market_insight::status))
        .route("/api/v2/market-insight/sessions", get(market_insight::list_sessions))
        .route("/api/v2/market-insight/export/:session_id", get(market_insight::export))
        .route("/api/v2/market-insight/health", get(market_insight::health))
        .route_layer(middleware::from_fn_with_state(state, auth::require_api_token));

    public
        .merge(protected)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
