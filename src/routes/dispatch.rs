//! Application routes: fixed service routes plus the routed fallback.

use crate::handlers::dispatch_request;
use crate::routes::common_routes_with_ready;
use crate::state::AppState;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

/// Health, readiness and version, then every other path through the request router.
pub fn app_routes(state: AppState) -> Router {
    let limit = state.config.site.body_limit;
    common_routes_with_ready(state.clone())
        .merge(Router::new().fallback(dispatch_request).with_state(state))
        .layer(RequestBodyLimitLayer::new(limit))
}
