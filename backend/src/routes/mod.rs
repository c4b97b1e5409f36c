//! HTTP routes.

pub mod admin;
pub mod auth;
pub mod health;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{middleware, Router};
use tower_cookies::{CookieManagerLayer, Cookies};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::logging::request_logger;
use crate::session::SESSION_COOKIE;
use crate::AppState;

/// Build the full application router.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health::router(state.clone()))
        .nest("/auth", auth::router(state.clone()))
        .nest("/admin", admin::router(state.clone()))
        .layer(cors_layer(&state.config.cors.origins))
        .layer(middleware::from_fn(request_logger))
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.trim() == "*" {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Id of the gateway session the caller presented, if any.
pub fn session_id(cookies: &Cookies) -> Option<String> {
    cookies
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value_trimmed().to_string())
        .filter(|id| !id.is_empty())
}
