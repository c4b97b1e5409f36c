//! Sign-in routes.
//!
//! - `GET /auth/oauth/:provider` starts an OAuth login
//! - `GET /auth/callback` completes it and redirects by role
//! - `GET /auth/session` returns the current session
//! - `POST /auth/logout` tears the session down

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use petcare_common::{Notice, Session};
use tower_cookies::cookie::{time, SameSite};
use tower_cookies::{Cookie, Cookies};

use crate::config::SessionConfig;
use crate::error::{ApiError, Result};
use crate::identity::Credential;
use crate::routes::session_id;
use crate::session::SESSION_COOKIE;
use crate::signin::SignInOutcome;
use crate::AppState;

/// Flash cookie carrying the notice to show after a redirect.
pub const NOTICE_COOKIE: &str = "petcare_notice";

fn session_cookie(id: String, config: &SessionConfig) -> Cookie<'static> {
    let max_age = i64::try_from(config.ttl_secs).unwrap_or(i64::MAX);
    Cookie::build((SESSION_COOKIE, id))
        .http_only(true)
        .secure(config.secure_cookies)
        .path("/")
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age))
        .build()
}

fn notice_cookie(notice: &Notice, config: &SessionConfig) -> Cookie<'static> {
    let value = format!("{}:{}", notice.kind, urlencoding::encode(&notice.message));
    Cookie::build((NOTICE_COOKIE, value))
        .secure(config.secure_cookies)
        .path("/")
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(60))
        .build()
}

/// Pick the provider credential presented by the browser.
fn credential_from(headers: &HeaderMap, provider_cookie: Option<String>) -> Credential {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    if let Some(token) = bearer {
        return Credential::Jwt(token.to_string());
    }

    match provider_cookie.filter(|value| !value.is_empty()) {
        Some(value) => Credential::Cookie(value),
        None => Credential::Anonymous,
    }
}

/// GET /auth/oauth/:provider - Redirect to the provider's login page
async fn begin_oauth(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
) -> Result<Redirect> {
    let oauth = &state.config.oauth;
    let url = state
        .provider
        .oauth_redirect_url(&provider, &oauth.success_url, &oauth.failure_url, &[])
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::debug!("Starting OAuth login with {}", provider);
    Ok(Redirect::to(url.as_str()))
}

/// GET /auth/callback - Complete an OAuth login
async fn callback(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let provider_cookie = cookies
        .get(&state.config.identity.session_cookie_name())
        .map(|cookie| cookie.value_trimmed().to_string());
    let credential = credential_from(&headers, provider_cookie);
    let paths = &state.config.destinations;
    let session_config = &state.config.session;

    match state.signin.complete_sign_in(&credential, &params).await {
        SignInOutcome::SignedIn {
            session_id,
            destination,
            notice,
            ..
        } => {
            cookies.add(session_cookie(session_id, session_config));
            cookies.add(notice_cookie(&notice, session_config));
            Redirect::to(destination.path(paths)).into_response()
        }
        SignInOutcome::Reauthorize { url } => Redirect::to(url.as_str()).into_response(),
        SignInOutcome::Failed { destination, notice } => {
            cookies.add(notice_cookie(&notice, session_config));
            Redirect::to(destination.path(paths)).into_response()
        }
    }
}

/// GET /auth/session - Current session of the caller
async fn current_session(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
) -> Result<Json<Session>> {
    let id = session_id(&cookies).ok_or(ApiError::Unauthorized)?;
    let session = state.sessions.get(&id).await.ok_or(ApiError::Unauthorized)?;
    Ok(Json(session))
}

/// POST /auth/logout - Clear the caller's session
async fn logout(State(state): State<Arc<AppState>>, cookies: Cookies) -> Response {
    if let Some(id) = session_id(&cookies) {
        state.sessions.clear(&id).await;
    }
    cookies.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());

    Redirect::to(&state.config.destinations.landing).into_response()
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/oauth/:provider", get(begin_oauth))
        .route("/callback", get(callback))
        .route("/session", get(current_session))
        .route("/logout", post(logout))
        .with_state(state)
}
