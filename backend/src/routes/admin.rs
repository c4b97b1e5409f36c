//! Admin API routes.
//!
//! Provides the approve/decline workflow for accounts waiting on review:
//! - `GET /admin/pending`
//! - `POST /admin/profiles/:id/approve`
//! - `POST /admin/profiles/:id/decline`

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use petcare_common::{status, Profile, Session};
use serde::Serialize;
use tower_cookies::Cookies;

use crate::error::{ApiError, Result};
use crate::routes::session_id;
use crate::AppState;

/// Middleware that requires a signed-in admin session.
async fn require_admin(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    mut request: Request,
    next: Next,
) -> Response {
    let session = match session_id(&cookies) {
        Some(id) => state.sessions.get(&id).await,
        None => None,
    };

    let Some(session) = session else {
        return ApiError::Unauthorized.into_response();
    };

    if !session.role_category().is_admin() {
        tracing::warn!("Non-admin {} tried to reach {}", session.principal_id, request.uri().path());
        return ApiError::Forbidden("Admin access required".to_string()).into_response();
    }

    request.extensions_mut().insert(session);
    next.run(request).await
}

/// Response for /admin/pending endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PendingResponse {
    pub profiles: Vec<Profile>,
    pub total: usize,
}

/// GET /admin/pending - Profiles awaiting review
async fn list_pending(State(state): State<Arc<AppState>>) -> Result<Json<PendingResponse>> {
    let profiles = state.retry.run(|| state.profiles.list_pending()).await?;
    let total = profiles.len();
    Ok(Json(PendingResponse { profiles, total }))
}

/// POST /admin/profiles/:id/approve
async fn approve(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<Session>,
    Path(profile_id): Path<String>,
) -> Result<Json<Profile>> {
    set_status(&state, &admin, &profile_id, status::ACCEPTED).await
}

/// POST /admin/profiles/:id/decline
async fn decline(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<Session>,
    Path(profile_id): Path<String>,
) -> Result<Json<Profile>> {
    set_status(&state, &admin, &profile_id, status::DECLINED).await
}

async fn set_status(
    state: &AppState,
    admin: &Session,
    profile_id: &str,
    tag: &str,
) -> Result<Json<Profile>> {
    let tags = [tag];
    let profile = state
        .retry
        .run(|| state.profiles.set_status(profile_id, &tags))
        .await?;

    // The reviewed principal must sign in again to pick up the new status.
    state.sessions.revoke_principal(&profile.account_id).await;

    tracing::info!(
        admin = %admin.principal_id,
        profile = %profile_id,
        status = %tag,
        "Profile reviewed"
    );
    Ok(Json(profile))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/pending", get(list_pending))
        .route("/profiles/:id/approve", post(approve))
        .route("/profiles/:id/decline", post(decline))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SESSION_COOKIE;
    use crate::test_util::{create_test_state, test_session, FakeIdentityProvider};
    use axum::body::Body;
    use axum::http::{header, Request as HttpRequest, StatusCode};
    use tower::ServiceExt;
    use tower_cookies::CookieManagerLayer;

    async fn send(app: Router, method: &str, uri: &str, session: Option<&str>) -> Response {
        let mut builder = HttpRequest::builder().method(method).uri(uri);
        if let Some(id) = session {
            builder = builder.header(header::COOKIE, format!("{}={}", SESSION_COOKIE, id));
        }
        app.layer(CookieManagerLayer::new())
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_requires_session() {
        let state = create_test_state(Arc::new(FakeIdentityProvider::new()));
        let response = send(router(state), "GET", "/pending", None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_session_is_unauthorized() {
        let state = create_test_state(Arc::new(FakeIdentityProvider::new()));
        let response = send(router(state), "GET", "/pending", Some("stale")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_non_admin_is_forbidden() {
        let state = create_test_state(Arc::new(FakeIdentityProvider::new()));
        let id = state.sessions.publish(test_session("u1", "Pet-Boarding")).await;
        let response = send(router(state), "POST", "/profiles/p1/approve", Some(&id)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_lists_pending() {
        let fake = Arc::new(FakeIdentityProvider::new());
        fake.insert_profile("c1", "clinic", &["Pending"], "");
        fake.insert_profile("u1", "user", &["active"], "");
        let state = create_test_state(fake.clone());
        let id = state.sessions.publish(test_session("root", "Admin")).await;

        let response = send(router(state), "GET", "/pending", Some(&id)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["total"], 1);
        assert_eq!(json["profiles"][0]["accountId"], "c1");
    }

    #[tokio::test]
    async fn test_admin_approves_and_declines() {
        let fake = Arc::new(FakeIdentityProvider::new());
        let first = fake.insert_profile("c1", "clinic", &["Pending"], "");
        let second = fake.insert_profile("c2", "pet training", &["Pending"], "");
        let state = create_test_state(fake.clone());
        let id = state.sessions.publish(test_session("root", "admin")).await;
        let app = router(state);

        let response = send(app.clone(), "POST", &format!("/profiles/{}/approve", first), Some(&id)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let response = send(app, "POST", &format!("/profiles/{}/decline", second), Some(&id)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let profiles = fake.profiles();
        let status_of = |doc: &str| profiles.iter().find(|p| p.id == doc).unwrap().status.clone();
        assert_eq!(status_of(&first), vec!["accepted".to_string()]);
        assert_eq!(status_of(&second), vec!["declined".to_string()]);
        assert_eq!(fake.update_calls(), 2);
    }

    #[tokio::test]
    async fn test_review_revokes_sessions_of_reviewed_principal() {
        let fake = Arc::new(FakeIdentityProvider::new());
        let pending = fake.insert_profile("c1", "clinic", &["Pending"], "");
        let state = create_test_state(fake.clone());
        let admin = state.sessions.publish(test_session("root", "admin")).await;
        let clinic = state.sessions.publish(test_session("c1", "clinic")).await;

        let response = send(
            router(state.clone()),
            "POST",
            &format!("/profiles/{}/decline", pending),
            Some(&admin),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.sessions.get(&clinic).await.is_none());
        assert!(state.sessions.get(&admin).await.is_some());
    }

    #[tokio::test]
    async fn test_demoted_admin_loses_access_after_sign_in_again() {
        let state = create_test_state(Arc::new(FakeIdentityProvider::new()));
        let old = state.sessions.publish(test_session("root", "admin")).await;
        let new = state.sessions.publish(test_session("root", "user")).await;

        let response = send(router(state.clone()), "GET", "/pending", Some(&old)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let response = send(router(state), "GET", "/pending", Some(&new)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_approve_unknown_profile_is_not_found() {
        let state = create_test_state(Arc::new(FakeIdentityProvider::new()));
        let id = state.sessions.publish(test_session("root", "admin")).await;
        let response = send(router(state), "POST", "/profiles/missing/approve", Some(&id)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
