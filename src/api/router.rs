//! Portal API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.
//!
//! Middleware stack (outermost → innermost):
//! 1. CORS → 2. Auth validator → 3. Audit logger
//!
//! Admin routes under `/api/admin/` use the admin token check in place of
//! the session validator.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::state::PortalState;

/// Room for multipart framing around the largest accepted file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the portal API router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn portal_api_router(state: Arc<PortalState>) -> Router {
    build_router(ApiContext::new(state))
}

fn build_router(ctx: ApiContext) -> Router {
    let body_limit = ctx.state.config.max_upload_bytes + MULTIPART_OVERHEAD;

    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        .route("/patients/search", get(endpoints::connections::search))
        .route("/patients/mine", get(endpoints::connections::my_patients))
        .route(
            "/patients/:aarogya_id/reports",
            get(endpoints::reports::for_patient),
        )
        .route(
            "/connections/request/:aarogya_id",
            post(endpoints::connections::send_request),
        )
        .route("/connections/pending", get(endpoints::connections::pending))
        .route("/connections/:id/accept", post(endpoints::connections::accept))
        .route("/connections/:id/reject", post(endpoints::connections::reject))
        .route(
            "/doctors/connected",
            get(endpoints::connections::connected_doctors),
        )
        .route("/doctors/public", get(endpoints::connections::public_doctors))
        .route("/doctors/me/public", post(endpoints::doctors::set_public))
        .route("/appointments", get(endpoints::appointments::list))
        .route("/appointments/request", post(endpoints::appointments::request))
        .route("/appointments/pending", get(endpoints::appointments::pending))
        .route(
            "/appointments/:id/confirm",
            post(endpoints::appointments::confirm),
        )
        .route("/appointments/:id/reject", post(endpoints::appointments::reject))
        .route(
            "/appointments/:id/activate-link",
            post(endpoints::appointments::activate_link),
        )
        .route(
            "/appointments/:id/complete",
            post(endpoints::appointments::complete),
        )
        .route("/reports/upload", post(endpoints::reports::upload))
        .route("/reports/mine", get(endpoints::reports::mine))
        .route("/reports/:id", delete(endpoints::reports::delete))
        .route(
            "/reports/content/:content_id",
            get(endpoints::reports::content),
        )
        .route("/reports/:id/summarize", post(endpoints::reports::summarize))
        .with_state(ctx.clone())
        // Middleware stack (innermost first, outermost last):
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx.clone()));

    let admin = Router::new()
        .route(
            "/admin/doctors/unauthorized",
            get(endpoints::doctors::unauthorized),
        )
        .route(
            "/admin/doctors/:email/authorize",
            post(endpoints::doctors::authorize),
        )
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::admin::require_admin))
        .layer(axum::Extension(ctx));

    let unprotected = Router::new().route("/health", get(endpoints::health::check));

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .nest("/api", protected)
        .nest("/api", admin)
        .nest("/api", unprotected)
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{Duration, Utc};
    use tower::ServiceExt;

    use crate::api::testing::{request, send, TestApi};
    use crate::api::types::{generate_token, hash_token};
    use crate::db;

    #[tokio::test]
    async fn protected_route_requires_token() {
        let api = TestApi::new();
        let (status, body) = send(&api, request("GET", "/api/appointments", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "AUTH_REQUIRED");
    }

    #[tokio::test]
    async fn invalid_token_returns_401() {
        let api = TestApi::new();
        let (status, _) =
            send(&api, request("GET", "/api/appointments", Some("not-a-session"), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn expired_session_returns_401() {
        let api = TestApi::new();
        let token = generate_token();
        {
            let conn = api.state.db().unwrap();
            let user = db::get_user_by_email(&conn, crate::api::testing::PATIENT)
                .unwrap()
                .unwrap();
            let issued = Utc::now() - Duration::hours(3);
            db::insert_session(&conn, &hash_token(&token), &user.id, &issued, &(issued + Duration::hours(1)))
                .unwrap();
        }
        let (status, _) = send(&api, request("GET", "/api/appointments", Some(&token), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn authenticated_responses_are_not_cached() {
        let api = TestApi::new();
        let response = api
            .router()
            .oneshot(request("GET", "/api/appointments", Some(&api.patient), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("Cache-Control").unwrap(), "no-store");
    }

    #[tokio::test]
    async fn cors_preflight_is_answered() {
        let api = TestApi::new();
        let req = Request::builder()
            .method("OPTIONS")
            .uri("/api/appointments")
            .header("Origin", "http://localhost:5173")
            .header("Access-Control-Request-Method", "POST")
            .body(Body::empty())
            .unwrap();
        let response = api.router().oneshot(req).await.unwrap();
        assert!(response.status().is_success());
        assert!(response
            .headers()
            .contains_key("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn admin_routes_are_closed_without_configured_token() {
        let state = std::sync::Arc::new(crate::state::PortalState::in_memory().unwrap());
        let req = request("GET", "/api/admin/doctors/unauthorized", Some("anything"), None);
        let response = super::portal_api_router(state).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let api = TestApi::new();
        let (status, _) = send(&api, request("GET", "/api/nothing-here", Some(&api.patient), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
