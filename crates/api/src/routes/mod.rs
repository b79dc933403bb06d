//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness check
//! GET  /health/ready                - Readiness check (database reachable)
//!
//! # Auth
//! POST /api/auth/login              - Exchange credentials for a token (rate limited)
//! GET  /api/auth/me                 - Profile of the token's user
//!
//! # Settings
//! GET  /api/settings/business-type  - Current business type (public)
//! PUT  /api/settings/business-type  - Set business type (admin)
//! ```

pub mod auth;
pub mod settings;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::middleware::RateLimiterLayer;
use crate::state::AppState;

/// Build the full router.
///
/// `login_limiter` is applied to the login route only; pass `None` to run
/// without rate limiting.
pub fn router(state: AppState, login_limiter: Option<RateLimiterLayer>) -> Router {
    let login = match login_limiter {
        Some(layer) => Router::new()
            .route("/login", post(auth::login))
            .layer(layer),
        None => Router::new().route("/login", post(auth::login)),
    };

    let auth_routes = login.route("/me", get(auth::me));

    let settings_routes = Router::new().route(
        "/business-type",
        get(settings::get_business_type).put(settings::put_business_type),
    );

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/auth", auth_routes)
        .nest("/api/settings", settings_routes)
        .with_state(state)
}

/// Liveness: the process is up.
async fn health() -> &'static str {
    "ok"
}

/// Readiness: 503 until the database answers.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use tillpoint_core::{Role, UserId, UserProfile};

    use super::*;
    use crate::config::ApiConfig;
    use crate::db;

    fn app() -> (Router, AppState) {
        let vars = [
            ("DB_USER", "pos"),
            ("DB_PASSWORD", ""),
            ("DB_NAME", "pos"),
            ("DB_PORT", "9"),
            ("JWT_SECRET", "Zr8%kQ2!mW5&xT9#bN4^vL7*cJ1@hF6$"),
        ];
        let config = ApiConfig::from_lookup(&|key: &str| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_owned())
        })
        .unwrap();
        let pool = db::create_lazy_pool(&config.database);
        let state = AppState::new(config, pool);
        (router(state.clone(), None), state)
    }

    fn token(state: &AppState, role: Role) -> String {
        let user = UserProfile {
            id: UserId::new(4),
            username: "lee".to_owned(),
            display_name: "Lee".to_owned(),
            role,
        };
        state.tokens().issue(&user).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_me_requires_token() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::get("/api/auth/me").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await,
            json!({"message": "Access token required", "code": "token_missing"})
        );
    }

    #[tokio::test]
    async fn test_me_returns_claims_profile() {
        let (app, state) = app();
        let request = Request::get("/api/auth/me")
            .header(header::AUTHORIZATION, format!("Bearer {}", token(&state, Role::Admin)))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["username"], "lee");
        assert_eq!(body["role"], "admin");
    }

    #[tokio::test]
    async fn test_cashier_cannot_set_business_type() {
        let (app, state) = app();
        let request = Request::put("/api/settings/business-type")
            .header(header::AUTHORIZATION, format!("Bearer {}", token(&state, Role::Cashier)))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"business_type":"Cafe"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["code"], "forbidden");
    }

    #[tokio::test]
    async fn test_login_rejects_malformed_body() {
        let (app, _) = app();
        let request = Request::post("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"username":"lee"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "bad_request");
    }
}
