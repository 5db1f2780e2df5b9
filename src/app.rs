use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::services::AuthService;
use crate::db::connection::ConnectivityCheck;
use crate::handlers::auth::{
    get_session, send_verification_email, sign_in_email, sign_out, sign_up_email, verify_email,
};
use crate::handlers::health::{db_health, health};

/// Identity endpoints, nested under `/api/auth`.
pub fn auth_routes(auth_service: Arc<AuthService>) -> Router {
    Router::new()
        .route("/sign-up/email", post(sign_up_email))
        .route("/sign-in/email", post(sign_in_email))
        .route("/sign-out", post(sign_out))
        .route("/get-session", get(get_session))
        .route("/send-verification-email", post(send_verification_email))
        .route("/verify-email", get(verify_email))
        .with_state(auth_service)
}

pub fn health_routes(connectivity: Arc<dyn ConnectivityCheck>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/db", get(db_health))
        .with_state(connectivity)
}

/// Credentialed CORS for the single frontend origin. An unparsable origin
/// disables cross-origin access.
fn cors_layer(frontend_url: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    match HeaderValue::from_str(frontend_url.trim_end_matches('/')) {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            tracing::warn!(frontend_url, "Invalid FRONTEND_URL, CORS disabled");
            layer
        }
    }
}

pub fn build_router(
    auth_service: Arc<AuthService>,
    connectivity: Arc<dyn ConnectivityCheck>,
    frontend_url: &str,
) -> Router {
    Router::new()
        .nest("/api/auth", auth_routes(auth_service))
        .merge(health_routes(connectivity))
        .layer(cors_layer(frontend_url))
        .layer(TraceLayer::new_for_http())
}
