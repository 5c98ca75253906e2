//! Router setup with all API routes and middleware.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use lexq_core::error::LexqError;

use crate::handlers;
use crate::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let port = state.config.general.port;
    let origins: Vec<HeaderValue> = [
        format!("http://127.0.0.1:{}", port),
        format!("http://localhost:{}", port),
    ]
    .iter()
    .filter_map(|origin| origin.parse().ok())
    .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    let public_routes = Router::new().route("/health", get(handlers::health));

    let limiter = RateLimiter::new(state.config.general.rate_limit_per_sec);

    let invoke_routes = Router::new()
        .route("/invoke", post(handlers::invoke))
        .layer(axum::middleware::from_fn(rate_limit_middleware))
        .layer(axum::Extension(limiter));

    let operator_routes = Router::new()
        .route("/sessions", get(handlers::list_sessions))
        .route(
            "/sessions/{id}/history",
            get(handlers::session_history).delete(handlers::clear_session),
        );

    let protected_routes = invoke_routes.merge(operator_routes).route_layer(
        axum::middleware::from_fn_with_state(state.clone(), crate::auth::require_auth),
    );

    public_routes
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(256 * 1024))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind to `general.host:general.port` and serve until the process exits.
pub async fn start_server(state: AppState) -> Result<(), LexqError> {
    let addr = format!(
        "{}:{}",
        state.config.general.host, state.config.general.port
    );
    let router = create_router(state);

    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| LexqError::Api(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, router)
        .await
        .map_err(|e| LexqError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
