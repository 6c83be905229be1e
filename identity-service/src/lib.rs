pub mod config;
pub mod db;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AuthConfig;
use crate::error::AppError;
use crate::services::{
    Database, EmailProvider, IdentityResolver, JwtService, MagicLinkService, SessionService,
};

#[derive(Clone)]
pub struct AppState {
    pub config: AuthConfig,
    pub db: Database,
    pub jwt: JwtService,
    pub magic_links: MagicLinkService,
    pub sessions: SessionService,
    pub resolver: IdentityResolver,
}

impl AppState {
    /// Wire the service graph from its leaves up.
    pub fn new(config: AuthConfig, pool: sqlx::PgPool, email: Arc<dyn EmailProvider>) -> Self {
        let db = Database::new(pool);
        let jwt = JwtService::new(&config.jwt);
        let magic_links =
            MagicLinkService::new(db.clone(), email, config.magic_link.ttl_seconds);
        let sessions = SessionService::new(db.clone(), jwt.clone(), config.sessions.max_concurrent);
        let resolver = IdentityResolver::new(db.clone(), jwt.clone());

        Self {
            config,
            db,
            jwt,
            magic_links,
            sessions,
            resolver,
        }
    }
}

pub fn build_router(state: AppState) -> Result<Router, AppError> {
    // Routes behind the request identity resolver
    let protected_routes = Router::new()
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/logout-all", post(handlers::auth::logout_all))
        .route("/auth/me", get(handlers::auth::get_me))
        .route("/auth/sessions", get(handlers::auth::list_sessions))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let cors = CorsLayer::new()
        .allow_origin(
            state
                .config
                .security
                .allowed_origins
                .iter()
                .filter_map(|o| match o.parse::<HeaderValue>() {
                    Ok(v) => Some(v),
                    Err(e) => {
                        tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e);
                        None
                    }
                })
                .collect::<Vec<HeaderValue>>(),
        )
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/auth/magic-link", post(handlers::auth::request_magic_link))
        .route("/api/auth/verify", get(handlers::auth::verify))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(cors);

    Ok(app)
}

/// Service health check
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    db::health_check(state.db.pool()).await.map_err(|e| {
        tracing::error!(error = %e, "Database health check failed");
        AppError::from(e)
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "postgres": "up"
        }
    })))
}
