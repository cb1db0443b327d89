use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json},
    routing::{delete, get, post, put},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::TokenService;
use crate::config::AppConfig;
use crate::database::Store;
use crate::handlers::{protected, public};
use crate::middleware::jwt_auth_middleware;
use crate::services::{CatService, MatchService, UserService};

/// Shared per-process state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub tokens: TokenService,
    pub users: UserService,
    pub cats: CatService,
    pub matches: MatchService,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>) -> Self {
        let timeout = config.query_timeout();
        let tokens = TokenService::from_config(&config.security);

        Self {
            users: UserService::new(store.clone(), tokens.clone(), timeout),
            cats: CatService::new(store.clone(), config.filter.clone(), timeout),
            matches: MatchService::new(store.clone(), timeout),
            tokens,
            store,
            config: Arc::new(config),
        }
    }
}

pub fn app(state: AppState) -> Router {
    let config = state.config.clone();

    let mut router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(user_routes())
        // Protected
        .merge(cat_routes().route_layer(middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_middleware,
        )))
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes));

    if config.security.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/user/register", post(public::user_register))
        .route("/v1/user/login", post(public::user_login))
}

fn cat_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/cat", post(protected::cat_create).get(protected::cat_list))
        .route("/v1/cat/:id", put(protected::cat_update).delete(protected::cat_delete))
        .route(
            "/v1/cat/match",
            post(protected::match_propose).get(protected::match_list),
        )
        .route("/v1/cat/match/approve", post(protected::match_approve))
        .route("/v1/cat/match/reject", post(protected::match_reject))
        .route("/v1/cat/match/:id", delete(protected::match_cancel))
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "message": "Cats Social API",
        "data": {
            "name": "cats-social",
            "version": version,
            "endpoints": {
                "user": "/v1/user/register, /v1/user/login (public)",
                "cat": "/v1/cat[/:id] (protected)",
                "match": "/v1/cat/match, /v1/cat/match/approve, /v1/cat/match/reject, /v1/cat/match/:id (protected)",
                "health": "/health (public)"
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "message": "ok",
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}

/// Bind and serve until Ctrl-C or SIGTERM.
pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let bind_addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("Cats Social API listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
