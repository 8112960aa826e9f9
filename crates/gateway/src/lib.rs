//! HTTP API gateway for liftlog.
//!
//! Exposes the agent (`POST /invoke`), a health check, the fitness-log
//! endpoints the web frontend reads and writes (`/api/sessions`,
//! `/api/nutrition`) and the free-form coach endpoint (`/api/coach`).
//!
//! Built on Axum.

pub mod api;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::{
    Router,
    extract::State,
    response::Json,
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use liftlog_agent::{AgentGraph, GraphOptions, InvokeRequest, InvokeResponse, ProviderReasoner};
use liftlog_config::{AppConfig, GatewayConfig, StorageBackend};
use liftlog_core::provider::Provider;
use liftlog_core::store::FitnessStore;
use liftlog_store::{InMemoryStore, SqliteStore};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub graph: Arc<AgentGraph>,
    pub store: Arc<dyn FitnessStore>,
    pub provider: Arc<dyn Provider>,
    pub model: String,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    /// Build every subsystem once from configuration: store, provider,
    /// tool catalog and agent graph.
    pub async fn from_config(config: &AppConfig) -> liftlog_core::Result<Self> {
        let store: Arc<dyn FitnessStore> = match config.storage.backend {
            StorageBackend::Sqlite => Arc::new(SqliteStore::open(&config.storage.path).await?),
            StorageBackend::Memory => Arc::new(InMemoryStore::new()),
        };

        let router = liftlog_providers::router::build_from_config(config);
        let provider = router.default().ok_or_else(|| liftlog_core::Error::Config {
            message: format!("provider '{}' is not configured", config.default_provider),
        })?;

        let model = config.active_model().to_string();
        let mut reasoner = ProviderReasoner::new(provider.clone(), &model)
            .with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens);
        if let Some(prompt) = &config.agent.system_prompt_override {
            reasoner = reasoner.with_system_prompt(prompt);
        }

        let tools = Arc::new(liftlog_tools::default_registry(store.clone()));
        let options = GraphOptions::from_config(&config.agent);
        let graph = AgentGraph::new(Arc::new(reasoner), tools, options);

        info!(
            store = store.name(),
            provider = provider.name(),
            model = %model,
            "Gateway state initialized"
        );

        Ok(Self {
            graph: Arc::new(graph),
            store,
            provider,
            model,
        })
    }
}

/// Build the Axum router with all gateway routes.
///
/// Layers applied:
/// - CORS limited to the configured origins
/// - Request body size limit
/// - HTTP trace logging
pub fn build_router(state: SharedState, config: &GatewayConfig) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/invoke", post(invoke_handler))
        .nest("/api", api::api_router())
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(cors_layer(&config.allowed_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::HeaderName::from_static("x-user-id")])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let state = Arc::new(GatewayState::from_config(&config).await?);
    let app = build_router(state, &config.gateway);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn invoke_handler(
    State(state): State<SharedState>,
    Json(request): Json<InvokeRequest>,
) -> Result<Json<InvokeResponse>, (StatusCode, Json<api::ErrorResponse>)> {
    if request.question.trim().is_empty() {
        return Err(api::error_response(StatusCode::BAD_REQUEST, "question must not be empty"));
    }

    info!(question_len = request.question.len(), "Invoke request received");
    Ok(Json(state.graph.invoke(request).await))
}
