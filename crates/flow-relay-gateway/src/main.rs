//! Flow Relay Gateway — POST /chat forwarded to the hosted flow-execution API.
//! The vendor's JSON comes back untouched; failures answer with a JSON `detail`.

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use flow_relay_core::{ChatRequest, RelayConfig, RelayError, Relay};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE_NAME: &str = "flow-relay.log";

struct AppState {
    relay: Relay,
}

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[flow-relay] .env not loaded: {} (using system environment)", e);
    }

    let config = match RelayConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[flow-relay] Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&config);

    if config.application_token.trim().is_empty() {
        tracing::warn!("[flow-relay] RELAY_APPLICATION_TOKEN is empty; the flow API will reject requests.");
    }
    if config.default_flow_id().is_none() && config.flow_cache_path.is_none() {
        tracing::warn!("[flow-relay] No flow_id or flow_cache_path configured; requests must name an endpoint.");
    }
    tracing::warn!("[flow-relay] CORS allows every origin, method and header. Restrict it before exposing this gateway.");

    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState {
        relay: Relay::new(Arc::new(config)),
    });
    let app = build_app(state);

    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("[flow-relay] Cannot bind {}: {}", bind_addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!(
        "[flow-relay] v{} listening on {}",
        flow_relay_core::version(),
        bind_addr
    );

    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        tracing::error!("[flow-relay] Server stopped: {}", e);
    }
}

fn init_tracing(config: &RelayConfig) {
    let file_layer = config.log_dir.as_ref().and_then(|dir| {
        match RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(LOG_FILE_NAME)
            .build(dir)
        {
            Ok(appender) => Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(appender)
                    .with_ansi(false),
            ),
            Err(e) => {
                eprintln!("[flow-relay] File logging disabled ({}): {}", dir.display(), e);
                None
            }
        }
    });

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
}

fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat_handler))
        .with_state(state)
        .layer(axum::middleware::from_fn(log_request))
        .layer(CorsLayer::very_permissive())
}

async fn log_request(request: Request<Body>, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());
    tracing::info!("[flow-relay] {} {} from {}", request.method(), request.uri().path(), peer);
    next.run(request).await
}

async fn health() -> &'static str {
    "OK"
}

/// POST /chat: resolve flow + tweaks, run the flow, relay the vendor body byte-for-byte.
async fn chat_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let flow = state.relay.chat(&body).await?;
    Ok((
        [(header::CONTENT_TYPE, "application/json")],
        flow.into_bytes(),
    )
        .into_response())
}

/// Failures answer `{"detail": "<error>"}`: the extractor's status for a bad body, 500 for
/// anything the relay raises.
enum ApiError {
    Body(JsonRejection),
    Relay(RelayError),
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::Body(e)
    }
}

impl From<RelayError> for ApiError {
    fn from(e: RelayError) -> Self {
        ApiError::Relay(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Body(rejection) => {
                tracing::warn!("[flow-relay] Rejected chat body: {}", rejection.body_text());
                (rejection.status(), rejection.body_text())
            }
            ApiError::Relay(e) => {
                tracing::error!("[flow-relay] Chat relay failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };
        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}
