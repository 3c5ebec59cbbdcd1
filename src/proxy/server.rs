//! HTTP server setup and configuration.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::handlers::{self, LATENCY_MS_HEADER, REQUEST_ID_HEADER, UPSTREAM_STATUS_HEADER};
use crate::config::{Config, CorsConfig};
use crate::error::Result;
use crate::hourglass::HourglassClient;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub hourglass: Arc<HourglassClient>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Build the upstream client and wrap the config for sharing.
    pub fn new(config: Config) -> Result<Self> {
        let hourglass = HourglassClient::new(&config.upstream)?;
        Ok(Self {
            hourglass: Arc::new(hourglass),
            config: Arc::new(config),
        })
    }
}

/// Per-request correlation ID, inserted as a request extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestId(pub Uuid);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tag the request with a fresh [`RequestId`] and stamp the ID and
/// wall-clock latency on whatever response comes back, rejections included.
async fn assign_request_id(mut request: Request, next: Next) -> Response {
    let start = Instant::now();
    let request_id = RequestId(Uuid::new_v4());
    request.extensions_mut().insert(request_id);

    let mut response = next.run(request).await;
    attach_request_headers(
        &mut response,
        &request_id,
        start.elapsed().as_millis() as u64,
    );
    response
}

/// Attach the correlation ID and latency headers to a response.
fn attach_request_headers(response: &mut Response, request_id: &RequestId, latency_ms: u64) {
    let headers = response.headers_mut();

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        headers.insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    headers.insert(
        HeaderName::from_static(LATENCY_MS_HEADER),
        HeaderValue::from(latency_ms),
    );
}

/// Build the CORS layer for the front-end.
///
/// Credentials are allowed by default, so origins and request headers are
/// listed or mirrored rather than wildcarded.
fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let allow_origin = if cors.allowed_origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to mirror ANY origin - this is insecure for production!");
        AllowOrigin::mirror_request()
    } else {
        let origins: Vec<_> = cors
            .allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring CORS origin that is not a valid header value");
                    None
                }
            })
            .collect();
        tracing::info!(origins = ?cors.allowed_origins, "CORS configured");
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(cors.allow_credentials)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .expose_headers([
            HeaderName::from_static(REQUEST_ID_HEADER),
            HeaderName::from_static(LATENCY_MS_HEADER),
            HeaderName::from_static(UPSTREAM_STATUS_HEADER),
        ])
}

/// Create the axum router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors);

    Router::new()
        // Hourglass proxy
        .route("/api/resources", get(handlers::get_resources))
        .route("/api/check-connection", get(handlers::check_connection))
        // Diagnostics
        .route("/test-cors", get(handlers::test_cors))
        .route("/health", get(handlers::health))
        .with_state(state)
        // Outermost first: IDs (so preflights carry them), trace, then CORS
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(assign_request_id))
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

/// Run the HTTP server until SIGINT or SIGTERM.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let listen_addr = config.server.listen.clone();
    let state = AppState::new(config)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(address = %listen_addr, "Starting coursetrack proxy server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Complete when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
