//! Application startup and lifecycle management.
//!
//! Builds the upstream providers, the router with its middleware stack, and
//! the listener. `main` and the integration tests both go through
//! [`Application`].

use crate::config::RelayConfig;
use crate::handlers;
use crate::handlers::RESULT_HEADER;
use crate::services::providers::arxiv::ArxivPaperSource;
use crate::services::providers::gemini::GeminiTextProvider;
use crate::services::providers::{PaperSource, TextProvider};
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderName, HeaderValue, Method, Request},
    middleware::{from_fn, from_fn_with_state, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    panic::panic_response,
    security_headers::security_headers_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower::util::ServiceExt;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: RelayConfig,
    pub text_provider: Arc<dyn TextProvider>,
    pub paper_source: Arc<dyn PaperSource>,
}

impl AppState {
    /// State wired to the real Gemini and arXiv upstreams.
    pub fn from_config(config: RelayConfig) -> Result<Self, AppError> {
        let text_provider: Arc<dyn TextProvider> = Arc::new(
            GeminiTextProvider::new(config.gemini.clone()).map_err(|e| {
                tracing::error!("Failed to initialize Gemini provider: {}", e);
                AppError::ConfigError(anyhow::Error::new(e))
            })?,
        );
        tracing::info!(endpoint = %config.gemini.endpoint, "Initialized Gemini text provider");

        let paper_source: Arc<dyn PaperSource> = Arc::new(
            ArxivPaperSource::new(config.arxiv.clone()).map_err(|e| {
                tracing::error!("Failed to initialize arXiv source: {}", e);
                AppError::ConfigError(anyhow::Error::new(e))
            })?,
        );
        tracing::info!(endpoint = %config.arxiv.endpoint, "Initialized arXiv paper source");

        Ok(Self {
            config,
            text_provider,
            paper_source,
        })
    }
}

/// Build the HTTP router with the full middleware stack.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security.allowed_origins);

    let app = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        .route(
            "/api/generate",
            post(handlers::generate).options(handlers::preflight),
        )
        .route(
            "/api/papers",
            post(handlers::search_papers).options(handlers::preflight),
        )
        .with_state(state)
        // Panics become the JSON 500 body
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware));

    app.clone()
        // Preflights and error responses carry CORS headers
        .layer(cors)
        .layer(from_fn_with_state(app, bypass_cors_for_plain_options))
}

/// `CorsLayer` answers every `OPTIONS` itself with an empty body. Only a real
/// preflight (one carrying `Access-Control-Request-Method`) goes to it; a
/// plain `OPTIONS` is served by the router directly.
async fn bypass_cors_for_plain_options(
    State(app): State<Router>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let is_plain_options = request.method() == Method::OPTIONS
        && !request
            .headers()
            .contains_key(header::ACCESS_CONTROL_REQUEST_METHOD);

    if !is_plain_options {
        return next.run(request).await;
    }

    match app.oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    // Credentials rule out a literal `*`; mirror the caller's origin instead.
    let allow_origin = if allowed_origins.iter().any(|o| o == "*") {
        tracing::warn!("Wildcard CORS origin configured; mirroring request origins");
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::list(allowed_origins.iter().filter_map(|o| {
            o.parse::<HeaderValue>()
                .map_err(|e| tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e))
                .ok()
        }))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .expose_headers([
            HeaderName::from_static(REQUEST_ID_HEADER),
            HeaderName::from_static(RESULT_HEADER),
        ])
        .allow_credentials(true)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application against the real upstreams.
    pub async fn build(config: RelayConfig) -> Result<Self, AppError> {
        let state = AppState::from_config(config)?;
        Self::build_with_state(state).await
    }

    /// Build the application around an already assembled state.
    pub async fn build_with_state(state: AppState) -> Result<Self, AppError> {
        // Port 0 picks a random port (used by tests)
        let addr = SocketAddr::from(([0, 0, 0, 0], state.config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        Ok(Self {
            port,
            listener,
            router: build_router(state),
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until SIGINT or SIGTERM, then drain in-flight requests.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
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
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
