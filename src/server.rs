//! Axum server setup, shared application state, and graceful shutdown.
//!
//! Contains [`ProxyState`] and [`RelayState`] (the `Arc`-shared state of
//! each service), [`build_proxy_router`] and [`build_relay_router`],
//! [`build_http_client`] for the hyper client both services use for
//! outbound calls, and [`shutdown_signal`] for SIGTERM / Ctrl+C handling.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::ForwardConfig;
use crate::health::{hello_handler, relay_health_handler};
use crate::proxy;
use crate::relay::TaskStatus;

pub type HttpsConnector = hyper_rustls::HttpsConnector<HttpConnector>;
pub type HttpClient = Client<HttpsConnector, http_body_util::Full<bytes::Bytes>>;

pub struct ProxyState {
    pub config: Arc<ForwardConfig>,
    pub http_client: HttpClient,
    /// Backend connect and response-header timeout.
    pub timeout: Duration,
}

pub struct RelayState {
    pub config: Arc<ForwardConfig>,
    pub task: TaskStatus,
}

/// Build the outbound client. Redirects are never followed.
///
/// `connect_timeout` bounds TCP connection setup; `None` leaves it to the OS.
#[must_use]
pub fn build_http_client(connect_timeout: Option<Duration>) -> HttpClient {
    // When multiple rustls crypto providers are compiled in, rustls cannot
    // auto-detect which one to use. Explicitly install `ring`.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_connect_timeout(connect_timeout);

    let https = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .wrap_connector(http);
    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(30))
        .build(https)
}

/// `GET /hello` answers locally; everything else, including other methods
/// on `/hello`, is forwarded to the backend.
pub fn build_proxy_router(state: Arc<ProxyState>, max_body: usize) -> Router {
    Router::new()
        .route(
            "/hello",
            get(hello_handler).fallback(proxy::forward_handler),
        )
        .fallback(proxy::forward_handler)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(max_body)),
        )
        .with_state(state)
}

pub fn build_relay_router(state: Arc<RelayState>) -> Router {
    Router::new()
        .route("/", get(relay_health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
