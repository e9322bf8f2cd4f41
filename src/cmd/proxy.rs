//! `courier proxy`: start the reverse proxy.
//!
//! Resolves the backend from `TARGET_BASE_URL`, rejects malformed values,
//! and serves the forwarding router until Ctrl+C or SIGTERM. A missing
//! backend is not fatal: every forwarded request then answers 503.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::ProxyArgs;
use crate::config::validation;
use crate::config::ForwardConfig;
use crate::error::CourierError;
use crate::logging;
use crate::server::{self, ProxyState};

pub async fn execute(args: ProxyArgs) -> Result<(), CourierError> {
    let log_format = logging::resolve_format(args.serve.pretty, args.serve.json);
    logging::init(&args.serve.log_level, log_format);

    let config = Arc::new(ForwardConfig::resolve(&args.config));
    validation::validate_proxy(&config)
        .map_err(|errors| CourierError::ConfigValidation { errors })?;

    let timeout = Duration::from_secs(args.timeout_secs);
    let state = Arc::new(ProxyState {
        config: Arc::clone(&config),
        http_client: server::build_http_client(Some(timeout)),
        timeout,
    });

    let router = server::build_proxy_router(state, args.max_body);

    let addr: SocketAddr = format!("{}:{}", args.serve.host, args.serve.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %addr,
        backend = config.target_base_url().unwrap_or("(none)"),
        timeout_secs = args.timeout_secs,
        "courier proxy started"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(server::shutdown_signal())
        .await?;

    tracing::info!("courier proxy stopped");
    Ok(())
}
