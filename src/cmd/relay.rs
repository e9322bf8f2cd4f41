//! `courier relay`: start the poll-and-relay service.
//!
//! Spawns the background poll task when the relay is fully configured,
//! serves the `GET /` health check, and on shutdown stops the task
//! through a watch channel before exiting.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::cli::RelayArgs;
use crate::config::validation;
use crate::config::ForwardConfig;
use crate::error::CourierError;
use crate::logging;
use crate::relay::{self, TaskStatus};
use crate::server::{self, RelayState};

pub async fn execute(args: RelayArgs) -> Result<(), CourierError> {
    let log_format = logging::resolve_format(args.serve.pretty, args.serve.json);
    logging::init(&args.serve.log_level, log_format);

    let config = Arc::new(ForwardConfig::resolve(&args.config));
    validation::validate_relay(&config)
        .map_err(|errors| CourierError::ConfigValidation { errors })?;

    // Dropping shutdown_tx also closes the channel and stops the loop
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let task = TaskStatus::new();
    let relay_handle = relay::spawn(
        &config,
        server::build_http_client(Some(relay::FETCH_TIMEOUT)),
        &task,
        shutdown_rx,
    )?;

    let state = Arc::new(RelayState {
        config: Arc::clone(&config),
        task,
    });
    let router = server::build_relay_router(state);

    let addr: SocketAddr = format!("{}:{}", args.serve.host, args.serve.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %addr,
        relay_enabled = relay_handle.is_some(),
        "courier relay started"
    );

    let graceful_shutdown = async move {
        server::shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    };

    axum::serve(listener, router)
        .with_graceful_shutdown(graceful_shutdown)
        .await?;

    if let Some(handle) = relay_handle {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "relay task failed");
        }
    }

    tracing::info!("courier relay stopped");
    Ok(())
}
