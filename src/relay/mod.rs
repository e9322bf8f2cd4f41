//! Poll-and-relay background task.
//!
//! [`spawn`] starts a single loop that waits one poll interval, runs one
//! [`run_cycle`], and repeats until the shutdown channel fires. Each
//! cycle runs in its own task so a panic is contained and logged. Cycles
//! never overlap, and no cycle's failure affects the next. Delivery is
//! at-most-once: a failed forward is logged and the message is dropped.
//!
//! The loop is only started when every relay variable is configured.
//! Otherwise the missing names are logged once and nothing runs.

pub mod client;
pub mod message;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::{redacted, ForwardConfig, RelayEndpoints};
use crate::error::{CourierError, RelayError};
use crate::server::HttpClient;

use self::message::{Fetched, RelayMessage};

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const FORWARD_TIMEOUT: Duration = Duration::from_secs(15);

/// Liveness of the poll task, queryable from the health endpoint.
#[derive(Debug, Clone, Default)]
pub struct TaskStatus(Arc<AtomicBool>);

impl TaskStatus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn mark_alive(&self) -> AliveGuard {
        self.0.store(true, Ordering::Release);
        AliveGuard(self.clone())
    }
}

/// Clears the liveness flag when the task ends, however it ends.
struct AliveGuard(TaskStatus);

impl Drop for AliveGuard {
    fn drop(&mut self) {
        (self.0).0.store(false, Ordering::Release);
    }
}

/// Everything one cycle needs.
#[derive(Clone)]
pub struct RelayContext {
    pub client: HttpClient,
    pub endpoints: RelayEndpoints,
    pub fetch_timeout: Duration,
    pub forward_timeout: Duration,
}

impl RelayContext {
    #[must_use]
    pub fn new(client: HttpClient, endpoints: RelayEndpoints) -> Self {
        Self {
            client,
            endpoints,
            fetch_timeout: FETCH_TIMEOUT,
            forward_timeout: FORWARD_TIMEOUT,
        }
    }
}

/// How a cycle that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    NoMessage,
    Incomplete { id: Option<String> },
    Forwarded { id: Option<String>, status: u16 },
}

/// One fetch-then-forward cycle.
pub async fn run_cycle(ctx: &RelayContext) -> Result<CycleOutcome, RelayError> {
    tracing::debug!(
        source = %redacted(&ctx.endpoints.source),
        "fetching message from source"
    );
    let body = client::fetch(&ctx.client, &ctx.endpoints.source, ctx.fetch_timeout).await?;

    let message = match message::interpret(&body)? {
        Fetched::NoMessage => return Ok(CycleOutcome::NoMessage),
        Fetched::Incomplete { id } => return Ok(CycleOutcome::Incomplete { id }),
        Fetched::Message(message) => message,
    };

    log_fetched(&message);

    let status = client::forward(
        &ctx.client,
        &ctx.endpoints.destination,
        &message.payload(),
        ctx.forward_timeout,
    )
    .await?;

    Ok(CycleOutcome::Forwarded {
        id: message.id,
        status: status.as_u16(),
    })
}

fn log_fetched(message: &RelayMessage) {
    let preview: String = message.title.chars().take(50).collect();
    tracing::info!(id = message.display_id(), title = %preview, "fetched message");
}

fn log_cycle(result: &Result<CycleOutcome, RelayError>) {
    match result {
        Ok(CycleOutcome::NoMessage) => tracing::info!("no new message to forward"),
        Ok(CycleOutcome::Incomplete { id }) => tracing::warn!(
            id = id.as_deref().unwrap_or("N/A"),
            "fetched message has no content, skipping"
        ),
        Ok(CycleOutcome::Forwarded { id, status }) => tracing::info!(
            id = id.as_deref().unwrap_or("N/A"),
            status,
            "message forwarded"
        ),
        Err(e @ RelayError::UpstreamBadResponse { .. }) => {
            tracing::warn!(error = %e, "source returned no valid message");
        }
        Err(e) => tracing::error!(error = %e, "relay cycle failed"),
    }
}

/// Start the poll task if the relay is configured.
///
/// Returns `Ok(None)` when a relay variable is missing (logged once here),
/// and an error when a configured URL cannot be parsed.
pub fn spawn(
    config: &ForwardConfig,
    client: HttpClient,
    status: &TaskStatus,
    shutdown: watch::Receiver<bool>,
) -> Result<Option<JoinHandle<()>>, CourierError> {
    let missing = config.missing_relay_vars();
    if !missing.is_empty() {
        tracing::warn!(
            missing = %missing.join(", "),
            "relay not started: missing configuration"
        );
        return Ok(None);
    }

    let Some(endpoints) = RelayEndpoints::from_config(config)? else {
        return Ok(None);
    };

    tracing::info!(
        source = %redacted(&endpoints.source),
        destination = %redacted(&endpoints.destination),
        interval_secs = config.poll_interval.as_secs(),
        "relay started"
    );

    let ctx = Arc::new(RelayContext::new(client, endpoints));
    let guard = status.mark_alive();
    let interval = config.poll_interval;

    Ok(Some(tokio::spawn(async move {
        let _guard = guard;
        poll_loop(ctx, interval, shutdown).await;
    })))
}

/// Wait one interval, run one cycle, repeat until `shutdown` changes.
pub async fn poll_loop(
    ctx: Arc<RelayContext>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await; // Skip first immediate tick

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => {
                tracing::debug!("relay loop shutting down");
                return;
            }
        }

        let cycle_ctx = Arc::clone(&ctx);
        let mut cycle = tokio::spawn(async move { run_cycle(&cycle_ctx).await });

        tokio::select! {
            joined = &mut cycle => match joined {
                Ok(result) => log_cycle(&result),
                Err(join_err) => tracing::error!(error = %join_err, "relay cycle panicked"),
            },
            _ = shutdown.changed() => {
                cycle.abort();
                tracing::debug!("relay loop shutting down, in-flight cycle aborted");
                return;
            }
        }
    }
}
