//! Courier is a minimal HTTP forwarding layer with two independent services.
//!
//! - The **reverse proxy** forwards every inbound request (any method, any
//!   path) to a single configured backend and streams the response back,
//!   stripping hop-by-hop headers in both directions.
//! - The **poll-and-relay** service fetches a message from a source API on a
//!   fixed interval and posts it to a destination API, at most once.
//!
//! # Architecture
//!
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (proxy, relay, validate, health).
//! - [`config`] -- Immutable [`ForwardConfig`](config::ForwardConfig) resolved
//!   from the environment, plus validation.
//! - [`error`] -- Unified error types using `thiserror`.
//! - [`health`] -- Local endpoints: relay `GET /` status and proxy `GET /hello`.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`proxy`] -- Core HTTP forwarding: URL joining, header stripping, and
//!   bounded-chunk response streaming.
//! - [`relay`] -- The cancellable poll-and-relay background task.
//! - [`server`] -- Axum routers, shared state, HTTP client, and graceful shutdown.

// Binary crate: public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod proxy;
pub mod relay;
pub mod server;
