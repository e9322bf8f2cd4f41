//! Command-line interface definitions using clap derive macros.
//!
//! Contains the top-level [`Cli`] parser, the [`Commands`] enum for
//! subcommands (proxy, relay, validate, health), and their argument
//! structs. Every forwarding setting is read from the environment
//! variable the deployment already uses, with a flag equivalent for
//! local runs.

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::MAX_POLL_INTERVAL_SECS;

#[derive(Parser)]
#[command(
    name = "courier",
    version,
    about = "Minimal HTTP forwarding layer",
    propagate_version = true,
    after_help = "\x1b[1mQuick start:\x1b[0m\n  \
        TARGET_BASE_URL=http://backend:8080 courier proxy    Reverse proxy\n  \
        courier relay                                         Poll-and-relay bridge\n  \
        courier validate                                      Check the environment"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Forward every request to TARGET_BASE_URL
    Proxy(Box<ProxyArgs>),

    /// Periodically relay a message from the source API to the destination API
    Relay(Box<RelayArgs>),

    /// Validate the environment configuration without starting
    Validate(ValidateArgs),

    /// Check health of a running instance
    Health(HealthArgs),
}

/// Listen address and logging, shared by both services.
#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Listen port
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Listen address
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Log level
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Force pretty (human-readable) log output
    #[arg(long)]
    pub pretty: bool,

    /// Force JSON log output (overrides TTY detection)
    #[arg(long, conflicts_with = "pretty")]
    pub json: bool,
}

/// Forwarding settings, normally supplied through the environment.
#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    /// Backend base URL for the reverse proxy
    #[arg(long, env = "TARGET_BASE_URL", help_heading = "Forwarding")]
    pub target_base_url: Option<String>,

    /// Source API URL polled by the relay
    #[arg(long, env = "CLOUDFLARE_API_URL", help_heading = "Forwarding")]
    pub source_api_url: Option<String>,

    /// Source API key (sent as the `key` query parameter)
    #[arg(
        long,
        env = "CLOUDFLARE_API_KEY",
        hide_env_values = true,
        help_heading = "Forwarding"
    )]
    pub source_api_key: Option<String>,

    /// Destination API URL the relay posts to
    #[arg(long, env = "TARGET_API_URL_BASE", help_heading = "Forwarding")]
    pub dest_api_url: Option<String>,

    /// Destination API key (sent as the `key` query parameter)
    #[arg(
        long,
        env = "TARGET_API_KEY",
        hide_env_values = true,
        help_heading = "Forwarding"
    )]
    pub dest_api_key: Option<String>,

    /// Seconds between poll cycles
    #[arg(
        long,
        env = "FORWARD_INTERVAL_SECONDS",
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..=MAX_POLL_INTERVAL_SECS),
        help_heading = "Forwarding"
    )]
    pub forward_interval: u64,

    /// Deployment environment; `production` disables the localhost backend default
    #[arg(
        long,
        env = "APP_ENV",
        default_value = "development",
        help_heading = "Forwarding"
    )]
    pub environment: String,
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        courier proxy                                          Forward to TARGET_BASE_URL\n  \
        courier proxy --target-base-url http://localhost:9000  Explicit backend\n  \
        courier proxy -p 8080 --pretty                         Local dev mode")]
pub struct ProxyArgs {
    #[command(flatten)]
    pub serve: ServeArgs,

    #[command(flatten)]
    pub config: ConfigArgs,

    // -- Tuning --
    /// Backend connect and response timeout in seconds
    #[arg(
        long,
        env = "PROXY_TIMEOUT_SECS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..),
        help_heading = "Tuning"
    )]
    pub timeout_secs: u64,

    /// Max request body size in bytes
    #[arg(
        long,
        env = "MAX_BODY_SIZE",
        default_value_t = 16 * 1024 * 1024,
        help_heading = "Tuning"
    )]
    pub max_body: usize,
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        courier relay                               Configure via environment\n  \
        courier relay --forward-interval 10 --pretty")]
pub struct RelayArgs {
    #[command(flatten)]
    pub serve: ServeArgs,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: ValidateFormat,
}

#[derive(Args)]
pub struct HealthArgs {
    /// URL of the running instance
    #[arg(default_value = "http://localhost:5000")]
    pub url: String,

    /// Path to probe
    #[arg(long, default_value = "/")]
    pub path: String,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ValidateFormat {
    Text,
    Json,
}
