//! Structured logging setup using the `tracing` ecosystem.
//!
//! Configures a `tracing-subscriber` with either JSON output (for
//! production) or pretty-printed output (for TTY / local dev). Format
//! is auto-detected from the terminal but can be forced via `--json`
//! or `--pretty`.

use tracing::Level;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

use crate::cli::LogLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[must_use]
pub fn resolve_format(pretty: bool, json: bool) -> LogFormat {
    if json {
        LogFormat::Json
    } else if pretty || std::io::IsTerminal::is_terminal(&std::io::stdout()) {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

/// Default level for the application, with the HTTP stack capped at `info`
/// so `--log-level trace` does not dump every connection poll.
#[must_use]
pub fn filter(level: &LogLevel) -> Targets {
    let level = level.to_tracing_level();
    let transport = if level > Level::INFO { Level::INFO } else { level };
    Targets::new()
        .with_default(level)
        .with_target("hyper", transport)
        .with_target("hyper_util", transport)
}

pub fn init(level: &LogLevel, format: LogFormat) {
    let output = match format {
        LogFormat::Json => fmt::layer().json().with_target(false).boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter(level))
        .with(output)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_wins() {
        assert_eq!(resolve_format(false, true), LogFormat::Json);
    }

    #[test]
    fn pretty_flag_forces_pretty() {
        assert_eq!(resolve_format(true, false), LogFormat::Pretty);
    }

    #[test]
    fn transport_targets_capped_at_info() {
        let targets = filter(&LogLevel::Trace);
        assert!(targets.would_enable("courier::proxy", &Level::TRACE));
        assert!(!targets.would_enable("hyper_util::client", &Level::DEBUG));
        assert!(targets.would_enable("hyper_util::client", &Level::INFO));
    }

    #[test]
    fn quiet_levels_apply_to_transport() {
        let targets = filter(&LogLevel::Warn);
        assert!(!targets.would_enable("hyper", &Level::INFO));
    }
}
