//! Unified error types for Courier.
//!
//! [`CourierError`] covers startup and CLI failures, [`ValidationError`]
//! reports a single bad configuration value, [`ProxyError`] is the
//! reverse-proxy failure taxonomy (rendered as an HTTP response), and
//! [`RelayError`] describes why a poll cycle did not complete.

use std::fmt;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  {}: {}", self.field, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " ({suggestion})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

fn format_errors(errors: &[ValidationError]) -> String {
    use std::fmt::Write;
    let mut buf = String::new();
    for (i, e) in errors.iter().enumerate() {
        if i > 0 {
            buf.push('\n');
        }
        // write! to String is infallible (only fails on OOM which is unrecoverable)
        let _ = write!(buf, "{e}");
    }
    buf
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CourierError {
    #[error("Config validation failed:\n{}", format_errors(.errors))]
    ConfigValidation { errors: Vec<ValidationError> },

    #[error("Invalid address: {0}")]
    AddressParse(#[from] std::net::AddrParseError),

    #[error("Invalid URI: {source}")]
    UriParse {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("HTTP request failed: {source}")]
    HttpRequest {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Health check failed with status {status}: {body}")]
    HealthCheckFailed { status: StatusCode, body: String },
}

/// Failure kinds of a single proxied request.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("no backend configured (set TARGET_BASE_URL)")]
    ConfigurationMissing,

    #[error("backend unreachable: {0}")]
    BackendUnreachable(String),

    #[error("backend did not respond within {0:?}")]
    BackendTimeout(Duration),

    #[error("backend request failed: {0}")]
    BackendProtocol(String),
}

impl ProxyError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::ConfigurationMissing => StatusCode::SERVICE_UNAVAILABLE,
            Self::BackendUnreachable(_) => StatusCode::BAD_GATEWAY,
            Self::BackendTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::BackendProtocol(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable kind, sent as the `error` field of the response body.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ConfigurationMissing => "configuration-missing",
            Self::BackendUnreachable(_) => "backend-unreachable",
            Self::BackendTimeout(_) => "backend-timeout",
            Self::BackendProtocol(_) => "backend-protocol-error",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Which leg of a poll cycle an outbound call belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayStage {
    Fetch,
    Forward,
}

impl fmt::Display for RelayStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch => f.write_str("fetch"),
            Self::Forward => f.write_str("forward"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("{stage} request timed out after {timeout:?}")]
    Timeout {
        stage: RelayStage,
        timeout: Duration,
    },

    #[error("{stage} request failed: {source}")]
    Transport {
        stage: RelayStage,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{stage} returned HTTP {status}: {body}")]
    Status {
        stage: RelayStage,
        status: StatusCode,
        body: String,
    },

    #[error("unexpected response from source: {raw}")]
    UpstreamBadResponse { raw: String },

    #[error("failed to encode forward payload: {0}")]
    Encode(#[from] serde_json::Error),
}
