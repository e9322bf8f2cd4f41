//! Configuration validation with detailed error reporting.
//!
//! [`validate_proxy`] and [`validate_relay`] check the values each
//! service uses. Unset values are not errors here: the proxy answers 503
//! without a backend and the relay simply does not start. Values that are
//! present but malformed are rejected so startup fails fast.

use url::Url;

use super::{
    ForwardConfig, ENV_DEST_API_URL, ENV_POLL_INTERVAL, ENV_SOURCE_API_URL, ENV_TARGET_BASE_URL,
    MAX_POLL_INTERVAL_SECS,
};
use crate::error::ValidationError;

/// Validate an outbound URL. Returns `Ok(())` or a human-readable error plus suggestion.
pub fn validate_url(url: &str) -> Result<(), (String, Option<String>)> {
    match Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            if scheme != "http" && scheme != "https" {
                Err((
                    format!("unsupported scheme '{scheme}' (expected http or https)"),
                    None,
                ))
            } else if parsed.host_str().is_none() {
                Err((format!("'{url}' has no host"), None))
            } else {
                Ok(())
            }
        }
        Err(url::ParseError::RelativeUrlWithoutBase) => Err((
            format!("'{url}' is not a valid URL"),
            Some(format!("did you mean 'http://{url}'?")),
        )),
        Err(_) => Err((format!("'{url}' is not a valid URL"), None)),
    }
}

fn check_url(field: &str, url: &str, errors: &mut Vec<ValidationError>) {
    if let Err((message, suggestion)) = validate_url(url) {
        errors.push(ValidationError {
            field: field.into(),
            message,
            suggestion,
        });
    }
}

pub fn validate_proxy(config: &ForwardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Some(base) = config.target_base_url() {
        check_url(ENV_TARGET_BASE_URL, base, &mut errors);

        // The inbound path and query are appended verbatim
        if base.contains('?') || base.contains('#') {
            errors.push(ValidationError {
                field: ENV_TARGET_BASE_URL.into(),
                message: "base URL must not contain a query string or fragment".into(),
                suggestion: base
                    .split(['?', '#'])
                    .next()
                    .map(|prefix| format!("did you mean '{prefix}'?")),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub fn validate_relay(config: &ForwardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Some(ref url) = config.source_api_url {
        check_url(ENV_SOURCE_API_URL, url, &mut errors);
    }
    if let Some(ref url) = config.dest_api_url {
        check_url(ENV_DEST_API_URL, url, &mut errors);
    }
    if config.poll_interval.is_zero() {
        errors.push(ValidationError {
            field: ENV_POLL_INTERVAL.into(),
            message: "interval must be a positive number of seconds".into(),
            suggestion: Some("the default is 60".into()),
        });
    } else if config.poll_interval.as_secs() > MAX_POLL_INTERVAL_SECS {
        errors.push(ValidationError {
            field: ENV_POLL_INTERVAL.into(),
            message: format!(
                "interval of {}s exceeds the {MAX_POLL_INTERVAL_SECS}s maximum",
                config.poll_interval.as_secs()
            ),
            suggestion: None,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate the settings of both services.
pub fn validate(config: &ForwardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = validate_proxy(config).err().unwrap_or_default();
    errors.extend(validate_relay(config).err().unwrap_or_default());
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Human-readable summary of which services the configuration enables.
#[must_use]
pub fn format_validation_report(config: &ForwardConfig) -> String {
    let proxy = config.target_base_url().map_or_else(
        || "disabled (no TARGET_BASE_URL)".to_string(),
        |url| format!("forwarding to {url}"),
    );

    let missing = config.missing_relay_vars();
    let relay = if missing.is_empty() {
        format!("polling every {}s", config.poll_interval.as_secs())
    } else {
        format!("disabled (missing {})", missing.join(", "))
    };

    format!("configuration is valid\n  proxy: {proxy}\n  relay: {relay}")
}
