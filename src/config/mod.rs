//! Process-wide forwarding configuration.
//!
//! [`ForwardConfig`] is resolved once at startup from [`ConfigArgs`]
//! (flags or environment), then shared read-only behind an `Arc` by the
//! proxy handler and the relay task. [`RelayEndpoints`] derives the
//! ready-to-call source and destination URLs, API keys attached.

pub mod validation;

use std::time::Duration;

use url::Url;

use crate::cli::ConfigArgs;
use crate::error::{CourierError, ValidationError};

pub const DEFAULT_TARGET_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
/// Longest accepted poll interval (one year).
pub const MAX_POLL_INTERVAL_SECS: u64 = 365 * 24 * 60 * 60;

/// Query parameter carrying the API key on both relay legs.
pub const KEY_PARAM: &str = "key";

pub const ENV_TARGET_BASE_URL: &str = "TARGET_BASE_URL";
pub const ENV_SOURCE_API_URL: &str = "CLOUDFLARE_API_URL";
pub const ENV_SOURCE_API_KEY: &str = "CLOUDFLARE_API_KEY";
pub const ENV_DEST_API_URL: &str = "TARGET_API_URL_BASE";
pub const ENV_DEST_API_KEY: &str = "TARGET_API_KEY";
pub const ENV_POLL_INTERVAL: &str = "FORWARD_INTERVAL_SECONDS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardConfig {
    pub target_base_url: Option<String>,
    pub source_api_url: Option<String>,
    pub source_api_key: Option<String>,
    pub dest_api_url: Option<String>,
    pub dest_api_key: Option<String>,
    pub poll_interval: Duration,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            target_base_url: None,
            source_api_url: None,
            source_api_key: None,
            dest_api_url: None,
            dest_api_key: None,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(String::from)
}

#[must_use]
pub fn is_production(environment: &str) -> bool {
    let env = environment.trim();
    env.eq_ignore_ascii_case("production") || env.eq_ignore_ascii_case("prod")
}

impl ForwardConfig {
    /// Build the configuration from parsed arguments.
    ///
    /// An unset `TARGET_BASE_URL` falls back to [`DEFAULT_TARGET_BASE_URL`]
    /// outside production. A value that is set but blank stays unset so the
    /// proxy reports itself unconfigured.
    #[must_use]
    pub fn resolve(args: &ConfigArgs) -> Self {
        let target_base_url = match args.target_base_url.as_deref().map(str::trim) {
            Some("") => {
                tracing::warn!(
                    var = ENV_TARGET_BASE_URL,
                    "backend base URL is empty, proxied requests will fail with 503"
                );
                None
            }
            Some(url) => Some(url.to_string()),
            None if is_production(&args.environment) => {
                tracing::error!(
                    var = ENV_TARGET_BASE_URL,
                    environment = %args.environment,
                    "backend base URL not set, proxied requests will fail with 503"
                );
                None
            }
            None => {
                tracing::warn!(
                    var = ENV_TARGET_BASE_URL,
                    default = DEFAULT_TARGET_BASE_URL,
                    "backend base URL not set, using development default"
                );
                Some(DEFAULT_TARGET_BASE_URL.to_string())
            }
        };

        Self {
            target_base_url,
            source_api_url: non_blank(args.source_api_url.as_ref()),
            source_api_key: non_blank(args.source_api_key.as_ref()),
            dest_api_url: non_blank(args.dest_api_url.as_ref()),
            dest_api_key: non_blank(args.dest_api_key.as_ref()),
            poll_interval: Duration::from_secs(args.forward_interval),
        }
    }

    /// The proxy backend, if configured and non-empty.
    #[must_use]
    pub fn target_base_url(&self) -> Option<&str> {
        self.target_base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
    }

    /// Names of the environment variables the relay needs but does not have.
    #[must_use]
    pub fn missing_relay_vars(&self) -> Vec<&'static str> {
        [
            (ENV_SOURCE_API_URL, &self.source_api_url),
            (ENV_SOURCE_API_KEY, &self.source_api_key),
            (ENV_DEST_API_URL, &self.dest_api_url),
            (ENV_DEST_API_KEY, &self.dest_api_key),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().map_or(true, str::is_empty))
        .map(|(name, _)| name)
        .collect()
    }

    #[must_use]
    pub fn relay_configured(&self) -> bool {
        self.missing_relay_vars().is_empty()
    }
}

/// Source and destination URLs with the API key attached.
#[derive(Debug, Clone)]
pub struct RelayEndpoints {
    pub source: Url,
    pub destination: Url,
}

impl RelayEndpoints {
    /// Returns `Ok(None)` when any relay variable is missing.
    pub fn from_config(config: &ForwardConfig) -> Result<Option<Self>, CourierError> {
        let (Some(source), Some(source_key), Some(dest), Some(dest_key)) = (
            config.source_api_url.as_deref(),
            config.source_api_key.as_deref(),
            config.dest_api_url.as_deref(),
            config.dest_api_key.as_deref(),
        ) else {
            return Ok(None);
        };

        let mut errors = Vec::new();
        let source = with_key(ENV_SOURCE_API_URL, source, source_key, &mut errors);
        let destination = with_key(ENV_DEST_API_URL, dest, dest_key, &mut errors);

        match (source, destination) {
            (Some(source), Some(destination)) => Ok(Some(Self {
                source,
                destination,
            })),
            _ => Err(CourierError::ConfigValidation { errors }),
        }
    }
}

fn with_key(
    field: &str,
    raw: &str,
    key: &str,
    errors: &mut Vec<ValidationError>,
) -> Option<Url> {
    match Url::parse(raw) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair(KEY_PARAM, key);
            Some(url)
        }
        Err(e) => {
            errors.push(ValidationError {
                field: field.to_string(),
                message: format!("'{raw}' is not a valid URL: {e}"),
                suggestion: None,
            });
            None
        }
    }
}

/// Host and path of a URL, for log fields that must not leak query keys.
#[must_use]
pub fn redacted(url: &Url) -> String {
    let host = url.host_str().unwrap_or("");
    url.port().map_or_else(
        || format!("{host}{}", url.path()),
        |port| format!("{host}:{port}{}", url.path()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ConfigArgs {
        ConfigArgs {
            target_base_url: None,
            source_api_url: None,
            source_api_key: None,
            dest_api_url: None,
            dest_api_key: None,
            forward_interval: DEFAULT_POLL_INTERVAL_SECS,
            environment: "development".into(),
        }
    }

    #[test]
    fn target_defaults_outside_production() {
        let config = ForwardConfig::resolve(&args());
        assert_eq!(config.target_base_url(), Some(DEFAULT_TARGET_BASE_URL));
    }

    #[test]
    fn target_has_no_default_in_production() {
        let mut a = args();
        a.environment = "Production".into();
        let config = ForwardConfig::resolve(&a);
        assert_eq!(config.target_base_url(), None);
    }

    #[test]
    fn blank_target_stays_unset() {
        let mut a = args();
        a.target_base_url = Some("   ".into());
        let config = ForwardConfig::resolve(&a);
        assert_eq!(config.target_base_url(), None);
    }

    #[test]
    fn blank_relay_values_are_missing() {
        let mut a = args();
        a.source_api_url = Some("https://pages.example.com/api/message".into());
        a.source_api_key = Some(String::new());
        let config = ForwardConfig::resolve(&a);
        assert_eq!(
            config.missing_relay_vars(),
            vec![ENV_SOURCE_API_KEY, ENV_DEST_API_URL, ENV_DEST_API_KEY]
        );
        assert!(!config.relay_configured());
    }

    #[test]
    fn endpoints_carry_encoded_key() {
        let config = ForwardConfig {
            source_api_url: Some("https://pages.example.com/api/message".into()),
            source_api_key: Some("s3cr3t&x".into()),
            dest_api_url: Some("http://10.0.0.5:5001/send".into()),
            dest_api_key: Some("dest".into()),
            ..ForwardConfig::default()
        };
        let endpoints = RelayEndpoints::from_config(&config).unwrap().unwrap();
        assert_eq!(
            endpoints.source.as_str(),
            "https://pages.example.com/api/message?key=s3cr3t%26x"
        );
        assert_eq!(endpoints.destination.as_str(), "http://10.0.0.5:5001/send?key=dest");
    }

    #[test]
    fn endpoints_absent_when_unconfigured() {
        let endpoints = RelayEndpoints::from_config(&ForwardConfig::default()).unwrap();
        assert!(endpoints.is_none());
    }

    #[test]
    fn redacted_drops_query() {
        let url = Url::parse("http://10.0.0.5:5001/send?key=dest").unwrap();
        assert_eq!(redacted(&url), "10.0.0.5:5001/send");
    }
}
