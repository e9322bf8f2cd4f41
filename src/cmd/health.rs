//! `courier health`: check the health of a running instance.
//!
//! Sends a `GET` request to the given URL and path (the relay's `/` by
//! default) and prints the plain-text status. Any non-2xx status is an
//! error, so the exit code works as a container liveness probe.

use http_body_util::BodyExt;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::cli::HealthArgs;
use crate::error::CourierError;

pub async fn execute(args: HealthArgs) -> Result<(), CourierError> {
    let url = probe_url(&args.url, &args.path);
    let uri: hyper::Uri =
        url.parse().map_err(
            |e: hyper::http::uri::InvalidUri| CourierError::UriParse {
                source: Box::new(e),
            },
        )?;

    let connector = hyper_util::client::legacy::connect::HttpConnector::new();
    let client = Client::builder(TokioExecutor::new()).build(connector);

    let req = hyper::Request::builder()
        .uri(uri)
        .body(http_body_util::Full::new(bytes::Bytes::new()))
        .map_err(|e| CourierError::HttpRequest {
            source: Box::new(e),
        })?;

    let response = tokio::time::timeout(std::time::Duration::from_secs(10), client.request(req))
        .await
        .map_err(|_| CourierError::HttpRequest {
            source: "health check timed out after 10s".into(),
        })?
        .map_err(|e| CourierError::HttpRequest {
            source: Box::new(e),
        })?;

    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .map_err(|e| CourierError::HttpRequest {
            source: Box::new(e),
        })?
        .to_bytes();
    let body = String::from_utf8_lossy(&body).trim().to_string();

    if !status.is_success() {
        return Err(CourierError::HealthCheckFailed { status, body });
    }

    println!("\u{2713} {url} ({status})");
    if !body.is_empty() {
        println!("  {body}");
    }

    Ok(())
}

fn probe_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
