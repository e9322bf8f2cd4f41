//! Outbound calls of a poll cycle: fetch from the source, post to the destination.

use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{ACCEPT, CONTENT_TYPE};
use hyper::{Method, StatusCode, Uri};
use url::Url;

use crate::error::{RelayError, RelayStage};
use crate::server::HttpClient;

use super::message::ForwardPayload;

/// Longest error body kept in logs.
const MAX_LOGGED_BODY: usize = 512;

pub async fn fetch(
    client: &HttpClient,
    url: &Url,
    timeout: Duration,
) -> Result<Bytes, RelayError> {
    let request = build(Method::GET, url, None, RelayStage::Fetch)?;
    send(client, request, timeout, RelayStage::Fetch)
        .await
        .map(|(_, body)| body)
}

pub async fn forward(
    client: &HttpClient,
    url: &Url,
    payload: &ForwardPayload<'_>,
    timeout: Duration,
) -> Result<StatusCode, RelayError> {
    let body = serde_json::to_vec(payload)?;
    let request = build(Method::POST, url, Some(body), RelayStage::Forward)?;
    send(client, request, timeout, RelayStage::Forward)
        .await
        .map(|(status, _)| status)
}

fn build(
    method: Method,
    url: &Url,
    json: Option<Vec<u8>>,
    stage: RelayStage,
) -> Result<hyper::Request<Full<Bytes>>, RelayError> {
    let uri: Uri = url.as_str().parse().map_err(|e| RelayError::Transport {
        stage,
        source: Box::new(e),
    })?;

    let mut builder = hyper::Request::builder()
        .method(method)
        .uri(uri)
        .header(ACCEPT, "application/json");
    let body = match json {
        Some(bytes) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Full::new(Bytes::from(bytes))
        }
        None => Full::new(Bytes::new()),
    };

    builder.body(body).map_err(|e| RelayError::Transport {
        stage,
        source: Box::new(e),
    })
}

/// Send a request and collect its body. Non-2xx statuses are errors.
async fn send(
    client: &HttpClient,
    request: hyper::Request<Full<Bytes>>,
    timeout: Duration,
    stage: RelayStage,
) -> Result<(StatusCode, Bytes), RelayError> {
    let exchange = async {
        let response = client
            .request(request)
            .await
            .map_err(|e| RelayError::Transport {
                stage,
                source: Box::new(e),
            })?;
        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| RelayError::Transport {
                stage,
                source: Box::new(e),
            })?
            .to_bytes();
        Ok::<_, RelayError>((status, body))
    };

    let (status, body) = tokio::time::timeout(timeout, exchange)
        .await
        .map_err(|_| RelayError::Timeout { stage, timeout })??;

    if !status.is_success() {
        return Err(RelayError::Status {
            stage,
            status,
            body: truncate(&body),
        });
    }
    Ok((status, body))
}

fn truncate(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if text.len() <= MAX_LOGGED_BODY {
        return text.into_owned();
    }
    let mut end = MAX_LOGGED_BODY;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &text[..end])
}
