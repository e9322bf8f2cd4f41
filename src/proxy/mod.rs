//! Reverse-proxy request forwarding.
//!
//! The [`forward_handler`] function is the Axum fallback that receives
//! every request not claimed by a dedicated route and relays it to the
//! configured backend. Submodules handle header stripping ([`headers`]),
//! backend URL construction ([`target`]), and bounded-chunk response
//! streaming ([`body`]).
//!
//! Backend responses are decoded before they are relayed, since
//! `content-encoding` never reaches the caller. The outbound
//! `accept-encoding` is therefore replaced with the encodings the
//! decoder supports.

pub mod body;
pub mod headers;
pub mod target;

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header::ACCEPT_ENCODING;
use axum::http::{HeaderMap, Method, Uri};
use axum::response::{IntoResponse, Response};
use http_body_util::Full;
use tower::ServiceExt;
use tower_http::decompression::Decompression;

use crate::error::ProxyError;
use crate::server::{HttpClient, ProxyState};

use self::body::{ChunkedBody, CHUNK_SIZE};

pub async fn forward_handler(
    State(state): State<Arc<ProxyState>>,
    method: Method,
    uri: Uri,
    req_headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = uuid::Uuid::new_v4();
    let start = Instant::now();

    let result = forward(
        &state.http_client,
        state.config.target_base_url(),
        state.timeout,
        method.clone(),
        &uri,
        req_headers,
        body,
    )
    .await;
    let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    match result {
        Ok(response) => {
            tracing::info!(
                request_id = %request_id,
                method = %method,
                path = %uri.path(),
                status = response.status().as_u16(),
                latency_ms,
                "request forwarded"
            );
            response
        }
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                method = %method,
                path = %uri.path(),
                kind = e.kind(),
                error = %e,
                latency_ms,
                "forwarding failed"
            );
            e.into_response()
        }
    }
}

/// Relay one request to `base` and return the backend's response with a
/// streamed body.
///
/// `timeout` bounds the TCP connect (through the client's connector) and the
/// wait for response headers. The body stream itself is not time-limited.
/// Compressed bodies are decoded on the fly, frame by frame.
pub async fn forward(
    client: &HttpClient,
    base: Option<&str>,
    timeout: Duration,
    method: Method,
    uri: &Uri,
    mut req_headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    let base = base.ok_or(ProxyError::ConfigurationMissing)?;

    let target_url = target::join(base, target::path_and_query(uri));
    let target_uri: Uri = target_url.parse().map_err(|e| {
        ProxyError::BackendProtocol(format!("invalid target URI '{target_url}': {e}"))
    })?;

    headers::strip_excluded(&mut req_headers);
    // Decompression advertises what it can decode when the header is absent
    req_headers.remove(ACCEPT_ENCODING);

    let mut outbound = hyper::Request::new(Full::new(body));
    *outbound.method_mut() = method;
    *outbound.uri_mut() = target_uri;
    *outbound.headers_mut() = req_headers;

    let exchange = Decompression::new(client.clone()).oneshot(outbound);
    let backend_response = match tokio::time::timeout(timeout, exchange).await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => return Err(classify(&e, timeout)),
        Err(_) => return Err(ProxyError::BackendTimeout(timeout)),
    };

    let (mut parts, incoming) = backend_response.into_parts();
    headers::strip_excluded(&mut parts.headers);

    let body = Body::new(ChunkedBody::new(incoming, CHUNK_SIZE));
    Ok(Response::from_parts(parts, body))
}

/// Map a client error onto the proxy failure taxonomy.
///
/// Connect failures whose cause is an I/O timeout become `BackendTimeout`,
/// other connect failures `BackendUnreachable`, everything else
/// `BackendProtocol`.
#[must_use]
pub fn classify(err: &hyper_util::client::legacy::Error, timeout: Duration) -> ProxyError {
    let detail = error_chain(err);
    if err.is_connect() {
        if caused_by_timeout(err) {
            ProxyError::BackendTimeout(timeout)
        } else {
            ProxyError::BackendUnreachable(detail)
        }
    } else {
        ProxyError::BackendProtocol(detail)
    }
}

fn caused_by_timeout(err: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::TimedOut {
                return true;
            }
        }
        current = e.source();
    }
    false
}

/// `outer: inner: root` rendering of an error and its sources.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut current = err.source();
    while let Some(e) = current {
        out.push_str(": ");
        out.push_str(&e.to_string());
        current = e.source();
    }
    out
}
