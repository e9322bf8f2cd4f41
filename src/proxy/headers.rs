//! Hop-by-hop header stripping for both directions of the proxy.
//!
//! The same exclusion set applies to the request sent to the backend and
//! to the response relayed to the caller. `host` is dropped so the client
//! sets the backend's authority, and `content-length` is dropped because
//! the transport recomputes it from the body actually sent.

use std::sync::LazyLock;

use http::{HeaderMap, HeaderName};

static EXCLUDED: LazyLock<Vec<HeaderName>> = LazyLock::new(|| {
    [
        "connection",
        "keep-alive",
        "proxy-authenticate",
        "proxy-authorization",
        "te",
        "trailer",
        "trailers",
        "transfer-encoding",
        "upgrade",
        "content-encoding",
        "content-length",
        "host",
    ]
    .iter()
    .filter_map(|name| name.parse::<HeaderName>().ok())
    .collect()
});

/// `HeaderName` is always lowercase, so comparison is case-insensitive.
#[must_use]
pub fn is_excluded(name: &HeaderName) -> bool {
    EXCLUDED.contains(name)
}

/// Remove every excluded header, keeping all values of the others.
pub fn strip_excluded(headers: &mut HeaderMap) {
    for name in EXCLUDED.iter() {
        headers.remove(name);
    }
}
