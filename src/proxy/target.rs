//! Backend URL construction.
//!
//! [`join`] appends the inbound path-and-query to the backend base URL
//! with exactly one `/` between them. Nothing is decoded or normalized,
//! so the inbound path and query reach the backend byte-for-byte.

use axum::http::Uri;

/// Join `base` and `path_and_query` with a single slash.
#[must_use]
pub fn join(base: &str, path_and_query: &str) -> String {
    let base = base.trim_end_matches('/');
    let rest = path_and_query.strip_prefix('/').unwrap_or(path_and_query);
    format!("{base}/{rest}")
}

/// The path-and-query of an inbound request URI, `/` when absent.
#[must_use]
pub fn path_and_query(uri: &Uri) -> &str {
    uri.path_and_query().map_or("/", |pq| pq.as_str())
}
