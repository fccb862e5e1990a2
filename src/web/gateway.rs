//! API-gateway compatibility layer.
//!
//! Deployed behind a gateway stage, every request path arrives prefixed
//! with `/Prod`, browsers preflight cross-origin uploads with `OPTIONS`, and
//! every response needs CORS headers. This middleware handles all three
//! before the application router sees the request.

use axum::extract::Request;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_MAX_AGE,
};
use axum::http::uri::PathAndQuery;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

pub const STAGE_PREFIX: &str = "/Prod";

/// Request extension recording the stage prefix that was stripped, so
/// pages can build links that survive the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagePrefix(pub &'static str);

const ALLOW_ORIGIN: &str = "*";
const ALLOW_METHODS: &str = "GET,POST,OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Amz-Security-Token";
const PREFLIGHT_MAX_AGE: &str = "86400";

/// Strip the stage prefix when it is a whole leading path segment.
///
/// `/Prod/health` → `/health`, `/Prod` → `/`, `/Production` is untouched.
pub fn strip_stage_prefix(path: &str) -> Option<&str> {
    match path.strip_prefix(STAGE_PREFIX) {
        Some("") => Some("/"),
        Some(rest) if rest.starts_with('/') => Some(rest),
        _ => None,
    }
}

/// `axum::middleware::from_fn` entry point.
pub async fn gateway(mut req: Request, next: Next) -> Response {
    if let Some(path) = strip_stage_prefix(req.uri().path()) {
        debug!("Normalized path: {} → {}", req.uri().path(), path);
        let path = path.to_string();
        rewrite_path(&mut req, &path);
        req.extensions_mut().insert(StagePrefix(STAGE_PREFIX));
    }

    if req.method() == Method::OPTIONS {
        let mut res = StatusCode::OK.into_response();
        add_cors_headers(res.headers_mut());
        res.headers_mut()
            .insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(PREFLIGHT_MAX_AGE));
        return res;
    }

    let mut res = next.run(req).await;
    add_cors_headers(res.headers_mut());
    res
}

fn rewrite_path(req: &mut Request, path: &str) {
    let path_and_query = match req.uri().query() {
        Some(q) => format!("{path}?{q}"),
        None => path.to_string(),
    };
    let mut parts = req.uri().clone().into_parts();
    let Ok(pq) = path_and_query.parse::<PathAndQuery>() else {
        return;
    };
    parts.path_and_query = Some(pq);
    if let Ok(uri) = Uri::from_parts(parts) {
        *req.uri_mut() = uri;
    }
}

fn add_cors_headers(headers: &mut HeaderMap) {
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static(ALLOW_ORIGIN));
    headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS));
}
