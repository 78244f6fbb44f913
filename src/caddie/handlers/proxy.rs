//! Same-origin API proxy.
//!
//! `/api/v1/*` is forwarded to the backend origin with the path and query
//! kept as-is. Only an allow-list of request headers crosses over, and a
//! failed upstream call turns into a fixed 500 without any detail.

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{Extension, Request},
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderMap, HeaderName, Method, StatusCode,
    },
    response::{IntoResponse, Json, Response},
};
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, instrument};
use url::Url;

use crate::caddie::APP_USER_AGENT;

/// Path prefix handled by the proxy.
pub const PROXY_PREFIX: &str = "/api/v1";

const FORWARDED_HEADERS: [HeaderName; 3] = [AUTHORIZATION, CONTENT_TYPE, ACCEPT];

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("upstream request failed: {0}")]
    Upstream(#[source] reqwest::Error),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Internal Server Error" })),
        )
            .into_response()
    }
}

/// Backend origin plus the pooled HTTP client used to reach it.
#[derive(Clone, Debug)]
pub struct Upstream {
    client: Client,
    base: Url,
}

impl Upstream {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base: Url) -> Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()
            .context("Failed to build upstream HTTP client")?;

        Ok(Self { client, base })
    }

    /// Backend URL for an incoming `path` and optional `query`.
    #[must_use]
    pub fn target(&self, path: &str, query: Option<&str>) -> Url {
        let mut url = self.base.clone();
        let base_path = self.base.path().trim_end_matches('/');
        url.set_path(&format!("{base_path}{path}"));
        url.set_query(query);
        url
    }
}

fn is_forwarded_method(method: &Method) -> bool {
    [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
    ]
    .contains(method)
}

fn carries_body(method: &Method) -> bool {
    [Method::POST, Method::PUT, Method::PATCH].contains(method)
}

fn forwarded_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = HeaderMap::new();
    for name in FORWARDED_HEADERS {
        if let Some(value) = headers.get(&name) {
            forwarded.insert(name, value.clone());
        }
    }
    forwarded
}

#[utoipa::path(
    get,
    path = "/api/v1/{path}",
    params(
        ("path" = String, Path, description = "Backend API path, forwarded verbatim")
    ),
    responses(
        (status = 200, description = "Upstream response, status and body passed through"),
        (status = 500, description = "Upstream unreachable")
    ),
    tag = "proxy"
)]
#[instrument(skip(upstream, request), fields(method = %request.method(), path = %request.uri().path()))]
pub async fn proxy(Extension(upstream): Extension<Arc<Upstream>>, request: Request) -> Response {
    if !is_forwarded_method(request.method()) {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    match forward(&upstream, request).await {
        Ok(response) => response,
        Err(err) => {
            error!("Proxy request failed: {err}");
            err.into_response()
        }
    }
}

async fn forward(upstream: &Upstream, request: Request) -> Result<Response, ProxyError> {
    let (parts, body) = request.into_parts();
    let target = upstream.target(parts.uri.path(), parts.uri.query());

    debug!("Forwarding {} {}", parts.method, target);

    let mut outbound = upstream
        .client
        .request(parts.method.clone(), target)
        .headers(forwarded_headers(&parts.headers));

    if carries_body(&parts.method) {
        outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));
    }

    let upstream_response = outbound.send().await.map_err(ProxyError::Upstream)?;
    let status = upstream_response.status();
    let content_type = upstream_response.headers().get(CONTENT_TYPE).cloned();

    debug!("Upstream answered {}", status);

    // the body is relayed as it arrives; a mid-stream failure aborts it
    let mut response = Response::new(Body::from_stream(upstream_response.bytes_stream()));
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        response.headers_mut().insert(CONTENT_TYPE, content_type);
    }

    Ok(response)
}
