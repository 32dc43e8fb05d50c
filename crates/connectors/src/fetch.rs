//! One bounded HTTP GET against Okapi, on behalf of one backend module.
//!
//! A response with any status is a successful fetch; only transport problems
//! (connect, timeout, truncated body) are errors.

use mux_common::headers::{RoutingContext, OKAPI_MODULE_ID};
use mux_error::{ErrorCode, ErrorContext, MuxError, Result};
use tracing::{debug, warn};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use std::time::Duration;
use url::Url;

/// Status and raw body of a backend answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

#[derive(Debug, Clone)]
pub struct FetchClient {
    timeout: Duration,
}

impl FetchClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// GET `url` as `backend_id`: routing headers copied, then
    /// `X-Okapi-Module-Id` and `Accept: application/json` set.
    pub async fn fetch(
        &self,
        backend_id: &str,
        url: &Url,
        ctx: &RoutingContext,
    ) -> Result<RawResponse> {
        let module_id = HeaderValue::from_str(backend_id).map_err(|e| {
            warn!(backend = backend_id, error = %e, "module id is not a valid header value");
            MuxError::transport(
                backend_id,
                url.as_str(),
                format!("module id {:?} cannot be sent as {}", backend_id, OKAPI_MODULE_ID),
            )
        })?;
        let mut headers = routing_headers(ctx);
        headers.insert(HeaderName::from_static(OKAPI_MODULE_ID), module_id);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        debug!(backend = backend_id, url = %url, "fetching from backend");
        self.get(url, headers).await.map_err(|e| {
            MuxError::from(e).with_context(ErrorContext::Backend {
                backend_id: backend_id.to_string(),
                url: url.to_string(),
                status: None,
            })
        })
    }

    /// GET `url` with only the routing headers, as the gateway itself.
    pub async fn fetch_as_gateway(
        &self,
        url: &Url,
        ctx: &RoutingContext,
    ) -> std::result::Result<RawResponse, reqwest::Error> {
        self.get(url, routing_headers(ctx)).await
    }

    // The client lives for this call only and is dropped on every exit path.
    async fn get(
        &self,
        url: &Url,
        headers: HeaderMap,
    ) -> std::result::Result<RawResponse, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(self.timeout).build()?;
        let resp = client.get(url.clone()).headers(headers).send().await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?.to_vec();
        Ok(RawResponse { status, body })
    }
}

fn routing_headers(ctx: &RoutingContext) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in ctx.iter() {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!(header = name, "dropping routing header that is not valid HTTP"),
        }
    }
    headers
}

/// `{okapi}{path}?offset=0&limit={window}[&query=...]`
pub fn search_url(okapi_url: &str, path: &str, window: usize, query: Option<&str>) -> Result<Url> {
    let mut url = parse_okapi_url(okapi_url, path)?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs
            .append_pair("offset", "0")
            .append_pair("limit", &window.to_string());
        if let Some(q) = query {
            pairs.append_pair("query", q);
        }
    }
    Ok(url)
}

/// `{okapi}{path}/{id}`, the id encoded as one path segment.
pub fn entity_url(okapi_url: &str, path: &str, id: &str) -> Result<Url> {
    let mut url = parse_okapi_url(okapi_url, path)?;
    url.path_segments_mut()
        .map_err(|_| {
            MuxError::new(
                ErrorCode::TransportFailure,
                format!("cannot append a path segment to {}", okapi_url),
            )
        })?
        .push(id);
    Ok(url)
}

pub fn backend_url(okapi_url: &str, path: &str) -> Result<Url> {
    parse_okapi_url(okapi_url, path)
}

fn parse_okapi_url(okapi_url: &str, path: &str) -> Result<Url> {
    let raw = format!("{}{}", okapi_url.trim_end_matches('/'), path);
    Url::parse(&raw).map_err(|e| {
        MuxError::new(
            ErrorCode::TransportFailure,
            format!("invalid backend url {}: {}", raw, e),
        )
    })
}
