use async_trait::async_trait;
use mux_common::RoutingContext;
use mux_error::{ErrorContext, MuxError, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::fetch::{backend_url, FetchClient};

/// Interface name to the modules currently implementing it, in discovery
/// order. The gateway's own modules are never listed.
#[async_trait]
pub trait ServiceDirectory: Send + Sync {
    async fn list_backends(&self, interface: &str, ctx: &RoutingContext) -> Result<Vec<String>>;
}

#[derive(Debug, Deserialize)]
struct ModuleEntry {
    id: String,
}

/// Asks the Okapi proxy which modules the tenant has enabled for an
/// interface.
#[derive(Debug, Clone)]
pub struct ProxyDirectory {
    client: FetchClient,
    self_prefix: String,
}

impl ProxyDirectory {
    pub fn new(client: FetchClient, self_prefix: impl Into<String>) -> Self {
        Self {
            client,
            self_prefix: self_prefix.into(),
        }
    }
}

#[async_trait]
impl ServiceDirectory for ProxyDirectory {
    async fn list_backends(&self, interface: &str, ctx: &RoutingContext) -> Result<Vec<String>> {
        let okapi = ctx
            .okapi_url()
            .ok_or_else(|| MuxError::directory_unavailable("missing X-Okapi-Url"))?;
        let tenant = ctx
            .tenant()
            .ok_or_else(|| MuxError::directory_unavailable("missing X-Okapi-Tenant"))?;

        let path = format!("/_/proxy/tenants/{}/interfaces/{}", tenant, interface);
        let url = backend_url(okapi, &path).map_err(|e| {
            MuxError::directory_unavailable(e.message).with_context(ErrorContext::Directory {
                url: None,
                status: None,
            })
        })?;

        info!(url = %url, "listing modules");
        let resp = self.client.fetch_as_gateway(&url, ctx).await.map_err(|e| {
            MuxError::directory_unavailable(format!("Get {} returned exception {}", url, e))
                .with_context(ErrorContext::Directory {
                    url: Some(url.to_string()),
                    status: None,
                })
        })?;

        if !resp.is_ok() {
            return Err(MuxError::directory_unavailable(format!(
                "Get {} returned status {}",
                url, resp.status
            ))
            .with_context(ErrorContext::Directory {
                url: Some(url.to_string()),
                status: Some(resp.status),
            }));
        }

        let modules: Vec<ModuleEntry> = serde_json::from_slice(&resp.body).map_err(|e| {
            warn!(url = %url, error = %e, "malformed module list");
            MuxError::directory_unavailable(format!("Get {} returned malformed body: {}", url, e))
                .with_context(ErrorContext::Directory {
                    url: Some(url.to_string()),
                    status: Some(resp.status),
                })
        })?;

        let ids = without_self(modules.into_iter().map(|m| m.id), &self.self_prefix);
        debug!(interface, backends = ?ids, "discovered backends");
        Ok(ids)
    }
}

/// A fixed module list, for deployments without a discovery proxy.
#[derive(Debug, Clone)]
pub struct StaticDirectory {
    backends: Vec<String>,
}

impl StaticDirectory {
    pub fn new(backends: Vec<String>, self_prefix: &str) -> Self {
        Self {
            backends: without_self(backends, self_prefix),
        }
    }
}

#[async_trait]
impl ServiceDirectory for StaticDirectory {
    async fn list_backends(&self, _interface: &str, ctx: &RoutingContext) -> Result<Vec<String>> {
        // Backends are still reached through Okapi.
        if ctx.okapi_url().is_none() {
            return Err(MuxError::directory_unavailable("missing X-Okapi-Url"));
        }
        Ok(self.backends.clone())
    }
}

fn without_self(ids: impl IntoIterator<Item = String>, self_prefix: &str) -> Vec<String> {
    ids.into_iter()
        .filter(|id| !id.starts_with(self_prefix))
        .collect()
}
