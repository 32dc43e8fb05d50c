//! Request pipeline of the codex multiplexer.
//!
//! The `FederationEngine` answers one request by:
//!
//! 1. **Discovery**: listing the modules implementing the entity's interface.
//! 2. **Parsing**: turning the query text into a tree, and its `sortby` clause
//!    into a comparator.
//! 3. **Routing**: excluding and rewriting the query per backend.
//! 4. **Fetching**: one page per routed backend, all at once.
//! 5. **Merging**: the bounded k-way merge over those pages.
//! 6. **Diagnostics**: one trail entry per queried backend.
//!
//! Discovery comes first, so an unreachable directory is reported even for an
//! unparseable query. Nothing survives between requests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use mux_common::scrubber::scrub;
use mux_common::{AppConfig, Package, ResultInfo, RoutingContext, SourceCollection};
use mux_connectors::{FetchClient, ProxyDirectory, ServiceDirectory, StaticDirectory};
use mux_cql::CqlQuery;
use mux_error::Result;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::{debug, info};

use crate::comparator::EntityComparator;
use crate::diagnostics::result_info;
use crate::entity::Entity;
use crate::merge::{fetch_pages, merge_pages, window, RoutedBackend};
use crate::router::{QueryRouter, Routed, SourceTagRules};

/// One merged page: serialized as `{ <collection key>: [...], resultInfo }`.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<E> {
    pub items: Vec<E>,
    pub result_info: ResultInfo,
}

impl<E: Entity> Serialize for Page<E> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(E::COLLECTION_KEY, &self.items)?;
        map.serialize_entry("resultInfo", &self.result_info)?;
        map.end()
    }
}

pub struct FederationEngineOptions {
    pub directory: Arc<dyn ServiceDirectory>,
    pub client: FetchClient,
    pub router: QueryRouter,
    pub default_limit: usize,
}

impl FederationEngineOptions {
    /// Options for `config`: the discovery proxy, or the static backend list
    /// when one is configured.
    pub fn from_config(config: &AppConfig) -> Self {
        let federation = &config.federation;
        let client = FetchClient::new(federation.request_timeout());
        let directory: Arc<dyn ServiceDirectory> = if federation.static_backends.is_empty() {
            Arc::new(ProxyDirectory::new(
                client.clone(),
                federation.self_prefix.clone(),
            ))
        } else {
            Arc::new(StaticDirectory::new(
                federation.static_backends.clone(),
                &federation.self_prefix,
            ))
        };
        Self {
            directory,
            client,
            router: QueryRouter::new(SourceTagRules::new(federation.source_tags.clone())),
            default_limit: federation.default_limit,
        }
    }
}

/// Counts one in-flight request for as long as it is alive, including when the
/// request future is dropped before it completes.
struct ActiveRequest(Arc<AtomicUsize>);

impl ActiveRequest {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter.clone())
    }
}

impl Drop for ActiveRequest {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

pub struct FederationEngine {
    directory: Arc<dyn ServiceDirectory>,
    client: FetchClient,
    router: QueryRouter,
    default_limit: usize,
    active_requests: Arc<AtomicUsize>,
}

impl FederationEngine {
    pub fn new(options: FederationEngineOptions) -> Self {
        Self {
            directory: options.directory,
            client: options.client,
            router: options.router,
            default_limit: options.default_limit,
            active_requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(FederationEngineOptions::from_config(config))
    }

    pub fn default_limit(&self) -> usize {
        self.default_limit
    }

    pub fn active_requests(&self) -> usize {
        self.active_requests.load(Ordering::Relaxed)
    }

    /// Federated search over every backend serving `E`.
    pub async fn search<E: Entity>(
        &self,
        ctx: &RoutingContext,
        query: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> Result<Page<E>> {
        let _active = ActiveRequest::enter(&self.active_requests);
        self.run_search::<E>(ctx, query, offset, limit).await
    }

    async fn run_search<E: Entity>(
        &self,
        ctx: &RoutingContext,
        query: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> Result<Page<E>> {
        let start = Instant::now();
        let backends = self.directory.list_backends(E::INTERFACE, ctx).await?;

        let query = query.map(str::trim).filter(|q| !q.is_empty());
        let parsed = query
            .map(|text| CqlQuery::parse(text).map_err(|e| e.into_mux_error(text)))
            .transpose()?;
        let comparator = match &parsed {
            Some(q) => EntityComparator::<E>::build(q)?,
            None => None,
        };

        let routed: Vec<RoutedBackend> = backends
            .iter()
            .filter_map(|id| match self.router.route(id, parsed.as_ref()) {
                Routed::Query(q) => Some(RoutedBackend::new(id.clone(), q)),
                Routed::Excluded => None,
            })
            .collect();
        debug!(
            entity = E::NAME,
            discovered = backends.len(),
            routed = routed.len(),
            "routing done"
        );

        let pages = fetch_pages::<E>(&self.client, ctx, &routed, window(offset, limit)).await?;
        let items = match &comparator {
            Some(cmp) => {
                let compare: &dyn Fn(&E, &E) -> std::cmp::Ordering = &|a, b| cmp.compare(a, b);
                merge_pages(&pages, offset, limit, Some(compare))
            }
            None => merge_pages(&pages, offset, limit, None),
        };
        let result_info = result_info(&routed, &pages);

        info!(
            target: "queries",
            entity = E::NAME,
            query = %scrub(query.unwrap_or("")),
            offset,
            limit,
            backends = routed.len(),
            items = items.len(),
            total_records = result_info.total_records,
            duration_ms = start.elapsed().as_millis() as u64,
            "search complete"
        );

        Ok(Page { items, result_info })
    }

    /// The record with `id` from the first backend that has it.
    pub async fn lookup<E: Entity>(&self, ctx: &RoutingContext, id: &str) -> Result<Option<E>> {
        let _active = ActiveRequest::enter(&self.active_requests);
        let backends = self.directory.list_backends(E::INTERFACE, ctx).await?;
        crate::lookup::lookup::<E>(&self.client, ctx, &backends, id).await
    }

    pub async fn package_sources(&self, ctx: &RoutingContext) -> Result<SourceCollection> {
        let _active = ActiveRequest::enter(&self.active_requests);
        let backends = self.directory.list_backends(Package::INTERFACE, ctx).await?;
        crate::lookup::package_sources(&self.client, ctx, &backends).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mux_common::Instance;
    use serde_json::json;

    #[test]
    fn test_page_uses_collection_key() {
        let page = Page {
            items: vec![Instance {
                id: Some("1".into()),
                ..Default::default()
            }],
            result_info: ResultInfo {
                total_records: 1,
                ..Default::default()
            },
        };
        assert_eq!(
            serde_json::to_value(&page).unwrap(),
            json!({
                "instances": [{"id": "1"}],
                "resultInfo": {"totalRecords": 1, "facets": [], "diagnostics": []}
            })
        );

        let empty: Page<Package> = Page {
            items: Vec::new(),
            result_info: ResultInfo::default(),
        };
        assert!(serde_json::to_value(&empty).unwrap().get("packages").is_some());
    }

    #[test]
    fn test_static_backends_from_config() {
        let mut config = AppConfig::default();
        config.federation.static_backends = vec!["mock1".into(), "mod-codex-mux-1.0".into()];
        let engine = FederationEngine::from_config(&config);
        assert_eq!(engine.default_limit(), 10);
        assert_eq!(engine.active_requests(), 0);
    }

    #[test]
    fn test_active_request_guard_counts_until_dropped() {
        let counter = Arc::new(AtomicUsize::new(0));
        let first = ActiveRequest::enter(&counter);
        let second = ActiveRequest::enter(&counter);
        assert_eq!(counter.load(Ordering::Relaxed), 2);
        drop(first);
        assert_eq!(counter.load(Ordering::Relaxed), 1);
        drop(second);
        assert_eq!(counter.load(Ordering::Relaxed), 0);
    }
}
