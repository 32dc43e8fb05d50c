//! Concurrent page fetch and the bounded k-way merge.
//!
//! Every routed backend is asked for records `0 .. offset + limit`. Once all
//! of them have answered, one cursor per backend walks its page and the merge
//! picks the next record either by the comparator or, without one, by the
//! fairness rule: the backend that has contributed the fewest records so far,
//! ties to the backend discovered first.

use std::cmp::Ordering;

use futures::future::try_join_all;
use mux_common::scrubber::scrub;
use mux_common::RoutingContext;
use mux_connectors::fetch::search_url;
use mux_connectors::{BackendPage, FetchClient};
use mux_error::{MuxError, Result};
use tracing::{debug, info};

use crate::entity::Entity;

/// A backend that survived routing, with the query text it will receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedBackend {
    pub id: String,
    pub query: Option<String>,
}

impl RoutedBackend {
    pub fn new(id: impl Into<String>, query: Option<String>) -> Self {
        Self {
            id: id.into(),
            query,
        }
    }
}

/// Number of records each backend is asked for.
pub fn window(offset: usize, limit: usize) -> usize {
    offset.saturating_add(limit)
}

/// Fetch one page per backend, concurrently. The result is in the same order
/// as `backends`. The first transport failure aborts the others.
pub async fn fetch_pages<E: Entity>(
    client: &FetchClient,
    ctx: &RoutingContext,
    backends: &[RoutedBackend],
    window: usize,
) -> Result<Vec<BackendPage<E>>> {
    let okapi = okapi_url(ctx)?;

    let calls = backends.iter().map(|backend| async move {
        let url = search_url(okapi, E::PATH, window, backend.query.as_deref())?;
        info!(
            target: "queries",
            backend = %backend.id,
            entity = E::NAME,
            query = %scrub(backend.query.as_deref().unwrap_or("")),
            limit = window,
            "dispatching search"
        );
        let resp = client.fetch(&backend.id, &url, ctx).await?;
        let page = BackendPage::<E>::from_response(
            &backend.id,
            resp,
            E::COLLECTION_KEY,
            backend.query.clone(),
        )?;
        debug!(
            backend = %backend.id,
            status = page.status,
            items = page.items.len(),
            total = page.total_records,
            "backend answered"
        );
        Ok::<_, MuxError>(page)
    });

    try_join_all(calls).await
}

pub(crate) fn okapi_url(ctx: &RoutingContext) -> Result<&str> {
    ctx.okapi_url()
        .ok_or_else(|| MuxError::directory_unavailable("missing X-Okapi-Url"))
}

/// Merge `pages` into the records at global positions
/// `offset .. offset + limit`.
///
/// With a comparator the winner is the backend whose current record is
/// strictly smallest, so equal records keep discovery order. Pages with a
/// non-200 status carry no items and never win.
pub fn merge_pages<E: Clone>(
    pages: &[BackendPage<E>],
    offset: usize,
    limit: usize,
    compare: Option<&dyn Fn(&E, &E) -> Ordering>,
) -> Vec<E> {
    let end = window(offset, limit);
    let mut cursors = vec![0usize; pages.len()];
    let mut merged = Vec::new();

    for position in 0..end {
        let mut winner: Option<usize> = None;
        for (i, page) in pages.iter().enumerate() {
            if cursors[i] >= page.items.len() {
                continue;
            }
            winner = match winner {
                None => Some(i),
                Some(w) => {
                    let better = match compare {
                        Some(cmp) => {
                            cmp(&page.items[cursors[i]], &pages[w].items[cursors[w]])
                                == Ordering::Less
                        }
                        None => cursors[i] < cursors[w],
                    };
                    Some(if better { i } else { w })
                }
            };
        }

        let Some(w) = winner else {
            break;
        };
        let item = &pages[w].items[cursors[w]];
        cursors[w] += 1;
        if position >= offset {
            merged.push(item.clone());
        }
    }

    merged
}
