//! By-id lookup and package-source aggregation: fan out the same GET to every
//! backend and combine the 200 answers.

use futures::future::try_join_all;
use mux_common::{RoutingContext, SourceCollection};
use mux_connectors::fetch::{backend_url, entity_url};
use mux_connectors::{FetchClient, RawResponse};
use mux_error::{ErrorCode, ErrorContext, MuxError, Result};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::entity::Entity;
use crate::merge::okapi_url;

pub const PACKAGE_SOURCES_PATH: &str = "/codex-packages-sources";

/// GET one URL per backend, concurrently. Answers keep discovery order; a
/// transport failure anywhere fails the whole call.
async fn fetch_each(
    client: &FetchClient,
    ctx: &RoutingContext,
    backends: &[String],
    url: &Url,
) -> Result<Vec<RawResponse>> {
    try_join_all(
        backends
            .iter()
            .map(|backend| client.fetch(backend, url, ctx)),
    )
    .await
}

fn decode<T: DeserializeOwned>(backend: &str, url: &Url, resp: &RawResponse) -> Result<T> {
    serde_json::from_slice(&resp.body).map_err(|e| {
        MuxError::new(
            ErrorCode::MalformedPayload,
            format!("{} returned an unreadable body from {}: {}", backend, url, e),
        )
        .with_context(ErrorContext::Backend {
            backend_id: backend.to_string(),
            url: url.to_string(),
            status: Some(resp.status),
        })
    })
}

/// The first backend, in discovery order, that answers 200 for `id`.
///
/// Every 200 answer is decoded, so an unreadable body fails the lookup even
/// when an earlier backend already has the record.
pub async fn lookup<E: Entity>(
    client: &FetchClient,
    ctx: &RoutingContext,
    backends: &[String],
    id: &str,
) -> Result<Option<E>> {
    let url = entity_url(okapi_url(ctx)?, E::PATH, id)?;
    let answers = fetch_each(client, ctx, backends, &url).await?;

    let mut found = Vec::new();
    for (backend, resp) in backends.iter().zip(&answers) {
        if !resp.is_ok() {
            debug!(backend = %backend, status = resp.status, id, "not here");
            continue;
        }
        debug!(backend = %backend, entity = E::NAME, id, "found");
        found.push(decode::<E>(backend, &url, resp)?);
    }
    Ok(found.into_iter().next())
}

/// Concatenation of every backend's `{ "sources": [...] }`. Non-200 answers
/// are skipped.
pub async fn package_sources(
    client: &FetchClient,
    ctx: &RoutingContext,
    backends: &[String],
) -> Result<SourceCollection> {
    let url = backend_url(okapi_url(ctx)?, PACKAGE_SOURCES_PATH)?;
    let answers = fetch_each(client, ctx, backends, &url).await?;

    let mut merged = SourceCollection::default();
    for (backend, resp) in backends.iter().zip(&answers) {
        if !resp.is_ok() {
            debug!(backend = %backend, status = resp.status, "skipping package sources");
            continue;
        }
        let collection: SourceCollection = decode(backend, &url, resp)?;
        merged.sources.extend(collection.sources);
    }
    Ok(merged)
}
