use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use mux_common::{Instance, Package, RoutingContext, SourceCollection};
use mux_error::{ErrorCode, MuxError};
use mux_runtime::{Entity, FederationEngine, Page};
use serde::Deserialize;
use std::sync::Arc;

use crate::{BACKEND_CALLS, BACKEND_ERRORS, REQUEST_COUNT, TRANSPORT_FAILURES};

pub fn create_api_router(engine: Arc<FederationEngine>) -> Router {
    Router::new()
        .merge(create_instance_router(engine.clone()))
        .merge(create_package_router(engine))
}

pub fn create_instance_router(engine: Arc<FederationEngine>) -> Router {
    Router::new()
        .route("/codex-instances", get(search::<Instance>))
        .route("/codex-instances/{id}", get(get_by_id::<Instance>))
        .route("/codex-instances-sources", get(instance_sources))
        .with_state(engine)
}

pub fn create_package_router(engine: Arc<FederationEngine>) -> Router {
    Router::new()
        .route("/codex-packages", get(search::<Package>))
        .route("/codex-packages/{id}", get(get_by_id::<Package>))
        .route("/codex-packages-sources", get(package_sources))
        .with_state(engine)
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

/// A failed request, rendered as a plain-text message with the error's
/// status class.
#[derive(Debug)]
pub struct ApiError(pub MuxError);

impl From<MuxError> for ApiError {
    fn from(e: MuxError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(target: "errors", status = status.as_u16(), error = %self.0.to_json(), "request failed");
        } else {
            tracing::warn!(target: "errors", status = status.as_u16(), error = %self.0.to_json(), "request rejected");
        }
        (
            status,
            [(header::CONTENT_TYPE, "text/plain")],
            self.0.message,
        )
            .into_response()
    }
}

fn routing_context(headers: &HeaderMap) -> RoutingContext {
    RoutingContext::from_headers(
        headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v))),
    )
}

fn record_failure(e: &MuxError) {
    if matches!(e.code, ErrorCode::TransportFailure | ErrorCode::Timeout) {
        TRANSPORT_FAILURES.inc();
    }
}

async fn search<E: Entity>(
    State(engine): State<Arc<FederationEngine>>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Result<Json<Page<E>>, ApiError> {
    REQUEST_COUNT.inc();
    let ctx = routing_context(&headers);
    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or_else(|| engine.default_limit());

    match engine
        .search::<E>(&ctx, params.query.as_deref(), offset, limit)
        .await
    {
        Ok(page) => {
            let diagnostics = &page.result_info.diagnostics;
            BACKEND_CALLS.inc_by(diagnostics.len() as u64);
            BACKEND_ERRORS.inc_by(diagnostics.iter().filter(|d| d.code != "200").count() as u64);
            Ok(Json(page))
        }
        Err(e) => {
            record_failure(&e);
            Err(e.into())
        }
    }
}

async fn get_by_id<E: Entity>(
    State(engine): State<Arc<FederationEngine>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    REQUEST_COUNT.inc();
    let ctx = routing_context(&headers);
    match engine.lookup::<E>(&ctx, &id).await {
        Ok(Some(entity)) => Ok(Json(entity).into_response()),
        Ok(None) => Ok((StatusCode::NOT_FOUND, [(header::CONTENT_TYPE, "text/plain")], id).into_response()),
        Err(e) => {
            record_failure(&e);
            Err(e.into())
        }
    }
}

async fn package_sources(
    State(engine): State<Arc<FederationEngine>>,
    headers: HeaderMap,
) -> Result<Json<SourceCollection>, ApiError> {
    REQUEST_COUNT.inc();
    let ctx = routing_context(&headers);
    engine.package_sources(&ctx).await.map(Json).map_err(|e| {
        record_failure(&e);
        e.into()
    })
}

async fn instance_sources() -> impl IntoResponse {
    (
        StatusCode::NOT_IMPLEMENTED,
        [(header::CONTENT_TYPE, "text/plain")],
        "Not implemented",
    )
}
