//! mux-server: the HTTP face of the codex multiplexer.
//!
//! Exposes the federation engine as the codex routes plus:
//! - **Health**: `/health` and `/ready`.
//! - **Observability**: Prometheus metrics at `/metrics`, JSON query and
//!   error logs under `logs/`, optional OTLP traces.
use axum::{response::IntoResponse, routing::get, Json, Router};
use mux_common::config::AppConfig;
use mux_runtime::FederationEngine;
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub mod api;

// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

pub const METRICS_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

fn register_counter(name: &str, help: &str) -> IntCounter {
    let counter = IntCounter::with_opts(Opts::new(name, help)).expect("valid counter options");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("counter registered once");
    counter
}

pub static REQUEST_COUNT: Lazy<IntCounter> =
    Lazy::new(|| register_counter("mux_requests_total", "Total number of codex requests served"));

pub static BACKEND_CALLS: Lazy<IntCounter> = Lazy::new(|| {
    register_counter(
        "mux_backend_calls_total",
        "Backend searches that returned a response",
    )
});

pub static BACKEND_ERRORS: Lazy<IntCounter> = Lazy::new(|| {
    register_counter(
        "mux_backend_errors_total",
        "Backend searches answered with a non-200 status",
    )
});

pub static TRANSPORT_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    register_counter(
        "mux_transport_failures_total",
        "Requests aborted by a backend transport failure or timeout",
    )
});

pub static ACTIVE_REQUESTS: Lazy<IntGauge> = Lazy::new(|| {
    let opts = Opts::new(
        "mux_active_requests",
        "Number of requests currently being federated",
    );
    let gauge = IntGauge::with_opts(opts).expect("valid gauge options");
    REGISTRY
        .register(Box::new(gauge.clone()))
        .expect("gauge registered once");
    gauge
});

/// Health, readiness, metrics and the codex routes over one engine.
pub fn app(engine: Arc<FederationEngine>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/metrics", get(metrics_handler))
        .merge(api::create_api_router(engine))
}

pub struct MuxServer {
    config_path: String,
}

impl Default for MuxServer {
    fn default() -> Self {
        Self {
            config_path: "config/mux.yaml".to_string(),
        }
    }
}

impl MuxServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config_path: &str) -> Self {
        self.config_path = config_path.to_string();
        self
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let app_config = AppConfig::from_file(&self.config_path)?;

        let otel_layer = mux_common::telemetry::tracing_layer(&app_config.telemetry)?;

        std::fs::create_dir_all("logs").ok();

        let queries_appender = tracing_appender::rolling::daily("logs", "queries.jsonl");
        let errors_appender = tracing_appender::rolling::daily("logs", "errors.jsonl");

        let queries_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(queries_appender)
            .with_filter(tracing_subscriber::filter::filter_fn(|metadata| {
                metadata.target() == "queries"
            }));

        let errors_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(errors_appender)
            .with_filter(tracing_subscriber::filter::filter_fn(|metadata| {
                metadata.target() == "errors"
            }));

        let stdout_layer =
            tracing_subscriber::fmt::layer().with_filter(EnvFilter::from_default_env());

        tracing_subscriber::registry()
            .with(stdout_layer)
            .with(otel_layer)
            .with(queries_layer)
            .with(errors_layer)
            .try_init()
            .ok();

        let engine = Arc::new(FederationEngine::from_config(&app_config));

        let gauge_engine = engine.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(METRICS_REFRESH_INTERVAL).await;
                ACTIVE_REQUESTS.set(gauge_engine.active_requests() as i64);
            }
        });

        let addr: SocketAddr = app_config.server.listen_addr.parse()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(
            "{} listening on {} (discovery={}, timeout={}ms)",
            app_config.server.name,
            addr,
            if app_config.federation.static_backends.is_empty() {
                "proxy"
            } else {
                "static"
            },
            app_config.federation.request_timeout_ms
        );

        axum::serve(listener, app(engine)).await?;

        mux_common::telemetry::shutdown();
        Ok(())
    }
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn ready_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ready" }))
}

async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(target: "errors", "failed to encode metrics: {}", e);
        return (axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        [(axum::http::header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}

#[cfg(test)]
mod metrics_tests;
