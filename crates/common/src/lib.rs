//! Types and configuration shared across the codex-mux crates.
//!
//! - **Configuration**: layered, validated application settings (`config`).
//! - **Routing**: the caller's Okapi headers (`headers`).
//! - **Models**: codex entities and the response envelope pieces (`models`).
//! - **Logging**: query text redaction (`scrubber`) and OTLP export (`telemetry`).
pub mod config;
pub mod headers;
pub mod models;
pub mod scrubber;
pub mod telemetry;

pub use crate::config::{AppConfig, FederationSettings, SourceTagRule};
pub use crate::headers::RoutingContext;
pub use crate::models::{Diagnostic, Instance, Package, ResultInfo, Source, SourceCollection};
