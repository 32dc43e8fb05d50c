use mux_common::scrubber::scrub;
use mux_common::{Diagnostic, ResultInfo};
use mux_connectors::BackendPage;
use tracing::warn;

use crate::merge::RoutedBackend;

/// One diagnostic per queried backend, in discovery order.
pub fn diagnostics<E>(backends: &[RoutedBackend], pages: &[BackendPage<E>]) -> Vec<Diagnostic> {
    backends
        .iter()
        .zip(pages)
        .map(|(backend, page)| {
            if page.is_ok() {
                Diagnostic {
                    source: backend.id.clone(),
                    code: page.status.to_string(),
                    record_count: Some(page.total_records),
                    query: page.query.clone(),
                    message: None,
                }
            } else {
                let message = page.message_text();
                warn!(
                    target: "errors",
                    backend = %backend.id,
                    status = page.status,
                    message = %scrub(&message),
                    "backend answered with an error status"
                );
                Diagnostic {
                    source: backend.id.clone(),
                    code: page.status.to_string(),
                    record_count: None,
                    query: page.query.clone(),
                    message: Some(message),
                }
            }
        })
        .collect()
}

/// Sum of the self-reported totals of the pages that came back 200.
pub fn total_records<E>(pages: &[BackendPage<E>]) -> u64 {
    pages
        .iter()
        .filter(|p| p.is_ok())
        .fold(0u64, |sum, p| sum.saturating_add(p.total_records))
}

pub fn result_info<E>(backends: &[RoutedBackend], pages: &[BackendPage<E>]) -> ResultInfo {
    ResultInfo {
        total_records: total_records(pages),
        facets: Vec::new(),
        diagnostics: diagnostics(backends, pages),
    }
}
