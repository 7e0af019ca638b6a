//! # Prometheus Metrics
//!
//! Operational metrics for the settlement node, scraped at `/metrics` on
//! the dedicated metrics port.
//!
//! Metrics live in their own [`prometheus::Registry`] (namespace
//! `fichaje`) so they never collide with a default global registry.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the node.
///
/// Clone-friendly (prometheus handles are `Arc` internally) so it can be
/// shared across request handlers.
#[derive(Clone)]
pub struct NodeMetrics {
    /// Registry that owns all metrics below.
    registry: Registry,
    /// Total transfers registered since startup.
    pub transfers_created_total: IntCounter,
    /// Total transfers that reached approval.
    pub transfers_approved_total: IntCounter,
    /// Total successful deposits into escrow.
    pub deposits_total: IntCounter,
    /// Total refunds returned to depositors.
    pub refunds_total: IntCounter,
    /// Total sealed documents attached to transfers.
    pub documents_attached_total: IntCounter,
    /// Sum of funds currently held in escrow, in base units.
    pub escrowed_value: IntGauge,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("fichaje".into()), None)
            .expect("failed to create prometheus registry");

        fn counter(registry: &Registry, name: &str, help: &str) -> IntCounter {
            let c = IntCounter::new(name, help).expect("metric creation");
            registry
                .register(Box::new(c.clone()))
                .expect("metric registration");
            c
        }

        let transfers_created_total = counter(
            &registry,
            "transfers_created_total",
            "Total transfer records registered",
        );
        let transfers_approved_total = counter(
            &registry,
            "transfers_approved_total",
            "Total transfers approved and distributed",
        );
        let deposits_total = counter(
            &registry,
            "deposits_total",
            "Total successful escrow deposits",
        );
        let refunds_total = counter(
            &registry,
            "refunds_total",
            "Total escrow refunds returned to depositors",
        );
        let documents_attached_total = counter(
            &registry,
            "documents_attached_total",
            "Total sealed documents attached to transfers",
        );

        let escrowed_value = IntGauge::new(
            "escrowed_value",
            "Funds currently held in escrow, in base units",
        )
        .expect("metric creation");
        registry
            .register(Box::new(escrowed_value.clone()))
            .expect("metric registration");

        Self {
            registry,
            transfers_created_total,
            transfers_approved_total,
            deposits_total,
            refunds_total,
            documents_attached_total,
            escrowed_value,
        }
    }

    /// Refresh the escrow gauge from the ledger's current total. Clamped
    /// at `i64::MAX`, which no real escrow sum approaches.
    pub fn set_escrowed(&self, total: u128) {
        self.escrowed_value
            .set(total.min(i64::MAX as u128) as i64);
    }

    /// Encodes all registered metrics into Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer).expect("prometheus output is valid utf-8"))
    }
}

/// Shared metrics handle passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler rendering `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
