// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Prometheus Metrics
//!
//! Exposes operational metrics for the custody node. Scraped by Prometheus
//! at the `/metrics` HTTP endpoint on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] with
//! the `timevault` prefix so they do not collide with any default global
//! registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use timevault_contracts::VaultEvent;

/// Holds all Prometheus metric handles for the node.
///
/// Clone-friendly (prometheus handles are reference-counted) so it can be
/// shared across request handlers.
#[derive(Clone)]
pub struct NodeMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Vaults created in either storage shape.
    pub vaults_created_total: IntCounter,
    /// Accepted deposits, including initial deposits at creation.
    pub deposits_total: IntCounter,
    /// Accepted regular withdrawals.
    pub withdrawals_total: IntCounter,
    /// Accepted emergency withdrawals.
    pub emergency_withdrawals_total: IntCounter,
    /// Rejected operations, labelled by error code.
    pub rejected_operations_total: IntCounterVec,
    /// Total value held across every vault.
    pub value_locked: IntGauge,
    /// Histogram of engine operation latency in seconds.
    pub operation_latency_seconds: Histogram,
}

fn register<M: prometheus::core::Collector + Clone + 'static>(
    registry: &Registry,
    metric: M,
) -> Result<M, prometheus::Error> {
    registry.register(Box::new(metric.clone()))?;
    Ok(metric)
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("timevault".into()), None)?;

        let vaults_created_total = register(
            &registry,
            IntCounter::new("vaults_created_total", "Total number of vaults created")?,
        )?;
        let deposits_total = register(
            &registry,
            IntCounter::new("deposits_total", "Total number of accepted deposits")?,
        )?;
        let withdrawals_total = register(
            &registry,
            IntCounter::new("withdrawals_total", "Total number of accepted withdrawals")?,
        )?;
        let emergency_withdrawals_total = register(
            &registry,
            IntCounter::new(
                "emergency_withdrawals_total",
                "Total number of accepted emergency withdrawals",
            )?,
        )?;
        let rejected_operations_total = register(
            &registry,
            IntCounterVec::new(
                Opts::new(
                    "rejected_operations_total",
                    "Total number of operations rejected by the engine",
                ),
                &["code"],
            )?,
        )?;
        let value_locked = register(
            &registry,
            IntGauge::new("value_locked", "Total value currently held in vaults")?,
        )?;
        let operation_latency_seconds = register(
            &registry,
            Histogram::with_opts(
                HistogramOpts::new(
                    "operation_latency_seconds",
                    "Engine operation latency in seconds, lock wait included",
                )
                .buckets(vec![
                    0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
                ]),
            )?,
        )?;

        Ok(Self {
            registry,
            vaults_created_total,
            deposits_total,
            withdrawals_total,
            emergency_withdrawals_total,
            rejected_operations_total,
            value_locked,
            operation_latency_seconds,
        })
    }

    /// Updates counters for a batch of committed events.
    pub fn observe_events(&self, events: &[VaultEvent]) {
        for event in events {
            match event {
                VaultEvent::VaultCreated { .. } => self.vaults_created_total.inc(),
                VaultEvent::VaultDeposit { .. } => self.deposits_total.inc(),
                VaultEvent::VaultWithdrawal { .. } => self.withdrawals_total.inc(),
                VaultEvent::EmergencyWithdrawal { .. } => self.emergency_withdrawals_total.inc(),
                _ => {}
            }
        }
    }

    /// Counts a rejected operation under its error code.
    pub fn observe_rejection(&self, code: &str) {
        self.rejected_operations_total
            .with_label_values(&[code])
            .inc();
    }

    /// Sets the value-locked gauge, saturating at `i64::MAX`.
    pub fn set_value_locked(&self, value: u64) {
        self.value_locked
            .set(i64::try_from(value).unwrap_or(i64::MAX));
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails.
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
