//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `qubesec_reconciliations_total{kind}` - Reconciliations started
//! - `qubesec_reconciliation_errors_total{kind}` - Reconciliations that returned an error
//! - `qubesec_reconciliation_duration_seconds{kind}` - Duration of reconciliations
//! - `qubesec_crypto_operations_total{operation}` - Calls into the crypto provider
//! - `qubesec_secrets_materialized_total{kind}` - Output Secrets created or rewritten
//! - `qubesec_status_conflicts_total` - Status writes that lost an optimistic-concurrency race
//! - `qubesec_pending_references_total{kind}` - Reconciliations parked on an unready reference
//! - `qubesec_requeues_total{reason}` - Requeues scheduled by the error policy

use anyhow::Result;
use prometheus::{HistogramVec, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "qubesec_reconciliations_total",
            "Total number of reconciliations by resource kind",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "qubesec_reconciliation_errors_total",
            "Total number of reconciliation errors by resource kind",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "qubesec_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds by resource kind",
        )
        .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static CRYPTO_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "qubesec_crypto_operations_total",
            "Total number of crypto provider operations by operation",
        ),
        &["operation"],
    )
    .expect("Failed to create CRYPTO_OPERATIONS_TOTAL metric - this should never happen")
});

static SECRETS_MATERIALIZED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "qubesec_secrets_materialized_total",
            "Total number of output Secrets written by resource kind",
        ),
        &["kind"],
    )
    .expect("Failed to create SECRETS_MATERIALIZED_TOTAL metric - this should never happen")
});

static STATUS_CONFLICTS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "qubesec_status_conflicts_total",
        "Total number of status writes rejected with a resource version conflict",
    )
    .expect("Failed to create STATUS_CONFLICTS_TOTAL metric - this should never happen")
});

static PENDING_REFERENCES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "qubesec_pending_references_total",
            "Total number of reconciliations waiting on an unready reference by resource kind",
        ),
        &["kind"],
    )
    .expect("Failed to create PENDING_REFERENCES_TOTAL metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "qubesec_requeues_total",
            "Total number of requeues scheduled after an error by reason",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(CRYPTO_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SECRETS_MATERIALIZED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STATUS_CONFLICTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PENDING_REFERENCES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;

    Ok(())
}

pub fn increment_reconciliations(kind: &str) {
    RECONCILIATIONS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_reconciliation_errors(kind: &str) {
    RECONCILIATION_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn observe_reconciliation_duration(kind: &str, duration: f64) {
    RECONCILIATION_DURATION
        .with_label_values(&[kind])
        .observe(duration);
}

pub fn increment_crypto_operations(operation: &str) {
    CRYPTO_OPERATIONS_TOTAL.with_label_values(&[operation]).inc();
}

pub fn increment_secrets_materialized(kind: &str) {
    SECRETS_MATERIALIZED_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_status_conflicts() {
    STATUS_CONFLICTS_TOTAL.inc();
}

pub fn increment_pending_references(kind: &str) {
    PENDING_REFERENCES_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}

/// Render every registered metric in the Prometheus text format
pub fn gather_text() -> Result<String> {
    use prometheus::Encoder;

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics() {
        assert!(register_metrics().is_ok());
        increment_status_conflicts();
        let text = gather_text().unwrap();
        assert!(text.contains("qubesec_status_conflicts_total"));
    }

    #[test]
    fn test_increment_reconciliations_is_per_kind() {
        let before = RECONCILIATIONS_TOTAL
            .with_label_values(&["QuantumKEMKeyPair"])
            .get();
        let other = RECONCILIATIONS_TOTAL
            .with_label_values(&["QuantumDerivedKey"])
            .get();
        increment_reconciliations("QuantumKEMKeyPair");
        assert_eq!(
            RECONCILIATIONS_TOTAL
                .with_label_values(&["QuantumKEMKeyPair"])
                .get(),
            before + 1
        );
        assert_eq!(
            RECONCILIATIONS_TOTAL
                .with_label_values(&["QuantumDerivedKey"])
                .get(),
            other
        );
    }

    #[test]
    fn test_increment_crypto_operations() {
        let before = CRYPTO_OPERATIONS_TOTAL.with_label_values(&["sign"]).get();
        increment_crypto_operations("sign");
        let after = CRYPTO_OPERATIONS_TOTAL.with_label_values(&["sign"]).get();
        assert_eq!(after, before + 1);
    }

    #[test]
    fn test_observe_reconciliation_duration() {
        observe_reconciliation_duration("QuantumSignMessage", 0.02);
        let count = RECONCILIATION_DURATION
            .with_label_values(&["QuantumSignMessage"])
            .get_sample_count();
        assert!(count >= 1);
    }
}
