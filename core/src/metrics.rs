//! Metrics for the reservation engine.
//!
//! Counters are emitted through the `metrics` facade; they are no-ops until
//! the host installs a recorder (the demo installs the Prometheus exporter).

use metrics::{counter, describe_counter};

/// Operations attempted, labelled by `operation` and `outcome`
pub const OPERATIONS_TOTAL: &str = "courtbook_operations_total";

/// Compensations executed, labelled by `operation` and `outcome`
pub const ROLLBACKS_TOTAL: &str = "courtbook_rollbacks_total";

/// Register metric descriptions with the installed recorder.
pub fn register_metrics() {
    describe_counter!(
        OPERATIONS_TOTAL,
        "Reservation engine operations by type and outcome"
    );
    describe_counter!(
        ROLLBACKS_TOTAL,
        "Compensating rollbacks executed after a partial failure"
    );
}

pub(crate) fn record_operation(operation: &'static str, succeeded: bool) {
    let outcome = if succeeded { "completed" } else { "failed" };
    counter!(OPERATIONS_TOTAL, "operation" => operation, "outcome" => outcome).increment(1);
}

pub(crate) fn record_rollback(operation: &'static str, succeeded: bool) {
    let outcome = if succeeded { "completed" } else { "failed" };
    counter!(ROLLBACKS_TOTAL, "operation" => operation, "outcome" => outcome).increment(1);
}
