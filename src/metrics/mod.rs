// Private module declaration
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry};

use crate::balance::CircuitState;

// Re-export for public API
pub use server::metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Covers:
// - Customer workflow operations (outcome counts, latency)
// - Calls to the payment service's BalanceService
// - Payment circuit breaker state
//
// Scraped via /metrics on the metrics port.
// ============================================================================

pub struct Metrics {
    registry: Registry,

    pub customer_operations: IntCounterVec,
    pub customer_operation_duration: HistogramVec,

    pub balance_calls: IntCounterVec,

    pub circuit_breaker_state: IntGauge,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let customer_operations = IntCounterVec::new(
            Opts::new("customer_operations_total", "Customer workflow operations by outcome"),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(customer_operations.clone()))?;

        let customer_operation_duration = HistogramVec::new(
            HistogramOpts::new(
                "customer_operation_duration_seconds",
                "Customer workflow operation duration",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["operation"],
        )?;
        registry.register(Box::new(customer_operation_duration.clone()))?;

        let balance_calls = IntCounterVec::new(
            Opts::new("balance_calls_total", "CreateBalance calls to the payment service"),
            &["outcome"],
        )?;
        registry.register(Box::new(balance_calls.clone()))?;

        let circuit_breaker_state = IntGauge::new(
            "circuit_breaker_state",
            "Payment circuit breaker state (0=Closed, 1=Open, 2=HalfOpen)",
        )?;
        registry.register(Box::new(circuit_breaker_state.clone()))?;

        Ok(Self {
            registry,
            customer_operations,
            customer_operation_duration,
            balance_calls,
            circuit_breaker_state,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_operation(&self, operation: &str, outcome: &str, duration_secs: f64) {
        self.customer_operations
            .with_label_values(&[operation, outcome])
            .inc();
        self.customer_operation_duration
            .with_label_values(&[operation])
            .observe(duration_secs);
    }

    pub fn record_balance_call(&self, outcome: &str) {
        self.balance_calls.with_label_values(&[outcome]).inc();
    }

    pub fn update_circuit_breaker_state(&self, state: CircuitState) {
        self.circuit_breaker_state.set(state.as_gauge());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        let gathered = metrics.registry.gather();
        assert!(gathered.iter().any(|m| m.name() == "circuit_breaker_state"));
    }

    #[test]
    fn test_record_operation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_operation("create", "ok", 0.02);
        metrics.record_operation("create", "conflict", 0.01);
        metrics.record_operation("create", "ok", 0.03);

        let gathered = metrics.registry.gather();
        let operations = gathered
            .iter()
            .find(|m| m.name() == "customer_operations_total")
            .unwrap();
        assert_eq!(operations.metric.len(), 2);

        let duration = gathered
            .iter()
            .find(|m| m.name() == "customer_operation_duration_seconds")
            .unwrap();
        assert_eq!(duration.metric[0].histogram.sample_count, Some(3));
    }

    #[test]
    fn test_record_balance_call() {
        let metrics = Metrics::new().unwrap();
        metrics.record_balance_call("ok");
        metrics.record_balance_call("ok");

        let gathered = metrics.registry.gather();
        let calls = gathered.iter().find(|m| m.name() == "balance_calls_total").unwrap();
        assert_eq!(calls.metric[0].counter.value, Some(2.0));
    }

    #[test]
    fn test_circuit_breaker_gauge() {
        let metrics = Metrics::new().unwrap();
        metrics.update_circuit_breaker_state(CircuitState::HalfOpen);

        let gathered = metrics.registry.gather();
        let state = gathered.iter().find(|m| m.name() == "circuit_breaker_state").unwrap();
        assert_eq!(state.metric[0].gauge.value, Some(2.0));
    }
}
