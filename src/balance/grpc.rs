use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};

use super::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError};
use super::proto::balance_service_client::BalanceServiceClient;
use super::proto::CreateBalanceRequest;
use super::{BalanceClient, BalanceError};
use crate::domain::customer::CustomerId;
use crate::metrics::Metrics;

// ============================================================================
// gRPC Balance Client - payment.BalanceService
// ============================================================================

#[derive(Debug, Clone)]
pub struct GrpcBalanceConfig {
    /// Payment service endpoint, e.g. `http://127.0.0.1:50051`
    pub endpoint: String,
    /// Upper bound for a single CreateBalance call
    pub call_timeout: Duration,
    pub circuit_breaker: CircuitBreakerConfig,
}

pub struct GrpcBalanceClient {
    client: BalanceServiceClient<Channel>,
    circuit_breaker: CircuitBreaker,
    call_timeout: Duration,
    metrics: Option<Arc<Metrics>>,
}

impl GrpcBalanceClient {
    /// Build a client over a lazily connected channel. The first call dials
    /// the payment service, so startup does not depend on it being up.
    pub fn connect_lazy(config: &GrpcBalanceConfig) -> Result<Self, tonic::transport::Error> {
        let channel = Endpoint::from_shared(config.endpoint.clone())?
            .connect_timeout(config.call_timeout)
            .connect_lazy();

        tracing::info!(endpoint = %config.endpoint, "Payment gRPC channel configured");

        Ok(Self {
            client: BalanceServiceClient::new(channel),
            circuit_breaker: CircuitBreaker::new(config.circuit_breaker.clone()),
            call_timeout: config.call_timeout,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    async fn record(&self, result: &Result<(), BalanceError>) {
        let Some(metrics) = &self.metrics else {
            return;
        };
        let outcome = match result {
            Ok(()) => "ok",
            Err(err) => err.outcome(),
        };
        let state = self.circuit_breaker.state().await;
        metrics.record_balance_call(outcome);
        metrics.update_circuit_breaker_state(state);
        tracing::debug!(outcome, circuit = state.label(), "Balance call recorded");
    }
}

#[async_trait]
impl BalanceClient for GrpcBalanceClient {
    async fn create_balance(&self, customer_id: CustomerId) -> Result<(), BalanceError> {
        let mut client = self.client.clone();
        let request = CreateBalanceRequest { customer_id };

        let result = self
            .circuit_breaker
            .call(
                bounded(self.call_timeout, async move {
                    client
                        .create_balance(request)
                        .await
                        .map(|_| ())
                        .map_err(classify_status)
                }),
                BalanceError::is_outage,
            )
            .await
            .map_err(|err| match err {
                CircuitBreakerError::Open => BalanceError::Unavailable,
                CircuitBreakerError::Failed(err) => err,
            });

        match &result {
            Ok(()) => tracing::info!(customer_id, "Balance created in payment service"),
            Err(err) => tracing::warn!(customer_id, error = %err, "Balance creation failed"),
        }

        self.record(&result).await;
        result
    }
}

/// Bound a balance call by `limit`. Dropping the inner future cancels the RPC.
async fn bounded<F>(limit: Duration, call: F) -> Result<(), BalanceError>
where
    F: Future<Output = Result<(), BalanceError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(BalanceError::Timeout(limit)))
}

/// Connection-level failures come back from tonic as `Unavailable`; every
/// other status is an answer from the payment service itself.
fn classify_status(status: tonic::Status) -> BalanceError {
    match status.code() {
        tonic::Code::Unavailable => BalanceError::Transport(status.message().to_string()),
        code => BalanceError::Rejected {
            code,
            message: status.message().to_string(),
        },
    }
}
