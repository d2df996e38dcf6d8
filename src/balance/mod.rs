// ============================================================================
// Balance-Creation Client
// ============================================================================
//
// Provisions a balance ledger entry in the payment service for a freshly
// inserted customer. The workflow only sees the `BalanceClient` trait; the
// production implementation speaks gRPC (see `grpc`).
//
// ============================================================================

mod circuit_breaker;
mod grpc;
pub mod proto;

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::customer::CustomerId;

pub use circuit_breaker::{CircuitBreakerConfig, CircuitState};
pub use grpc::{GrpcBalanceClient, GrpcBalanceConfig};

#[async_trait]
pub trait BalanceClient: Send + Sync {
    /// Create the balance record keyed by `customer_id`.
    async fn create_balance(&self, customer_id: CustomerId) -> Result<(), BalanceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BalanceError {
    #[error("payment service rejected balance creation ({code:?}): {message}")]
    Rejected { code: tonic::Code, message: String },

    #[error("payment service unreachable: {0}")]
    Transport(String),

    #[error("balance creation timed out after {0:?}")]
    Timeout(Duration),

    #[error("payment service unavailable: circuit breaker open")]
    Unavailable,
}

impl BalanceError {
    /// Prometheus label for `balance_calls_total`
    pub fn outcome(&self) -> &'static str {
        match self {
            BalanceError::Rejected { .. } => "rejected",
            BalanceError::Transport(_) => "transport_error",
            BalanceError::Timeout(_) => "timeout",
            BalanceError::Unavailable => "circuit_open",
        }
    }

    /// Whether the failure means the payment service is down or overloaded,
    /// as opposed to an answer it gave about this request.
    pub fn is_outage(&self) -> bool {
        match self {
            BalanceError::Transport(_) | BalanceError::Timeout(_) | BalanceError::Unavailable => true,
            BalanceError::Rejected { code, .. } => matches!(
                code,
                tonic::Code::Unavailable
                    | tonic::Code::DeadlineExceeded
                    | tonic::Code::ResourceExhausted
                    | tonic::Code::Unknown
            ),
        }
    }
}
