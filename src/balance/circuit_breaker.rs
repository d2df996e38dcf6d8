use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

// ============================================================================
// Circuit Breaker for the payment service
// ============================================================================
//
// Fails balance creation fast while the payment service keeps failing, so a
// dead dependency does not hold a database transaction open for the full
// call timeout on every create. It never retries a call.
//
// States:
// - Closed: calls pass through
// - Open: calls are refused until `recovery_timeout` has elapsed
// - HalfOpen: trial calls pass; one failure reopens, enough successes close
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    /// Value exported through the `circuit_breaker_state` gauge
    pub fn as_gauge(self) -> i64 {
        match self {
            CircuitState::Closed => 0,
            CircuitState::Open => 1,
            CircuitState::HalfOpen => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// How long the circuit stays open before a trial call
    pub recovery_timeout: Duration,
    /// Trial successes needed to close again
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 1,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    #[error("circuit breaker is open")]
    Open,

    #[error(transparent)]
    Failed(E),
}

#[derive(Debug)]
struct Counters {
    state: CircuitState,
    consecutive_failures: u32,
    trial_successes: u32,
    opened_at: Option<Instant>,
}

#[derive(Clone, Debug)]
pub struct CircuitBreaker {
    counters: Arc<Mutex<Counters>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            counters: Arc::new(Mutex::new(Counters {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                trial_successes: 0,
                opened_at: None,
            })),
            config,
        }
    }

    /// Run `operation` unless the circuit is open.
    ///
    /// Only errors for which `is_failure` holds count toward opening the
    /// circuit. Any other error is an answer from a live dependency and
    /// resets the failure streak like a success.
    pub async fn call<F, T, E, P>(&self, operation: F, is_failure: P) -> Result<T, CircuitBreakerError<E>>
    where
        F: Future<Output = Result<T, E>>,
        P: FnOnce(&E) -> bool,
    {
        self.admit().await?;

        match operation.await {
            Ok(value) => {
                self.on_success().await;
                Ok(value)
            }
            Err(err) => {
                if is_failure(&err) {
                    self.on_failure().await;
                } else {
                    self.on_success().await;
                }
                Err(CircuitBreakerError::Failed(err))
            }
        }
    }

    async fn admit<E>(&self) -> Result<(), CircuitBreakerError<E>> {
        let mut counters = self.counters.lock().await;
        if counters.state != CircuitState::Open {
            return Ok(());
        }

        let recovered = counters
            .opened_at
            .is_some_and(|opened| opened.elapsed() >= self.config.recovery_timeout);
        if !recovered {
            return Err(CircuitBreakerError::Open);
        }

        tracing::info!("Payment circuit half-open, allowing trial call");
        counters.state = CircuitState::HalfOpen;
        counters.trial_successes = 0;
        Ok(())
    }

    async fn on_success(&self) {
        let mut counters = self.counters.lock().await;
        counters.consecutive_failures = 0;

        if counters.state == CircuitState::HalfOpen {
            counters.trial_successes += 1;
            if counters.trial_successes >= self.config.success_threshold {
                tracing::info!(
                    trial_successes = counters.trial_successes,
                    "Payment circuit closed"
                );
                counters.state = CircuitState::Closed;
                counters.trial_successes = 0;
                counters.opened_at = None;
            }
        }
    }

    async fn on_failure(&self) {
        let mut counters = self.counters.lock().await;
        counters.consecutive_failures += 1;

        let reopen = match counters.state {
            CircuitState::Closed => counters.consecutive_failures >= self.config.failure_threshold,
            CircuitState::HalfOpen => true,
            // A call admitted before another task opened the circuit
            CircuitState::Open => false,
        };

        if reopen {
            tracing::warn!(
                consecutive_failures = counters.consecutive_failures,
                "Payment circuit opened"
            );
            counters.state = CircuitState::Open;
            counters.trial_successes = 0;
            counters.opened_at = Some(Instant::now());
        }
    }

    pub async fn state(&self) -> CircuitState {
        self.counters.lock().await.state
    }
}
