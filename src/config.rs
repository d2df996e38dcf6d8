use std::str::FromStr;
use std::time::Duration;

use crate::balance::{CircuitBreakerConfig, GrpcBalanceConfig};

// ============================================================================
// Application Configuration
// ============================================================================
//
// Loaded once at startup from the environment (a `.env` file is honoured).
//
// | Variable                    | Default   |
// |-----------------------------|-----------|
// | DATABASE_URL                | required  |
// | PAYMENT_GRPC_SERVICE        | required  |
// | SERVER_HOST                 | 0.0.0.0   |
// | SERVER_PORT                 | 5002      |
// | METRICS_PORT                | 9090      |
// | DATABASE_MAX_CONNECTIONS    | 10        |
// | BALANCE_TIMEOUT_MS          | 5000      |
// | BALANCE_FAILURE_THRESHOLD   | 5         |
// | BALANCE_RECOVERY_SECS       | 30        |
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub server_host: String,
    pub server_port: u16,
    pub metrics_port: u16,
    pub balance: GrpcBalanceConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = required(&lookup, "DATABASE_URL")?;
        let payment_endpoint = required(&lookup, "PAYMENT_GRPC_SERVICE")?;

        let call_timeout_ms: u64 = parsed(&lookup, "BALANCE_TIMEOUT_MS", 5_000)?;
        if call_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "BALANCE_TIMEOUT_MS",
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            database_url,
            database_max_connections: parsed(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port: parsed(&lookup, "SERVER_PORT", 5002)?,
            metrics_port: parsed(&lookup, "METRICS_PORT", 9090)?,
            balance: GrpcBalanceConfig {
                endpoint: payment_endpoint,
                call_timeout: Duration::from_millis(call_timeout_ms),
                circuit_breaker: CircuitBreakerConfig {
                    failure_threshold: parsed(&lookup, "BALANCE_FAILURE_THRESHOLD", 5)?,
                    recovery_timeout: Duration::from_secs(parsed(
                        &lookup,
                        "BALANCE_RECOVERY_SECS",
                        30,
                    )?),
                    success_threshold: 1,
                },
            },
        })
    }
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(key)),
    }
}

fn parsed<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: format!("{raw:?}: {e}"),
        }),
    }
}
