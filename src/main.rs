use actix_web::{web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod balance;
mod config;
mod domain;
mod metrics;
mod repository;
mod workflow;

use balance::GrpcBalanceClient;
use config::AppConfig;
use repository::{CustomerRepository, InMemoryCustomerRepository, PostgresCustomerRepository};
use workflow::CustomerWorkflow;

/// `DATABASE_URL` value that selects the in-memory store
const IN_MEMORY_STORE: &str = "memory://";

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG overrides the default filter
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,customer_service=debug")),
        )
        .init();

    tracing::info!("Starting customer service");

    let config = AppConfig::from_env()?;

    // === 1. Customer store ===
    let repository: Arc<dyn CustomerRepository> = if config.database_url == IN_MEMORY_STORE {
        tracing::warn!("Using the in-memory customer store, data is lost on shutdown");
        Arc::new(InMemoryCustomerRepository::new())
    } else {
        tracing::info!(max_connections = config.database_max_connections, "Connecting to PostgreSQL");
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(&config.database_url)
            .await?;

        let repository = PostgresCustomerRepository::new(pool);
        repository.ensure_schema().await?;
        Arc::new(repository)
    };

    // === 2. Prometheus metrics ===
    let metrics = Arc::new(metrics::Metrics::new()?);
    tracing::info!("Metrics registry created with {} metrics", metrics.registry().gather().len());

    // === 3. Balance client (lazy channel, circuit breaker, per-call timeout) ===
    tracing::info!(endpoint = %config.balance.endpoint, "Configuring balance client");
    let balance = GrpcBalanceClient::connect_lazy(&config.balance)?.with_metrics(metrics.clone());

    // === 4. Workflow and servers ===
    let workflow = CustomerWorkflow::new(repository, Arc::new(balance))
        .with_metrics(metrics.clone());

    let metrics_server = metrics::metrics_server(
        metrics.registry().clone(),
        &config.server_host,
        config.metrics_port,
    )?;
    tracing::info!("Metrics server listening on {}:{}", config.server_host, config.metrics_port);

    let api_server = HttpServer::new(move || {
        App::new()
            .wrap(api::cors())
            .app_data(web::Data::new(workflow.clone()))
            .configure(api::configure)
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run();
    tracing::info!(
        "Customer API listening on {}:{}{}",
        config.server_host,
        config.server_port,
        api::CUSTOMER_GROUP_PATH
    );

    tokio::try_join!(api_server, metrics_server)?;

    tracing::info!("Customer service stopped");
    Ok(())
}
