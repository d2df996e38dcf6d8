use futures_util::FutureExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use crate::balance::{BalanceClient, BalanceError};
use crate::domain::customer::{Customer, CustomerId, CustomerUpdate, NewCustomer};
use crate::metrics::Metrics;
use crate::repository::{CreateEffect, CustomerRepository, StoreError};

// ============================================================================
// Customer Workflow
// ============================================================================
//
// Orchestrates: Delivery → Workflow → Store (+ Balance client on create)
//
// Create is all-or-nothing: the balance call runs inside the store's insert
// transaction and a failure rolls the insert back. No retries here; a failed
// create is resubmitted by the caller.
//
// Delete does not retract the remote balance record.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("customer {0} not found")]
    NotFound(CustomerId),

    #[error("a customer with email {0} already exists")]
    Conflict(String),

    #[error("customer was not created: {0}")]
    SideEffect(#[source] BalanceError),

    #[error("storage failure: {0}")]
    Storage(#[source] StoreError),
}

impl WorkflowError {
    /// Prometheus label for `customer_operations_total`
    pub fn outcome(&self) -> &'static str {
        match self {
            WorkflowError::NotFound(_) => "not_found",
            WorkflowError::Conflict(_) => "conflict",
            WorkflowError::SideEffect(_) => "side_effect",
            WorkflowError::Storage(_) => "storage_error",
        }
    }
}

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => WorkflowError::NotFound(id),
            StoreError::Conflict(email) => WorkflowError::Conflict(email),
            StoreError::SideEffect(cause) => WorkflowError::SideEffect(cause),
            other => WorkflowError::Storage(other),
        }
    }
}

/// Stateless; clones share the same store, client and metrics.
#[derive(Clone)]
pub struct CustomerWorkflow {
    repository: Arc<dyn CustomerRepository>,
    balance: Arc<dyn BalanceClient>,
    metrics: Option<Arc<Metrics>>,
}

impl CustomerWorkflow {
    pub fn new(repository: Arc<dyn CustomerRepository>, balance: Arc<dyn BalanceClient>) -> Self {
        Self {
            repository,
            balance,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    #[tracing::instrument(name = "customer.get_all", skip(self))]
    pub async fn get_all(&self) -> Result<Vec<Customer>, WorkflowError> {
        self.observe("get_all", self.repository.find_all()).await
    }

    #[tracing::instrument(name = "customer.get_by_id", skip(self))]
    pub async fn get_by_id(&self, id: CustomerId) -> Result<Customer, WorkflowError> {
        self.observe("get_by_id", self.repository.find_by_id(id)).await
    }

    #[tracing::instrument(name = "customer.create", skip(self, customer), fields(customer_id))]
    pub async fn create(&self, customer: NewCustomer) -> Result<Customer, WorkflowError> {
        let effect = balance_effect(Arc::clone(&self.balance));
        self.observe("create", self.repository.create_with_effect(customer, effect))
            .await
    }

    #[tracing::instrument(name = "customer.update", skip(self, customer), fields(customer_id = customer.id))]
    pub async fn update(&self, customer: CustomerUpdate) -> Result<Customer, WorkflowError> {
        self.observe("update", self.repository.update(customer)).await
    }

    #[tracing::instrument(name = "customer.delete", skip(self))]
    pub async fn delete(&self, id: CustomerId) -> Result<(), WorkflowError> {
        self.observe("delete", self.repository.delete(id)).await
    }

    /// Classify the store result and report it. Reporting never changes it.
    async fn observe<T, F>(&self, operation: &'static str, call: F) -> Result<T, WorkflowError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let started = Instant::now();
        let result = call.await.map_err(WorkflowError::from);

        let outcome = match &result {
            Ok(_) => "ok",
            Err(err) => err.outcome(),
        };
        if let Some(metrics) = &self.metrics {
            metrics.record_operation(operation, outcome, started.elapsed().as_secs_f64());
        }

        match &result {
            Ok(_) => tracing::debug!(operation, "Customer operation succeeded"),
            Err(WorkflowError::Storage(err)) => {
                tracing::error!(operation, error = %err, "Customer operation failed")
            }
            Err(err) => tracing::info!(operation, outcome, error = %err, "Customer operation rejected"),
        }

        result
    }
}

/// The create effect: provision the balance for the id the store just assigned.
fn balance_effect(balance: Arc<dyn BalanceClient>) -> CreateEffect {
    Box::new(move |created: Customer| {
        async move {
            tracing::Span::current().record("customer_id", created.id);
            tracing::debug!(customer_id = created.id, "Requesting balance creation");
            balance.create_balance(created.id).await
        }
        .boxed()
    })
}
