// ============================================================================
// Customer Store
// ============================================================================
//
// Persistence contract consumed by the workflow. Two implementations:
// - postgres/   - sqlx over the `customers` table
// - in_memory/  - same transactional contract without a database
//
// ============================================================================

mod in_memory;
mod postgres;

use async_trait::async_trait;
use futures_util::future::BoxFuture;

use crate::balance::BalanceError;
use crate::domain::customer::{Customer, CustomerId, CustomerUpdate, NewCustomer};

pub use in_memory::InMemoryCustomerRepository;
pub use postgres::PostgresCustomerRepository;

/// Action run inside the create transaction with the id-assigned customer.
/// An `Err` rolls the insert back.
pub type CreateEffect =
    Box<dyn FnOnce(Customer) -> BoxFuture<'static, Result<(), BalanceError>> + Send>;

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Customer>, StoreError>;

    async fn find_by_id(&self, id: CustomerId) -> Result<Customer, StoreError>;

    async fn create(&self, customer: NewCustomer) -> Result<Customer, StoreError>;

    /// Insert `customer`, run `effect` against the inserted row, then commit.
    ///
    /// The unique email check happens at insert time, before `effect` runs.
    /// If `effect` fails the insert is rolled back and its error is returned
    /// as [`StoreError::SideEffect`]. The row is invisible to every other
    /// reader until commit, and dropping the returned future rolls back.
    async fn create_with_effect(
        &self,
        customer: NewCustomer,
        effect: CreateEffect,
    ) -> Result<Customer, StoreError>;

    async fn update(&self, customer: CustomerUpdate) -> Result<Customer, StoreError>;

    async fn delete(&self, id: CustomerId) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("customer {0} not found")]
    NotFound(CustomerId),

    #[error("a customer with email {0} already exists")]
    Conflict(String),

    #[error("balance creation failed, customer not created: {0}")]
    SideEffect(#[source] BalanceError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored row is invalid: {0}")]
    CorruptRow(String),
}
