use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use super::{CreateEffect, CustomerRepository, StoreError};
use crate::domain::customer::{Customer, CustomerId, CustomerUpdate, Email, NewCustomer};

// ============================================================================
// PostgreSQL Customer Repository
// ============================================================================
//
// Table:
//   customers(id BIGSERIAL PK, nome TEXT NOT NULL, email TEXT NOT NULL UNIQUE,
//             created_at TIMESTAMPTZ, updated_at TIMESTAMPTZ)
//
// create_with_effect keeps the transaction open across the effect, so the
// unique index on email serializes concurrent creates of the same address:
// the second INSERT waits for the first to commit or roll back.
//
// ============================================================================

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS customers (
    id BIGSERIAL PRIMARY KEY,
    nome TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)";

const INSERT_CUSTOMER: &str = "INSERT INTO customers (nome, email) VALUES ($1, $2)
     RETURNING id, nome, email, created_at, updated_at";

#[derive(Clone)]
pub struct PostgresCustomerRepository {
    pool: PgPool,
}

impl PostgresCustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the customers table if it is missing
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        tracing::info!("customers table ready");
        Ok(())
    }
}

#[async_trait]
impl CustomerRepository for PostgresCustomerRepository {
    async fn find_all(&self) -> Result<Vec<Customer>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, nome, email, created_at, updated_at FROM customers ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!("Loaded {} customers", rows.len());
        rows.iter().map(customer_from_row).collect()
    }

    async fn find_by_id(&self, id: CustomerId) -> Result<Customer, StoreError> {
        let key = row_key(id)?;
        let row = sqlx::query(
            "SELECT id, nome, email, created_at, updated_at FROM customers WHERE id = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => customer_from_row(&row),
            None => Err(StoreError::NotFound(id)),
        }
    }

    async fn create(&self, customer: NewCustomer) -> Result<Customer, StoreError> {
        let row = sqlx::query(INSERT_CUSTOMER)
            .bind(&customer.name)
            .bind(customer.email.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify_write_error(e, &customer.email))?;

        customer_from_row(&row)
    }

    async fn create_with_effect(
        &self,
        customer: NewCustomer,
        effect: CreateEffect,
    ) -> Result<Customer, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(INSERT_CUSTOMER)
            .bind(&customer.name)
            .bind(customer.email.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| classify_write_error(e, &customer.email))?;
        let created = customer_from_row(&row)?;

        tracing::debug!(customer_id = created.id, "Customer inserted, running create effect");

        if let Err(effect_error) = effect(created.clone()).await {
            // Dropping `tx` would roll back as well
            if let Err(rollback_error) = tx.rollback().await {
                tracing::warn!(
                    customer_id = created.id,
                    error = %rollback_error,
                    "Explicit rollback failed, connection will be discarded"
                );
            }
            tracing::info!(
                customer_id = created.id,
                error = %effect_error,
                "Create effect failed, customer insert rolled back"
            );
            return Err(StoreError::SideEffect(effect_error));
        }

        if let Err(commit_error) = tx.commit().await {
            tracing::error!(
                customer_id = created.id,
                error = %commit_error,
                "Commit failed after balance was created remotely"
            );
            return Err(StoreError::Database(commit_error));
        }

        tracing::info!(customer_id = created.id, "✅ Customer committed");
        Ok(created)
    }

    async fn update(&self, customer: CustomerUpdate) -> Result<Customer, StoreError> {
        let key = row_key(customer.id)?;
        let row = sqlx::query(
            "UPDATE customers SET nome = $1, email = $2, updated_at = NOW()
             WHERE id = $3
             RETURNING id, nome, email, created_at, updated_at",
        )
        .bind(&customer.name)
        .bind(customer.email.as_str())
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify_write_error(e, &customer.email))?;

        match row {
            Some(row) => customer_from_row(&row),
            None => Err(StoreError::NotFound(customer.id)),
        }
    }

    async fn delete(&self, id: CustomerId) -> Result<(), StoreError> {
        let key = row_key(id)?;
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

/// BIGSERIAL keys are signed; an id past i64::MAX cannot name a row.
fn row_key(id: CustomerId) -> Result<i64, StoreError> {
    i64::try_from(id).map_err(|_| StoreError::NotFound(id))
}

fn classify_write_error(error: sqlx::Error, email: &Email) -> StoreError {
    if let sqlx::Error::Database(db) = &error {
        if db.is_unique_violation() {
            return StoreError::Conflict(email.as_str().to_string());
        }
    }
    StoreError::Database(error)
}

fn customer_from_row(row: &PgRow) -> Result<Customer, StoreError> {
    let id: i64 = row.try_get("id")?;
    let id = CustomerId::try_from(id)
        .map_err(|_| StoreError::CorruptRow(format!("negative customer id {id}")))?;
    let name: String = row.try_get("nome")?;
    let email: String = row.try_get("email")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    Ok(Customer {
        id,
        name,
        email: Email::new(email),
        created_at,
        updated_at,
    })
}

// ============================================================================
// Integration Tests (require PostgreSQL)
// ============================================================================
//
// Run with:
//   DATABASE_URL=postgres://... cargo test -- --ignored
//
// ============================================================================
