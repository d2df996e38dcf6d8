use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{CreateEffect, CustomerRepository, StoreError};
use crate::domain::customer::{Customer, CustomerId, CustomerUpdate, Email, NewCustomer};

// ============================================================================
// In-Memory Customer Repository
// ============================================================================
//
// Mirrors the PostgreSQL semantics the workflow relies on:
// - ids come from a sequence and are never reused, even after a rollback
// - an in-flight insert reserves its email, so a concurrent create with the
//   same address fails with Conflict before its effect can run
// - the row becomes readable only when the insert commits
//
// ============================================================================

#[derive(Debug, Default)]
struct Table {
    last_id: CustomerId,
    rows: BTreeMap<CustomerId, Customer>,
    reserved_emails: HashSet<Email>,
}

impl Table {
    fn email_taken(&self, email: &Email, except: Option<CustomerId>) -> bool {
        self.reserved_emails.contains(email)
            || self
                .rows
                .values()
                .any(|row| &row.email == email && Some(row.id) != except)
    }
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryCustomerRepository {
    table: Arc<Mutex<Table>>,
}

impl InMemoryCustomerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Table> {
        lock_table(&self.table)
    }

    fn begin_insert(&self, customer: NewCustomer) -> Result<PendingInsert, StoreError> {
        let mut table = self.lock();
        if table.email_taken(&customer.email, None) {
            return Err(StoreError::Conflict(customer.email.as_str().to_string()));
        }

        table.last_id += 1;
        table.reserved_emails.insert(customer.email.clone());

        let now = Utc::now();
        Ok(PendingInsert {
            table: Arc::clone(&self.table),
            customer: Customer {
                id: table.last_id,
                name: customer.name,
                email: customer.email,
                created_at: now,
                updated_at: now,
            },
            committed: false,
        })
    }
}

fn lock_table(table: &Mutex<Table>) -> MutexGuard<'_, Table> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An uncommitted insert. Dropping it without `commit` rolls it back.
struct PendingInsert {
    table: Arc<Mutex<Table>>,
    customer: Customer,
    committed: bool,
}

impl PendingInsert {
    fn commit(mut self) -> Customer {
        let mut table = lock_table(&self.table);
        table.reserved_emails.remove(&self.customer.email);
        table.rows.insert(self.customer.id, self.customer.clone());
        drop(table);

        self.committed = true;
        self.customer.clone()
    }
}

impl Drop for PendingInsert {
    fn drop(&mut self) {
        if !self.committed {
            tracing::debug!(customer_id = self.customer.id, "Rolling back in-memory insert");
            lock_table(&self.table)
                .reserved_emails
                .remove(&self.customer.email);
        }
    }
}

#[async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn find_all(&self) -> Result<Vec<Customer>, StoreError> {
        Ok(self.lock().rows.values().cloned().collect())
    }

    async fn find_by_id(&self, id: CustomerId) -> Result<Customer, StoreError> {
        self.lock()
            .rows
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn create(&self, customer: NewCustomer) -> Result<Customer, StoreError> {
        Ok(self.begin_insert(customer)?.commit())
    }

    async fn create_with_effect(
        &self,
        customer: NewCustomer,
        effect: CreateEffect,
    ) -> Result<Customer, StoreError> {
        let pending = self.begin_insert(customer)?;

        match effect(pending.customer.clone()).await {
            Ok(()) => Ok(pending.commit()),
            Err(err) => {
                drop(pending);
                Err(StoreError::SideEffect(err))
            }
        }
    }

    async fn update(&self, customer: CustomerUpdate) -> Result<Customer, StoreError> {
        let mut table = self.lock();
        if !table.rows.contains_key(&customer.id) {
            return Err(StoreError::NotFound(customer.id));
        }
        if table.email_taken(&customer.email, Some(customer.id)) {
            return Err(StoreError::Conflict(customer.email.as_str().to_string()));
        }

        let row = table
            .rows
            .get_mut(&customer.id)
            .ok_or(StoreError::NotFound(customer.id))?;
        row.name = customer.name;
        row.email = customer.email;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete(&self, id: CustomerId) -> Result<(), StoreError> {
        self.lock()
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::BalanceError;
    use futures_util::FutureExt;

    fn joana() -> NewCustomer {
        NewCustomer::new("Joana", Email::new("joana@bank.com"))
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let repo = InMemoryCustomerRepository::new();

        let first = repo.create(joana()).await.unwrap();
        let second = repo
            .create(NewCustomer::new("Rui", Email::new("rui@bank.com")))
            .await
            .unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
    }

    #[tokio::test]
    async fn test_uncommitted_insert_is_invisible_and_reserves_email() {
        let repo = InMemoryCustomerRepository::new();
        let observer = repo.clone();

        let effect: CreateEffect = Box::new(move |created: Customer| {
            async move {
                assert!(observer.find_all().await.unwrap().is_empty());
                assert!(matches!(
                    observer.find_by_id(created.id).await,
                    Err(StoreError::NotFound(_))
                ));

                let duplicate = observer
                    .create(NewCustomer::new("Other", created.email.clone()))
                    .await;
                assert!(matches!(duplicate, Err(StoreError::Conflict(_))));
                Ok::<(), BalanceError>(())
            }
            .boxed()
        });

        let created = repo.create_with_effect(joana(), effect).await.unwrap();
        assert_eq!(repo.find_by_id(created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_failed_effect_rolls_back_and_frees_email() {
        let repo = InMemoryCustomerRepository::new();

        let effect: CreateEffect =
            Box::new(|_: Customer| async { Err::<(), _>(BalanceError::Unavailable) }.boxed());
        let result = repo.create_with_effect(joana(), effect).await;

        assert!(matches!(result, Err(StoreError::SideEffect(BalanceError::Unavailable))));
        assert!(repo.find_all().await.unwrap().is_empty());

        // Sequence values are not reused after a rollback
        let retried = repo.create(joana()).await.unwrap();
        assert_eq!(retried.id, 2);
    }

    #[tokio::test]
    async fn test_dropped_create_rolls_back() {
        let repo = InMemoryCustomerRepository::new();

        let effect: CreateEffect =
            Box::new(|_: Customer| futures_util::future::pending::<Result<(), BalanceError>>().boxed());
        let in_flight = repo.create_with_effect(joana(), effect);
        let timed_out =
            tokio::time::timeout(std::time::Duration::from_millis(20), in_flight).await;

        assert!(timed_out.is_err());
        assert!(repo.find_all().await.unwrap().is_empty());
        assert!(repo.create(joana()).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_rejects_email_of_other_customer() {
        let repo = InMemoryCustomerRepository::new();
        let joana = repo.create(joana()).await.unwrap();
        let rui = repo
            .create(NewCustomer::new("Rui", Email::new("rui@bank.com")))
            .await
            .unwrap();

        let clash = repo
            .update(CustomerUpdate {
                id: rui.id,
                name: "Rui".to_string(),
                email: joana.email.clone(),
            })
            .await;
        assert!(matches!(clash, Err(StoreError::Conflict(_))));

        // Keeping your own email is not a conflict
        let renamed = repo
            .update(CustomerUpdate {
                id: joana.id,
                name: "Joana Silva".to_string(),
                email: joana.email.clone(),
            })
            .await
            .unwrap();
        assert_eq!(renamed.name, "Joana Silva");
        assert_eq!(renamed.created_at, joana.created_at);
    }

    #[tokio::test]
    async fn test_delete_is_hard_delete() {
        let repo = InMemoryCustomerRepository::new();
        let created = repo.create(joana()).await.unwrap();

        repo.delete(created.id).await.unwrap();

        assert!(matches!(repo.find_by_id(created.id).await, Err(StoreError::NotFound(_))));
        assert!(matches!(repo.delete(created.id).await, Err(StoreError::NotFound(_))));
        // The email can be registered again
        assert!(repo.create(joana()).await.is_ok());
    }
}
