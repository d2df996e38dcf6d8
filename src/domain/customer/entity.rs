use chrono::{DateTime, Utc};

use super::value_objects::Email;

// ============================================================================
// Customer Entity
// ============================================================================

/// Store-assigned customer identifier. Zero is never assigned.
pub type CustomerId = u64;

/// A committed customer row
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub email: Email,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a customer; the store assigns the id
#[derive(Debug, Clone, PartialEq)]
pub struct NewCustomer {
    pub name: String,
    pub email: Email,
}

impl NewCustomer {
    pub fn new(name: impl Into<String>, email: Email) -> Self {
        Self {
            name: name.into(),
            email,
        }
    }
}

/// Replacement values for an existing customer. The id selects the row and
/// is never rewritten.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerUpdate {
    pub id: CustomerId,
    pub name: String,
    pub email: Email,
}
