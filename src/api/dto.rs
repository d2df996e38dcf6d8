use serde::{Deserialize, Serialize};

use crate::domain::customer::{validate_name, Customer, CustomerError, CustomerId, Email};

// ============================================================================
// Wire Types
// ============================================================================
//
// Field names follow the public contract of the customer API (`nome`).
//
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerRequest {
    #[serde(default)]
    pub nome: String,
    #[serde(default)]
    pub email: String,
}

pub type CreateCustomerRequest = CustomerRequest;
pub type UpdateCustomerRequest = CustomerRequest;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerResponse {
    pub id: CustomerId,
    pub nome: String,
    pub email: String,
}

impl From<Customer> for CustomerResponse {
    fn from(customer: Customer) -> Self {
        Self {
            id: customer.id,
            nome: customer.name,
            email: customer.email.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, error: CustomerError) -> Self {
        Self {
            field,
            message: error.to_string(),
        }
    }
}

/// Request fields after validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedCustomer {
    pub name: String,
    pub email: Email,
}

impl CustomerRequest {
    /// Check every field and report all failures at once.
    pub fn validate(&self) -> Result<ValidatedCustomer, Vec<FieldError>> {
        let name = validate_name(&self.nome).map_err(|e| FieldError::new("nome", e));
        let email = Email::parse(&self.email).map_err(|e| FieldError::new("email", e));

        match (name, email) {
            (Ok(name), Ok(email)) => Ok(ValidatedCustomer { name, email }),
            (name, email) => Err(name.err().into_iter().chain(email.err()).collect()),
        }
    }
}
