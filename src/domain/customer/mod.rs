// ============================================================================
// Customer Domain
// ============================================================================
//
// Plain data for the customer entity:
// - Value objects (Email, name rules)
// - Entity types (Customer, NewCustomer, CustomerUpdate)
// - Errors (CustomerError enum)
//
// Persistence lives in `crate::repository`, orchestration in `crate::workflow`.
//
// ============================================================================

pub mod value_objects;
pub mod entity;
pub mod errors;

// Re-export for convenience
pub use value_objects::*;
pub use entity::*;
pub use errors::*;
