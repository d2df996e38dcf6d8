// ============================================================================
// Domain Layer
// ============================================================================
//
// Customer types and input rules shared by the store, the workflow and the
// delivery layer. Nothing in here talks to PostgreSQL or the payment service.
//
// ============================================================================

pub mod customer;
