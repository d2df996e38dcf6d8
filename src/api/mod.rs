// ============================================================================
// Delivery Layer - HTTP API
// ============================================================================
//
// Translates HTTP requests into workflow calls and workflow results into
// status codes. Requests are assumed to be authenticated upstream.
//
// ============================================================================

mod dto;
mod error;
mod handlers;

pub use handlers::{configure, cors, CUSTOMER_GROUP_PATH};
