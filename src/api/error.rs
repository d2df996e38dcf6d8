use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;

use super::dto::FieldError;
use crate::workflow::WorkflowError;

// ============================================================================
// Delivery Errors → HTTP status
// ============================================================================
//
// NotFound → 404, Conflict → 409, balance failure → 422, storage → 500.
// Malformed requests never reach the workflow and answer 400.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("request validation failed")]
    Validation(Vec<FieldError>),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Workflow(WorkflowError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Workflow(WorkflowError::Conflict(_)) => StatusCode::CONFLICT,
            ApiError::Workflow(WorkflowError::SideEffect(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Workflow(WorkflowError::Storage(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ApiError::Validation(errors) => json!({ "errors": errors }),
            // Storage details stay in the logs
            ApiError::Workflow(WorkflowError::Storage(_)) => json!({ "error": "internal server error" }),
            other => json!({ "error": other.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
