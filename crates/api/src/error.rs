//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use commerce::OrderContext;
use workflow::{ExecutionError, ExecutionStatus, WorkflowError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// A workflow run failed or could not start.
    Workflow {
        error: WorkflowError,
        execution_id: Option<String>,
        status: Option<ExecutionStatus>,
    },
    /// Internal server error.
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Workflow { error, .. } => workflow_status(error),
        }
    }
}

/// Maps an engine error to the status a client should see.
fn workflow_status(error: &WorkflowError) -> StatusCode {
    match error {
        WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
        WorkflowError::Configuration(_) | WorkflowError::InvalidPayload { .. } => {
            StatusCode::BAD_REQUEST
        }
        WorkflowError::Step { .. } | WorkflowError::Compensation { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        WorkflowError::Cancelled { .. } => StatusCode::GATEWAY_TIMEOUT,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            ApiError::BadRequest(msg) => serde_json::json!({ "error": msg }),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                serde_json::json!({ "error": msg })
            }
            ApiError::Workflow {
                error,
                execution_id,
                status: run_status,
            } => {
                if let WorkflowError::Compensation { .. } = error {
                    tracing::error!(error = %error, ?execution_id, "workflow rollback incomplete");
                }
                serde_json::json!({
                    "error": error.to_string(),
                    "execution_id": execution_id,
                    "status": run_status.map(|s| s.as_str()),
                })
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<WorkflowError> for ApiError {
    fn from(error: WorkflowError) -> Self {
        ApiError::Workflow {
            error,
            execution_id: None,
            status: None,
        }
    }
}

impl From<ExecutionError<OrderContext>> for ApiError {
    fn from(err: ExecutionError<OrderContext>) -> Self {
        ApiError::Workflow {
            execution_id: err.context.as_ref().map(|c| c.execution_id.to_string()),
            status: err.context.as_ref().map(|c| c.status),
            error: err.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use workflow::CancelReason;

    fn step() -> WorkflowError {
        WorkflowError::Step {
            activity: "authorize_payment".to_string(),
            attempts: 3,
            reason: "declined".to_string(),
        }
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            workflow_status(&WorkflowError::NotFound("x".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            workflow_status(&WorkflowError::InvalidPayload {
                activity: "validate_cart".into(),
                reason: "cart is empty".into(),
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(workflow_status(&step()), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            workflow_status(&WorkflowError::Cancelled {
                activity: "create_order".into(),
                reason: CancelReason::DeadlineExceeded,
            }),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_broken_rollback_is_unprocessable() {
        let err = WorkflowError::Compensation {
            activity: "reserve_inventory".into(),
            reason: "release rejected".into(),
            cause: Box::new(WorkflowError::Cancelled {
                activity: "create_order".into(),
                reason: CancelReason::DeadlineExceeded,
            }),
        };
        assert_eq!(workflow_status(&err), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
