//! # API Error Type
//!
//! Unified error type for back-office commands.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Presentation layer                 Rust back-office                    │
//! │  ──────────────────                 ────────────────                    │
//! │                                                                         │
//! │  create_sale(draft)                                                     │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command: Result<T, ApiError>                                    │  │
//! │  │                                                                  │  │
//! │  │  WorkflowError ──┐                                               │  │
//! │  │  DbError ────────┼──► ApiError { code, message, completedSteps } │  │
//! │  │  CoreError ──────┤                                               │  │
//! │  │  ConfigError ────┘                                               │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  e.code = "STATE_CONFLICT"                                              │
//! │  e.message = "Sale 3f2a... is cancelled, cannot cancel"                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Store failures are logged here with their detail and surfaced with a
//! generic message.

use bizdesk_core::{CoreError, ValidationError};
use bizdesk_db::{DbError, WorkflowError};
use serde::Serialize;
use tracing::error;

use crate::config::ConfigError;

/// What a caller receives when a command fails.
///
/// ```json
/// {
///   "code": "PARTIAL_FAILURE",
///   "message": "create_sale stopped at commit: disk I/O error",
///   "completedSteps": ["begin", "verify_customer", "insert_header"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    /// Only set for partial failures.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub completed_steps: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input rejected before anything was written.
    ValidationFailed,

    /// Referenced record missing for this tenant.
    NotFound,

    /// Current state forbids the operation (cancelled sale, paid account,
    /// not enough stock).
    StateConflict,

    /// The store failed; nothing was written.
    StoreUnavailable,

    /// A multi-step write may be half applied. Needs reconciliation.
    PartialFailure,

    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            completed_steps: Vec::new(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationFailed, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::StateConflict, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::Validation(e) => ApiError::validation(e.to_string()),
            DbError::UniqueViolation { field, value } => {
                ApiError::validation(format!("{} '{}' already exists", field, value))
            }
            DbError::ForeignKeyViolation { message } => {
                error!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            DbError::CheckViolation { message } => ApiError::validation(message),
            err @ DbError::Conflict { .. } => ApiError::conflict(err.to_string()),
            DbError::ConnectionFailed(e) => {
                error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::StoreUnavailable, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                error!("Database migration failed: {}", e);
                ApiError::new(ErrorCode::StoreUnavailable, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::StoreUnavailable, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                error!("Transaction failed: {}", e);
                ApiError::new(ErrorCode::StoreUnavailable, "Database transaction failed")
            }
            DbError::PoolExhausted => ApiError::new(ErrorCode::StoreUnavailable, "Database pool exhausted"),
            DbError::Internal(e) => {
                error!("Internal database error: {}", e);
                ApiError::internal("Database operation failed")
            }
        }
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::ValidationFailed(e) => ApiError::validation(e.to_string()),
            WorkflowError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            WorkflowError::StateConflict(message) => ApiError::conflict(message),
            WorkflowError::StoreUnavailable(message) => {
                error!("Sale workflow store failure: {}", message);
                ApiError::new(ErrorCode::StoreUnavailable, "Database operation failed")
            }
            WorkflowError::PartialFailure {
                operation,
                completed,
                failed_at,
                reason,
            } => {
                error!(
                    operation = %operation,
                    failed_at = %failed_at,
                    completed = ?completed,
                    "Sale workflow may be partially applied: {}",
                    reason
                );
                ApiError {
                    code: ErrorCode::PartialFailure,
                    message: format!("{} stopped at {}: {}", operation, failed_at, reason),
                    completed_steps: completed,
                }
            }
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::CustomerNotFound(id) => ApiError::not_found("Customer", &id),
            CoreError::ProductNotFound(id) => ApiError::not_found("Product", &id),
            CoreError::SaleNotFound(id) => ApiError::not_found("Sale", &id),
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
            other @ (CoreError::InsufficientStock { .. }
            | CoreError::InvalidSaleStatus { .. }
            | CoreError::InvalidAccountStatus { .. }) => ApiError::conflict(other.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        error!("Configuration error: {}", err);
        ApiError::internal(err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_codes() {
        let json = serde_json::to_value(ApiError::not_found("Sale", "s1")).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Sale not found: s1");
        assert!(json.get("completedSteps").is_none());
    }

    #[test]
    fn test_partial_failure_keeps_steps() {
        let err = ApiError::from(WorkflowError::PartialFailure {
            operation: "create_sale".into(),
            completed: vec!["begin".into(), "insert_header".into()],
            failed_at: "commit".into(),
            reason: "disk I/O error".into(),
        });

        assert_eq!(err.code, ErrorCode::PartialFailure);
        assert_eq!(err.completed_steps, vec!["begin", "insert_header"]);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "PARTIAL_FAILURE");
        assert_eq!(json["completedSteps"][1], "insert_header");
    }

    #[test]
    fn test_workflow_errors_map() {
        assert_eq!(
            ApiError::from(WorkflowError::StateConflict("sold out".into())).code,
            ErrorCode::StateConflict
        );
        assert_eq!(
            ApiError::from(WorkflowError::StoreUnavailable("locked".into())).code,
            ErrorCode::StoreUnavailable
        );
        assert_eq!(
            ApiError::from(WorkflowError::ValidationFailed(ValidationError::required("items"))).code,
            ErrorCode::ValidationFailed
        );
    }

    #[test]
    fn test_db_errors_map() {
        assert_eq!(
            ApiError::from(DbError::UniqueViolation {
                field: "code".into(),
                value: "A-1".into()
            })
            .message,
            "code 'A-1' already exists"
        );
        assert_eq!(ApiError::from(DbError::PoolExhausted).code, ErrorCode::StoreUnavailable);
        assert_eq!(
            ApiError::from(CoreError::InsufficientStock {
                product: "Widget".into(),
                available: 1,
                requested: 3,
            })
            .code,
            ErrorCode::StateConflict
        );
    }
}
