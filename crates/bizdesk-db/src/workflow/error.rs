//! # Workflow Errors
//!
//! What a caller of `create_sale` / `cancel_sale` gets back on failure.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ValidationFailed  rejected before the transaction began               │
//! │  NotFound          customer / product / sale missing for this tenant   │
//! │  StateConflict     lifecycle or stock forbids it; rolled back          │
//! │  StoreUnavailable  store failed; rolled back cleanly                   │
//! │  ─────────────────────────────────────────────────────────────────────  │
//! │  PartialFailure    rollback or commit failed: outcome unknown,         │
//! │                    `completed` lists the steps that ran                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything above the line means nothing was written.

use bizdesk_core::{CoreError, ValidationError};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::error::DbError;

// =============================================================================
// Steps
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    CreateSale,
    CancelSale,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::CreateSale => "create_sale",
            Operation::CancelSale => "cancel_sale",
        })
    }
}

/// One store-side step of a sale workflow, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Begin,
    CheckRequestId,
    VerifyCustomer,
    VerifyProducts,
    AllocateNumber,
    InsertHeader,
    InsertItems,
    InsertReceivable,
    DecrementStock,
    LoadSale,
    MarkCancelled,
    RestoreStock,
    CancelReceivables,
    Commit,
}

impl Step {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Step::Begin => "begin",
            Step::CheckRequestId => "check_request_id",
            Step::VerifyCustomer => "verify_customer",
            Step::VerifyProducts => "verify_products",
            Step::AllocateNumber => "allocate_number",
            Step::InsertHeader => "insert_header",
            Step::InsertItems => "insert_items",
            Step::InsertReceivable => "insert_receivable",
            Step::DecrementStock => "decrement_stock",
            Step::LoadSale => "load_sale",
            Step::MarkCancelled => "mark_cancelled",
            Step::RestoreStock => "restore_stock",
            Step::CancelReceivables => "cancel_receivables",
            Step::Commit => "commit",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Steps completed so far plus the one in flight.
#[derive(Debug, Clone, Serialize)]
pub struct StepLog {
    pub operation: Operation,
    pub completed: Vec<Step>,
    pub current: Step,
}

impl StepLog {
    pub fn new(operation: Operation) -> Self {
        StepLog {
            operation,
            completed: Vec::new(),
            current: Step::Begin,
        }
    }

    /// Marks the current step done and starts `step`.
    pub fn enter(&mut self, step: Step) {
        self.completed.push(self.current);
        self.current = step;
    }

    /// The outcome of this run can no longer be proven clean.
    pub fn partial_failure(&self, reason: impl Into<String>) -> WorkflowError {
        WorkflowError::PartialFailure {
            operation: self.operation.to_string(),
            completed: self.completed.iter().map(|s| s.as_str().to_string()).collect(),
            failed_at: self.current.as_str().to_string(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Error
// =============================================================================

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("State conflict: {0}")]
    StateConflict(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Some steps may have been applied. Needs manual reconciliation.
    #[error("{operation} failed at {failed_at} after {completed:?}: {reason}")]
    PartialFailure {
        operation: String,
        completed: Vec<String>,
        failed_at: String,
        reason: String,
    },
}

impl WorkflowError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        WorkflowError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// True when the caller can trust that nothing was written.
    pub fn is_clean(&self) -> bool {
        !matches!(self, WorkflowError::PartialFailure { .. })
    }
}

impl From<CoreError> for WorkflowError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::CustomerNotFound(id) => WorkflowError::not_found("Customer", id),
            CoreError::ProductNotFound(id) => WorkflowError::not_found("Product", id),
            CoreError::SaleNotFound(id) => WorkflowError::not_found("Sale", id),
            CoreError::Validation(v) => WorkflowError::ValidationFailed(v),
            other @ (CoreError::InsufficientStock { .. }
            | CoreError::InvalidSaleStatus { .. }
            | CoreError::InvalidAccountStatus { .. }) => WorkflowError::StateConflict(other.to_string()),
        }
    }
}

/// Store errors raised inside a step. Constraint hits mean the data moved
/// under us; everything else means the store misbehaved.
impl From<DbError> for WorkflowError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => WorkflowError::NotFound { entity, id },
            DbError::Validation(v) => WorkflowError::ValidationFailed(v),
            DbError::Conflict { .. }
            | DbError::UniqueViolation { .. }
            | DbError::ForeignKeyViolation { .. }
            | DbError::CheckViolation { .. } => WorkflowError::StateConflict(err.to_string()),
            other => WorkflowError::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for WorkflowError {
    fn from(err: sqlx::Error) -> Self {
        WorkflowError::from(DbError::from(err))
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_log_reports_progress() {
        let mut log = StepLog::new(Operation::CreateSale);
        log.enter(Step::VerifyCustomer);
        log.enter(Step::InsertHeader);
        log.enter(Step::Commit);

        match log.partial_failure("disk I/O error") {
            WorkflowError::PartialFailure {
                operation,
                completed,
                failed_at,
                reason,
            } => {
                assert_eq!(operation, "create_sale");
                assert_eq!(completed, vec!["begin", "verify_customer", "insert_header"]);
                assert_eq!(failed_at, "commit");
                assert_eq!(reason, "disk I/O error");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_core_errors_classify() {
        let stock = WorkflowError::from(CoreError::InsufficientStock {
            product: "Widget".into(),
            available: 1,
            requested: 2,
        });
        assert!(matches!(stock, WorkflowError::StateConflict(_)));
        assert!(stock.is_clean());

        assert!(matches!(
            WorkflowError::from(CoreError::SaleNotFound("s".into())),
            WorkflowError::NotFound { .. }
        ));
    }

    #[test]
    fn test_db_errors_classify() {
        assert!(matches!(
            WorkflowError::from(DbError::PoolExhausted),
            WorkflowError::StoreUnavailable(_)
        ));
        assert!(matches!(
            WorkflowError::from(DbError::CheckViolation { message: "stock".into() }),
            WorkflowError::StateConflict(_)
        ));
        assert!(matches!(
            WorkflowError::from(DbError::not_found("Product", "p")),
            WorkflowError::NotFound { .. }
        ));
    }
}
