//! Domain error types
//!
//! These errors are framework-agnostic and represent business-level failures
//! of the progress/reward ledger.

use std::fmt;

#[derive(Debug)]
pub enum LedgerError {
    /// Referenced user/language/quest/item does not exist
    NotFound,
    /// Malformed or out-of-range input, with the offending field(s)
    Validation(String),
    /// Atomic update lost a race; the caller should retry the whole operation
    Conflict(String),
    /// Database/persistence error
    Storage(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::NotFound => write!(f, "Resource not found"),
            LedgerError::Validation(msg) => write!(f, "Validation error: {}", msg),
            LedgerError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            LedgerError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for LedgerError {}

// Conversion from SeaORM errors (used in the service layer)
impl From<sea_orm::DbErr> for LedgerError {
    fn from(e: sea_orm::DbErr) -> Self {
        LedgerError::Storage(e.to_string())
    }
}

/// Detects a unique-constraint violation without consuming the error.
///
/// The completion tables rely on UNIQUE indexes as their idempotency guard;
/// a violation there means "already credited", not a failure.
pub fn is_unique_violation(e: &sea_orm::DbErr) -> bool {
    matches!(
        e.sql_err(),
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
    )
}
