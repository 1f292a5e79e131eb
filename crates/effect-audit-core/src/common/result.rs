//! Common Result Type

use super::error::AuditError;

/// Audit result type
pub type AuditResult<T> = Result<T, AuditError>;
