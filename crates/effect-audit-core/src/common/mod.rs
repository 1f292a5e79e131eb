//! Common Utilities
//!
//! Error taxonomy, result alias, and path helpers shared by every stage.

pub mod error;
pub mod paths;
pub mod result;

pub use error::{AuditError, ExitCode};
pub use paths::{display_path, resolve, write_atomic};
pub use result::AuditResult;
