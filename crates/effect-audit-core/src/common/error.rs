//! Common Error Types
//!
//! Fatal audit errors and their process exit code mapping.

use std::path::PathBuf;

/// Process exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Audit passed
    Success = 0,
    /// Missing or extra tokens (or duplicates under strict policy)
    ReconciliationFailure = 1,
    /// Manifest, config, or source tree could not be used at all
    SetupFailure = 2,
}

impl ExitCode {
    pub fn code(&self) -> i32 {
        *self as i32
    }
}

/// Fatal audit error
///
/// Reconciliation findings are never errors: they live in the
/// [`AuditReport`](crate::reconcile::AuditReport). Everything here aborts the
/// run before any artifact is written.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("effects manifest not found: {}", path.display())]
    ManifestNotFound { path: PathBuf },

    #[error("malformed manifest {}: {message}", path.display())]
    ManifestFormat { path: PathBuf, message: String },

    #[error("invalid manifest entry {token:?} (field `{field}`): {message}")]
    ManifestSchema {
        token: String,
        field: &'static str,
        message: String,
    },

    #[error("duplicate token in manifest: {token:?}")]
    DuplicateToken { token: String },

    #[error("source root unreadable {}: {reason}", path.display())]
    SourceRootUnreadable { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AuditError {
    /// Create a schema error for a named entry field
    pub fn schema(token: impl Into<String>, field: &'static str, message: impl Into<String>) -> Self {
        Self::ManifestSchema {
            token: token.into(),
            field,
            message: message.into(),
        }
    }

    /// Create a format error for a manifest document
    pub fn format(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ManifestFormat {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Every fatal error is a setup failure.
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::SetupFailure
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_names_token_and_field() {
        let err = AuditError::schema("blur", "kind", "expected one of effect, sentinel, support");
        let msg = err.to_string();
        assert!(msg.contains("\"blur\""));
        assert!(msg.contains("`kind`"));
    }

    #[test]
    fn test_all_errors_exit_with_setup_failure() {
        let errors = [
            AuditError::ManifestNotFound {
                path: PathBuf::from("docs/effects_manifest.yaml"),
            },
            AuditError::DuplicateToken {
                token: "blur".to_string(),
            },
            AuditError::Config("bad glob".to_string()),
        ];
        for err in errors {
            assert_eq!(err.exit_code().code(), 2);
        }
    }
}
