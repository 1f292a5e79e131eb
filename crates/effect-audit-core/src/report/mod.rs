//! Reporter
//!
//! Turns an [`AuditReport`] into an exit decision, JSON and text renderings,
//! and the optional snapshot artifact.

pub mod render;
pub mod snapshot;

use serde::Serialize;

use crate::common::ExitCode;
use crate::reconcile::AuditReport;

pub use render::{render_json, render_text, write_report};
pub use snapshot::{write_snapshot, Snapshot};

/// Whether duplicate registrations alone fail the audit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Report duplicates, pass anyway
    #[default]
    Lenient,
    /// Duplicates fail the audit
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitDecision {
    Pass,
    Fail,
}

impl ExitDecision {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            ExitDecision::Pass => ExitCode::Success,
            ExitDecision::Fail => ExitCode::ReconciliationFailure,
        }
    }
}

/// Missing or extra tokens always fail; duplicates fail only under
/// [`DuplicatePolicy::Strict`].
pub fn decide(report: &AuditReport, policy: DuplicatePolicy) -> ExitDecision {
    if report.has_mismatch() {
        return ExitDecision::Fail;
    }
    if report.has_duplicates() && policy == DuplicatePolicy::Strict {
        return ExitDecision::Fail;
    }
    ExitDecision::Pass
}
