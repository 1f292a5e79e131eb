//! Reconciler
//!
//! Set algebra between the manifest and the scanned registrations. Inputs are
//! only borrowed; the report is built once and never changed.

use globset::GlobSet;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::info;

use crate::manifest::Manifest;
use crate::scan::{ScanEntry, ScanOutcome, UnreadableFile};

/// Diagnostics settings
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    /// File-name globs of monolith files
    pub monolith_files: GlobSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub manifest_count: usize,
    pub registered_count: usize,
    pub files_scanned: usize,
    pub files_unreadable: usize,
}

/// A file with no explicit registration whose name suggests an effect
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeuristicHint {
    pub path: String,
    pub candidate: String,
}

/// Reconciliation result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub missing_tokens: BTreeSet<String>,
    pub extra_tokens: BTreeSet<String>,
    pub duplicate_tokens: BTreeMap<String, BTreeSet<String>>,
    pub totals: Totals,
    pub monolith_registrations: BTreeMap<String, BTreeSet<String>>,
    pub heuristic_hints: Vec<HeuristicHint>,
    pub unreadable_files: Vec<UnreadableFile>,
    /// Every scanned file, only for extended reports
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<ScanEntry>>,
}

impl AuditReport {
    /// Missing or extra tokens exist
    pub fn has_mismatch(&self) -> bool {
        !self.missing_tokens.is_empty() || !self.extra_tokens.is_empty()
    }

    pub fn has_duplicates(&self) -> bool {
        !self.duplicate_tokens.is_empty()
    }

    /// Attach the per-file scan records
    pub fn with_files(mut self, entries: &[ScanEntry]) -> Self {
        self.files = Some(entries.to_vec());
        self
    }
}

/// Compare the manifest against the scan
///
/// Heuristic file-name matches are reported as hints and never count as
/// registrations.
pub fn reconcile(manifest: &Manifest, scan: &ScanOutcome, options: &ReconcileOptions) -> AuditReport {
    let registry = &scan.registry;

    let missing_tokens: BTreeSet<String> = manifest
        .tokens()
        .filter(|token| !registry.contains(token))
        .map(str::to_string)
        .collect();

    let extra_tokens: BTreeSet<String> = registry
        .iter()
        .filter(|(token, paths)| !paths.is_empty() && !manifest.contains(token))
        .map(|(token, _)| token.to_string())
        .collect();

    let duplicate_tokens: BTreeMap<String, BTreeSet<String>> = registry
        .iter()
        .filter(|(_, paths)| paths.len() > 1)
        .map(|(token, paths)| (token.to_string(), paths.clone()))
        .collect();

    let monolith_registrations: BTreeMap<String, BTreeSet<String>> = registry
        .iter()
        .filter_map(|(token, paths)| {
            let inside: BTreeSet<String> = paths
                .iter()
                .filter(|p| is_monolith(p, &options.monolith_files))
                .cloned()
                .collect();
            (!inside.is_empty()).then(|| (token.to_string(), inside))
        })
        .collect();

    let heuristic_hints = scan
        .entries
        .iter()
        .filter(|e| !e.has_registrations())
        .filter_map(|e| {
            e.heuristic_name.as_ref().map(|candidate| HeuristicHint {
                path: e.path.clone(),
                candidate: candidate.clone(),
            })
        })
        .collect();

    let report = AuditReport {
        totals: Totals {
            manifest_count: manifest.len(),
            registered_count: registry.len(),
            files_scanned: scan.files_scanned(),
            files_unreadable: scan.unreadable.len(),
        },
        missing_tokens,
        extra_tokens,
        duplicate_tokens,
        monolith_registrations,
        heuristic_hints,
        unreadable_files: scan.unreadable.clone(),
        files: None,
    };

    info!(
        "Reconciled: {} missing, {} extra, {} duplicated",
        report.missing_tokens.len(),
        report.extra_tokens.len(),
        report.duplicate_tokens.len()
    );
    report
}

fn is_monolith(display_path: &str, monoliths: &GlobSet) -> bool {
    Path::new(display_path)
        .file_name()
        .is_some_and(|name| monoliths.is_match(name))
}
