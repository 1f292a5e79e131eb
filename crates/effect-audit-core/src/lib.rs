//! effect-audit-core - reconciles the effect manifest against source
//! registrations
//!
//! The manifest loader and the registry scanner run independently; the
//! reconciler compares their outputs with pure set algebra and the reporter
//! decides pass/fail.
//!
//! # Features
//!
//! - `yaml` (default) - structured manifest parser (brings in `serde_yaml`);
//!   without it the line-oriented parser is used
//! - `parallel` - per-file extraction on `rayon`
//!
//! # Example
//!
//! ```ignore
//! use effect_audit_core::{audit, AuditConfig, AuditRequest};
//!
//! let config = AuditConfig::discover(".".as_ref(), None)?;
//! let run = audit(&AuditRequest::new(".", config))?;
//! println!("{}", run.render_text());
//! ```

pub mod common;
pub mod config;
pub mod manifest;
pub mod reconcile;
pub mod report;
pub mod scan;

use std::path::{Path, PathBuf};
use tracing::info;

pub use common::{AuditError, AuditResult, ExitCode};
pub use config::AuditConfig;
pub use manifest::{EffectKind, Manifest, ManifestEntry, ManifestParser, ParserChoice};
pub use reconcile::{reconcile, AuditReport, ReconcileOptions};
pub use report::{decide, DuplicatePolicy, ExitDecision, Snapshot};
pub use scan::{scan, RegisteredToken, Registry, ScanEntry, ScanOutcome};

/// One audit invocation
#[derive(Debug, Clone)]
pub struct AuditRequest {
    pub repo_root: PathBuf,
    pub config: AuditConfig,
    pub parser: ParserChoice,
    /// Include every ScanEntry in the report
    pub scan_details: bool,
}

impl AuditRequest {
    pub fn new(repo_root: impl Into<PathBuf>, config: AuditConfig) -> Self {
        Self {
            repo_root: repo_root.into(),
            config,
            parser: ParserChoice::Auto,
            scan_details: false,
        }
    }
}

/// A completed audit: inputs kept for the snapshot, plus the decision
#[derive(Debug, Clone)]
pub struct AuditRun {
    pub manifest: Manifest,
    pub scan: ScanOutcome,
    pub report: AuditReport,
    pub decision: ExitDecision,
}

impl AuditRun {
    pub fn render_json(&self) -> AuditResult<String> {
        report::render_json(&self.report, self.decision)
    }

    pub fn render_text(&self) -> String {
        report::render_text(&self.report, self.decision)
    }

    pub fn write_snapshot(&self, path: &Path) -> AuditResult<Snapshot> {
        report::write_snapshot(path, &self.manifest, &self.scan.registry)
    }
}

/// Load, scan, reconcile, decide
///
/// Any error returned here is fatal (exit 2); reconciliation findings are in
/// the returned run.
pub fn audit(request: &AuditRequest) -> AuditResult<AuditRun> {
    let config = &request.config;
    let scan_config = config.scan_config()?;
    let options = config.reconcile_options()?;

    let parser = manifest::select_parser(request.parser)?;
    let manifest = manifest::load_with(&config.manifest_path(&request.repo_root), parser.as_ref())?;

    let roots = config.source_root_paths(&request.repo_root);
    let scan = scan::scan(&roots, &scan_config)?;

    let mut report = reconcile::reconcile(&manifest, &scan, &options);
    if request.scan_details {
        report = report.with_files(&scan.entries);
    }
    let decision = report::decide(&report, config.duplicate_policy());
    info!("Audit decision: {:?}", decision);

    Ok(AuditRun {
        manifest,
        scan,
        report,
        decision,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn repo(manifest: &str, files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(docs.join("effects_manifest.yaml"), manifest).unwrap();

        let src = dir.path().join("libs/avs-effects-legacy/src");
        fs::create_dir_all(&src).unwrap();
        for (rel, contents) in files {
            let path = src.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }
        dir
    }

    const BLUR_AND_STARFIELD: &str = "entries:\n  - token: blur\n    kind: effect\n  - token: starfield\n    kind: effect\n";

    #[test]
    fn test_missing_starfield_fails() {
        let dir = repo(
            BLUR_AND_STARFIELD,
            &[("trans/effect_blur.cpp", "REGISTER_AVS_EFFECT(Blur, \"blur\");\n")],
        );
        let run = audit(&AuditRequest::new(dir.path(), AuditConfig::default())).unwrap();

        assert_eq!(run.report.missing_tokens.iter().collect::<Vec<_>>(), vec!["starfield"]);
        assert!(run.report.extra_tokens.is_empty());
        assert!(run.report.duplicate_tokens.is_empty());
        assert_eq!(run.decision.exit_code().code(), 1);
    }

    #[test]
    fn test_duplicate_blur_policy() {
        let files = [
            ("a/effect_blur.cpp", "REGISTER_AVS_EFFECT(Blur, \"blur\");\n"),
            ("b/effect_blur_alt.cpp", "REGISTER_AVS_EFFECT(BlurAlt, \"blur\");\n"),
        ];
        let dir = repo("entries:\n  - token: blur\n    kind: effect\n", &files);

        let lenient = audit(&AuditRequest::new(dir.path(), AuditConfig::default())).unwrap();
        assert_eq!(lenient.decision.exit_code().code(), 0);
        assert_eq!(lenient.report.duplicate_tokens["blur"].len(), 2);

        let strict_config = AuditConfig {
            strict_duplicates: true,
            ..AuditConfig::default()
        };
        let strict = audit(&AuditRequest::new(dir.path(), strict_config)).unwrap();
        assert_eq!(strict.decision.exit_code().code(), 1);
    }

    #[test]
    fn test_extra_glow_fails() {
        let dir = repo(
            "entries:\n  - token: blur\n    kind: effect\n",
            &[
                ("effect_blur.cpp", "REGISTER_AVS_EFFECT(Blur, \"blur\");\n"),
                ("effect_glow.cpp", "REGISTER_AVS_EFFECT(Glow, \"glow\");\n"),
            ],
        );
        let run = audit(&AuditRequest::new(dir.path(), AuditConfig::default())).unwrap();
        assert_eq!(run.report.extra_tokens.iter().collect::<Vec<_>>(), vec!["glow"]);
        assert_eq!(run.decision, ExitDecision::Fail);
    }

    #[test]
    fn test_line_parser_gives_same_run() {
        let dir = repo(
            BLUR_AND_STARFIELD,
            &[("trans/effect_blur.cpp", "REGISTER_AVS_EFFECT(Blur, \"blur\");\n")],
        );
        let mut request = AuditRequest::new(dir.path(), AuditConfig::default());
        let auto = audit(&request).unwrap();
        request.parser = ParserChoice::Line;
        let line = audit(&request).unwrap();
        assert_eq!(auto.manifest, line.manifest);
        assert_eq!(auto.report, line.report);
    }

    #[test]
    fn test_scan_details_attached() {
        let dir = repo(
            "entries:\n  - token: blur\n    kind: effect\n",
            &[("effect_blur.cpp", "REGISTER_AVS_EFFECT(Blur, \"blur\");\n")],
        );
        let mut request = AuditRequest::new(dir.path(), AuditConfig::default());
        request.scan_details = true;
        let run = audit(&request).unwrap();
        assert_eq!(run.report.files.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_missing_manifest_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = audit(&AuditRequest::new(dir.path(), AuditConfig::default())).unwrap_err();
        assert!(matches!(err, AuditError::ManifestNotFound { .. }));
        assert_eq!(err.exit_code().code(), 2);
    }
}
