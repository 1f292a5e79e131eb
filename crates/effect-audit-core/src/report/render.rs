//! Report rendering
//!
//! JSON for machines, a short sorted summary for people. Both come from the
//! same [`AuditReport`]; every collection in it is already sorted.

use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::info;

use super::ExitDecision;
use crate::common::{write_atomic, AuditResult};
use crate::reconcile::AuditReport;

#[derive(Serialize)]
struct JsonReport<'a> {
    status: ExitDecision,
    #[serde(flatten)]
    report: &'a AuditReport,
}

/// Pretty-printed JSON report including the pass/fail status
pub fn render_json(report: &AuditReport, decision: ExitDecision) -> AuditResult<String> {
    let value: Value = serde_json::to_value(JsonReport {
        status: decision,
        report,
    })?;
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Human-readable summary
pub fn render_text(report: &AuditReport, decision: ExitDecision) -> String {
    let totals = &report.totals;
    let mut out = format!(
        "Manifest entries: {}  Registered tokens: {}  Files scanned: {}\n",
        totals.manifest_count, totals.registered_count, totals.files_scanned
    );

    push_section(
        &mut out,
        "Unregistered tokens",
        report.missing_tokens.iter().map(|token| format!("  - {}", token)),
    );
    push_section(
        &mut out,
        "Tokens not present in manifest",
        report.extra_tokens.iter().map(|token| format!("  - {}", token)),
    );
    push_section(
        &mut out,
        "Duplicate registrations",
        report.duplicate_tokens.iter().map(|(token, paths)| {
            let mut item = format!("  - {}", token);
            for path in paths {
                item.push_str(&format!("\n      {}", path));
            }
            item
        }),
    );
    push_section(
        &mut out,
        "Registrations in monolith files",
        report.monolith_registrations.iter().map(|(token, paths)| {
            let joined: Vec<&str> = paths.iter().map(String::as_str).collect();
            format!("  - {} ({})", token, joined.join(", "))
        }),
    );
    push_section(
        &mut out,
        "Files named like effects without a registration",
        report
            .heuristic_hints
            .iter()
            .map(|hint| format!("  - {} ({})", hint.path, hint.candidate)),
    );
    push_section(
        &mut out,
        "Unreadable files",
        report
            .unreadable_files
            .iter()
            .map(|file| format!("  - {}: {}", file.path, file.reason)),
    );

    out.push_str(match decision {
        ExitDecision::Pass => "Effect audit passed.\n",
        ExitDecision::Fail => "Effect audit failed.\n",
    });
    out
}

/// `title (n):` followed by one line per item; nothing when there are no items
fn push_section(out: &mut String, title: &str, items: impl ExactSizeIterator<Item = String>) {
    if items.len() == 0 {
        return;
    }
    out.push_str(&format!("{} ({}):\n", title, items.len()));
    for item in items {
        out.push_str(&item);
        out.push('\n');
    }
}

/// Write the rendered report to a file
pub fn write_report(path: &Path, rendered: &str) -> AuditResult<()> {
    write_atomic(path, rendered.as_bytes())?;
    info!("Wrote audit report to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::HeuristicHint;
    use crate::report::tests::empty_report;

    #[test]
    fn test_json_fields_sorted() {
        let mut report = empty_report();
        report.missing_tokens.insert("starfield".to_string());
        report.missing_tokens.insert("aurora".to_string());
        report.duplicate_tokens.insert(
            "blur".to_string(),
            ["src/z.cpp", "src/a.cpp"].iter().map(|s| s.to_string()).collect(),
        );

        let json: Value = serde_json::from_str(&render_json(&report, ExitDecision::Fail).unwrap()).unwrap();
        assert_eq!(json["status"], "fail");
        assert_eq!(json["missing_tokens"], serde_json::json!(["aurora", "starfield"]));
        assert_eq!(json["extra_tokens"], serde_json::json!([]));
        assert_eq!(json["duplicate_tokens"]["blur"], serde_json::json!(["src/a.cpp", "src/z.cpp"]));
        assert_eq!(json["totals"]["manifest_count"], 1);
        assert!(json.get("files").is_none());
    }

    #[test]
    fn test_text_lists_every_offender() {
        let mut report = empty_report();
        report.missing_tokens.insert("starfield".to_string());
        report.extra_tokens.insert("glow".to_string());
        report.heuristic_hints.push(HeuristicHint {
            path: "src/effect_aurora.cpp".to_string(),
            candidate: "aurora".to_string(),
        });

        let text = render_text(&report, ExitDecision::Fail);
        assert!(text.contains("Unregistered tokens (1):\n  - starfield\n"));
        assert!(text.contains("Tokens not present in manifest (1):\n  - glow\n"));
        assert!(text.contains("src/effect_aurora.cpp (aurora)"));
        assert!(text.ends_with("Effect audit failed.\n"));
    }

    #[test]
    fn test_text_duplicate_paths_indented() {
        let mut report = empty_report();
        report.duplicate_tokens.insert(
            "blur".to_string(),
            ["src/b.cpp", "src/a.cpp"].iter().map(|s| s.to_string()).collect(),
        );
        let text = render_text(&report, ExitDecision::Pass);
        assert!(text.starts_with("Manifest entries: 1  Registered tokens: 1  Files scanned: 1\n"));
        assert!(text.contains("Duplicate registrations (1):\n  - blur\n      src/a.cpp\n      src/b.cpp\n"));
        assert!(!text.contains("Unreadable files"));
    }

    #[test]
    fn test_text_pass() {
        let text = render_text(&empty_report(), ExitDecision::Pass);
        assert!(text.ends_with("Effect audit passed.\n"));
    }
}
