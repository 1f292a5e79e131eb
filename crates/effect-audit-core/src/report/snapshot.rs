//! Snapshot artifact
//!
//! Sorted registered tokens plus the manifest entries, for tracking the
//! catalog across commits.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::common::{write_atomic, AuditResult};
use crate::manifest::{Manifest, ManifestEntry};
use crate::scan::Registry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub generated_at: String,
    pub tokens: Vec<String>,
    pub entries: Vec<ManifestEntry>,
}

impl Snapshot {
    pub fn new(manifest: &Manifest, registry: &Registry) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339(),
            tokens: registry.tokens().map(str::to_string).collect(),
            entries: manifest.entries().to_vec(),
        }
    }
}

/// Write the snapshot JSON to `path`
///
/// Only called with a finished report in hand, so a fatal error earlier in the
/// run never leaves an artifact behind.
pub fn write_snapshot(path: &Path, manifest: &Manifest, registry: &Registry) -> AuditResult<Snapshot> {
    let snapshot = Snapshot::new(manifest, registry);
    let content = serde_json::to_string_pretty(&snapshot)?;
    write_atomic(path, content.as_bytes())?;
    info!("Wrote snapshot ({} tokens) to {:?}", snapshot.tokens.len(), path);
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{parse_manifest, EffectKind, LineParser};

    #[test]
    fn test_snapshot_round_trips_from_disk() {
        let manifest = parse_manifest(
            "entries:\n  - token: glow\n    kind: effect\n  - token: blur\n    kind: support\n    modes: [a]\n",
            &LineParser,
        )
        .unwrap();
        let registry: Registry = [
            ("glow".to_string(), "src/effect_glow.cpp".to_string()),
            ("blur".to_string(), "src/effect_blur.cpp".to_string()),
        ]
        .into_iter()
        .collect();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifacts").join("effects_snapshot.json");
        write_snapshot(&path, &manifest, &registry).unwrap();

        let loaded: Snapshot = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.tokens, vec!["blur".to_string(), "glow".to_string()]);
        // Manifest order, not sorted
        assert_eq!(loaded.entries[0].token, "glow");
        assert_eq!(loaded.entries[1].kind, EffectKind::Support);
        assert_eq!(loaded.entries[1].modes, vec!["a".to_string()]);
    }
}
