//! Manifest Loader
//!
//! Reads the manifest document, parses it, validates, returns the manifest.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::info;

use super::parser::{default_parser, validate_entries, ManifestParser};
use super::types::Manifest;
use crate::common::{AuditError, AuditResult};

/// Largest manifest document accepted
const MAX_MANIFEST_BYTES: u64 = 4_000_000;

/// Load a manifest with the preferred parser for this build
pub fn load(path: &Path) -> AuditResult<Manifest> {
    load_with(path, default_parser().as_ref())
}

/// Load a manifest with a specific parser
pub fn load_with(path: &Path, parser: &dyn ManifestParser) -> AuditResult<Manifest> {
    let text = read_manifest_text(path)?;
    let manifest = parse_manifest(&text, parser).map_err(|err| match err {
        AuditError::ManifestFormat { message, .. } => AuditError::format(path, message),
        other => other,
    })?;

    info!(
        "Loaded manifest {:?}: {} entries ({} parser)",
        path,
        manifest.len(),
        parser.name()
    );
    Ok(manifest)
}

/// Parse and validate manifest text that is already in memory
pub fn parse_manifest(text: &str, parser: &dyn ManifestParser) -> AuditResult<Manifest> {
    let raw = parser
        .parse(text)
        .map_err(|message| AuditError::format("<memory>", message))?;
    let entries = validate_entries(raw)?;
    Ok(Manifest::from_validated(entries))
}

fn read_manifest_text(path: &Path) -> AuditResult<String> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(AuditError::ManifestNotFound {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(AuditError::io(path, e)),
    };

    if !metadata.is_file() {
        return Err(AuditError::format(path, "manifest path is not a file"));
    }
    if metadata.len() > MAX_MANIFEST_BYTES {
        return Err(AuditError::format(path, "manifest file too large (max 4MB)"));
    }

    fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::InvalidData => AuditError::format(path, "manifest is not valid UTF-8"),
        _ => AuditError::io(path, e),
    })
}
