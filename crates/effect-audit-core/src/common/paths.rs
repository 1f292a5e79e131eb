//! Path Utilities
//!
//! Path resolution against the repository root and stable path display.

use std::fs;
use std::path::{Component, Path, PathBuf};

use super::error::AuditError;
use super::result::AuditResult;

/// Default manifest location, relative to the repository root
pub const DEFAULT_MANIFEST: &str = "docs/effects_manifest.yaml";

/// Default registration source root, relative to the repository root
pub const DEFAULT_SOURCE_ROOT: &str = "libs/avs-effects-legacy/src";

/// Default config file name, looked up in the repository root
pub const CONFIG_FILE_NAME: &str = "effect-audit.json";

/// Resolve `path` against `base` unless it is already absolute
pub fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Render a scanned file path for reports
///
/// Paths are shown relative to the parent of the scan root (so the root's own
/// name stays visible) and always use `/` separators, which keeps reports
/// identical across platforms.
pub fn display_path(path: &Path, root: &Path) -> String {
    let base = root.parent().unwrap_or(root);
    let relative = path.strip_prefix(base).unwrap_or(path);

    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            Component::RootDir | Component::Prefix(_) | Component::CurDir => None,
        })
        .collect();

    let joined = parts.join("/");
    if relative.is_absolute() {
        format!("/{}", joined)
    } else {
        joined
    }
}

/// Write `contents` to `path` through a sibling temp file and a rename
///
/// Readers never observe a half-written artifact.
pub fn write_atomic(path: &Path, contents: &[u8]) -> AuditResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| AuditError::io(parent, e))?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| AuditError::Config(format!("output path has no file name: {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));

    fs::write(&tmp, contents).map_err(|e| AuditError::io(&tmp, e))?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(AuditError::io(path, e));
    }
    Ok(())
}
