//! Configuration management
//!
//! Audit settings from built-in defaults, an optional JSON config file in the
//! repository root, and caller overrides (applied by the CLI).

use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::common::paths::{CONFIG_FILE_NAME, DEFAULT_MANIFEST, DEFAULT_SOURCE_ROOT};
use crate::common::{resolve, AuditError, AuditResult};
use crate::reconcile::ReconcileOptions;
use crate::report::DuplicatePolicy;
use crate::scan::{Patterns, ScanConfig};

/// `REGISTER_AVS_EFFECT(ClassName, "Token")`
pub const DEFAULT_TOKEN_PATTERN: &str = r#"REGISTER_AVS_EFFECT\(\s*[^,]+,\s*"([^"]+)"\s*\)"#;

/// Declared class-like symbols
pub const DEFAULT_SYMBOL_PATTERN: &str = r"\b(?:class|struct)\s+([A-Za-z_][A-Za-z0-9_]*)";

/// `effect_<name>.<ext>`
pub const DEFAULT_HEURISTIC_PATTERN: &str = r"^effect_([A-Za-z0-9_]+)\.[A-Za-z0-9]+$";

fn default_extensions() -> Vec<String> {
    vec!["*.cpp".to_string()]
}

fn default_monolith_files() -> Vec<String> {
    vec![
        "effects_*.cpp".to_string(),
        "registry.cpp".to_string(),
        "effect_registry.cpp".to_string(),
    ]
}

/// Audit configuration file (`effect-audit.json`)
///
/// Every field is optional in the file. Relative paths resolve against the
/// repository root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuditConfig {
    pub manifest: PathBuf,
    pub source_roots: Vec<PathBuf>,
    /// File-name globs selecting source files
    pub extensions: Vec<String>,
    /// Registration regex; capture group 1 is the token
    pub token_pattern: String,
    pub symbol_pattern: String,
    /// Applied to the file name; capture group 1 is the candidate name
    pub heuristic_pattern: String,
    /// File-name globs of legacy files that bundle registrations
    pub monolith_files: Vec<String>,
    /// Fail the audit on duplicate registrations
    pub strict_duplicates: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            manifest: PathBuf::from(DEFAULT_MANIFEST),
            source_roots: vec![PathBuf::from(DEFAULT_SOURCE_ROOT)],
            extensions: default_extensions(),
            token_pattern: DEFAULT_TOKEN_PATTERN.to_string(),
            symbol_pattern: DEFAULT_SYMBOL_PATTERN.to_string(),
            heuristic_pattern: DEFAULT_HEURISTIC_PATTERN.to_string(),
            monolith_files: default_monolith_files(),
            strict_duplicates: false,
        }
    }
}

impl AuditConfig {
    /// Read a config file
    pub fn load(path: &Path) -> AuditResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| AuditError::io(path, e))?;
        let config: AuditConfig = serde_json::from_str(&content)
            .map_err(|e| AuditError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        info!("Loaded audit config from {:?}", path);
        Ok(config)
    }

    /// Explicit config file, else `effect-audit.json` in `repo_root` when it
    /// exists, else defaults
    pub fn discover(repo_root: &Path, explicit: Option<&Path>) -> AuditResult<Self> {
        if let Some(path) = explicit {
            return Self::load(&resolve(repo_root, path));
        }

        let candidate = repo_root.join(CONFIG_FILE_NAME);
        match fs::metadata(&candidate) {
            Ok(_) => Self::load(&candidate),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No {} in {:?}, using defaults", CONFIG_FILE_NAME, repo_root);
                Ok(Self::default())
            }
            Err(e) => Err(AuditError::io(candidate, e)),
        }
    }

    pub fn manifest_path(&self, repo_root: &Path) -> PathBuf {
        resolve(repo_root, &self.manifest)
    }

    pub fn source_root_paths(&self, repo_root: &Path) -> Vec<PathBuf> {
        self.source_roots.iter().map(|p| resolve(repo_root, p)).collect()
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        if self.strict_duplicates {
            DuplicatePolicy::Strict
        } else {
            DuplicatePolicy::Lenient
        }
    }

    /// Compile globs and patterns for the scanner
    pub fn scan_config(&self) -> AuditResult<ScanConfig> {
        if self.source_roots.is_empty() {
            return Err(AuditError::Config("at least one source root is required".to_string()));
        }

        Ok(ScanConfig {
            extensions: build_globset("extensions", &self.extensions)?,
            patterns: Patterns {
                token: compile_capturing("token_pattern", &self.token_pattern)?,
                symbol: compile_capturing("symbol_pattern", &self.symbol_pattern)?,
                heuristic: compile_capturing("heuristic_pattern", &self.heuristic_pattern)?,
            },
        })
    }

    pub fn reconcile_options(&self) -> AuditResult<ReconcileOptions> {
        Ok(ReconcileOptions {
            monolith_files: build_globset("monolith_files", &self.monolith_files)?,
        })
    }
}

fn build_globset(field: &str, patterns: &[String]) -> AuditResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| AuditError::Config(format!("invalid glob in `{}`: {}", field, e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| AuditError::Config(format!("invalid globs in `{}`: {}", field, e)))
}

fn compile_capturing(field: &str, pattern: &str) -> AuditResult<Regex> {
    let regex = Regex::new(pattern)
        .map_err(|e| AuditError::Config(format!("invalid regex in `{}`: {}", field, e)))?;
    if regex.captures_len() < 2 {
        return Err(AuditError::Config(format!(
            "`{}` must contain a capture group for the extracted name",
            field
        )));
    }
    Ok(regex)
}
