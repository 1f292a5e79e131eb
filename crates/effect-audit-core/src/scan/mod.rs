//! Registry Scanner
//!
//! Walks the source roots, extracts registrations from every matching file,
//! and folds them into a [`Registry`]. Nothing is compiled or executed; file
//! contents are flat text.
//!
//! Files are collected and sorted before extraction, and per-file results are
//! merged through [`RegistryBuilder::merge`], so neither traversal order nor
//! the `parallel` feature can change the outcome.

pub mod extract;
pub mod registry;

use globset::GlobSet;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::common::{display_path, AuditError, AuditResult};

pub use extract::{Patterns, ScanEntry};
pub use registry::{RegisteredToken, Registry, RegistryBuilder};

/// Compiled scanner settings
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// File-name globs selecting source files
    pub extensions: GlobSet,
    pub patterns: Patterns,
}

/// A source file that could not be read
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnreadableFile {
    pub path: String,
    pub reason: String,
}

/// Scanner output
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub registry: Registry,
    /// One entry per file read, sorted by path
    pub entries: Vec<ScanEntry>,
    pub unreadable: Vec<UnreadableFile>,
}

impl ScanOutcome {
    pub fn files_scanned(&self) -> usize {
        self.entries.len()
    }
}

/// A discovered source file and the root it was found under
#[derive(Debug, Clone)]
struct SourceFile {
    path: PathBuf,
    /// Symlinks and overlapping roots resolve to the same file here
    canonical: PathBuf,
    display: String,
}

enum FileResult {
    Read(ScanEntry),
    Unreadable(UnreadableFile),
}

/// Scan every root and build the registration set
///
/// A root that is missing or not a directory is fatal. Failures below a root
/// are recorded per file and never abort the scan.
pub fn scan(roots: &[PathBuf], config: &ScanConfig) -> AuditResult<ScanOutcome> {
    let mut unreadable = Vec::new();
    let mut files = Vec::new();

    for root in roots {
        check_root(root)?;
        collect_files(root, config, &mut files, &mut unreadable);
    }

    // One file reached twice keeps its smallest display path
    files.sort_by(|a, b| a.canonical.cmp(&b.canonical).then_with(|| a.display.cmp(&b.display)));
    files.dedup_by(|a, b| a.canonical == b.canonical);
    disambiguate(&mut files);
    files.sort_by(|a, b| a.display.cmp(&b.display));
    info!("Scanning {} source files under {} root(s)", files.len(), roots.len());

    let results = read_all(&files, &config.patterns);

    let mut builder = RegistryBuilder::new();
    let mut entries = Vec::with_capacity(results.len());
    for result in results {
        match result {
            FileResult::Read(entry) => {
                let mut partial = RegistryBuilder::new();
                for token in &entry.tokens {
                    partial.record(token, &entry.path);
                }
                builder.merge(partial);
                entries.push(entry);
            }
            FileResult::Unreadable(file) => unreadable.push(file),
        }
    }

    unreadable.sort_by(|a, b| a.path.cmp(&b.path));
    let registry = builder.freeze();
    info!(
        "Scan complete: {} files, {} registered tokens, {} unreadable",
        entries.len(),
        registry.len(),
        unreadable.len()
    );

    Ok(ScanOutcome {
        registry,
        entries,
        unreadable,
    })
}

fn check_root(root: &Path) -> AuditResult<()> {
    match fs::metadata(root) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(AuditError::SourceRootUnreadable {
            path: root.to_path_buf(),
            reason: "not a directory".to_string(),
        }),
        Err(e) => Err(AuditError::SourceRootUnreadable {
            path: root.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

fn collect_files(
    root: &Path,
    config: &ScanConfig,
    files: &mut Vec<SourceFile>,
    unreadable: &mut Vec<UnreadableFile>,
) {
    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        // Skip dotfiles and dot-directories below the root
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(root);
                warn!("Failed to walk {:?}: {}", path, e);
                unreadable.push(UnreadableFile {
                    path: display_path(path, root),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        if !config.extensions.is_match(entry.file_name()) {
            continue;
        }

        let path = entry.into_path();
        let canonical = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        files.push(SourceFile {
            canonical,
            display: display_path(&path, root),
            path,
        });
    }
}

/// Roots sharing a final component can produce equal display paths for
/// different files; those fall back to the full path.
fn disambiguate(files: &mut [SourceFile]) {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for file in files.iter() {
        *counts.entry(file.display.as_str()).or_default() += 1;
    }
    let clashing: HashSet<String> = counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(d, _)| d.to_string())
        .collect();

    for file in files.iter_mut().filter(|f| clashing.contains(&f.display)) {
        file.display = file.path.to_string_lossy().replace('\\', "/");
    }
}

fn read_one(file: &SourceFile, patterns: &Patterns) -> FileResult {
    match fs::read_to_string(&file.path) {
        Ok(text) => {
            let file_name = file
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let entry = patterns.extract(file.display.clone(), &file_name, &text);
            debug!(
                path = %entry.path,
                tokens = entry.tokens.len(),
                symbols = entry.symbol_names.len(),
                "Scanned source file"
            );
            FileResult::Read(entry)
        }
        Err(e) => {
            warn!("Skipping unreadable source file {:?}: {}", file.path, e);
            FileResult::Unreadable(UnreadableFile {
                path: file.display.clone(),
                reason: e.to_string(),
            })
        }
    }
}

#[cfg(not(feature = "parallel"))]
fn read_all(files: &[SourceFile], patterns: &Patterns) -> Vec<FileResult> {
    files.iter().map(|f| read_one(f, patterns)).collect()
}

#[cfg(feature = "parallel")]
fn read_all(files: &[SourceFile], patterns: &Patterns) -> Vec<FileResult> {
    use rayon::prelude::*;

    files.par_iter().map(|f| read_one(f, patterns)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuditConfig;

    fn write(root: &Path, rel: &str, contents: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn scan_config() -> ScanConfig {
        AuditConfig::default().scan_config().unwrap()
    }

    #[test]
    fn test_scan_collects_tokens_and_entries() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("src");
        write(&root, "trans/effect_blur.cpp", b"REGISTER_AVS_EFFECT(Blur, \"blur\");\n");
        write(&root, "render/effect_starfield.cpp", b"// not yet registered\nclass Starfield {};\n");
        write(&root, "notes.txt", b"REGISTER_AVS_EFFECT(Glow, \"glow\");\n");

        let outcome = scan(&[root], &scan_config()).unwrap();

        assert_eq!(outcome.registry.tokens().collect::<Vec<_>>(), vec!["blur"]);
        assert_eq!(outcome.files_scanned(), 2);
        let starfield = outcome
            .entries
            .iter()
            .find(|e| e.path == "src/render/effect_starfield.cpp")
            .unwrap();
        assert!(starfield.tokens.is_empty());
        assert_eq!(starfield.heuristic_name.as_deref(), Some("starfield"));
        assert_eq!(starfield.symbol_names, vec!["Starfield".to_string()]);
    }

    #[test]
    fn test_scan_records_duplicate_paths() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("src");
        write(&root, "a/effect_blur.cpp", b"REGISTER_AVS_EFFECT(Blur, \"blur\");\n");
        write(&root, "b/blur_alias.cpp", b"REGISTER_AVS_EFFECT(BlurAlias, \"blur\");\n");

        let outcome = scan(&[root], &scan_config()).unwrap();
        let paths: Vec<_> = outcome.registry.paths("blur").unwrap().iter().cloned().collect();
        assert_eq!(paths, vec!["src/a/effect_blur.cpp".to_string(), "src/b/blur_alias.cpp".to_string()]);
    }

    #[test]
    fn test_scan_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("src");
        for i in 0..12 {
            write(
                &root,
                &format!("d{}/effect_{}.cpp", i % 3, i),
                format!("REGISTER_AVS_EFFECT(E{i}, \"tok{}\");\n", i % 5).as_bytes(),
            );
        }

        let config = scan_config();
        let first = scan(&[root.clone()], &config).unwrap();
        let second = scan(&[root], &config).unwrap();
        assert_eq!(first.registry, second.registry);
        assert_eq!(first.entries, second.entries);
    }

    #[test]
    fn test_unreadable_file_does_not_abort() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("src");
        write(&root, "effect_blur.cpp", b"REGISTER_AVS_EFFECT(Blur, \"blur\");\n");
        write(&root, "effect_binary.cpp", &[0xff, 0xfe, 0x00, 0x80]);

        let outcome = scan(&[root], &scan_config()).unwrap();
        assert!(outcome.registry.contains("blur"));
        assert_eq!(outcome.unreadable.len(), 1);
        assert_eq!(outcome.unreadable[0].path, "src/effect_binary.cpp");
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = scan(&[dir.path().join("nope")], &scan_config()).unwrap_err();
        assert!(matches!(err, AuditError::SourceRootUnreadable { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_file_counted_once() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("src");
        write(&root, "trans/effect_blur.cpp", b"REGISTER_AVS_EFFECT(Blur, \"blur\");\n");
        fs::create_dir_all(root.join("links")).unwrap();
        std::os::unix::fs::symlink(root.join("trans/effect_blur.cpp"), root.join("links/effect_blur.cpp")).unwrap();

        let outcome = scan(&[root], &scan_config()).unwrap();
        let paths: Vec<_> = outcome.registry.paths("blur").unwrap().iter().cloned().collect();
        assert_eq!(paths, vec!["src/links/effect_blur.cpp".to_string()]);
        assert_eq!(outcome.files_scanned(), 1);
    }

    #[test]
    fn test_overlapping_roots_counted_once() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("src");
        write(&root, "trans/effect_blur.cpp", b"REGISTER_AVS_EFFECT(Blur, \"blur\");\n");

        let outcome = scan(&[root.clone(), root.join("trans")], &scan_config()).unwrap();
        assert!(!outcome.registry.registered().any(|t| t.is_duplicate()));
        assert_eq!(outcome.files_scanned(), 1);
    }

    #[test]
    fn test_dot_directories_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("src");
        write(&root, ".cache/effect_glow.cpp", b"REGISTER_AVS_EFFECT(Glow, \"glow\");\n");
        write(&root, "effect_blur.cpp", b"REGISTER_AVS_EFFECT(Blur, \"blur\");\n");

        let outcome = scan(&[root], &scan_config()).unwrap();
        assert_eq!(outcome.registry.tokens().collect::<Vec<_>>(), vec!["blur"]);
    }
}
