//! Manifest Parsers
//!
//! Two strategies read the same document grammar into [`RawEntry`] records;
//! [`validate_entries`] is the single place schema rules are enforced, so both
//! strategies accept and reject exactly the same manifests.

use std::collections::HashSet;

use tracing::debug;

use super::types::{EffectKind, ManifestEntry, RawEntry, RawModes, RawValue};
use crate::common::{AuditError, AuditResult};

/// Top-level key holding the entry sequence
pub const ENTRIES_KEY: &str = "entries";

/// A manifest document reader
///
/// `parse` only reports document-level problems (as a message the loader
/// wraps with the manifest path). Field-level problems are left in the
/// returned records for [`validate_entries`].
pub trait ManifestParser {
    fn name(&self) -> &'static str;

    fn parse(&self, text: &str) -> Result<Vec<RawEntry>, String>;
}

/// Which parser to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParserChoice {
    /// Structured when compiled in, otherwise line-oriented
    #[default]
    Auto,
    Structured,
    Line,
}

/// The preferred parser for this build
pub fn default_parser() -> Box<dyn ManifestParser> {
    #[cfg(feature = "yaml")]
    {
        Box::new(super::structured::YamlParser)
    }
    #[cfg(not(feature = "yaml"))]
    {
        Box::new(super::line::LineParser)
    }
}

/// Resolve a [`ParserChoice`] to a parser
pub fn select_parser(choice: ParserChoice) -> AuditResult<Box<dyn ManifestParser>> {
    match choice {
        ParserChoice::Auto => Ok(default_parser()),
        ParserChoice::Line => Ok(Box::new(super::line::LineParser)),
        #[cfg(feature = "yaml")]
        ParserChoice::Structured => Ok(Box::new(super::structured::YamlParser)),
        #[cfg(not(feature = "yaml"))]
        ParserChoice::Structured => Err(AuditError::Config(
            "structured manifest parser not available in this build (enable the `yaml` feature)".to_string(),
        )),
    }
}

/// Shared schema check for both parsers
///
/// Rejects an empty or absent token, a token or kind that is not a string, a
/// kind outside the allowed set, a `modes` value that is not a sequence of
/// strings, and any repeated token.
pub fn validate_entries(raw: Vec<RawEntry>) -> AuditResult<Vec<ManifestEntry>> {
    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(raw.len());

    for (idx, entry) in raw.into_iter().enumerate() {
        let token = match entry.token {
            Some(RawValue::Str(token)) if !token.is_empty() => token,
            Some(RawValue::Other(found)) => {
                return Err(AuditError::schema(
                    format!("<entry {}>", idx + 1),
                    "token",
                    format!("token must be a string (got {})", found),
                ))
            }
            _ => {
                return Err(AuditError::schema(
                    format!("<entry {}>", idx + 1),
                    "token",
                    "manifest entry missing token",
                ))
            }
        };

        let kind = match entry.kind {
            Some(RawValue::Str(kind)) => kind
                .parse::<EffectKind>()
                .map_err(|msg| AuditError::schema(token.as_str(), "kind", msg))?,
            Some(RawValue::Other(found)) => {
                return Err(AuditError::schema(
                    token,
                    "kind",
                    format!("kind must be a string (got {})", found),
                ))
            }
            None => return Err(AuditError::schema(token, "kind", "manifest entry missing kind")),
        };

        let modes = match entry.modes {
            RawModes::Absent => Vec::new(),
            RawModes::List(modes) => modes,
            RawModes::Invalid => {
                return Err(AuditError::schema(token, "modes", "modes must be a list of strings"))
            }
        };

        if !seen.insert(token.clone()) {
            return Err(AuditError::DuplicateToken { token });
        }

        debug!(token = %token, kind = %kind, modes = modes.len(), "Validated manifest entry");
        entries.push(ManifestEntry { token, kind, modes });
    }

    Ok(entries)
}
