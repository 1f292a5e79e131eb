//! Manifest Types
//!
//! The declared effect catalog: validated entries plus a token index.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Allowed values for an entry's `kind`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectKind {
    Effect,
    Sentinel,
    Support,
}

impl EffectKind {
    pub const ALL: [EffectKind; 3] = [EffectKind::Effect, EffectKind::Sentinel, EffectKind::Support];

    pub fn as_str(&self) -> &'static str {
        match self {
            EffectKind::Effect => "effect",
            EffectKind::Sentinel => "sentinel",
            EffectKind::Support => "support",
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EffectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EffectKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("expected one of effect, sentinel, support (got {:?})", s))
    }
}

/// One validated manifest entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub token: String,
    pub kind: EffectKind,
    #[serde(default)]
    pub modes: Vec<String>,
}

/// `modes` as seen by a parser, before validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RawModes {
    #[default]
    Absent,
    List(Vec<String>),
    /// Present, but not a sequence of strings
    Invalid,
}

/// A `token` or `kind` value as a parser read it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    Str(String),
    /// Present but not a string; names the YAML type found
    Other(&'static str),
}

impl RawValue {
    pub fn str(value: impl Into<String>) -> Self {
        RawValue::Str(value.into())
    }
}

/// Parser output for one entry; both parsers emit this shape
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    /// `None` when the key is absent
    pub token: Option<RawValue>,
    pub kind: Option<RawValue>,
    pub modes: RawModes,
}

/// Loaded effect manifest
///
/// Entries keep document order; `index` maps token to position. There is no
/// mutable access once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
    index: HashMap<String, usize>,
}

impl Manifest {
    /// Build from entries whose tokens are already known to be unique
    pub(crate) fn from_validated(entries: Vec<ManifestEntry>) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (entry.token.clone(), idx))
            .collect();
        Self { entries, index }
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn get(&self, token: &str) -> Option<&ManifestEntry> {
        self.index.get(token).and_then(|idx| self.entries.get(*idx))
    }

    pub fn contains(&self, token: &str) -> bool {
        self.index.contains_key(token)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.token.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse() {
        assert_eq!("sentinel".parse::<EffectKind>(), Ok(EffectKind::Sentinel));
        assert!("Effect".parse::<EffectKind>().is_err());
        assert!("filter".parse::<EffectKind>().is_err());
    }

    #[test]
    fn test_manifest_lookup() {
        let manifest = Manifest::from_validated(vec![
            ManifestEntry {
                token: "Trans / Blur".to_string(),
                kind: EffectKind::Effect,
                modes: vec!["light".to_string(), "heavy".to_string()],
            },
            ManifestEntry {
                token: "Unknown Render Object".to_string(),
                kind: EffectKind::Sentinel,
                modes: vec![],
            },
        ]);

        assert_eq!(manifest.len(), 2);
        assert!(manifest.contains("Trans / Blur"));
        assert_eq!(manifest.get("Unknown Render Object").map(|e| e.kind), Some(EffectKind::Sentinel));
        assert!(manifest.get("Trans / Water").is_none());
        assert_eq!(manifest.tokens().collect::<Vec<_>>(), vec!["Trans / Blur", "Unknown Render Object"]);
    }

    #[test]
    fn test_entry_serializes_lowercase_kind() {
        let entry = ManifestEntry {
            token: "blur".to_string(),
            kind: EffectKind::Support,
            modes: vec![],
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["kind"], "support");
    }
}
