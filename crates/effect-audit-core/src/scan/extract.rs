//! Per-file pattern extraction

use regex::Regex;
use serde::Serialize;

/// Everything extracted from one source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanEntry {
    pub path: String,
    /// Explicit registrations, in file order (may repeat)
    pub tokens: Vec<String>,
    /// Declared class/struct names, diagnostics only
    pub symbol_names: Vec<String>,
    /// Candidate name derived from the file name, never a registration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heuristic_name: Option<String>,
}

impl ScanEntry {
    pub fn has_registrations(&self) -> bool {
        !self.tokens.is_empty()
    }
}

/// Compiled extraction patterns
#[derive(Debug, Clone)]
pub struct Patterns {
    pub token: Regex,
    pub symbol: Regex,
    pub heuristic: Regex,
}

impl Patterns {
    /// Extract tokens, symbols, and the filename hint for one file
    pub fn extract(&self, path: String, file_name: &str, text: &str) -> ScanEntry {
        ScanEntry {
            path,
            tokens: first_captures(&self.token, text),
            symbol_names: dedup_in_order(first_captures(&self.symbol, text)),
            heuristic_name: self
                .heuristic
                .captures(file_name)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string()),
        }
    }
}

fn first_captures(pattern: &Regex, text: &str) -> Vec<String> {
    pattern
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

fn dedup_in_order(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items.into_iter().filter(|s| seen.insert(s.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_HEURISTIC_PATTERN, DEFAULT_SYMBOL_PATTERN, DEFAULT_TOKEN_PATTERN};

    fn patterns() -> Patterns {
        Patterns {
            token: Regex::new(DEFAULT_TOKEN_PATTERN).unwrap(),
            symbol: Regex::new(DEFAULT_SYMBOL_PATTERN).unwrap(),
            heuristic: Regex::new(DEFAULT_HEURISTIC_PATTERN).unwrap(),
        }
    }

    const OSCILLOSCOPE: &str = r#"
#include "avs/effects/render/effect_oscilloscope_star.h"

namespace avs::effects::render {

class EffectOscilloscopeStar;
struct StarState { int arms; };

AVS_EFFECT_TOKEN("Render / Oscilloscope Star");
REGISTER_AVS_EFFECT(EffectOscilloscopeStar, "Render / Oscilloscope Star");

}
"#;

    #[test]
    fn test_extract_registration() {
        let entry = patterns().extract(
            "src/render/effect_oscilloscope_star.cpp".to_string(),
            "effect_oscilloscope_star.cpp",
            OSCILLOSCOPE,
        );
        assert_eq!(entry.tokens, vec!["Render / Oscilloscope Star".to_string()]);
        assert_eq!(
            entry.symbol_names,
            vec!["EffectOscilloscopeStar".to_string(), "StarState".to_string()]
        );
        assert_eq!(entry.heuristic_name.as_deref(), Some("oscilloscope_star"));
    }

    #[test]
    fn test_marker_token_alone_is_not_a_registration() {
        let entry = patterns().extract(
            "src/misc/comment.cpp".to_string(),
            "comment.cpp",
            "AVS_EFFECT_TOKEN(\"Misc / Comment\");\n",
        );
        assert!(entry.tokens.is_empty());
        assert!(!entry.has_registrations());
        assert!(entry.heuristic_name.is_none());
    }

    #[test]
    fn test_multiple_registrations_and_whitespace() {
        let text = "REGISTER_AVS_EFFECT( Blur , \"Trans / Blur\" );\nREGISTER_AVS_EFFECT(ns::Glow,\n    \"glow\");\n";
        let entry = patterns().extract("src/effects_trans.cpp".to_string(), "effects_trans.cpp", text);
        assert_eq!(entry.tokens, vec!["Trans / Blur".to_string(), "glow".to_string()]);
    }
}
