//! Structured (YAML) manifest parser
//!
//! Reads the document as a generic [`serde_yaml::Value`] tree rather than a
//! typed struct, so that field-level problems reach the shared validation pass
//! instead of surfacing as deserializer errors the line parser could never
//! reproduce.

use serde_yaml::Value;

use super::parser::{ManifestParser, ENTRIES_KEY};
use super::types::{RawEntry, RawModes, RawValue};

#[derive(Debug, Clone, Copy, Default)]
pub struct YamlParser;

impl ManifestParser for YamlParser {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn parse(&self, text: &str) -> Result<Vec<RawEntry>, String> {
        let doc: Value = serde_yaml::from_str(text).map_err(|e| format!("Failed to parse YAML: {}", e))?;

        let Value::Mapping(root) = doc else {
            return Err("manifest root must be a mapping".to_string());
        };

        let entries = match root.get(ENTRIES_KEY) {
            Some(Value::Sequence(items)) => items,
            // `entries:` with nothing under it
            Some(Value::Null) => return Ok(Vec::new()),
            Some(_) => return Err(format!("`{}` must be a list", ENTRIES_KEY)),
            None => return Err(format!("missing top-level `{}` list", ENTRIES_KEY)),
        };

        entries
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                let Value::Mapping(fields) = item else {
                    return Err(format!("manifest entry {} must be a mapping", idx + 1));
                };

                Ok(RawEntry {
                    token: fields.get("token").map(raw_value),
                    kind: fields.get("kind").map(raw_value),
                    modes: match fields.get("modes") {
                        None | Some(Value::Null) => RawModes::Absent,
                        Some(Value::Sequence(items)) => items
                            .iter()
                            .map(|item| match item {
                                Value::String(mode) => Some(mode.clone()),
                                _ => None,
                            })
                            .collect::<Option<Vec<_>>>()
                            .map(RawModes::List)
                            .unwrap_or(RawModes::Invalid),
                        Some(_) => RawModes::Invalid,
                    },
                })
            })
            .collect()
    }
}

/// Only YAML strings are strings; numbers and bools are not coerced
fn raw_value(value: &Value) -> RawValue {
    match value {
        Value::String(s) => RawValue::Str(s.clone()),
        Value::Null => RawValue::Other("null"),
        Value::Bool(_) => RawValue::Other("boolean"),
        Value::Number(_) => RawValue::Other("number"),
        Value::Sequence(_) => RawValue::Other("sequence"),
        Value::Mapping(_) => RawValue::Other("mapping"),
        Value::Tagged(_) => RawValue::Other("tagged value"),
    }
}
