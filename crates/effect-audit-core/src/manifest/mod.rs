//! Manifest System
//!
//! Loads and validates the declared effect catalog.

pub mod line;
pub mod loader;
pub mod parser;
#[cfg(feature = "yaml")]
pub mod structured;
pub mod types;

pub use line::LineParser;
pub use loader::{load, load_with, parse_manifest};
pub use parser::{
    default_parser, select_parser, validate_entries, ManifestParser, ParserChoice,
};
#[cfg(feature = "yaml")]
pub use structured::YamlParser;
pub use types::{EffectKind, Manifest, ManifestEntry, RawEntry, RawModes, RawValue};
