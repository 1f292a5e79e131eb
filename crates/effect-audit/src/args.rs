use clap::{Parser, ValueEnum};
use effect_audit_core::{AuditConfig, ParserChoice};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "effect-audit",
    version,
    about = "Audit the effect registry against the effects manifest"
)]
pub struct Args {
    #[arg(long, help = "Path to the effects manifest (default: docs/effects_manifest.yaml)")]
    pub manifest: Option<PathBuf>,

    #[arg(long = "source-root", value_name = "DIR", help = "Source root to scan (repeatable)")]
    pub source_roots: Vec<PathBuf>,

    #[arg(long, default_value = ".", help = "Repository root that relative paths resolve against")]
    pub repo_root: PathBuf,

    #[arg(long, help = "Config file (default: effect-audit.json in the repository root, if present)")]
    pub config: Option<PathBuf>,

    #[arg(long, value_name = "PATH", help = "Write a JSON snapshot of tokens and manifest entries")]
    pub out: Option<PathBuf>,

    #[arg(long, value_name = "PATH", help = "Write the report to a file instead of stdout")]
    pub report: Option<PathBuf>,

    #[arg(long, help = "CI strictness: duplicate registrations fail the audit")]
    pub ci: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    #[arg(long, value_enum, default_value_t = ParserArg::Auto, help = "Manifest parser")]
    pub parser: ParserArg,

    #[arg(long, help = "Include every scanned file in the report")]
    pub scan_details: bool,

    #[arg(short, long, action = clap::ArgAction::Count, help = "Increase log verbosity")]
    pub verbose: u8,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ParserArg {
    Auto,
    Structured,
    Line,
}

impl From<ParserArg> for ParserChoice {
    fn from(arg: ParserArg) -> Self {
        match arg {
            ParserArg::Auto => ParserChoice::Auto,
            ParserArg::Structured => ParserChoice::Structured,
            ParserArg::Line => ParserChoice::Line,
        }
    }
}

impl Args {
    /// Command-line flags win over the config file
    pub fn apply(&self, config: &mut AuditConfig) {
        if let Some(manifest) = &self.manifest {
            config.manifest = manifest.clone();
        }
        if !self.source_roots.is_empty() {
            config.source_roots = self.source_roots.clone();
        }
        if self.ci {
            config.strict_duplicates = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "effect-audit",
            "--manifest",
            "m.yaml",
            "--source-root",
            "a",
            "--source-root",
            "b",
            "--ci",
        ]);
        let mut config = AuditConfig::default();
        args.apply(&mut config);

        assert_eq!(config.manifest, PathBuf::from("m.yaml"));
        assert_eq!(config.source_roots, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert!(config.strict_duplicates);
    }

    #[test]
    fn test_defaults_leave_config_alone() {
        let args = Args::parse_from(["effect-audit"]);
        let mut config = AuditConfig::default();
        args.apply(&mut config);
        assert_eq!(config, AuditConfig::default());
        assert!(matches!(args.format, OutputFormat::Json));
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
