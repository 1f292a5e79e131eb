mod args;

use std::io::Write;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use effect_audit_core::{audit, AuditConfig, AuditError, AuditRequest};
use tracing::info;
use tracing_subscriber::EnvFilter;

use args::{Args, OutputFormat};

/// Exit status for fatal setup failures
const SETUP_FAILURE: u8 = 2;

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            let code = err
                .downcast_ref::<AuditError>()
                .map(|e| e.exit_code().code() as u8)
                .unwrap_or(SETUP_FAILURE);
            eprintln!("effect-audit: {:#}", err);
            ExitCode::from(code)
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(args: &Args) -> anyhow::Result<u8> {
    let mut config = AuditConfig::discover(&args.repo_root, args.config.as_deref())?;
    args.apply(&mut config);

    let mut request = AuditRequest::new(&args.repo_root, config);
    request.parser = args.parser.into();
    request.scan_details = args.scan_details;

    let run = audit(&request)?;

    let rendered = match args.format {
        OutputFormat::Json => run.render_json()?,
        OutputFormat::Text => run.render_text(),
    };

    if let Some(path) = &args.out {
        run.write_snapshot(path)
            .with_context(|| format!("failed to write snapshot to {}", path.display()))?;
    }

    match &args.report {
        Some(path) => {
            effect_audit_core::report::write_report(path, &rendered)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            if !rendered.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
            stdout.flush()?;
        }
    }

    info!(
        "{} missing, {} extra, {} duplicated",
        run.report.missing_tokens.len(),
        run.report.extra_tokens.len(),
        run.report.duplicate_tokens.len()
    );
    Ok(run.decision.exit_code().code() as u8)
}
