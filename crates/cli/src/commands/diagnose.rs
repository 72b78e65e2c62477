//! The diagnose command: load a configuration dump, run the engine,
//! render the report.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use colored::*;
use edgescope_diagnostics::{
    DiagnosticEngine, FileConfigSource, ReportFormat, Severity, SymptomParams,
};
use std::fs;
use std::path::PathBuf;

#[derive(Args)]
pub struct DiagnoseArgs {
    /// Distribution identifier to diagnose
    #[arg(short, long)]
    pub distribution_id: String,

    /// JSON configuration dump exported from the control plane
    #[arg(short, long)]
    pub config_dump: PathBuf,

    /// HTTP error code the viewer is seeing (403, 404, 5xx)
    #[arg(short, long)]
    pub error_code: Option<String>,

    /// Request path that produced the error
    #[arg(long)]
    pub request_path: Option<String>,

    /// Request domain that produced the error
    #[arg(long)]
    pub request_domain: Option<String>,

    /// Run live origin reachability probes
    #[arg(long)]
    pub active_validation: bool,

    /// Skip proactive recommendations
    #[arg(long)]
    pub no_proactive: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Console)]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum OutputFormat {
    Console,
    Markdown,
    Json,
}

pub async fn execute(args: DiagnoseArgs) -> Result<()> {
    let source = FileConfigSource::load(&args.config_dump).with_context(|| {
        format!(
            "failed to load configuration dump {}",
            args.config_dump.display()
        )
    })?;

    let mut params = SymptomParams::new(&args.distribution_id)
        .with_active_validation(args.active_validation)
        .with_proactive_checks(!args.no_proactive);
    if let Some(code) = args.error_code {
        params = params.with_error_code(code);
    }
    if let Some(path) = args.request_path {
        params = params.with_request_path(path);
    }
    if let Some(domain) = args.request_domain {
        params = params.with_request_domain(domain);
    }

    if args.format == OutputFormat::Console {
        println!(
            "{}",
            format!("Diagnosing distribution {}", args.distribution_id)
                .bright_blue()
                .bold()
        );
    }

    let engine = DiagnosticEngine::new();
    let report = engine.run(&source, &params).await?;

    let rendered = match args.format {
        OutputFormat::Console => report.render(ReportFormat::Text)?,
        OutputFormat::Markdown => report.render(ReportFormat::Markdown)?,
        OutputFormat::Json => report.render(ReportFormat::Json)?,
    };

    match args.output {
        Some(path) => {
            fs::write(&path, rendered)?;
            println!("Report written to {}", path.display());
        }
        None => println!("{rendered}"),
    }

    if args.format == OutputFormat::Console {
        let count = report.count_by_severity();
        let summary = format!(
            "{} critical, {} high, {} medium, {} low",
            count.critical, count.high, count.medium, count.low
        );
        if report.findings().any(|f| f.severity >= Severity::High) {
            println!("{} {}", "Issues found:".bright_red().bold(), summary);
        } else if !report.is_clean() {
            println!("{} {}", "Issues found:".yellow().bold(), summary);
        } else {
            println!("{}", "No issues found".bright_green().bold());
        }
    }

    Ok(())
}
