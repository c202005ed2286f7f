use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use autotran_core::{BatchReport, Config};
use autotran_engine::{BatchRunner, DirectorySink, DirectorySource, TemplateSet};

/// Autotran - rewrite AUTONOMOUS_TRANSACTION routines for PostgreSQL
#[derive(Parser)]
#[command(name = "autotran")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory with the scripts to convert
    #[arg(long = "input_path", alias = "input-path", value_name = "DIR")]
    input_path: PathBuf,

    /// Directory the converted scripts are written to
    #[arg(long = "output_path", alias = "output-path", value_name = "DIR")]
    output_path: PathBuf,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stdout))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let cwd = std::env::current_dir().context("Failed to determine the working directory")?;
    let config = Config::discover(&cwd).context("Failed to load autotran.toml")?;

    let templates = TemplateSet::load(&config).context("Failed to load caller templates")?;

    let source = DirectorySource::new(&cli.input_path, config.selection.clone());
    let mut sink = DirectorySink::create(&cli.output_path)
        .with_context(|| format!("Failed to prepare output directory {}", cli.output_path.display()))?;

    tracing::info!(
        input = %source.root().display(),
        output = %sink.root().display(),
        "converting scripts"
    );

    let report = BatchRunner::new(&templates)
        .run(&source, &mut sink)
        .with_context(|| format!("Failed to scan input directory {}", cli.input_path.display()))?;

    print_summary(&report);

    match report.to_json() {
        Ok(json) => tracing::debug!(report = %json, "run report"),
        Err(e) => tracing::warn!("Could not serialize run report: {}", e),
    }

    Ok(())
}

fn print_summary(report: &BatchReport) {
    let summary = &report.summary;

    println!();
    println!("{}", "Conversion summary".bold());
    println!("  {} {}", "SQL files:".cyan(), summary.sql_files);
    println!("  {} {}", "Selected:".cyan(), summary.selected);
    println!("  {} {}", "Converted:".cyan(), summary.converted.to_string().green());

    if summary.unreadable > 0 {
        println!("  {} {}", "Unreadable:".cyan(), summary.unreadable.to_string().red());
    }

    let warnings: Vec<_> = report.warnings().collect();
    if !warnings.is_empty() {
        println!("  {} {}", "Warnings:".cyan(), warnings.len().to_string().yellow());
        for diagnostic in warnings {
            println!("    {}", diagnostic.to_string().yellow());
        }
    }

    if summary.failed > 0 || summary.unreadable > 0 {
        println!("  {} {}", "Failed:".cyan(), summary.failed.to_string().red());
        for diagnostic in report.errors() {
            println!("    {}", diagnostic.to_string().red());
        }
    } else {
        println!("  {}", "✓ No failures".green());
    }
}
