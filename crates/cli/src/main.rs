use anyhow::Result;
use clap::Parser;
use console::{Term, style};
use slackforge_core::{Config, Orchestrator, PackageReport, PackageStatus, RunReport};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// slackforge - build Slackware packages from upstream sources
#[derive(Parser)]
#[command(name = "slackforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the package configuration file
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Build only the named package instead of all configured ones
    #[arg(long)]
    package: Option<String>,

    /// Output directory for built packages (default: ./build)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Working directory for clones and staging trees (default: ./tmp)
    #[arg(long)]
    temp: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .without_time()
        .init();

    let cli = Cli::parse();
    let term = Term::stderr();

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            term.write_line(&format!("{} {}", style("error:").red().bold(), e))?;
            std::process::exit(1);
        }
    };

    // Explicit flags win over the config file; the config wins over the
    // built-in defaults.
    let output_root = cli
        .output
        .or_else(|| config.output_path.clone())
        .unwrap_or_else(|| PathBuf::from("./build"));
    let temp_root = cli
        .temp
        .or_else(|| config.temp_path.clone())
        .unwrap_or_else(|| PathBuf::from("./tmp"));

    term.write_line(&format!(
        "{} Loaded {} package(s) from {}",
        style("::").cyan().bold(),
        config.packages.len(),
        cli.config.display()
    ))?;

    let orchestrator = Orchestrator::new(config, output_root, temp_root);

    let report = match &cli.package {
        Some(name) => match orchestrator.run_one(name) {
            Ok(report) => RunReport {
                reports: vec![report],
            },
            Err(e) => {
                term.write_line(&format!("{} {}", style("error:").red().bold(), e))?;
                std::process::exit(1);
            }
        },
        None => orchestrator.run_all(),
    };

    term.write_line("")?;
    for pkg_report in &report.reports {
        print_report(&term, pkg_report)?;
    }

    term.write_line("")?;
    term.write_line(&format!(
        "{} {} built, {} skipped, {} failed; packages in {}",
        style("::").cyan().bold(),
        report.succeeded_count(),
        report.skipped_count(),
        report.failed_count(),
        orchestrator.repo_root().display()
    ))?;

    // Any package failure makes the whole invocation fail, in both batch
    // and single-package mode.
    if !report.is_success() {
        std::process::exit(1);
    }

    Ok(())
}

fn print_report(term: &Term, report: &PackageReport) -> Result<()> {
    let symbol = match &report.status {
        PackageStatus::Built { .. } | PackageStatus::Downloaded { .. } => style("+").green().bold(),
        PackageStatus::Skipped => style("-").dim(),
        PackageStatus::Failed { .. } => style("x").red().bold(),
    };

    term.write_line(&format!(
        "  {} {} {}",
        symbol,
        report.name,
        style(format!("({})", report.description())).dim()
    ))?;

    Ok(())
}
