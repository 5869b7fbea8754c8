//! Retail-ETL CLI
//!
//! Runs the retail sales ETL pipeline once and writes the HTML report.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use retail_etl::{Pipeline, PipelineConfig, Reporter};

#[derive(Parser)]
#[command(name = "retail-etl")]
#[command(about = "Clean, transform and report on retail sales data", long_about = None)]
struct Cli {
    /// Path to a JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the raw input dataset (.csv or .parquet)
    #[arg(long, global = true, env = "RETAIL_ETL_INPUT")]
    input: Option<PathBuf>,

    /// Override the cleaned snapshot path (.parquet)
    #[arg(long, global = true)]
    cleaned: Option<PathBuf>,

    /// Override the transformed output path (.parquet)
    #[arg(long, global = true)]
    transformed: Option<PathBuf>,

    /// Override the HTML report path
    #[arg(long, global = true)]
    report: Option<PathBuf>,

    /// Also write INFO-level logs to this file
    #[arg(long, global = true, env = "RETAIL_ETL_LOG_FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline and write the report (default if no command specified)
    Run,

    /// Validate configuration
    Validate,

    /// Generate a configuration file with the default paths
    GenerateConfig {
        /// Output path for configuration file
        #[arg(short, long, default_value = "pipeline.json")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    match cli.command {
        None | Some(Commands::Run) => {
            let config = resolve_config(&cli)?;
            run_command(&config)?;
        }

        Some(Commands::Validate) => {
            let config = resolve_config(&cli)?;
            tracing::info!("Configuration is valid");
            println!("{}", config.to_json()?);
        }

        Some(Commands::GenerateConfig { output }) => {
            generate_config_command(&output)?;
        }
    }

    Ok(())
}

/// Console filter: `RUST_LOG` directives when set, INFO otherwise.
fn console_filter(directives: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(directives.unwrap_or_default())
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let console = fmt::layer().with_filter(console_filter(rust_log.as_deref()));

    let file = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = File::options()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(LevelFilter::INFO),
            )
        }
        None => None,
    };

    tracing_subscriber::registry().with(console).with(file).init();
    Ok(())
}

fn resolve_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    // Apply overrides
    if let Some(path) = &cli.input {
        config.input_path = path.clone();
    }
    if let Some(path) = &cli.cleaned {
        config.cleaned_path = path.clone();
    }
    if let Some(path) = &cli.transformed {
        config.transformed_path = path.clone();
    }
    if let Some(path) = &cli.report {
        config.report_path = path.clone();
    }

    config.validate()?;
    Ok(config)
}

fn run_command(config: &PipelineConfig) -> Result<()> {
    let mut pipeline = Pipeline::new(config);
    let summary = pipeline.run();
    tracing::debug!(summary = %serde_json::to_string(&summary)?, "Run summary");

    let snapshot = pipeline.metrics().snapshot();
    snapshot.log_summary();

    let artifacts = Reporter::new(&config.report_path).generate(&snapshot);
    for warning in &artifacts.warnings {
        tracing::warn!("Report incomplete: {warning}");
    }

    match summary.halted_at {
        None => Ok(()),
        Some(stage) => anyhow::bail!("Pipeline aborted at stage '{stage}'"),
    }
}

fn generate_config_command(output: &Path) -> Result<()> {
    let json = PipelineConfig::default().to_json()?;
    std::fs::write(output, json)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    tracing::info!("Wrote default configuration to {}", output.display());
    Ok(())
}
