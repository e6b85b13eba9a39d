use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use maintlog_converter::app::ConvertUseCase;
use maintlog_converter::config::ConversionConfig;
use maintlog_converter::domain::Severity;
use maintlog_converter::infra::FileConversionOutputAdapter;
use maintlog_converter::logging;
use maintlog_converter::pipeline::ingestion::read_csv_table;
use maintlog_converter::pipeline::processing::column_map::ColumnMapper;
use maintlog_converter::pipeline::processing::convert::{ConversionOutcome, LegacyConverter};
use maintlog_converter::report;

#[derive(Parser)]
#[command(name = "maintlog_converter")]
#[command(about = "Legacy maintenance-log conversion and data-quality pipeline")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a legacy CSV sheet into normalized records plus anomalies
    Convert {
        /// Path to the legacy CSV file
        #[arg(long)]
        input: PathBuf,
        /// Directory for records.ndjson / anomalies.ndjson output
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Write a Markdown conversion report to this path
        #[arg(long)]
        report: Option<PathBuf>,
        /// TOML config with thresholds and synonym overrides
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Show how the sheet's headers map onto canonical fields, without
    /// converting any rows
    Mapping {
        /// Path to the legacy CSV file
        #[arg(long)]
        input: PathBuf,
        /// TOML config with thresholds and synonym overrides
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn print_summary(source: &str, outcome: &ConversionOutcome) {
    println!("\n📊 Conversion Results for {}:", source);
    println!("   Records: {}", outcome.records.len());
    println!(
        "   Fields mapped: {} of {}",
        outcome.mapped_count,
        outcome.column_mapping.fields.len()
    );
    println!("   Anomalies: {}", outcome.issue_count);

    let high: Vec<_> = outcome
        .anomalies
        .iter()
        .filter(|a| a.severity == Severity::High)
        .collect();
    if !high.is_empty() {
        println!("\n⚠️  High-severity anomalies:");
        for anomaly in high {
            match anomaly.row {
                Some(row) => println!("   - row {}: {}", row, anomaly.description),
                None => println!("   - document: {}", anomaly.description),
            }
        }
    }
}

async fn run_convert(
    input: PathBuf,
    output_dir: Option<PathBuf>,
    report_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConversionConfig::load_or_default(config_path.as_deref())?;
    let table = read_csv_table(&input)?;
    let source = input.display().to_string();

    let outcome = match output_dir {
        Some(dir) => {
            let adapter = Box::new(FileConversionOutputAdapter::new(&dir)?);
            let use_case = ConvertUseCase::new(LegacyConverter::new(&config), adapter);
            use_case.convert_table(&source, &table).await?
        }
        None => LegacyConverter::new(&config).convert(&table)?,
    };

    print_summary(&source, &outcome);

    if let Some(path) = report_path {
        let markdown = report::render_markdown(&source, Utc::now(), &outcome);
        std::fs::write(&path, markdown)?;
        info!("report written to {}", path.display());
        println!("   Report: {}", path.display());
    }

    Ok(())
}

fn run_mapping(
    input: PathBuf,
    config_path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConversionConfig::load_or_default(config_path.as_deref())?;
    let table = read_csv_table(&input)?;

    let mapper = ColumnMapper::new(config.vocabulary(), config.match_threshold);
    let mapping = mapper.map_columns(&table.headers);

    println!("\n🗂  Column mapping for {}:", input.display());
    for field_mapping in &mapping.fields {
        match &field_mapping.matched {
            Some(matched) => println!(
                "   ✓ {:<14} <- '{}' (score {:.2})",
                field_mapping.field.as_str(),
                matched.header,
                matched.score
            ),
            None => println!("   - {:<14} unmapped", field_mapping.field.as_str()),
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    logging::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            input,
            output_dir,
            report,
            config,
        } => {
            println!("🔄 Converting legacy sheet...");
            if let Err(e) = run_convert(input, output_dir, report, config).await {
                error!("Conversion failed: {}", e);
                eprintln!("❌ Conversion failed: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Mapping { input, config } => {
            if let Err(e) = run_mapping(input, config) {
                error!("Mapping failed: {}", e);
                eprintln!("❌ Mapping failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
