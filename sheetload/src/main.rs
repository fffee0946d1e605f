use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use sheetimport::{Dataset, ImportConfig, ImportOptions, Importer, SheetSelector};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod formatter;

#[derive(Parser)]
#[command(name = "sheetload")]
#[command(about = "Import an xlsx worksheet as a statistical dataset", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// More diagnostics on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the worksheets of a workbook
    Sheets {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Import one worksheet and print the dataset
    Import(ImportArgs),
}

#[derive(Args)]
struct ImportArgs {
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Sheet name or 1-based position (default: first sheet with data)
    #[arg(short, long, value_name = "SHEET")]
    sheet: Option<String>,

    /// Columns to skip on the left
    #[arg(long, default_value_t = 0)]
    xoffset: u32,

    /// Rows to skip on top
    #[arg(long, default_value_t = 0)]
    yoffset: u32,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    format: OutputFormat,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Colored table
    Table,
    /// Comma-separated values
    Csv,
    /// JSON document
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    let importer = Importer::new(config);

    match cli.command {
        Command::Sheets { file } => {
            let sheets = importer
                .list_sheets(&file)
                .with_context(|| format!("Failed to read workbook: {}", file.display()))?;
            formatter::print_sheets(&file, &sheets);
        }
        Command::Import(args) => {
            let options = ImportOptions {
                sheet: args.sheet.as_deref().map(SheetSelector::parse),
                xoffset: args.xoffset,
                yoffset: args.yoffset,
                ..Default::default()
            };
            let mut dataset = Dataset::empty();
            let outcome = importer
                .import(&args.file, &options, &mut dataset)
                .with_context(|| format!("Failed to import: {}", args.file.display()))?;

            match args.format {
                OutputFormat::Table => formatter::print_table(&dataset, &outcome),
                OutputFormat::Csv => formatter::print_csv(&dataset)?,
                OutputFormat::Json => formatter::print_json(&dataset, &outcome)?,
            }
        }
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ImportConfig> {
    if let Some(config_path) = path {
        return ImportConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()));
    }
    // Fall back to a config in the current directory if there is one
    let default_config_path = PathBuf::from("sheetimport.toml");
    if default_config_path.exists() {
        ImportConfig::from_file(&default_config_path).with_context(|| {
            format!(
                "Failed to load config from {}",
                default_config_path.display()
            )
        })
    } else {
        Ok(ImportConfig::default())
    }
}
