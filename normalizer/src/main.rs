//! ons-normalize CLI - Normalize exported ONS CSV files
//!
//! # Commands
//!
//! ```bash
//! ons-normalize datasets                              # List known datasets
//! ons-normalize spec population                       # Show a dataset's spec as JSON
//! ons-normalize normalize crime --dir data/csv        # Normalize one dataset
//! ons-normalize normalize wellbeing --wide -e latin1  # Wide wellbeing, forced encoding
//! ons-normalize all --dir data/csv --out-dir out      # Normalize every dataset
//! ons-normalize parse data/csv/rental.csv             # Dump a raw CSV as JSON
//! ```
//!
//! `--dir` defaults to `ONS_CSV_DIR`, which may also be set in a `.env` file.

use clap::{Parser, Subcommand, ValueEnum};
use ons_normalizer::{
    detect_delimiter, load_file, parse_wellbeing_for_period, parse_wellbeing_wide, Config,
    ConfigError, Dataset, ReadOptions, Table,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "ons-normalize")]
#[command(about = "Normalize ONS local-authority statistics into joinable tables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the supported datasets and their input files
    Datasets,

    /// Print a dataset's normalization spec as JSON
    Spec {
        /// Dataset name (see `datasets`)
        dataset: Dataset,
    },

    /// Parse a raw CSV file and output JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Lines to skip before the header row
        #[arg(long, default_value = "0")]
        skip_rows: usize,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Normalize one dataset
    Normalize {
        /// Dataset name (see `datasets`)
        dataset: Dataset,

        /// Directory holding the CSV files (default: $ONS_CSV_DIR)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Wellbeing only: one row per authority, one column per measure
        #[arg(long)]
        wide: bool,

        /// Wellbeing only: keep a single reporting period, e.g. 2020-21
        #[arg(long)]
        period: Option<String>,

        /// Input encoding (auto-detect if not specified)
        #[arg(short, long)]
        encoding: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Normalize every dataset into an output directory
    All {
        /// Directory holding the CSV files (default: $ONS_CSV_DIR)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Directory for the normalized files
        #[arg(long)]
        out_dir: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Input encoding (auto-detect if not specified)
        #[arg(short, long)]
        encoding: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Datasets => cmd_datasets(),

        Commands::Spec { dataset } => cmd_spec(dataset),

        Commands::Parse {
            input,
            delimiter,
            skip_rows,
            output,
        } => cmd_parse(&input, delimiter, skip_rows, output.as_deref()),

        Commands::Normalize {
            dataset,
            dir,
            format,
            wide,
            period,
            encoding,
            output,
        } => cmd_normalize(
            dataset,
            dir.as_deref(),
            format,
            wide,
            period.as_deref(),
            encoding,
            output.as_deref(),
        ),

        Commands::All {
            dir,
            out_dir,
            format,
            encoding,
        } => cmd_all(dir.as_deref(), &out_dir, format, encoding),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_datasets() -> Result<(), Box<dyn std::error::Error>> {
    for dataset in Dataset::ALL {
        println!("{:<16} {}", dataset.name(), dataset.file_name());
    }
    Ok(())
}

fn cmd_spec(dataset: Dataset) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(&dataset.spec())?;
    println!("{}", json);
    Ok(())
}

fn cmd_parse(
    input: &Path,
    delimiter: Option<char>,
    skip_rows: usize,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Parsing CSV: {}", input.display());

    let delimiter = match delimiter {
        Some(c) if c.is_ascii() => c as u8,
        Some(c) => {
            return Err(format!("Delimiter must be a single ASCII character, got '{}'", c).into())
        }
        None => {
            let head = fs::read(input)?;
            detect_delimiter(&String::from_utf8_lossy(&head))
        }
    };
    let options = ReadOptions::default()
        .with_delimiter(delimiter)
        .with_skip_rows(skip_rows);

    let result = load_file(input, &options)?;
    eprintln!("   Encoding: {}", result.encoding);
    eprintln!("   Delimiter: '{}'", format_delimiter(result.delimiter));
    eprintln!("   Columns: {}", result.table.columns().join(" | "));
    eprintln!("Parsed {} records", result.table.len());

    write_table(&result.table, OutputFormat::Json, output)
}

fn cmd_normalize(
    dataset: Dataset,
    dir: Option<&Path>,
    format: OutputFormat,
    wide: bool,
    period: Option<&str>,
    encoding: Option<String>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(dir, encoding)?;

    if (wide || period.is_some()) && dataset != Dataset::Wellbeing {
        return Err("--wide and --period only apply to the wellbeing dataset".into());
    }

    let table = match (dataset, wide, period) {
        (Dataset::Wellbeing, true, period) => {
            parse_wellbeing_wide(&config.csv_dir, period, &config.read_options)?
        }
        (Dataset::Wellbeing, false, Some(period)) => {
            parse_wellbeing_for_period(&config.csv_dir, period, &config.read_options)?
        }
        (dataset, _, _) => dataset.normalize_with(&config.csv_dir, &config.read_options)?,
    };

    write_table(&table, format, output)
}

fn cmd_all(
    dir: Option<&Path>,
    out_dir: &Path,
    format: OutputFormat,
    encoding: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(dir, encoding)?;
    fs::create_dir_all(out_dir)?;

    for dataset in Dataset::ALL {
        let table = dataset.normalize_with(&config.csv_dir, &config.read_options)?;
        let path = out_dir.join(format!("{}.{}", dataset.name(), format.extension()));
        write_table(&table, format, Some(path.as_path()))?;
    }

    eprintln!("Done!");
    Ok(())
}

fn resolve_config(dir: Option<&Path>, encoding: Option<String>) -> Result<Config, ConfigError> {
    let config = Config::resolve(dir)?;
    Ok(match encoding {
        Some(encoding) => config.with_read_options(ReadOptions::default().with_encoding(encoding)),
        None => config,
    })
}

fn format_delimiter(d: u8) -> String {
    match d {
        b'\t' => "\\t".to_string(),
        c => (c as char).to_string(),
    }
}

fn write_table(
    table: &Table,
    format: OutputFormat,
    path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = match format {
        OutputFormat::Json => serde_json::to_string_pretty(table)?,
        OutputFormat::Csv => {
            let mut buf = Vec::new();
            table.write_csv(&mut buf)?;
            String::from_utf8(buf)?
        }
    };
    write_output(&content, path)
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
