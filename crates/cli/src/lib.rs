use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use takeoff_core::{
    scan, ExportFormat, Extractor, ExtractorConfig, LengthUnit, Measurement, OcrConfig,
    SourceStatus,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "takeoff")]
#[command(about = "Measurement takeoff from construction drawings")]
pub struct Cli {
    /// Log debug output to stderr unless RUST_LOG is set.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract measurements from PDFs, images and text files.
    Extract {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
        /// Drawing scale, e.g. 0.01 for 1:100.
        #[arg(long)]
        scale: Option<f64>,
        /// Read the drawing scale from the first file when --scale is not given.
        #[arg(long)]
        detect_scale: bool,
        /// Write the ledger as JSON.
        #[arg(long, value_name = "PATH")]
        json: Option<PathBuf>,
        /// Write the ledger as CSV.
        #[arg(long, value_name = "PATH")]
        csv: Option<PathBuf>,
        /// Tesseract languages for image files.
        #[arg(long, value_name = "LANGS")]
        ocr_lang: Option<String>,
    },
    /// Print the measurements found in a piece of text as JSON.
    Scan {
        #[arg(value_name = "TEXT")]
        text: String,
    },
    /// Print the area of a rectangle as JSON.
    Area(DimensionArgs),
    /// Print the perimeter of a rectangle as JSON.
    Perimeter(DimensionArgs),
    /// Print which optional sources are available.
    Capabilities,
    /// Print CLI version.
    Version,
}

#[derive(Debug, Args)]
struct DimensionArgs {
    #[arg(long)]
    width: f64,
    #[arg(long)]
    height: f64,
    /// Unit of width and height: mm, cm or m.
    #[arg(long, default_value = "mm")]
    unit: LengthUnit,
    #[arg(long, default_value = "")]
    label: String,
    #[arg(long, default_value_t = 1.0)]
    scale: f64,
}

#[derive(Debug, Serialize)]
struct ScanOutput<'a> {
    text: &'a str,
    measurements: Vec<Measurement>,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Extract { files, scale, detect_scale, json, csv, ocr_lang } => {
            let mut ocr = OcrConfig::default();
            if let Some(language) = ocr_lang {
                ocr = ocr.with_language(language);
            }
            let config = ExtractorConfig::new().with_scale(scale.unwrap_or(1.0)).with_ocr(ocr);
            let detect_scale = detect_scale && scale.is_none();

            run_extract(&files, config, detect_scale, json.as_deref(), csv.as_deref())
        }
        Commands::Scan { text } => {
            let measurements: Vec<Measurement> = scan(&text).into_iter().collect();
            print_json(&ScanOutput { text: &text, measurements })
        }
        Commands::Area(args) => {
            let mut extractor = Extractor::new(ExtractorConfig::new().with_scale(args.scale));
            let measurement =
                extractor.record_area(args.width, args.height, args.unit, &args.label);
            print_json(&measurement)
        }
        Commands::Perimeter(args) => {
            let mut extractor = Extractor::new(ExtractorConfig::new().with_scale(args.scale));
            let measurement =
                extractor.record_perimeter(args.width, args.height, args.unit, &args.label);
            print_json(&measurement)
        }
        Commands::Capabilities => {
            let extractor = Extractor::with_default_sources(ExtractorConfig::default());
            print_json(&extractor.capabilities())
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    // A subscriber may already be installed when `run` is called more than once.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_extract(
    files: &[PathBuf],
    config: ExtractorConfig,
    detect_scale: bool,
    json: Option<&Path>,
    csv: Option<&Path>,
) -> Result<()> {
    let mut extractor = Extractor::with_default_sources(config);

    if detect_scale {
        if let Some(first) = files.first() {
            match extractor.detect_scale(first) {
                Ok(Some(detected)) => {
                    tracing::info!(
                        denominator = detected.denominator,
                        text = %detected.source_text,
                        "detected drawing scale"
                    );
                    extractor.set_scale(detected.factor());
                }
                Ok(None) => tracing::warn!(path = %first.display(), "no drawing scale found"),
                Err(err) => {
                    tracing::warn!(path = %first.display(), error = %err, "scale detection skipped")
                }
            }
        }
    }

    let mut missing = Vec::new();
    for file in files {
        let report = extractor.extract_from_path(file);
        eprintln!("{}", report.summary_line());
        if report.status == SourceStatus::NotFound {
            missing.push(file.display().to_string());
        }
    }

    let ledger = extractor.ledger();
    print!("{}", ledger.report());

    if let Some(path) = json {
        ledger
            .export(ExportFormat::Json, path)
            .with_context(|| format!("failed to write JSON to {}", path.display()))?;
    }

    if let Some(path) = csv {
        ledger
            .export(ExportFormat::Csv, path)
            .with_context(|| format!("failed to write CSV to {}", path.display()))?;
    }

    if missing.len() == files.len() {
        anyhow::bail!("file does not exist: {}", missing.join(", "));
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}
