//! # Etiqueta CLI
//!
//! Command-line interface for label generation and printing.
//!
//! ## Usage
//!
//! ```bash
//! # Generate EZPL for a label described in JSON
//! etiqueta generate label.json
//!
//! # Generate ZPL into a file
//! etiqueta generate --language zpl -o label.zpl label.json
//!
//! # Check a command file against a 100x50mm label
//! etiqueta validate --width 100 --height 50 label.zpl
//!
//! # Stretch or shrink a command file onto a 60x40mm label
//! etiqueta rescale --width 60 --height 40 label.ezp
//!
//! # Print one label through the configured channels
//! etiqueta print label.json
//!
//! # Print several labels as one transmission
//! etiqueta batch box1.json box2.json box3.json
//!
//! # Show configured channels and whether they can be used right now
//! etiqueta channels
//! ```
//!
//! Configuration comes from `ETIQUETA_*` environment variables (a `.env`
//! file is loaded first) or from `--config FILE`.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use etiqueta::{
    EtiquetaError,
    codegen::{self, CommandStream, Language},
    config::EngineConfig,
    diagnostics,
    label::{LabelSize, LabelSpec},
    orchestrator::{PrintOrchestrator, PrintResult},
};

/// Etiqueta - Thermal label generation and printing
#[derive(Parser, Debug)]
#[command(name = "etiqueta")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file (default: ETIQUETA_* environment variables)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate printer commands for a label
    Generate {
        /// Label description (JSON)
        label: PathBuf,

        /// Target language: ezpl, zpl or xml (default: configured language)
        #[arg(long, short)]
        language: Option<String>,

        /// Write to FILE instead of stdout
        #[arg(long, short, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Check a command file against a label size
    Validate {
        /// EZPL or ZPL command file
        file: PathBuf,

        /// Label width in millimeters
        #[arg(long)]
        width: f64,

        /// Label height in millimeters
        #[arg(long)]
        height: f64,

        /// Command language (default: from file extension)
        #[arg(long, short)]
        language: Option<String>,

        /// Resolution the file was generated for (default: configured dpi)
        #[arg(long)]
        dpi: Option<u16>,
    },

    /// Rescale a command file to a label size
    Rescale {
        /// EZPL or ZPL command file
        file: PathBuf,

        /// Target width in millimeters
        #[arg(long)]
        width: f64,

        /// Target height in millimeters
        #[arg(long)]
        height: f64,

        /// Command language (default: from file extension)
        #[arg(long, short)]
        language: Option<String>,

        /// Resolution the file was generated for (default: configured dpi)
        #[arg(long)]
        dpi: Option<u16>,

        /// Write to FILE instead of stdout
        #[arg(long, short, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Print a label (JSON) or a raw command file
    Print {
        /// Label description (JSON), or a command file with --raw
        file: PathBuf,

        /// Treat FILE as printer commands instead of a label description
        #[arg(long, requires_all = ["width", "height"])]
        raw: bool,

        /// Label width in millimeters (with --raw)
        #[arg(long)]
        width: Option<f64>,

        /// Label height in millimeters (with --raw)
        #[arg(long)]
        height: Option<f64>,
    },

    /// Print several labels as one transmission
    Batch {
        /// Label descriptions (JSON), printed in order
        #[arg(required = true)]
        labels: Vec<PathBuf>,
    },

    /// List configured channels and their availability
    Channels,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "etiqueta=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), EtiquetaError> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::from_env()?,
    };

    match cli.command {
        Commands::Generate {
            label,
            language,
            output,
        } => {
            let spec = read_label(&label)?;
            let language = match language {
                Some(l) => Language::parse(&l)?,
                None => config.language(),
            };
            let generator = codegen::generator_for(language, config.profile(), config.truncation.clone());
            let stream = generator.generate(&spec)?;
            write_output(output.as_deref(), stream.text())?;
        }

        Commands::Validate {
            file,
            width,
            height,
            language,
            dpi,
        } => {
            let size = LabelSize::new(width, height);
            let stream = read_stream(&file, language.as_deref(), size, dpi.unwrap_or(config.profile().dpi))?;
            let report = diagnostics::validate(&stream, size)?;

            for issue in &report.issues {
                println!("{}", issue);
            }
            if let Some((x, y)) = report.observed_max {
                println!(
                    "Content reaches {}x{} of {}x{} dots",
                    x, y, report.declared_dots.0, report.declared_dots.1
                );
            }
            if !report.is_valid {
                return Err(EtiquetaError::Validation(report.error_summary()));
            }
            println!("Valid.");
        }

        Commands::Rescale {
            file,
            width,
            height,
            language,
            dpi,
            output,
        } => {
            let size = LabelSize::new(width, height);
            let stream = read_stream(&file, language.as_deref(), size, dpi.unwrap_or(config.profile().dpi))?;
            let rescaled = diagnostics::rescale(&stream, size)?;
            write_output(output.as_deref(), rescaled.text())?;
        }

        Commands::Print {
            file,
            raw,
            width,
            height,
        } => {
            let orchestrator = PrintOrchestrator::from_config(&config)?;
            let result = match (raw, width, height) {
                (true, Some(w), Some(h)) => {
                    let size = LabelSize::new(w, h);
                    let stream = read_stream(&file, None, size, orchestrator.profile().dpi)?;
                    orchestrator.print_stream(stream).await?
                }
                (true, _, _) => {
                    return Err(EtiquetaError::Config("--raw needs --width and --height".into()));
                }
                (false, _, _) => orchestrator.print_label(&read_label(&file)?).await?,
            };
            report_print(result)?;
        }

        Commands::Batch { labels } => {
            let orchestrator = PrintOrchestrator::from_config(&config)?;
            let specs = labels.iter().map(|p| read_label(p)).collect::<Result<Vec<_>, _>>()?;
            let result = orchestrator.print_batch(&specs).await?;
            report_print(result)?;
        }

        Commands::Channels => {
            let orchestrator = PrintOrchestrator::from_config(&config)?;
            let statuses = orchestrator.channel_status().await;
            if statuses.is_empty() {
                println!("No channels configured.");
            }
            for status in statuses {
                match &status.reason {
                    None => println!("{:>4}  {:<12} {:<12} available", status.priority, status.name, status.kind),
                    Some(reason) => println!(
                        "{:>4}  {:<12} {:<12} unavailable: {}",
                        status.priority, status.name, status.kind, reason
                    ),
                }
            }
        }
    }

    Ok(())
}

fn read_label(path: &Path) -> Result<LabelSpec, EtiquetaError> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| EtiquetaError::Config(format!("cannot read {}: {}", path.display(), e)))?;
    LabelSpec::from_json(&json)
}

/// Load a command file, taking the language from `language` or the file
/// extension.
fn read_stream(path: &Path, language: Option<&str>, size: LabelSize, dpi: u16) -> Result<CommandStream, EtiquetaError> {
    let language = match language {
        Some(l) => Language::parse(l)?,
        None => match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => Language::parse(ext)?,
            None => {
                return Err(EtiquetaError::Config(format!(
                    "cannot tell the language of {}; pass --language",
                    path.display()
                )));
            }
        },
    };
    let text = std::fs::read_to_string(path)?;
    CommandStream::from_raw(text, language, size, dpi)
}

fn write_output(path: Option<&Path>, text: &str) -> Result<(), EtiquetaError> {
    match path {
        Some(path) => {
            std::fs::write(path, text)?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}

fn report_print(result: PrintResult) -> Result<(), EtiquetaError> {
    println!("{}", serde_json::to_string_pretty(&result)?);
    result.into_result().map(|_| ())
}
