//! Caddyclub - Caddyfile toolkit
//!
//! This is the main entry point for the Caddyclub CLI.

use anyhow::Context;
use ariadne::{Config as ReportConfig, IndexType, Label, Report, ReportKind, Source};
use caddyclub_config::{
    count_blocks, detect_virtual_container, json_to_caddyfile, parse, serialize, to_admin_config,
    validate, ValidationReport,
};
use caddyclub_core::config::ConvertOptions;
use clap::{Parser, Subcommand};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Caddyclub - edit, check and convert Caddyfiles
#[derive(Parser)]
#[command(name = "caddyclub")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a Caddyfile in canonical form
    Fmt {
        /// Path to the Caddyfile
        #[arg(default_value = "Caddyfile")]
        file: PathBuf,

        /// Rewrite the file in place
        #[arg(short, long)]
        write: bool,
    },

    /// Convert a Caddyfile to admin JSON
    Adapt {
        /// Path to the Caddyfile
        #[arg(default_value = "Caddyfile")]
        file: PathBuf,

        /// Conversion options file (.toml or .json)
        #[arg(long)]
        options: Option<PathBuf>,
    },

    /// Convert admin JSON back to a Caddyfile
    Unadapt {
        /// Path to the JSON document
        file: PathBuf,
    },

    /// Check whether a file looks like a Caddyfile
    Validate {
        /// Path to the Caddyfile
        #[arg(default_value = "Caddyfile")]
        file: PathBuf,
    },

    /// Show the services of a wildcard site block
    Services {
        /// Path to the Caddyfile
        #[arg(default_value = "Caddyfile")]
        file: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; logs go to stderr so stdout stays machine readable
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    match cli.command {
        Commands::Fmt { file, write } => {
            let source = read_checked(&file)?;
            let formatted = serialize(&parse(&source));
            if write {
                std::fs::write(&file, &formatted)
                    .with_context(|| format!("Failed to write {}", file.display()))?;
                eprintln!("✅ Formatted '{}'", file.display());
            } else {
                print!("{}", formatted);
            }
        }

        Commands::Adapt { file, options } => {
            let options = match options {
                Some(path) => ConvertOptions::load(&path)
                    .with_context(|| format!("Failed to load options {}", path.display()))?,
                None => ConvertOptions::default(),
            };
            let source = read_checked(&file)?;
            let converted = to_admin_config(&parse(&source), &options);
            if !converted.diagnostics.is_empty() {
                eprintln!(
                    "⚠️ {} item(s) could not be converted exactly",
                    converted.diagnostics.len()
                );
            }
            println!("{}", serde_json::to_string_pretty(&converted.value)?);
        }

        Commands::Unadapt { file } => {
            let json = read(&file)?;
            let caddyfile = json_to_caddyfile(&json)
                .with_context(|| format!("Failed to convert {}", file.display()))?;
            print!("{}", caddyfile);
        }

        Commands::Validate { file } => {
            tracing::info!("Validating file: {}", file.display());
            let source = read(&file)?;
            let report = validate(&source);
            render_warnings(&file, &source, &report)?;

            if report.valid {
                println!(
                    "✅ '{}' looks like a Caddyfile (confidence {})",
                    file.display(),
                    report.confidence
                );
            } else {
                for error in &report.errors {
                    eprintln!("❌ {}", error);
                }
                std::process::exit(1);
            }
        }

        Commands::Services { file } => {
            let source = read_checked(&file)?;
            match detect_virtual_container(&source) {
                Some(container) => println!("{}", serde_json::to_string_pretty(&container)?),
                None => {
                    tracing::info!("No virtual container found; reporting block statistics");
                    println!("{}", serde_json::to_string_pretty(&count_blocks(&source))?);
                }
            }
        }

        Commands::Version => {
            println!("Caddyclub v{}", caddyclub_core::VERSION);
        }
    }

    Ok(())
}

fn read(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Read a Caddyfile and refuse it when the validator does
fn read_checked(path: &Path) -> anyhow::Result<String> {
    let source = read(path)?;
    let report = validate(&source);
    render_warnings(path, &source, &report)?;
    if !report.valid {
        anyhow::bail!(
            "'{}' does not look like a Caddyfile: {}",
            path.display(),
            report.errors.join("; ")
        );
    }
    Ok(source)
}

/// Byte range of a 1-based line
fn line_span(source: &str, line: usize) -> Range<usize> {
    let mut start = 0;
    for (index, text) in source.split_inclusive('\n').enumerate() {
        if index + 1 == line {
            return start..start + text.trim_end().len();
        }
        start += text.len();
    }
    start..start
}

fn render_warnings(path: &Path, source: &str, report: &ValidationReport) -> anyhow::Result<()> {
    let name = path.display().to_string();
    for (warning, &line) in report.warnings.iter().zip(&report.warning_lines) {
        let span = line_span(source, line);
        Report::build(ReportKind::Warning, (name.as_str(), span.clone()))
            .with_config(ReportConfig::default().with_index_type(IndexType::Byte))
            .with_message(warning)
            .with_label(Label::new((name.as_str(), span)).with_message("not Caddyfile syntax"))
            .finish()
            .eprint((name.as_str(), Source::from(source)))?;
    }
    Ok(())
}
