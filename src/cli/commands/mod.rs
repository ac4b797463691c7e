//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod extract;
mod normalize;
mod tools;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Settings;
use crate::models::DocType;

#[derive(Parser)]
#[command(name = "realty-extract")]
#[command(about = "Extract property, unit, and lease data from real-estate PDFs")]
#[command(version)]
pub struct Cli {
    /// Config file path (TOML, or JSON with a .json extension)
    #[arg(short, long, global = true, env = "REALTY_EXTRACT_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a document and print the result as JSON
    Extract {
        /// PDF file to extract
        path: PathBuf,
        /// Document type: flyer, rent_roll, lease, or auto (anything else means auto)
        #[arg(short, long, default_value = "auto", value_parser = parse_doc_type)]
        doc_type: DocType,
        /// Print the full report (routing, diagnostics, enrichment outcome)
        #[arg(short, long)]
        report: bool,
    },

    /// Normalize a JSON document or model response to the canonical schema
    Normalize {
        /// Input file, or - for stdin
        #[arg(default_value = "-")]
        input: PathBuf,
    },

    /// Check availability of external tools
    CheckTools,
}

fn parse_doc_type(s: &str) -> Result<DocType, std::convert::Infallible> {
    Ok(DocType::parse(s))
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            path,
            doc_type,
            report,
        } => {
            let settings = Settings::load(cli.config.as_deref())?;
            extract::cmd_extract(settings, &path, doc_type, report).await
        }
        Commands::Normalize { input } => normalize::cmd_normalize(&input),
        Commands::CheckTools => tools::cmd_check_tools(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_unknown_doc_type_falls_through() {
        let cli = Cli::try_parse_from(["realty-extract", "extract", "a.pdf", "--doc-type", "memo"]).unwrap();
        match cli.command {
            Commands::Extract { doc_type, .. } => assert_eq!(doc_type, DocType::Auto),
            _ => panic!("expected extract"),
        }

        let cli = Cli::try_parse_from(["realty-extract", "-v", "extract", "a.pdf", "-d", "rent_roll", "--report"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Extract { doc_type, report, .. } => {
                assert_eq!(doc_type, DocType::RentRoll);
                assert!(report);
            }
            _ => panic!("expected extract"),
        }
    }
}
