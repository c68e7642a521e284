//! CV-Airgap: move envelopes across the air gap as frame files.
//!
//! ## Usage
//!
//! ```bash
//! # Split an unsigned transaction into frames of at most 1200 bytes
//! cv-airgap split --input tx.json --out-dir frames/
//!
//! # Reassemble on the other side (any order)
//! cv-airgap join frames/*.frame
//!
//! # What is in this file?
//! cv-airgap inspect frames/unsigned-transaction-001-of-005.frame
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cv_airgap::{describe, inspect_file, join_files, split_file};
use cv_telemetry::{init_logging, TelemetryConfig};

/// Cold-Vault air-gap transfer tool
#[derive(Parser, Debug)]
#[command(name = "cv-airgap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Print debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write an envelope file out as frame files
    Split {
        /// Envelope JSON (wire envelope or bare payload)
        #[arg(short, long)]
        input: PathBuf,

        /// Upper bound on one frame, header included
        #[arg(long, default_value = "1200")]
        max_frame_bytes: usize,

        /// Directory for the frame files
        #[arg(short, long)]
        out_dir: PathBuf,
    },

    /// Reassemble frame files and print the envelope
    Join {
        /// Frame files, in any order
        #[arg(required = true)]
        frames: Vec<PathBuf>,

        /// Print the canonical envelope instead of a summary
        #[arg(long)]
        raw: bool,
    },

    /// Describe an envelope or frame file
    Inspect {
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut telemetry = TelemetryConfig::for_tool("cv-airgap");
    if cli.verbose {
        telemetry.log_level = "debug".to_string();
    }
    init_logging(&telemetry).context("initializing logging")?;

    match cli.command {
        Commands::Split {
            input,
            max_frame_bytes,
            out_dir,
        } => {
            let written = split_file(&input, &out_dir, max_frame_bytes)?;
            for path in &written {
                println!("{}", path.display());
            }
        }
        Commands::Join { frames, raw } => {
            let envelope = join_files(&frames)?;
            if raw {
                println!("{}", envelope.to_wire().to_canonical_string());
            } else {
                println!("{}", describe(&envelope));
            }
        }
        Commands::Inspect { file } => {
            println!("{}", inspect_file(&file)?);
        }
    }
    Ok(())
}
