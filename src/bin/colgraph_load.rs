//! Binary entry point for the colgraph bulk loader.
#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use colgraph::config::LoadConfig;
use colgraph::progress::CountingProgress;
use colgraph::{build, logging};

#[derive(Parser, Debug)]
#[command(
    name = "colgraph-load",
    version,
    about = "Loads a CSV dataset into colgraph's on-disk columnar format"
)]
struct Cli {
    #[arg(value_name = "INPUT_DIR", help = "Directory holding metadata.json and the CSV files")]
    input_dir: PathBuf,

    #[arg(value_name = "OUTPUT_DIR", help = "Directory to write the built graph into")]
    output_dir: PathBuf,

    #[arg(long, help = "Worker thread count (default: available parallelism)")]
    threads: Option<usize>,

    #[arg(long, value_enum, default_value_t = Verbosity::Info, help = "Log verbosity")]
    verbosity: Verbosity,

    #[arg(long, help = "Nominal CSV block size in bytes")]
    buffer_pool_size: Option<usize>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Verbosity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Verbosity {
    fn as_str(self) -> &'static str {
        match self {
            Verbosity::Trace => "trace",
            Verbosity::Debug => "debug",
            Verbosity::Info => "info",
            Verbosity::Warn => "warn",
            Verbosity::Error => "error",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbosity.as_str());

    let mut config = LoadConfig::default();
    if let Some(threads) = cli.threads {
        config.threads = threads;
    }
    if let Some(bytes) = cli.buffer_pool_size {
        config.block_size_bytes = bytes;
    }
    config.verbosity = cli.verbosity.as_str().to_string();

    let progress = CountingProgress::default();
    match build::run(&cli.input_dir, &cli.output_dir, &config, &progress) {
        Ok(out) => {
            tracing::info!(
                node_labels = out.catalog.node_labels.len(),
                rel_labels = out.catalog.rel_labels.len(),
                "build finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "build failed");
            ExitCode::FAILURE
        }
    }
}
