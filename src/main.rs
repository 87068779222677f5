//! qwen-clone CLI entry point.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use qwen_clone::audio::FfmpegConverter;
use qwen_clone::backend::create_backend;
use qwen_clone::cli::Args;
use qwen_clone::engine::CloneEngine;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Usage errors exit with 1 like every other failure; --help/--version exit 0
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };
    init_logging(args.verbose);

    match run(&args) {
        Ok(path) => {
            info!("Done: {}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    // RUST_LOG overrides --verbose
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

fn run(args: &Args) -> Result<PathBuf> {
    // Validate before anything touches the backend
    let options = args.validate()?;

    let backend = create_backend(&args.backend_url());
    let engine = CloneEngine::new(backend, FfmpegConverter::new());

    engine
        .clone_voice(&options)
        .with_context(|| format!("Failed to clone voice from {}", options.ref_audio.display()))
}
