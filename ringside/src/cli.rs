//! Pieces shared by the binaries: common flags, logging setup and exit codes.

use crate::errors::RingError;
use clap::Args;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Options accepted by every binary.
#[derive(Debug, Clone, Default, Args)]
pub struct RingArgs {
    /// Submission queue depth
    #[arg(long, env = "RINGSIDE_QUEUE_DEPTH")]
    pub queue_depth: Option<u32>,

    /// Log at debug level, overriding RUST_LOG
    #[arg(short, long)]
    pub debug: bool,
}

impl RingArgs {
    pub fn queue_depth_or(&self, default: u32) -> u32 {
        self.queue_depth.unwrap_or(default)
    }
}

/// Installs a stderr subscriber. `RUST_LOG` picks the level unless `debug` is
/// set; the default is `info`.
pub fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // A subscriber may already be installed when called twice.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

/// Prints a program's result lines to stdout, or its failure as
/// `<kind label>: <reason>` to stderr, and maps the outcome to an exit code.
pub fn finish(result: anyhow::Result<String>) -> ExitCode {
    match result {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}: {err:#}", failure_label(&err));
            ExitCode::FAILURE
        }
    }
}

fn failure_label(err: &anyhow::Error) -> &'static str {
    err.downcast_ref::<RingError>()
        .map_or("Error", RingError::label)
}
