use clap::Parser;
use ringside::cli::{self, RingArgs};
use ringside::programs::file_io;
use std::path::PathBuf;
use std::process::ExitCode;

/// Write a payload to a file and read it back through io_uring.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// File to create, verify and unlink
    #[arg(default_value = file_io::DEFAULT_PATH)]
    path: PathBuf,

    #[command(flatten)]
    ring: RingArgs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    cli::init_tracing(cli.ring.debug);

    let queue_depth = cli.ring.queue_depth_or(file_io::QUEUE_DEPTH);
    cli::finish(file_io::run(&cli.path, queue_depth))
}
