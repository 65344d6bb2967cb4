use clap::Parser;
use ringside::cli::{self, RingArgs};
use ringside::programs::openat;
use std::path::PathBuf;
use std::process::ExitCode;

/// Open, read and close a file without the open/read/close syscalls.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// File to read
    #[arg(default_value = openat::DEFAULT_PATH)]
    path: PathBuf,

    #[command(flatten)]
    ring: RingArgs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    cli::init_tracing(cli.ring.debug);

    let queue_depth = cli.ring.queue_depth_or(openat::QUEUE_DEPTH);
    cli::finish(openat::run(&cli.path, queue_depth))
}
