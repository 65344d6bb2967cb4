use clap::Parser;
use ringside::cli::{self, RingArgs};
use ringside::programs::net_connect;
use std::net::{IpAddr, SocketAddr};
use std::process::ExitCode;

/// Connect, send an HTTP request and receive the reply through io_uring.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// Peer address
    #[arg(default_value_t = net_connect::DEFAULT_IP)]
    ip: IpAddr,

    /// Peer port
    #[arg(default_value_t = net_connect::DEFAULT_PORT)]
    port: u16,

    #[command(flatten)]
    ring: RingArgs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    cli::init_tracing(cli.ring.debug);

    let addr = SocketAddr::new(cli.ip, cli.port);
    let queue_depth = cli.ring.queue_depth_or(net_connect::QUEUE_DEPTH);
    cli::finish(net_connect::run(addr, queue_depth))
}
