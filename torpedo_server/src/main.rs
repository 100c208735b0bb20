// CLI entry point for the torpedo session server.
//
// Starts a standalone server that two battleship clients connect to; any
// further connections spectate. See `server.rs` for the networking
// architecture and `session.rs` for the match state machine.

use std::net::IpAddr;
use std::time::Duration;

use clap::Parser;
use torpedo_server::server::{ServerConfig, start_server};

/// torpedo — two-player battleship session server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// Listen port
    #[arg(long, default_value_t = 65432)]
    port: u16,

    /// Per-connection outbound queue capacity
    #[arg(long, default_value_t = 64)]
    queue_depth: usize,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt::init();

    let config = ServerConfig {
        host: args.host,
        port: args.port,
        queue_depth: args.queue_depth,
    };
    let (_handle, addr) = start_server(config)?;

    println!("torpedo listening on {addr}");
    println!("Press Ctrl+C to stop.");

    // The process exits on SIGINT/SIGTERM by default, which tears the
    // server threads down with it; there is no state worth flushing.
    loop {
        std::thread::sleep(Duration::from_secs(3600));
    }
}
