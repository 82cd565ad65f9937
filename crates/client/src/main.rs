mod headless;
mod session;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use floorsync::NetConfig;
use floorsync::net::{DEFAULT_TCP_PORT, DEFAULT_UDP_PORT};
use session::{Session, SessionConfig};

#[derive(Parser)]
#[command(name = "floorsync-client")]
#[command(about = "Headless floorsync client")]
struct Args {
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = DEFAULT_TCP_PORT)]
    tcp_port: u16,

    #[arg(long, default_value_t = DEFAULT_UDP_PORT)]
    udp_port: u16,

    #[arg(short, long, default_value = "player")]
    name: String,

    #[arg(short, long, default_value_t = 30)]
    tick_rate: u32,

    #[arg(long, help = "Stop after this many ticks")]
    ticks: Option<u64>,

    #[arg(long, help = "Ask the server to move to this floor once connected")]
    floor: Option<u32>,

    #[arg(long, help = "Chat line to send once connected")]
    say: Option<String>,

    #[arg(long, default_value_t = 30, help = "Seconds of silence before giving up")]
    liveness_secs: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let net = NetConfig {
        host: args.host,
        tcp_port: args.tcp_port,
        udp_port: args.udp_port,
        liveness_timeout: Duration::from_secs(args.liveness_secs),
        ..Default::default()
    };
    let config = SessionConfig {
        name: args.name,
        tick_rate: args.tick_rate.max(1),
        max_ticks: args.ticks,
        floor: args.floor,
        say: args.say,
    };

    let mut session = Session::connect(net, config)?;
    let result = session.run();
    session.shutdown();

    result
}
