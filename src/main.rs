//! cluster-rpc - Operator tool for the cluster wire protocol
//!
//! Inspects opcodes and raw frames, probes slaves and runs a liveness responder.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cluster_rpc::config::{self, Config};
use cluster_rpc::network::{
    connect, decode_frame, master_ping, resolve_host, FrameMetadata, NetworkConfig as NetConfig,
    PingResponder, Server,
};
use cluster_rpc::protocol::{ClusterMessage, ClusterOp, CLUSTER_OP_BASE, RESERVED_OPCODES};
use cluster_rpc::types::ShardMask;

/// cluster-rpc - Master/slave wire protocol tool
#[derive(Parser)]
#[command(name = "cluster-rpc")]
#[command(version = "0.1.0")]
#[command(about = "Inspect and exercise the shard cluster wire protocol", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the opcode table
    Opcodes,

    /// Decode a hex-encoded message and print it
    Decode {
        /// `[opcode][payload]`, or a whole stream frame with --frame
        hex: String,

        /// Input is a stream frame with metadata and rpc id
        #[arg(short, long)]
        frame: bool,
    },

    /// Ping one slave, or every configured slave
    Ping {
        /// Slave address as HOST:PORT
        #[arg(short, long)]
        addr: Option<String>,
    },

    /// Answer pings on the configured port
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Shard masks to report in pongs
        #[arg(short, long = "shard-mask")]
        shard_masks: Vec<u32>,
    },

    /// Show current configuration
    Config {
        /// Generate sample configuration
        #[arg(long)]
        generate: bool,

        /// Output path for generated config
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default().unwrap_or_default()
    };

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Opcodes => print_opcodes(),
        Commands::Decode { hex, frame } => decode(&hex, frame)?,
        Commands::Ping { addr } => run_ping(&config, addr).await?,
        Commands::Serve { port, shard_masks } => run_serve(&config, port, shard_masks).await?,
        Commands::Config { generate, output } => {
            if generate {
                let sample = config::generate_sample_config()?;
                if let Some(path) = output {
                    std::fs::write(&path, &sample)?;
                    println!("Configuration written to: {}", path.display());
                } else {
                    println!("{}", sample);
                }
            } else {
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}

/// Print every registered opcode with its pairing and route
fn print_opcodes() {
    println!(
        "{:>6} {:>6}  {:<38} {:<9} {:<11} pair",
        "opcode", "offset", "message", "kind", "route"
    );
    for op in ClusterOp::ALL {
        let pair = op
            .response_op()
            .or_else(|| op.request_op())
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>6} {:>6}  {:<38} {:<9} {:<11} {}",
            op.as_u8(),
            op.offset(),
            op.name(),
            format!("{:?}", op.kind()),
            op.route().to_string(),
            pair
        );
    }
    for reserved in RESERVED_OPCODES {
        println!("{:>6} {:>6}  (reserved)", reserved, reserved - CLUSTER_OP_BASE);
    }
}

fn parse_hex(input: &str) -> anyhow::Result<Vec<u8>> {
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(digits).context("input is not valid hex")
}

fn decode(input: &str, frame: bool) -> anyhow::Result<()> {
    let bytes = parse_hex(input)?;
    if frame {
        let frame = decode_frame(&bytes)?;
        println!(
            "branch={} cluster_peer_id={} rpc_id={}",
            frame.metadata.branch.value, frame.metadata.cluster_peer_id, frame.rpc_id
        );
        print_message(&frame.message);
    } else {
        print_message(&ClusterMessage::from_wire(&bytes)?);
    }
    Ok(())
}

fn print_message(message: &ClusterMessage) {
    let op = message.op();
    println!("{} ({}, {:?})", op, op.as_u8(), op.kind());
    println!("{:#?}", message);
}

/// Resolve `HOST:PORT`
async fn parse_addr(addr: &str) -> anyhow::Result<SocketAddr> {
    if let Ok(addr) = addr.parse() {
        return Ok(addr);
    }
    let (host, port) = addr
        .rsplit_once(':')
        .with_context(|| format!("expected HOST:PORT, got {}", addr))?;
    let port = port.parse().with_context(|| format!("invalid port in {}", addr))?;
    Ok(resolve_host(host, port).await?)
}

/// Ping slaves and report their pongs
async fn run_ping(config: &Config, addr: Option<String>) -> anyhow::Result<()> {
    let targets = match addr {
        Some(addr) => vec![(addr.clone(), parse_addr(&addr).await?)],
        None => {
            if config.slaves.is_empty() {
                anyhow::bail!("No slaves configured. Pass --addr or add [[slaves]] to the config.");
            }
            config
                .slaves
                .iter()
                .map(|slave| -> anyhow::Result<_> { Ok((slave.id.clone(), slave.socket_addr()?)) })
                .collect::<anyhow::Result<Vec<_>>>()?
        }
    };

    let net_config = NetConfig::from(&config.network);
    let mut failures = 0;
    for (label, addr) in targets {
        match ping_one(&net_config, &config.general.node_id, addr).await {
            Ok(line) => println!("{} ({}): {}", label, addr, line),
            Err(e) => {
                failures += 1;
                println!("{} ({}): FAILED {:#}", label, addr, e);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} slave(s) did not answer", failures);
    }
    Ok(())
}

async fn ping_one(config: &NetConfig, node_id: &str, addr: SocketAddr) -> anyhow::Result<String> {
    let mut conn = connect(addr, config).await?;
    let response = conn
        .call(FrameMetadata::default(), master_ping(node_id))
        .await?;
    let rtt_us = conn.stats().rtt_us;
    conn.close().await?;

    match response {
        ClusterMessage::Pong(pong) => {
            let masks: Vec<String> = pong
                .shard_mask_list
                .iter()
                .map(|mask| format!("{:#b}", mask.value))
                .collect();
            Ok(format!(
                "pong id={} shard_masks=[{}] rtt={}us",
                String::from_utf8_lossy(&pong.id),
                masks.join(", "),
                rtt_us
            ))
        }
        other => anyhow::bail!("unexpected reply {}", other.op()),
    }
}

/// Answer pings until Ctrl+C
async fn run_serve(
    config: &Config,
    port: Option<u16>,
    shard_masks: Vec<u32>,
) -> anyhow::Result<()> {
    let mut network = config.network.clone();
    if let Some(port) = port {
        network.port = port;
    }
    let masks = shard_masks.into_iter().map(ShardMask::new).collect();
    let responder = PingResponder::new(config.general.node_id.clone(), masks);

    let server = Server::bind(&network.listen_addr(), responder, NetConfig::from(&network)).await?;
    println!("Answering pings on {}. Press Ctrl+C to stop.", server.local_addr()?);

    server
        .run(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    tracing::info!("Server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["cluster-rpc", "opcodes"]);
        assert!(cli.is_ok());

        let cli = Cli::try_parse_from(["cluster-rpc", "decode", "--frame", "00ff"]).unwrap();
        assert!(matches!(cli.command, Commands::Decode { frame: true, .. }));

        let cli = Cli::try_parse_from(["cluster-rpc", "serve", "-s", "2", "-s", "3"]).unwrap();
        match cli.command {
            Commands::Serve { shard_masks, port } => {
                assert_eq!(shard_masks, vec![2, 3]);
                assert_eq!(port, None);
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_decode_hex() {
        let wire = ClusterMessage::from(cluster_rpc::protocol::AddMinorBlockResponse::new(0))
            .to_wire()
            .unwrap();
        let text = format!("0x{}", hex::encode(&wire));
        assert_eq!(parse_hex(&text).unwrap(), wire.to_vec());
        assert!(decode(&text, false).is_ok());
        assert!(decode("9c", false).is_err());
        assert!(parse_hex("zz").is_err());
    }
}
