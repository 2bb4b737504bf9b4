//! SWIM packet tool.
//!
//! Decodes and encodes SWIM packets, listens for packets from a running
//! cluster, and probes a member with a failure detection ping.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::net::{SocketAddr, SocketAddrV4};
use std::path::PathBuf;
use std::time::Duration;
use swim_wire::{FdMsgType, MemberDef, MemberStatus, Packet, PacketBuilder};
use tokio::net::UdpSocket;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod config;
#[macro_use]
mod logging;

use config::SwimConfig;
use logging::SwimLogFormatter;

/// Largest UDP datagram we accept
const RECV_BUFFER_SIZE: usize = 65536;

/// SWIM packet inspection and probing tool
#[derive(Parser, Debug)]
#[command(name = "swim", version, about = "SWIM packet inspection and probing tool")]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Configuration file path
    #[arg(long, default_value = "config.yaml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode one packet and print it as JSON
    Decode {
        /// Packet bytes as hex
        #[arg(long, conflicts_with = "file")]
        hex: Option<String>,

        /// File holding the raw packet bytes
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Build a packet from the configured identity and print it as hex
    Encode {
        /// Add a failure detection ping
        #[arg(long, conflicts_with = "ack")]
        ping: bool,

        /// Add a failure detection ack
        #[arg(long)]
        ack: bool,

        /// Add a quit notice
        #[arg(long)]
        quit: bool,

        /// Anti-entropy member, ADDR@UUID[@STATUS[@INCARNATION]] (repeatable)
        #[arg(long, value_parser = parse_member)]
        member: Vec<MemberDef>,

        /// Dissemination event, ADDR@UUID[@STATUS[@INCARNATION]] (repeatable)
        #[arg(long, value_parser = parse_member)]
        event: Vec<MemberDef>,
    },

    /// Receive packets over UDP and log every decoded packet
    Listen {
        /// Bind address (defaults to the configured source address)
        #[arg(long)]
        bind: Option<SocketAddrV4>,
    },

    /// Send a ping to a member and print its reply
    Ping {
        /// Member address, e.g. 127.0.0.1:3301
        #[arg(long)]
        to: SocketAddrV4,

        /// How long to wait for the reply, e.g. 1s
        #[arg(long, default_value = "1s")]
        timeout: humantime::Duration,
    },
}

/// Parse `ADDR@UUID[@STATUS[@INCARNATION]]`
fn parse_member(s: &str) -> Result<MemberDef, String> {
    let mut parts = s.split('@');
    let addr = parts
        .next()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| "missing member address".to_string())?
        .parse::<SocketAddrV4>()
        .map_err(|e| format!("invalid member address: {}", e))?;
    if addr.ip().is_unspecified() || addr.port() == 0 {
        return Err(format!("member address {} must have a non-zero IP and port", addr));
    }
    let uuid = parts
        .next()
        .ok_or_else(|| "missing member uuid".to_string())?
        .parse::<Uuid>()
        .map_err(|e| format!("invalid member uuid: {}", e))?;
    let mut member = MemberDef::new(addr, uuid);
    if let Some(status) = parts.next() {
        member.status = status.parse::<MemberStatus>()?;
    }
    if let Some(incarnation) = parts.next() {
        member.incarnation = incarnation
            .parse()
            .map_err(|e| format!("invalid member incarnation: {}", e))?;
    }
    if parts.next().is_some() {
        return Err(format!("too many fields in member '{}'", s));
    }
    if uuid.is_nil() {
        return Err("member uuid must not be nil".to_string());
    }
    Ok(member)
}

/// Start a packet from the configured identity
fn packet_builder(config: &SwimConfig) -> PacketBuilder {
    let builder =
        PacketBuilder::new(config.src_addr, config.uuid).with_max_size(config.max_packet_size);
    match config.version {
        Some(version) => builder.with_version(version),
        None => builder,
    }
}

fn run_decode(hex_input: Option<String>, file: Option<PathBuf>) -> anyhow::Result<()> {
    let bytes = match (hex_input, file) {
        (Some(text), _) => {
            let text: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            hex::decode(text).context("invalid hex input")?
        }
        (None, Some(path)) => {
            std::fs::read(&path).with_context(|| format!("failed to read {:?}", path))?
        }
        (None, None) => bail!("either --hex or --file is required"),
    };

    component_debug!("decode", "decoding {} bytes", bytes.len());
    let packet = Packet::decode(&bytes)?;
    println!("{}", serde_json::to_string_pretty(&packet)?);
    Ok(())
}

fn run_encode(
    config: &SwimConfig,
    fd: Option<FdMsgType>,
    quit: bool,
    members: &[MemberDef],
    events: &[MemberDef],
) -> anyhow::Result<()> {
    let mut builder = packet_builder(config);
    if let Some(msg_type) = fd {
        builder.failure_detection(msg_type, config.incarnation);
    }
    if quit {
        builder.quit(config.incarnation);
    }
    let encoded = builder.anti_entropy(members);
    if encoded < members.len() {
        component_warn!(
            "encode",
            "only {} of {} members fit in the packet",
            encoded,
            members.len()
        );
    }
    let encoded = builder.dissemination(events);
    if encoded < events.len() {
        component_warn!("encode", "only {} of {} events fit in the packet", encoded, events.len());
    }

    let bytes = builder.build()?;
    component_debug!("encode", "encoded packet of {} bytes", bytes.len());
    println!("{}", hex::encode(&bytes));
    Ok(())
}

async fn run_listen(config: &SwimConfig, bind: SocketAddrV4) -> anyhow::Result<()> {
    let socket = UdpSocket::bind(bind)
        .await
        .with_context(|| format!("failed to bind {}", bind))?;
    component_info!("listen", "Listening for SWIM packets on {} as {}", bind, config.uuid);

    let mut buf = vec![0u8; RECV_BUFFER_SIZE];
    loop {
        tokio::select! {
            received = socket.recv_from(&mut buf) => {
                let (len, peer) = received.context("receive failed")?;
                match Packet::decode(&buf[..len]) {
                    Ok(packet) => log_packet(&packet, len),
                    Err(e) => {
                        // One bad packet never stops the loop.
                        component_warn!("listen", "Dropping malformed packet from {}: {}", peer, e);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                component_info!("listen", "Shutting down");
                return Ok(());
            }
        }
    }
}

fn log_packet(packet: &Packet, len: usize) {
    let fd = packet
        .failure_detection
        .map(|fd| format!("{}({})", fd.msg_type, fd.incarnation))
        .unwrap_or_else(|| "-".to_string());
    component_info!(
        "listen",
        "{} bytes from {} ({}): fd={} anti_entropy={} dissemination={} quit={}",
        len,
        packet.meta.src,
        packet.src_uuid,
        fd,
        packet.anti_entropy.len(),
        packet.dissemination.len(),
        packet.quit.is_some()
    );
    for member in packet.anti_entropy.iter().chain(&packet.dissemination) {
        component_debug!(
            "listen",
            "  member {} at {}: {} (incarnation {})",
            member.uuid,
            member.addr,
            member.status,
            member.incarnation
        );
    }
}

/// Whether `packet` received from `peer` answers a ping sent to `to`
fn is_ack_from(packet: &Packet, peer: SocketAddr, to: SocketAddrV4) -> bool {
    peer == SocketAddr::V4(to)
        && matches!(packet.failure_detection, Some(fd) if fd.msg_type == FdMsgType::Ack)
}

async fn run_ping(config: &SwimConfig, to: SocketAddrV4, timeout: Duration) -> anyhow::Result<()> {
    let socket = UdpSocket::bind(config.src_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.src_addr))?;

    let mut builder = packet_builder(config);
    builder.failure_detection(FdMsgType::Ping, config.incarnation);
    let bytes = builder.build()?;
    socket
        .send_to(&bytes, to)
        .await
        .with_context(|| format!("failed to send ping to {}", to))?;
    component_debug!("ping", "sent {} byte ping to {}", bytes.len(), to);

    let mut buf = vec![0u8; RECV_BUFFER_SIZE];
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let received = tokio::time::timeout_at(deadline, socket.recv_from(&mut buf)).await;
        let (len, peer) = match received {
            Ok(result) => result.context("receive failed")?,
            Err(_) => bail!("no reply from {} within {}", to, humantime::format_duration(timeout)),
        };
        match Packet::decode(&buf[..len]) {
            Ok(packet) if is_ack_from(&packet, peer, to) => {
                println!("{}", serde_json::to_string_pretty(&packet)?);
                return Ok(());
            }
            Ok(_) => {
                component_debug!(
                    "ping",
                    "Skipping packet from {} that is not an ack from {}",
                    peer,
                    to
                );
            }
            Err(e) => {
                component_warn!("ping", "Ignoring malformed packet from {}: {}", peer, e);
            }
        }
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let env_filter = EnvFilter::new("info")
        .add_directive(format!("swim={}", args.log_level).parse()?)
        .add_directive(format!("swim_wire={}", args.log_level).parse()?);

    let formatter = SwimLogFormatter::new("swim".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .event_format(formatter)
        .init();

    info!("Starting swim v{}", env!("CARGO_PKG_VERSION"));

    let config = SwimConfig::load_from_file(&args.config)?;

    match args.command {
        Command::Decode { hex, file } => run_decode(hex, file),
        Command::Encode {
            ping,
            ack,
            quit,
            member,
            event,
        } => {
            let fd = match (ping, ack) {
                (true, _) => Some(FdMsgType::Ping),
                (_, true) => Some(FdMsgType::Ack),
                _ => None,
            };
            run_encode(&config, fd, quit, &member, &event)
        }
        Command::Listen { bind } => {
            let bind = bind.unwrap_or(config.src_addr);
            run_listen(&config, bind).await
        }
        Command::Ping { to, timeout } => run_ping(&config, to, timeout.into()).await,
    }
}
