//! MeshCore companion protocol dump tool.
//!
//! - `mcdump decode` replays a capture through the frame reassembler and
//!   prints one JSON object per frame
//! - `mcdump encode` prints the wire bytes of a host command as hex
//! - `mcdump config` prints the effective configuration as YAML

mod config;
mod input;

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use meshcore_companion::*;
use serde::Serialize;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::input::InputFormat;

#[derive(Parser)]
#[command(name = "mcdump")]
#[command(author, version, about = "MeshCore companion protocol dump tool", long_about = None)]
struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Protocol configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Use transparent framing (BLE) regardless of the config file
    #[arg(long, global = true)]
    transparent: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a capture of device→host traffic
    Decode {
        /// Capture file (omit or use - for stdin)
        input: Option<PathBuf>,

        /// Capture encoding
        #[arg(short, long, value_enum, default_value = "auto")]
        format: InputFormat,

        /// Bytes per read when replaying a binary capture
        #[arg(long, default_value = "64")]
        chunk_size: usize,

        /// Print frames that have no decoder
        #[arg(long)]
        all: bool,
    },

    /// Encode a host→device command
    Encode {
        #[command(subcommand)]
        command: EncodeCommand,
    },

    /// Print the effective configuration
    Config,
}

#[derive(Subcommand)]
enum EncodeCommand {
    /// Query device information
    DeviceQuery {
        #[arg(default_value = "3")]
        app_version: u8,
    },
    /// Start the app session
    AppStart {
        #[arg(default_value = "mcdump")]
        app_name: String,
    },
    /// Request one channel descriptor
    GetChannel { index: u8 },
    /// Request the contact list
    GetContacts {
        /// Only contacts modified after this Unix time
        #[arg(long)]
        since: Option<u32>,
    },
    /// Fetch the next queued message
    SyncNext,
    /// Send a self-advertisement
    Advert {
        /// Flood instead of zero-hop
        #[arg(long)]
        flood: bool,
    },
    /// Configure a channel
    SetChannel {
        index: u8,
        name: String,
        /// 16-byte channel secret as hex
        secret: String,
    },
    /// Set the advertised position
    Position {
        #[arg(allow_hyphen_values = true)]
        latitude: f64,
        #[arg(allow_hyphen_values = true)]
        longitude: f64,
        /// Altitude in metres
        #[arg(long, allow_hyphen_values = true)]
        altitude: Option<i32>,
    },
    /// Send a plain text message to a channel, stamped with the current time
    ChannelText { index: u8, text: String },
    /// Discover nearby nodes
    Discover {
        /// Node-type bitmask (bit n = advert type n)
        #[arg(long, default_value = "255")]
        types: u8,
        /// Correlation tag
        #[arg(long)]
        tag: u32,
        /// Ask for full public keys instead of 8-byte prefixes
        #[arg(long)]
        full_keys: bool,
        #[arg(long, default_value = "0")]
        since: u32,
    },
}

/// One output line of `mcdump decode`.
#[derive(Serialize)]
struct DecodedFrame<'a> {
    index: usize,
    opcode: u8,
    band: OpcodeBand,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let mut protocol = config::load(cli.config.as_deref())?;
    if cli.transparent {
        protocol.transport = TransportMode::Transparent;
    }
    debug!("protocol config: {:?}", protocol);

    match cli.command {
        Commands::Decode {
            input,
            format,
            chunk_size,
            all,
        } => cmd_decode(&protocol, input, format, chunk_size, all),
        Commands::Encode { command } => cmd_encode(&protocol, command),
        Commands::Config => {
            print!("{}", serde_yaml::to_string(&protocol)?);
            Ok(())
        }
    }
}

fn cmd_decode(
    protocol: &ProtocolConfig,
    path: Option<PathBuf>,
    format: InputFormat,
    chunk_size: usize,
    all: bool,
) -> Result<()> {
    let data = input::read(path.as_deref()).context("reading capture")?;
    let chunks = input::chunks(&data, format, chunk_size)?;
    info!("read {} bytes in {} chunks", data.len(), chunks.len());

    let mut reassembler = protocol.reassembler();
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let mut frames = 0usize;
    let mut errors = 0usize;
    for chunk in &chunks {
        for frame in reassembler.feed(chunk) {
            let index = frames;
            frames += 1;

            let decoded = Message::decode(&frame, protocol);
            if let Ok(Message::Unhandled(_)) = decoded {
                if !all {
                    continue;
                }
            }

            let (message, error) = match &decoded {
                Ok(message) => (Some(message), None),
                Err(e) => {
                    errors += 1;
                    warn!("frame {} (opcode 0x{:02X}): {}", index, frame.opcode, e);
                    (None, Some(e.to_string()))
                }
            };

            let line = DecodedFrame {
                index,
                opcode: frame.opcode,
                band: OpcodeBand::classify_inbound(frame.opcode),
                message,
                error,
            };
            serde_json::to_writer(&mut out, &line)?;
            writeln!(out)?;
        }
    }
    out.flush()?;

    if reassembler.buffered_len() > 0 {
        warn!(
            "capture ended inside a frame, {} bytes left over",
            reassembler.buffered_len()
        );
    }
    info!("{} frames, {} decode errors", frames, errors);
    Ok(())
}

fn cmd_encode(protocol: &ProtocolConfig, command: EncodeCommand) -> Result<()> {
    let command = match command {
        EncodeCommand::DeviceQuery { app_version } => device_query(app_version),
        EncodeCommand::AppStart { app_name } => app_start(&app_name),
        EncodeCommand::GetChannel { index } => get_channel(index),
        EncodeCommand::GetContacts { since } => get_contacts(since),
        EncodeCommand::SyncNext => sync_next_message(),
        EncodeCommand::Advert { flood } => send_self_advert(flood),
        EncodeCommand::SetChannel {
            index,
            name,
            secret,
        } => {
            let secret = hex::decode(&secret).context("channel secret must be hex")?;
            set_channel(index, &name, &secret)?
        }
        EncodeCommand::Position {
            latitude,
            longitude,
            altitude,
        } => set_position(latitude, longitude, altitude)?,
        EncodeCommand::ChannelText { index, text } => send_channel_text(index, &text),
        EncodeCommand::Discover {
            types,
            tag,
            full_keys,
            since,
        } => {
            let mut request = DiscoveryRequest::new(types, tag).with_since(since);
            if full_keys {
                request = request.full_keys();
            }
            info!(
                "responses will carry {:?} keys; decode them with discovery_key set to match",
                request.key_length()
            );
            request.to_command()
        }
    };

    println!("{}", hex::encode(protocol.encode(&command)));
    Ok(())
}
