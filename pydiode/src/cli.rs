//! Command-line surface, in the builder style this workspace's
//! `turn_client_udp`/`turn_server_udp` examples use: a `clap::App` with
//! subcommands and explicit `Arg::with_name` definitions rather than the
//! derive macro.

use anyhow::{anyhow, Result};
use clap::{App, AppSettings, Arg, SubCommand};

use pydiode_proto::config::{
    DEFAULT_CHUNK_BYTES, DEFAULT_IDLE_TIMEOUT, DEFAULT_K, DEFAULT_PORT, DEFAULT_R, DEFAULT_RATE_BPS,
    DEFAULT_REDUNDANT_FINAL, DEFAULT_WINDOW_BLOCKS,
};

#[derive(Debug, Clone)]
pub struct SendArgs {
    pub dst_ip: String,
    pub source_ip: String,
    pub port: u16,
    pub rate_bps: u64,
    pub chunk_bytes: usize,
    pub k: usize,
    pub r: usize,
    pub redundant_final: usize,
}

#[derive(Debug, Clone)]
pub struct ReceiveArgs {
    pub listen_ip: String,
    pub port: u16,
    pub idle_timeout_secs: u64,
    pub chunk_bytes: usize,
    pub k: usize,
    pub r: usize,
    pub window_blocks: usize,
}

#[derive(Debug, Clone)]
pub enum Command {
    Send(SendArgs),
    Receive(ReceiveArgs),
}

#[derive(Debug, Clone)]
pub struct Cli {
    pub debug: bool,
    pub quiet: bool,
    pub command: Command,
}

pub fn parse() -> Result<Cli> {
    let default_port = DEFAULT_PORT.to_string();
    let default_rate = DEFAULT_RATE_BPS.to_string();
    let default_chunk = DEFAULT_CHUNK_BYTES.to_string();
    let default_k = DEFAULT_K.to_string();
    let default_r = DEFAULT_R.to_string();
    let default_redundant = DEFAULT_REDUNDANT_FINAL.to_string();
    let default_idle = DEFAULT_IDLE_TIMEOUT.as_secs().to_string();
    let default_window = DEFAULT_WINDOW_BLOCKS.to_string();

    let app = App::new("pydiode")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Transfers byte streams across a unidirectional (data-diode) UDP link")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .setting(AppSettings::DeriveDisplayOrder)
        .arg(Arg::with_name("debug").long("debug").global(true).help("Raise log verbosity to debug"))
        .arg(
            Arg::with_name("quiet")
                .long("quiet")
                .global(true)
                .conflicts_with("debug")
                .help("Only log warnings and errors"),
        )
        .subcommand(
            SubCommand::with_name("send")
                .about("Read stdin and transmit it across the diode")
                .arg(Arg::with_name("dst_ip").help("Destination address").required(true).index(1))
                .arg(
                    Arg::with_name("source-ip")
                        .long("source-ip")
                        .takes_value(true)
                        .default_value("0.0.0.0")
                        .help("Local address to bind the sending socket to"),
                )
                .arg(Arg::with_name("port").long("port").takes_value(true).default_value(&default_port))
                .arg(
                    Arg::with_name("rate")
                        .long("rate")
                        .takes_value(true)
                        .default_value(&default_rate)
                        .help("Target throughput in bits/sec (0 disables pacing)"),
                )
                .arg(Arg::with_name("chunk-bytes").long("chunk-bytes").takes_value(true).default_value(&default_chunk))
                .arg(Arg::with_name("k").long("k").takes_value(true).default_value(&default_k))
                .arg(Arg::with_name("r").long("r").takes_value(true).default_value(&default_r))
                .arg(
                    Arg::with_name("redundant-final")
                        .long("redundant-final")
                        .takes_value(true)
                        .default_value(&default_redundant)
                        .help("Times the terminal block's packets are retransmitted"),
                ),
        )
        .subcommand(
            SubCommand::with_name("receive")
                .about("Listen for transmissions and write the reassembled stream to stdout")
                .arg(Arg::with_name("listen_ip").help("Local address to bind to").required(true).index(1))
                .arg(Arg::with_name("port").long("port").takes_value(true).default_value(&default_port))
                .arg(
                    Arg::with_name("idle-timeout")
                        .long("idle-timeout")
                        .takes_value(true)
                        .default_value(&default_idle)
                        .help("Seconds of silence before giving up on the stream"),
                )
                .arg(Arg::with_name("chunk-bytes").long("chunk-bytes").takes_value(true).default_value(&default_chunk))
                .arg(Arg::with_name("k").long("k").takes_value(true).default_value(&default_k))
                .arg(Arg::with_name("r").long("r").takes_value(true).default_value(&default_r))
                .arg(
                    Arg::with_name("window")
                        .long("window")
                        .takes_value(true)
                        .default_value(&default_window)
                        .help("Blocks of reorder/loss tolerance before a block is declared lost"),
                ),
        );

    let matches = app.get_matches();
    let debug = matches.is_present("debug");
    let quiet = matches.is_present("quiet");

    let command = if let Some(m) = matches.subcommand_matches("send") {
        Command::Send(SendArgs {
            dst_ip: m.value_of("dst_ip").unwrap().to_owned(),
            source_ip: m.value_of("source-ip").unwrap().to_owned(),
            port: parse_arg(m.value_of("port").unwrap(), "--port")?,
            rate_bps: parse_arg(m.value_of("rate").unwrap(), "--rate")?,
            chunk_bytes: parse_arg(m.value_of("chunk-bytes").unwrap(), "--chunk-bytes")?,
            k: parse_arg(m.value_of("k").unwrap(), "--k")?,
            r: parse_arg(m.value_of("r").unwrap(), "--r")?,
            redundant_final: parse_arg(m.value_of("redundant-final").unwrap(), "--redundant-final")?,
        })
    } else if let Some(m) = matches.subcommand_matches("receive") {
        Command::Receive(ReceiveArgs {
            listen_ip: m.value_of("listen_ip").unwrap().to_owned(),
            port: parse_arg(m.value_of("port").unwrap(), "--port")?,
            idle_timeout_secs: parse_arg(m.value_of("idle-timeout").unwrap(), "--idle-timeout")?,
            chunk_bytes: parse_arg(m.value_of("chunk-bytes").unwrap(), "--chunk-bytes")?,
            k: parse_arg(m.value_of("k").unwrap(), "--k")?,
            r: parse_arg(m.value_of("r").unwrap(), "--r")?,
            window_blocks: parse_arg(m.value_of("window").unwrap(), "--window")?,
        })
    } else {
        return Err(anyhow!("no subcommand given"));
    };

    Ok(Cli { debug, quiet, command })
}

fn parse_arg<T: std::str::FromStr>(raw: &str, flag: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| anyhow!("invalid value for {flag}: {e}"))
}
