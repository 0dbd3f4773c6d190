//! CLI argument parsing for sonar-node

use clap::Parser;
use sonar_wire::PeerAddr;
use std::path::PathBuf;

/// Sonar overlay search node
#[derive(Parser, Debug, Clone)]
#[command(name = "sonar")]
#[command(about = "Node of an unstructured peer-to-peer search overlay")]
#[command(version)]
pub struct Cli {
    /// Address to listen on, also the node's overlay address (host:port)
    pub addr: PeerAddr,

    /// File listing neighbours, one host:port per line
    pub neighbours: Option<PathBuf>,

    /// File listing key/value pairs, one "key value" per line
    pub keys: Option<PathBuf>,

    /// TTL given to searches started here
    #[arg(long, default_value_t = sonar_network::DEFAULT_TTL)]
    pub ttl: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Timeout for connecting and writing to a peer, in milliseconds
    #[arg(long, default_value = "5000")]
    pub connect_timeout_ms: u64,

    /// Run without the interactive menu until Ctrl-C
    #[arg(long)]
    pub no_menu: bool,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
