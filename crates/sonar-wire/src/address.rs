//! Overlay addresses

use crate::error::{WireError, WireResult};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

/// Address of a node in the overlay, written `host:port` on the wire.
///
/// The host is kept as text: nodes identify each other by the exact string
/// they were configured with, so `localhost:9000` and `127.0.0.1:9000` are
/// different overlay addresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerAddr {
    host: String,
    port: u16,
}

impl PeerAddr {
    /// Create an address, validating the host
    pub fn new(host: impl Into<String>, port: u16) -> WireResult<Self> {
        let host = host.into();
        if host.is_empty() || host.contains(|c: char| c.is_whitespace() || c == '"') {
            return Err(WireError::InvalidAddress(format!("{}:{}", host, port)));
        }
        Ok(Self { host, port })
    }

    /// Loopback address on `port`
    pub fn localhost(port: u16) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port,
        }
    }

    /// Host part
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port part
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Address of the node listening on `port` on this address's host.
    ///
    /// SEARCH messages only carry the port of the previous hop, so a receiver
    /// rebuilds the sender's address from its own host. This is only correct
    /// when every node of the overlay shares a single host identity.
    pub fn with_port(&self, port: u16) -> Self {
        Self {
            host: self.host.clone(),
            port,
        }
    }
}

impl FromStr for PeerAddr {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .trim()
            .rsplit_once(':')
            .ok_or_else(|| WireError::InvalidAddress(s.to_string()))?;
        let port = port
            .parse::<u16>()
            .map_err(|_| WireError::InvalidAddress(s.to_string()))?;
        Self::new(host, port)
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl From<SocketAddr> for PeerAddr {
    fn from(addr: SocketAddr) -> Self {
        Self {
            host: addr.ip().to_string(),
            port: addr.port(),
        }
    }
}
