//! Network error types

use sonar_wire::WireError;
use thiserror::Error;

/// Network errors
#[derive(Debug, Error)]
pub enum NetworkError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or incomplete message
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// Connection failed
    #[error("connection to {addr} failed: {reason}")]
    ConnectionFailed {
        /// Target address
        addr: String,
        /// Underlying failure
        reason: String,
    },

    /// Timeout
    #[error("timeout: {0}")]
    Timeout(String),

    /// No neighbour at the requested table index
    #[error("no neighbour at index {0}")]
    NoSuchNeighbour(usize),

    /// Not running
    #[error("node service not running")]
    NotRunning,

    /// Already running
    #[error("node service already running")]
    AlreadyRunning,
}

/// Result type for network operations
pub type NetworkResult<T> = Result<T, NetworkError>;
