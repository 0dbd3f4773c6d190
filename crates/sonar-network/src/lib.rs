//! # sonar-network
//!
//! Overlay nodes for the Sonar search network.
//!
//! This crate provides:
//! - Neighbour tables maintained by HELLO and BYE
//! - Flooding, random walk and backtracking depth-first key search
//! - Per-mode hit and hop statistics
//! - A TCP service carrying one message per connection
//!
//! ## Architecture
//!
//! ```text
//! +-------------------+
//! |   NodeService     |  <- TCP listener, one task per connection
//! +-------------------+
//!          |
//! +-------------------+
//! |      Node         |  <- Tables, query state, stats
//! +-------------------+
//!          |
//! +--------+--------+
//! | Command| Search |  <- Per-operation behaviour
//! +--------+--------+
//!          |
//! +-------------------+
//! |    Transport      |  <- Outbound connect-send-close
//! +-------------------+
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use sonar_network::{NodeConfig, NodeEvent, NodeService};
//! use sonar_wire::SearchMode;
//!
//! let config = NodeConfig::default()
//!     .with_listen_addr("127.0.0.1:9000".parse()?)
//!     .with_neighbours(vec!["127.0.0.1:9001".parse()?]);
//!
//! let service = NodeService::bind(config).await?;
//! let mut events = service.node().take_events().unwrap();
//! service.start().await?;
//!
//! service.node().search(SearchMode::Flooding, "key").await?;
//! while let Some(event) = events.recv().await {
//!     if let NodeEvent::SearchResolved { value, hop_count, .. } = event {
//!         println!("{} after {} hops", value, hop_count);
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod command;
mod config;
mod error;
mod node;
mod query;
mod search;
mod service;
mod stats;
mod table;
mod transport;

pub use command::{Command, Outcome};
pub use config::{NodeConfig, DEFAULT_TTL};
pub use error::{NetworkError, NetworkResult};
pub use node::{Node, NodeEvent};
pub use query::{BacktrackState, BacktrackTable, FloodSeenSet, QueryKey};
pub use service::NodeService;
pub use stats::{ModeStats, SearchStats, StatsSnapshot};
pub use table::{KeyStore, NeighbourTable};
pub use transport::{read_message, write_message, TcpTransport, Transport};
