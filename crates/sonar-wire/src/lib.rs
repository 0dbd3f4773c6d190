//! # sonar-wire
//!
//! Message model and text wire protocol for the Sonar search overlay.
//!
//! Every message travels alone over a fresh TCP connection as one quoted
//! line:
//!
//! ```text
//! "<origin> <seq_number> <ttl> <operation> [<arg1> <arg2> <arg3> <arg4>]"
//!
//! SEARCH args: MODE LAST_HOP_PORT KEY HOP_COUNT
//! VAL args:    MODE KEY VALUE HOP_COUNT
//! HELLO, BYE:  none
//! ```
//!
//! ## Usage
//!
//! ```
//! use sonar_wire::{Message, MessageCodec, SearchMode};
//!
//! let msg = Message::builder()
//!     .origin("127.0.0.1:9000".parse().unwrap())
//!     .seq_number(1)
//!     .ttl(5)
//!     .search(SearchMode::RandomWalk, 9000, "foo")
//!     .build()
//!     .unwrap();
//!
//! let text = MessageCodec::encode(&msg);
//! assert_eq!(text, "\"127.0.0.1:9000 1 5 SEARCH RW 9000 foo 1\"");
//! assert_eq!(MessageCodec::decode(&text).unwrap(), msg);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod builder;
mod codec;
mod error;
mod message;

pub use address::PeerAddr;
pub use builder::MessageBuilder;
pub use codec::{MessageCodec, MAX_MESSAGE_SIZE};
pub use error::{WireError, WireResult};
pub use message::{ArgumentKey, Message, Operation, Payload, SearchArgs, SearchMode, ValArgs};
