//! Message builder

use crate::address::PeerAddr;
use crate::error::{WireError, WireResult};
use crate::message::{ArgumentKey, Message, Operation, Payload, SearchArgs, SearchMode, ValArgs};

/// Fluent builder for [`Message`].
///
/// The builder is consumed by [`MessageBuilder::build`], so nothing leaks
/// from one message into the next. Sequence number and TTL default to 0 and
/// 1; the node supplies its own counter and default TTL when it originates
/// messages.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    origin: Option<PeerAddr>,
    seq_number: u64,
    ttl: u32,
    operation: Option<Operation>,
    mode: Option<SearchMode>,
    last_hop_port: Option<u16>,
    key: Option<String>,
    value: Option<String>,
    hop_count: Option<u32>,
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self {
            origin: None,
            seq_number: 0,
            ttl: 1,
            operation: None,
            mode: None,
            last_hop_port: None,
            key: None,
            value: None,
            hop_count: None,
        }
    }
}

impl MessageBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the origin address
    pub fn origin(mut self, origin: PeerAddr) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Set the sequence number
    pub fn seq_number(mut self, seq_number: u64) -> Self {
        self.seq_number = seq_number;
        self
    }

    /// Set the TTL
    pub fn ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the operation
    pub fn operation(mut self, operation: Operation) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Set the search mode
    pub fn mode(mut self, mode: SearchMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Set the previous hop's listening port
    pub fn last_hop_port(mut self, port: u16) -> Self {
        self.last_hop_port = Some(port);
        self
    }

    /// Set the searched key
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set the found value
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Set the hop count
    pub fn hop_count(mut self, hop_count: u32) -> Self {
        self.hop_count = Some(hop_count);
        self
    }

    /// Shorthand for a freshly originated SEARCH (hop count 1)
    pub fn search(self, mode: SearchMode, last_hop_port: u16, key: impl Into<String>) -> Self {
        self.operation(Operation::Search)
            .mode(mode)
            .last_hop_port(last_hop_port)
            .key(key)
            .hop_count(1)
    }

    /// Shorthand for a VAL answer
    pub fn val(
        self,
        mode: SearchMode,
        key: impl Into<String>,
        value: impl Into<String>,
        hop_count: u32,
    ) -> Self {
        self.operation(Operation::Val)
            .mode(mode)
            .key(key)
            .value(value)
            .hop_count(hop_count)
    }

    /// Set an argument from its wire text
    pub fn argument(self, key: ArgumentKey, raw: &str) -> WireResult<Self> {
        let invalid = |reason: &str| WireError::InvalidArgument {
            key,
            reason: format!("{} ({:?})", reason, raw),
        };
        Ok(match key {
            ArgumentKey::Mode => self.mode(raw.parse()?),
            ArgumentKey::LastHopPort => {
                self.last_hop_port(raw.parse().map_err(|_| invalid("not a port number"))?)
            }
            ArgumentKey::Key => self.key(raw),
            ArgumentKey::Value => self.value(raw),
            ArgumentKey::HopCount => {
                self.hop_count(raw.parse().map_err(|_| invalid("not a hop count"))?)
            }
        })
    }

    /// Validate and finalise the message
    pub fn build(self) -> WireResult<Message> {
        let origin = self.origin.ok_or(WireError::MissingField("origin"))?;
        let operation = self.operation.ok_or(WireError::MissingField("operation"))?;

        let payload = match operation {
            Operation::Hello | Operation::Bye => {
                let stray = [
                    (ArgumentKey::Mode, self.mode.is_some()),
                    (ArgumentKey::LastHopPort, self.last_hop_port.is_some()),
                    (ArgumentKey::Key, self.key.is_some()),
                    (ArgumentKey::Value, self.value.is_some()),
                    (ArgumentKey::HopCount, self.hop_count.is_some()),
                ]
                .into_iter()
                .find(|(_, set)| *set);
                if let Some((key, _)) = stray {
                    return Err(WireError::InvalidArgument {
                        key,
                        reason: format!("not defined for {}", operation),
                    });
                }
                if operation == Operation::Hello {
                    Payload::Hello
                } else {
                    Payload::Bye
                }
            }
            Operation::Search => {
                if self.value.is_some() {
                    return Err(WireError::InvalidArgument {
                        key: ArgumentKey::Value,
                        reason: "not defined for SEARCH".into(),
                    });
                }
                let key = self.key.ok_or(WireError::MissingField("KEY"))?;
                validate_token(ArgumentKey::Key, &key)?;
                Payload::Search(SearchArgs {
                    mode: self.mode.ok_or(WireError::MissingField("MODE"))?,
                    last_hop_port: self
                        .last_hop_port
                        .ok_or(WireError::MissingField("LAST_HOP_PORT"))?,
                    key,
                    hop_count: self.hop_count.ok_or(WireError::MissingField("HOP_COUNT"))?,
                })
            }
            Operation::Val => {
                if self.last_hop_port.is_some() {
                    return Err(WireError::InvalidArgument {
                        key: ArgumentKey::LastHopPort,
                        reason: "not defined for VAL".into(),
                    });
                }
                let key = self.key.ok_or(WireError::MissingField("KEY"))?;
                let value = self.value.ok_or(WireError::MissingField("VALUE"))?;
                validate_token(ArgumentKey::Key, &key)?;
                validate_token(ArgumentKey::Value, &value)?;
                Payload::Val(ValArgs {
                    mode: self.mode.ok_or(WireError::MissingField("MODE"))?,
                    key,
                    value,
                    hop_count: self.hop_count.ok_or(WireError::MissingField("HOP_COUNT"))?,
                })
            }
        };

        Ok(Message {
            origin,
            seq_number: self.seq_number,
            ttl: self.ttl,
            payload,
        })
    }
}

/// Keys and values travel as single space-separated fields.
fn validate_token(key: ArgumentKey, token: &str) -> WireResult<()> {
    if token.is_empty() {
        return Err(WireError::InvalidArgument {
            key,
            reason: "empty".into(),
        });
    }
    if token.contains(|c: char| c.is_whitespace() || c == '"') {
        return Err(WireError::InvalidArgument {
            key,
            reason: format!("{:?} contains whitespace or quotes", token),
        });
    }
    Ok(())
}
