//! Text encoding for the overlay wire protocol

use crate::builder::MessageBuilder;
use crate::error::{WireError, WireResult};
use crate::message::{Message, Operation};

/// Maximum accepted frame size (64 KiB).
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Fields every message carries before its arguments.
const HEADER_FIELDS: usize = 4;

/// Codec for the overlay's text messages.
///
/// Wire format: one double-quoted line of space-separated fields,
/// `"origin seq_number ttl operation [arg1 arg2 arg3 arg4]"`. Arguments are
/// raw values in the order given by [`Operation::argument_schema`].
#[derive(Debug, Default, Clone, Copy)]
pub struct MessageCodec;

impl MessageCodec {
    /// Encodes a message to its wire text.
    pub fn encode(msg: &Message) -> String {
        let mut fields = vec![
            msg.origin().to_string(),
            msg.seq_number().to_string(),
            msg.ttl().to_string(),
            msg.operation().to_string(),
        ];
        fields.extend(msg.arguments().into_iter().map(|(_, value)| value));
        format!("\"{}\"", fields.join(" "))
    }

    /// Decodes a message from its wire text.
    pub fn decode(text: &str) -> WireResult<Message> {
        let text = text.trim();
        let text = text.strip_prefix('"').unwrap_or(text);
        let text = text.strip_suffix('"').unwrap_or(text);

        let fields: Vec<&str> = text.split_whitespace().collect();
        if fields.len() < HEADER_FIELDS {
            return Err(WireError::Format(format!(
                "expected at least {} fields, got {}",
                HEADER_FIELDS,
                fields.len()
            )));
        }

        let origin = fields[0].parse()?;
        let seq_number = fields[1]
            .parse::<u64>()
            .map_err(|_| WireError::Format(format!("invalid sequence number {:?}", fields[1])))?;
        let ttl = fields[2]
            .parse::<u32>()
            .map_err(|_| WireError::Format(format!("invalid ttl {:?}", fields[2])))?;
        let operation: Operation = fields[3].parse()?;

        let schema = operation.argument_schema();
        let raw_args = &fields[HEADER_FIELDS..];
        if raw_args.len() != schema.len() {
            return Err(WireError::ArgumentCount {
                operation,
                expected: schema.len(),
                actual: raw_args.len(),
            });
        }

        let mut builder = MessageBuilder::new()
            .origin(origin)
            .seq_number(seq_number)
            .ttl(ttl)
            .operation(operation);
        for (key, raw) in schema.iter().zip(raw_args) {
            builder = builder.argument(*key, raw)?;
        }
        builder.build()
    }

    /// Encodes a message to bytes for the socket.
    pub fn encode_message(msg: &Message) -> Vec<u8> {
        Self::encode(msg).into_bytes()
    }

    /// Decodes a message from bytes read off the socket.
    pub fn decode_message(data: &[u8]) -> WireResult<Message> {
        if data.len() > MAX_MESSAGE_SIZE {
            return Err(WireError::TooLarge {
                size: data.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }
        let text = std::str::from_utf8(data)
            .map_err(|e| WireError::Format(format!("invalid utf-8: {}", e)))?;
        Self::decode(text)
    }
}
