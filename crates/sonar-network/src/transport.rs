//! Outbound delivery and socket framing

use crate::error::{NetworkError, NetworkResult};
use async_trait::async_trait;
use bytes::BytesMut;
use sonar_wire::{Message, MessageCodec, PeerAddr, WireError, MAX_MESSAGE_SIZE};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

/// Delivers one message to one node.
///
/// Every send is independent: open a connection, write the message, close.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Send `message` to `target`
    async fn send(&self, target: &PeerAddr, message: &Message) -> NetworkResult<()>;
}

/// TCP transport: one short-lived connection per message.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    connect_timeout: Duration,
}

impl TcpTransport {
    /// Create a transport with the given connect/write bound
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&self, target: &PeerAddr, message: &Message) -> NetworkResult<()> {
        let deliver = async {
            let mut stream = TcpStream::connect((target.host(), target.port()))
                .await
                .map_err(|e| NetworkError::ConnectionFailed {
                    addr: target.to_string(),
                    reason: e.to_string(),
                })?;
            write_message(&mut stream, message).await
        };
        tokio::time::timeout(self.connect_timeout, deliver)
            .await
            .map_err(|_| NetworkError::Timeout(format!("sending to {}", target)))?
    }
}

/// Read one message: everything up to EOF, bounded by [`MAX_MESSAGE_SIZE`].
pub async fn read_message<R>(reader: &mut R) -> NetworkResult<Message>
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(1024);
    loop {
        let n = reader.read_buf(&mut buf).await?;
        if n == 0 {
            break;
        }
        if buf.len() > MAX_MESSAGE_SIZE {
            return Err(WireError::TooLarge {
                size: buf.len(),
                max: MAX_MESSAGE_SIZE,
            }
            .into());
        }
    }
    Ok(MessageCodec::decode_message(&buf)?)
}

/// Write one message and close the write side.
pub async fn write_message<W>(writer: &mut W, msg: &Message) -> NetworkResult<()>
where
    W: AsyncWrite + Unpin,
{
    let data = MessageCodec::encode_message(msg);
    writer.write_all(&data).await?;
    writer.flush().await?;
    writer.shutdown().await?;
    Ok(())
}
