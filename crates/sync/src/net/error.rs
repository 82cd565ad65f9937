use std::io;

use super::protocol::PacketError;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("server closed the connection")]
    ConnectionClosed,
    #[error("connect failed: {0}")]
    Connect(#[source] io::Error),
    #[error("receive failed: {0}")]
    Receive(#[source] io::Error),
    #[error("send failed: {0}")]
    Send(#[source] io::Error),
    #[error("could not allocate a {0} byte receive buffer")]
    OutOfMemory(usize),
}

/// Everything the network layer can report upward.
///
/// Only `ProtocolCorruption` is survivable inside the workers; the rest end
/// the connection or, for `ConnectionDenied`, the connection attempt.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("transport error: {0}")]
    Transport(#[source] TransportError),
    #[error("received corrupted data: {0}")]
    ProtocolCorruption(#[source] PacketError),
    #[error("invalid outbound packet: {0}")]
    InvalidPacket(#[from] PacketError),
    #[error("the server denied the connection")]
    ConnectionDenied,
    #[error("network shut down: {0}")]
    ServerShutdown(String),
    #[error("resource exhaustion: {0}")]
    ResourceExhaustion(String),
    #[error("not connected")]
    NotConnected,
    #[error("failed to start network worker: {0}")]
    Spawn(#[source] io::Error),
}

impl From<TransportError> for NetError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::OutOfMemory(_) => Self::ResourceExhaustion(err.to_string()),
            other => Self::Transport(other),
        }
    }
}
