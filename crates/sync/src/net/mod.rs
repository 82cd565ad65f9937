mod config;
mod error;
pub mod packets;
mod protocol;
mod receiver;
mod router;
mod sender;
mod stats;
mod transport;

pub use config::NetConfig;
pub use error::{NetError, TransportError};
pub use protocol::{
    DEFAULT_TCP_PORT, DEFAULT_UDP_PORT, HEADER_SIZE, MAX_DATAGRAM_SIZE, NUM_PACKET_TYPES, Packet,
    PacketError, PacketType, Reliability, TIMESTAMP_SIZE, decode, decode_datagram, encode,
    encode_datagram, frame_header, size_of,
};
pub use receiver::{ReceiveState, ReceiveWorker};
pub use router::{Fetch, InboundEvent, NetworkRouter};
pub use sender::{Outbound, SendWorker};
pub use stats::{NetworkStats, SharedStats};
pub use transport::{Channel, Readiness, ReceiveHalf, SendHalf, ShutdownHandle};
