use super::packets::{
    AllPositionUpdate, Chat, ClientLobby, FloorMove, FloorMoveRequest, GameStatus,
    ObjectiveLocations, ObjectiveStatus, Payload, PlayerConnect, PlayerName, PositionUpdate,
    Tagging,
};

pub const DEFAULT_TCP_PORT: u16 = 42337;
pub const DEFAULT_UDP_PORT: u16 = 42338;

/// Highest valid packet type identifier.
pub const NUM_PACKET_TYPES: u32 = 14;

pub const HEADER_SIZE: usize = std::mem::size_of::<u32>();
pub const TIMESTAMP_SIZE: usize = std::mem::size_of::<u64>();
pub const MAX_DATAGRAM_SIZE: usize = 1200;

#[cfg(not(target_endian = "little"))]
compile_error!("payload layouts are cast directly and assume a little-endian host");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum PacketType {
    PlayerName = 1,
    PlayerConnect = 2,
    GameStatus = 3,
    Chat = 4,
    ClientLobby = 5,
    ObjectiveLocations = 6,
    Reserved = 7,
    PositionUpdate = 8,
    AllPositionUpdate = 9,
    FloorMoveRequest = 10,
    FloorMove = 11,
    Tagging = 12,
    KeepAlive = 13,
    ObjectiveStatus = 14,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reliability {
    Reliable,
    Unreliable,
}

impl PacketType {
    pub const ALL: [PacketType; NUM_PACKET_TYPES as usize] = [
        Self::PlayerName,
        Self::PlayerConnect,
        Self::GameStatus,
        Self::Chat,
        Self::ClientLobby,
        Self::ObjectiveLocations,
        Self::Reserved,
        Self::PositionUpdate,
        Self::AllPositionUpdate,
        Self::FloorMoveRequest,
        Self::FloorMove,
        Self::Tagging,
        Self::KeepAlive,
        Self::ObjectiveStatus,
    ];

    pub fn id(self) -> u32 {
        self as u32
    }

    pub fn payload_size(self) -> usize {
        match self {
            Self::PlayerName => PlayerName::SIZE,
            Self::PlayerConnect => PlayerConnect::SIZE,
            Self::GameStatus => GameStatus::SIZE,
            Self::Chat => Chat::SIZE,
            Self::ClientLobby => ClientLobby::SIZE,
            Self::ObjectiveLocations => ObjectiveLocations::SIZE,
            Self::Reserved | Self::KeepAlive => 0,
            Self::PositionUpdate => PositionUpdate::SIZE,
            Self::AllPositionUpdate => AllPositionUpdate::SIZE,
            Self::FloorMoveRequest => FloorMoveRequest::SIZE,
            Self::FloorMove => FloorMove::SIZE,
            Self::Tagging => Tagging::SIZE,
            Self::ObjectiveStatus => ObjectiveStatus::SIZE,
        }
    }

    pub fn reliability(self) -> Reliability {
        match self {
            Self::PositionUpdate
            | Self::AllPositionUpdate
            | Self::FloorMoveRequest
            | Self::FloorMove
            | Self::Tagging => Reliability::Unreliable,
            _ => Reliability::Reliable,
        }
    }
}

impl TryFrom<u32> for PacketType {
    type Error = PacketError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        match raw {
            1..=NUM_PACKET_TYPES => Ok(Self::ALL[raw as usize - 1]),
            _ => Err(PacketError::InvalidType(raw)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PacketError {
    #[error("invalid packet type {0}")]
    InvalidType(u32),
    #[error("{kind:?} payload must be {expected} bytes, got {actual}")]
    PayloadSize {
        kind: PacketType,
        expected: usize,
        actual: usize,
    },
    #[error("truncated packet: need {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("{field} index {index} out of range")]
    OutOfRange { field: &'static str, index: u32 },
}

/// Payload size for a raw type identifier straight off the wire.
pub fn size_of(raw: u32) -> Result<usize, PacketError> {
    PacketType::try_from(raw).map(PacketType::payload_size)
}

pub fn frame_header(kind: PacketType) -> [u8; HEADER_SIZE] {
    kind.id().to_le_bytes()
}

fn check_payload(kind: PacketType, payload: &[u8]) -> Result<(), PacketError> {
    let expected = kind.payload_size();
    if payload.len() != expected {
        return Err(PacketError::PayloadSize {
            kind,
            expected,
            actual: payload.len(),
        });
    }
    Ok(())
}

fn read_header(bytes: &[u8]) -> Result<PacketType, PacketError> {
    let header: [u8; HEADER_SIZE] = bytes
        .get(..HEADER_SIZE)
        .and_then(|h| h.try_into().ok())
        .ok_or(PacketError::Truncated {
            expected: HEADER_SIZE,
            actual: bytes.len(),
        })?;
    PacketType::try_from(u32::from_le_bytes(header))
}

/// `[u32 type][payload]`, the stream framing.
pub fn encode(kind: PacketType, payload: &[u8]) -> Result<Vec<u8>, PacketError> {
    check_payload(kind, payload)?;
    let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
    bytes.extend_from_slice(&frame_header(kind));
    bytes.extend_from_slice(payload);
    Ok(bytes)
}

pub fn decode(bytes: &[u8]) -> Result<(PacketType, Vec<u8>), PacketError> {
    let kind = read_header(bytes)?;
    let expected = HEADER_SIZE + kind.payload_size();
    if bytes.len() != expected {
        return Err(PacketError::Truncated {
            expected,
            actual: bytes.len(),
        });
    }
    Ok((kind, bytes[HEADER_SIZE..].to_vec()))
}

/// Client datagrams carry no timestamp; the server stamps its own.
pub fn encode_datagram(kind: PacketType, payload: &[u8]) -> Result<Vec<u8>, PacketError> {
    encode(kind, payload)
}

/// Server datagrams: `[u32 type][payload][u64 timestamp]`.
pub fn decode_datagram(bytes: &[u8]) -> Result<(PacketType, Vec<u8>, u64), PacketError> {
    let kind = read_header(bytes)?;
    let payload_end = HEADER_SIZE + kind.payload_size();
    let expected = payload_end + TIMESTAMP_SIZE;
    if bytes.len() < expected {
        return Err(PacketError::Truncated {
            expected,
            actual: bytes.len(),
        });
    }

    let mut stamp = [0u8; TIMESTAMP_SIZE];
    stamp.copy_from_slice(&bytes[payload_end..expected]);

    Ok((
        kind,
        bytes[HEADER_SIZE..payload_end].to_vec(),
        u64::from_le_bytes(stamp),
    ))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub kind: PacketType,
    pub payload: Vec<u8>,
    pub timestamp: u64,
}

impl Packet {
    pub fn new(kind: PacketType, payload: Vec<u8>, timestamp: u64) -> Self {
        Self {
            kind,
            payload,
            timestamp,
        }
    }

    pub fn from_payload<T: Payload>(kind: PacketType, payload: &T, timestamp: u64) -> Self {
        Self::new(kind, bytemuck::bytes_of(payload).to_vec(), timestamp)
    }

    /// Reinterprets the payload as its wire layout.
    pub fn read<T: Payload>(&self) -> Result<T, PacketError> {
        bytemuck::try_pod_read_unaligned(&self.payload).map_err(|_| PacketError::PayloadSize {
            kind: self.kind,
            expected: T::SIZE,
            actual: self.payload.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payload(kind: PacketType) -> Vec<u8> {
        (0..kind.payload_size()).map(|i| (i * 7 + 3) as u8).collect()
    }

    #[test]
    fn test_round_trip_every_type() {
        for kind in PacketType::ALL {
            let payload = sample_payload(kind);
            let bytes = encode(kind, &payload).unwrap();
            assert_eq!(bytes.len(), HEADER_SIZE + kind.payload_size());

            let (decoded_kind, decoded_payload) = decode(&bytes).unwrap();
            assert_eq!(decoded_kind, kind);
            assert_eq!(decoded_payload, payload);
        }
    }

    #[test]
    fn test_invalid_types_are_corruption() {
        for raw in [0, NUM_PACKET_TYPES + 1, 90, u32::MAX] {
            let mut bytes = raw.to_le_bytes().to_vec();
            bytes.extend_from_slice(&[0u8; 16]);
            assert_eq!(decode(&bytes), Err(PacketError::InvalidType(raw)));
            assert_eq!(size_of(raw), Err(PacketError::InvalidType(raw)));
        }
    }

    #[test]
    fn test_decode_never_panics_on_short_input() {
        assert!(matches!(decode(&[]), Err(PacketError::Truncated { .. })));
        assert!(matches!(decode(&[2, 0]), Err(PacketError::Truncated { .. })));

        let header = PacketType::GameStatus.id().to_le_bytes();
        assert!(matches!(
            decode(&header),
            Err(PacketError::Truncated { .. })
        ));
    }

    #[test]
    fn test_encode_rejects_wrong_payload_size() {
        let err = encode(PacketType::FloorMove, &[0u8; 3]).unwrap_err();
        assert_eq!(
            err,
            PacketError::PayloadSize {
                kind: PacketType::FloorMove,
                expected: 12,
                actual: 3
            }
        );
    }

    #[test]
    fn test_datagram_carries_sender_timestamp() {
        let payload = sample_payload(PacketType::AllPositionUpdate);
        let mut bytes = encode_datagram(PacketType::AllPositionUpdate, &payload).unwrap();
        bytes.extend_from_slice(&987_654u64.to_le_bytes());

        let (kind, decoded, timestamp) = decode_datagram(&bytes).unwrap();
        assert_eq!(kind, PacketType::AllPositionUpdate);
        assert_eq!(decoded, payload);
        assert_eq!(timestamp, 987_654);
    }

    #[test]
    fn test_datagram_without_timestamp_is_truncated() {
        let payload = sample_payload(PacketType::FloorMove);
        let bytes = encode_datagram(PacketType::FloorMove, &payload).unwrap();
        assert!(matches!(
            decode_datagram(&bytes),
            Err(PacketError::Truncated { .. })
        ));
    }

    #[test]
    fn test_protocol_assignment() {
        assert_eq!(PacketType::GameStatus.reliability(), Reliability::Reliable);
        assert_eq!(PacketType::KeepAlive.reliability(), Reliability::Reliable);
        assert_eq!(
            PacketType::AllPositionUpdate.reliability(),
            Reliability::Unreliable
        );
        assert_eq!(PacketType::Tagging.reliability(), Reliability::Unreliable);
    }

    #[test]
    fn test_typed_payload_read() {
        let mv = FloorMove {
            new_floor: 2,
            x: 10.0,
            y: 20.0,
        };
        let packet = Packet::from_payload(PacketType::FloorMove, &mv, 0);
        assert_eq!(packet.read::<FloorMove>().unwrap(), mv);
        assert!(packet.read::<GameStatus>().is_err());
    }
}
