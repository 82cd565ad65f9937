use bytemuck::{Pod, Zeroable};

pub const MAX_PLAYERS: usize = 32;
pub const MAX_FLOORS: u32 = 4;
pub const OBJECTIVES_PER_FLOOR: usize = 16;
pub const MAX_OBJECTIVES: usize = OBJECTIVES_PER_FLOOR * MAX_FLOORS as usize;
pub const MAX_NAME: usize = 32;
pub const MAX_MESSAGE: usize = 128;

pub const CONNECT_CODE_ACCEPTED: u32 = 0;
pub const CONNECT_CODE_DENIED: u32 = 1;

pub const GAME_IN_PROGRESS: u32 = 0;
pub const GAME_TEAM1_WIN: u32 = 1;
pub const GAME_TEAM2_WIN: u32 = 2;

/// Fixed-size wire layout of a packet payload.
///
/// Implementors are `#[repr(C)]` records without padding, so the payload size
/// of a packet type is exactly `size_of::<Self>()`.
pub trait Payload: Pod {
    const SIZE: usize = std::mem::size_of::<Self>();
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PlayerName {
    pub player_number: u32,
    pub name: [u8; MAX_NAME],
}

impl PlayerName {
    pub fn new(player_number: u32, name: &str) -> Self {
        Self {
            player_number,
            name: fixed_str(name),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct PlayerConnect {
    pub connect_code: u32,
    pub player_number: u32,
    pub team: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct GameStatus {
    pub player_valid: [u8; MAX_PLAYERS],
    pub ready: [u8; MAX_PLAYERS],
    pub teams: [u8; MAX_PLAYERS],
    pub characters: [u8; MAX_PLAYERS],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct Chat {
    pub sender: u32,
    pub message: [u8; MAX_MESSAGE],
}

impl Chat {
    pub fn new(sender: u32, message: &str) -> Self {
        Self {
            sender,
            message: fixed_str(message),
        }
    }

    pub fn text(&self) -> String {
        trim_nul(&self.message)
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct ClientLobby {
    pub player_number: u32,
    pub team: u32,
    pub ready: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ObjectiveLocations {
    pub floor: u32,
    pub x: [f32; OBJECTIVES_PER_FLOOR],
    pub y: [f32; OBJECTIVES_PER_FLOOR],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PositionUpdate {
    pub player_number: u32,
    pub floor: u32,
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct AllPositionUpdate {
    pub floor: u32,
    pub on_floor: [u8; MAX_PLAYERS],
    pub x: [f32; MAX_PLAYERS],
    pub y: [f32; MAX_PLAYERS],
    pub vel_x: [f32; MAX_PLAYERS],
    pub vel_y: [f32; MAX_PLAYERS],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FloorMoveRequest {
    pub current_floor: u32,
    pub desired_floor: u32,
    pub x: f32,
    pub y: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FloorMove {
    pub new_floor: u32,
    pub x: f32,
    pub y: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct Tagging {
    pub tagger: u32,
    pub taggee: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct ObjectiveStatus {
    pub captured: [u8; MAX_OBJECTIVES],
    pub game_status: u32,
}

impl Payload for PlayerName {}
impl Payload for PlayerConnect {}
impl Payload for GameStatus {}
impl Payload for Chat {}
impl Payload for ClientLobby {}
impl Payload for ObjectiveLocations {}
impl Payload for PositionUpdate {}
impl Payload for AllPositionUpdate {}
impl Payload for FloorMoveRequest {}
impl Payload for FloorMove {}
impl Payload for Tagging {}
impl Payload for ObjectiveStatus {}

fn fixed_str<const N: usize>(text: &str) -> [u8; N] {
    let mut buf = [0u8; N];
    // Keep one trailing NUL so receivers can always find the end.
    let len = text.len().min(N - 1);
    buf[..len].copy_from_slice(&text.as_bytes()[..len]);
    buf
}

fn trim_nul(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
