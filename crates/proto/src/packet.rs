//! The decoded packet union passed between transport and mediator.

use bytes::Bytes;

use crate::{CommandOutput, CommandRequest, PlayerList, TextPacket};

/// Bedrock packet identifiers for the packets the mediator understands.
pub mod ids {
    pub const TEXT: u32 = 0x09;
    pub const PLAYER_LIST: u32 = 0x3f;
    pub const COMMAND_REQUEST: u32 = 0x4d;
    pub const COMMAND_OUTPUT: u32 = 0x4f;
}

/// Packet direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketDirection {
    /// Client to server
    Serverbound,
    /// Server to client
    Clientbound,
}

/// A packet the mediator does not model, kept as id plus payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    pub id: u32,
    pub data: Bytes,
    pub direction: PacketDirection,
}

impl RawPacket {
    pub fn new(id: u32, data: impl Into<Bytes>, direction: PacketDirection) -> Self {
        Self {
            id,
            data: data.into(),
            direction,
        }
    }

    /// Total size including the packet id.
    pub fn size(&self) -> usize {
        4 + self.data.len()
    }
}

/// A decoded Bedrock packet.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Text(TextPacket),
    PlayerList(PlayerList),
    CommandRequest(CommandRequest),
    CommandOutput(CommandOutput),
    Raw(RawPacket),
}

impl Packet {
    /// Numeric packet id, used as the key for typed-packet subscriptions.
    pub fn id(&self) -> u32 {
        match self {
            Self::Text(_) => ids::TEXT,
            Self::PlayerList(_) => ids::PLAYER_LIST,
            Self::CommandRequest(_) => ids::COMMAND_REQUEST,
            Self::CommandOutput(_) => ids::COMMAND_OUTPUT,
            Self::Raw(raw) => raw.id,
        }
    }

    pub fn direction(&self) -> PacketDirection {
        match self {
            Self::CommandRequest(_) => PacketDirection::Serverbound,
            Self::Raw(raw) => raw.direction,
            _ => PacketDirection::Clientbound,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Text(_) => "Text",
            Self::PlayerList(_) => "PlayerList",
            Self::CommandRequest(_) => "CommandRequest",
            Self::CommandOutput(_) => "CommandOutput",
            Self::Raw(_) => "Raw",
        }
    }
}

impl From<TextPacket> for Packet {
    fn from(value: TextPacket) -> Self {
        Self::Text(value)
    }
}

impl From<PlayerList> for Packet {
    fn from(value: PlayerList) -> Self {
        Self::PlayerList(value)
    }
}

impl From<CommandRequest> for Packet {
    fn from(value: CommandRequest) -> Self {
        Self::CommandRequest(value)
    }
}

impl From<CommandOutput> for Packet {
    fn from(value: CommandOutput) -> Self {
        Self::CommandOutput(value)
    }
}

impl From<RawPacket> for Packet {
    fn from(value: RawPacket) -> Self {
        Self::Raw(value)
    }
}
