//! Seams to the network transport.
//!
//! The transport owns the socket and the codec. Inbound, it feeds
//! [`InboundEvent`]s into the framework's event loop over a channel; outbound,
//! the framework hands it decoded packets through [`PacketSink`].

use proto::Packet;
use thiserror::Error;

use crate::identity::SelfInfo;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection closed")]
    Closed,

    #[error("Send failed: {0}")]
    Send(String),
}

/// Outbound half of the transport.
///
/// `Ok` only means the packet was accepted for transmission.
pub trait PacketSink: Send + Sync {
    fn write_packet(&self, packet: Packet) -> Result<(), TransportError>;
}

/// Everything the event loop consumes.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    /// The agent finished logging in and learned its own identity.
    Identified(SelfInfo),
    Packet(Packet),
    ConnectionLost { reason: String },
    /// One line typed at the backend console.
    BackendLine(String),
}

impl From<Packet> for InboundEvent {
    fn from(packet: Packet) -> Self {
        Self::Packet(packet)
    }
}
