//! Bedrock packet model for Tether
//!
//! This crate holds the packet types the mediator consumes from and hands to the
//! transport. Encoding and decoding are the transport's business; only the
//! already-decoded shapes live here.

#![warn(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::unwrap_used,
    clippy::str_to_string,
    clippy::clone_on_ref_ptr,
    clippy::explicit_iter_loop,
    clippy::implicit_clone,
    clippy::inefficient_to_string,
    clippy::manual_let_else,
    clippy::redundant_closure_for_method_calls,
    clippy::trivially_copy_pass_by_ref,
    clippy::unused_self
)]

pub mod command;
pub mod packet;
pub mod player_list;
pub mod rawtext;
pub mod text;

pub use uuid;

pub use command::{CommandOrigin, CommandOriginType, CommandOutput, CommandRequest, OutputMessage};
pub use packet::{ids, Packet, PacketDirection, RawPacket};
pub use player_list::{PlayerList, PlayerListAction, PlayerListEntry};
pub use rawtext::RawText;
pub use text::{TextPacket, TextType};
