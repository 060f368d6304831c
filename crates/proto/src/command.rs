//! Command request and command output packets.
//!
//! A request carries an origin whose UUID is echoed back by the server in the
//! matching output packet; this is how the mediator correlates responses.

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u32)]
pub enum CommandOriginType {
    Player = 0,
    Block = 1,
    MinecartBlock = 2,
    DevConsole = 3,
    Test = 4,
    AutomationPlayer = 5,
    ClientAutomation = 6,
    DedicatedServer = 7,
    Entity = 8,
    Virtual = 9,
    GameArgument = 10,
    EntityServer = 11,
    Precompiled = 12,
    GameDirectorEntityServer = 13,
    Script = 14,
    Executor = 15,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOrigin {
    pub origin_type: CommandOriginType,
    pub uuid: Uuid,
    pub request_id: String,
    pub player_unique_id: i64,
}

impl CommandOrigin {
    pub fn player(uuid: Uuid) -> Self {
        Self {
            origin_type: CommandOriginType::Player,
            uuid,
            request_id: String::new(),
            player_unique_id: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub command_line: String,
    pub origin: CommandOrigin,
    pub internal: bool,
    pub version: i32,
}

impl CommandRequest {
    /// Build a request with a fresh correlation UUID.
    pub fn new(command_line: impl Into<String>) -> Self {
        Self::with_uuid(command_line, Uuid::new_v4())
    }

    pub fn with_uuid(command_line: impl Into<String>, uuid: Uuid) -> Self {
        Self {
            command_line: command_line.into(),
            origin: CommandOrigin::player(uuid),
            internal: false,
            version: 0x24,
        }
    }

    pub fn correlation_id(&self) -> Uuid {
        self.origin.uuid
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputMessage {
    pub success: bool,
    pub message: String,
    pub parameters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub origin: CommandOrigin,
    pub output_type: u8,
    pub success_count: u32,
    pub messages: Vec<OutputMessage>,
    pub data_set: String,
}

impl CommandOutput {
    pub fn correlation_id(&self) -> Uuid {
        self.origin.uuid
    }

    /// Whether at least one target accepted the command.
    pub fn succeeded(&self) -> bool {
        self.success_count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_correlation() {
        let first = CommandRequest::new("list");
        let second = CommandRequest::new("list");
        assert_ne!(first.correlation_id(), second.correlation_id());

        let id = Uuid::new_v4();
        let fixed = CommandRequest::with_uuid("time set day", id);
        assert_eq!(fixed.correlation_id(), id);
        assert_eq!(fixed.command_line, "time set day");
    }
}
