//! Drive Command Encoding

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::wire;

/// A command understood by the vehicle controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriveCommand {
    Forward,
    Backward,
    Left,
    Right,
    Stop,
    /// Set speed to the given percent
    Speed(u16),
}

impl DriveCommand {
    /// Map an intent id (`"forward"`, `"left"`, ...) to its command.
    ///
    /// Unknown ids map to `Stop` so any caller can always produce a valid command.
    pub fn from_id(id: &str) -> Self {
        match id {
            "forward" => DriveCommand::Forward,
            "backward" => DriveCommand::Backward,
            "left" => DriveCommand::Left,
            "right" => DriveCommand::Right,
            _ => DriveCommand::Stop,
        }
    }

    /// Encode to the wire string
    pub fn encode(&self) -> String {
        match self {
            DriveCommand::Forward => wire::FORWARD.to_string(),
            DriveCommand::Backward => wire::BACKWARD.to_string(),
            DriveCommand::Left => wire::LEFT.to_string(),
            DriveCommand::Right => wire::RIGHT.to_string(),
            DriveCommand::Stop => wire::STOP.to_string(),
            DriveCommand::Speed(percent) => format!("{}{}", wire::SPEED_PREFIX, percent),
        }
    }

    /// Encoded bytes as written to the link
    pub fn to_bytes(&self) -> Vec<u8> {
        self.encode().into_bytes()
    }

    /// Check if this command sets the vehicle in motion
    pub fn is_movement(&self) -> bool {
        matches!(
            self,
            DriveCommand::Forward | DriveCommand::Backward | DriveCommand::Left | DriveCommand::Right
        )
    }
}

impl fmt::Display for DriveCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
