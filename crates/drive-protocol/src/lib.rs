//! Drive Protocol Implementation
//!
//! This crate provides the command protocol spoken to the wheelchair
//! (or toy vehicle) controller, and the transport contract the gaze
//! controller depends on. Commands are single ASCII letters, with speed
//! carried as `V<percent>`.

mod command;
mod dispatcher;
mod error;
mod mock;
mod serial;
mod transport;

pub use command::DriveCommand;
pub use dispatcher::{CommandDispatcher, CommandSender, DispatchStats, SendFailure};
pub use error::TransportError;
pub use mock::{MockHandle, MockTransport};
pub use serial::{SerialTransport, TransportConfig};
pub use transport::{ConnectionState, Transport};

/// Wire command letters
pub mod wire {
    /// Move forward
    pub const FORWARD: &str = "F";
    /// Move backward
    pub const BACKWARD: &str = "B";
    /// Turn left
    pub const LEFT: &str = "L";
    /// Turn right
    pub const RIGHT: &str = "R";
    /// Stop
    pub const STOP: &str = "S";
    /// Speed prefix, followed by the integer percent
    pub const SPEED_PREFIX: &str = "V";
}
