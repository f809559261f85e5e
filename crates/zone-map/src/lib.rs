//! Control Zone Map
//!
//! Classifies gaze points into the directional control zones
//! (forward, backward, left, right, stop). Zones are plain geometry,
//! independent of any rendering, with asymmetric padding so entering a
//! control is forgiving and leaving it is strict.

mod map;
mod region;

pub use map::{HitPadding, HitTest, ZoneMap, ZoneSpec};
pub use region::Region;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Zone map error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ZoneError {
    #[error("Zone {0} defined more than once")]
    DuplicateZone(Zone),

    #[error("Zones {0} and {1} overlap")]
    Overlap(Zone, Zone),

    #[error("Degenerate region for zone {zone}: {reason}")]
    DegenerateRegion { zone: Zone, reason: String },
}

/// A directional control zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Forward,
    Backward,
    Left,
    Right,
    Stop,
}

impl Zone {
    pub const ALL: [Zone; 5] = [
        Zone::Forward,
        Zone::Backward,
        Zone::Left,
        Zone::Right,
        Zone::Stop,
    ];

    /// Stable identifier, shared with the command encoder
    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Forward => "forward",
            Zone::Backward => "backward",
            Zone::Left => "left",
            Zone::Right => "right",
            Zone::Stop => "stop",
        }
    }

    /// Check if looking at this zone moves the vehicle
    pub fn is_directional(&self) -> bool {
        !matches!(self, Zone::Stop)
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
