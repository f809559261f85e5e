//! Controller state

use tokio::time::Instant;
use zone_map::Zone;

/// Where the controller is in the dwell/move cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No zone targeted
    #[default]
    Idle,
    /// Looking at `zone` since `since`; `triggered` once a stop-zone dwell has fired
    Dwelling {
        zone: Zone,
        since: Instant,
        triggered: bool,
    },
    /// A movement command for `zone` is active
    Moving { zone: Zone },
}

/// State owned by the controller
#[derive(Debug, Clone, Default)]
pub struct ControllerState {
    pub phase: Phase,
    /// Arrival time of the last frame
    pub last_sample_time: Option<Instant>,
    /// Last zone a movement command was issued for
    pub last_move_zone: Option<Zone>,
}

impl ControllerState {
    pub fn active_zone(&self) -> Option<Zone> {
        match self.phase {
            Phase::Idle => None,
            Phase::Dwelling { zone, .. } | Phase::Moving { zone } => Some(zone),
        }
    }

    pub fn dwell_start_time(&self) -> Option<Instant> {
        match self.phase {
            Phase::Dwelling { since, .. } => Some(since),
            _ => None,
        }
    }

    pub fn is_moving(&self) -> bool {
        matches!(self.phase, Phase::Moving { .. })
    }

    /// Reset state (on teardown or link loss)
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
