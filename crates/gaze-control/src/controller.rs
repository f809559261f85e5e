//! Gaze command state machine

use drive_protocol::DriveCommand;
use gaze_source::{GazeFrame, ScreenPoint};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use zone_map::{HitTest, Zone, ZoneMap};

use crate::{CommandSink, ControllerConfig, ControllerState, DelayTimer, Phase};

fn command_for(zone: Zone) -> DriveCommand {
    DriveCommand::from_id(zone.as_str())
}

/// Converts gaze frames into drive commands.
///
/// Every input carries the time it is processed at, so the controller has
/// no clock of its own. Pending timers are exposed through
/// [`GazeController::next_deadline`] and run by [`GazeController::on_timer`].
pub struct GazeController<C> {
    config: ControllerConfig,
    zones: ZoneMap,
    sink: C,
    state: ControllerState,
    /// Brake watchdog, re-armed by every "still in zone" sample while moving
    watchdog: DelayTimer,
    /// Second stop after a zone exit, tracking loss or watchdog brake
    repeat_stop: DelayTimer,
    speed: u16,
    link_up: bool,
}

impl<C: CommandSink> GazeController<C> {
    pub fn new(config: ControllerConfig, zones: ZoneMap, sink: C) -> Self {
        info!(
            "Creating gaze controller: dwell {} ms, brake timeout {} ms",
            config.dwell_ms, config.brake_timeout_ms
        );
        let link_up = sink.is_connected();
        Self {
            speed: config.default_speed.min(config.max_speed),
            config,
            zones,
            sink,
            state: ControllerState::default(),
            watchdog: DelayTimer::new(),
            repeat_stop: DelayTimer::new(),
            link_up,
        }
    }

    /// Process one gaze frame received at `now`
    pub fn handle_frame(&mut self, frame: &GazeFrame, now: Instant) {
        self.state.last_sample_time = Some(now);

        // Tracking loss takes priority over every other transition
        let sample = match frame {
            GazeFrame::Absent { .. } => {
                self.on_tracking_lost(now);
                return;
            }
            GazeFrame::Sample(sample) => sample,
        };

        if !self.sink.is_connected() {
            if self.link_up {
                self.on_connection_change(false);
            }
            debug!("Link down, gaze at ({:.0}, {:.0}) ignored", sample.x, sample.y);
            return;
        }
        self.link_up = true;

        self.handle_point(&sample.point(), now);
    }

    fn handle_point(&mut self, point: &ScreenPoint, now: Instant) {
        match self.state.phase {
            Phase::Idle => {
                if let Some(zone) = self.zones.classify_with(point, HitTest::Loose) {
                    self.start_dwell(zone, now);
                }
            }
            Phase::Dwelling {
                zone,
                since,
                triggered,
            } => {
                // Grown regions overlap near shared borders, so the dwell
                // continues only while the point still classifies as `zone`
                match self.zones.classify_with(point, HitTest::Loose) {
                    Some(hit) if hit == zone => {
                        if !triggered && now.duration_since(since) >= self.dwell() {
                            self.activate(zone, now);
                        }
                    }
                    Some(next) => self.start_dwell(next, now),
                    None => {
                        debug!("Dwell on {} abandoned", zone);
                        self.state.phase = Phase::Idle;
                    }
                }
            }
            Phase::Moving { zone } => {
                if self.zones.contains(zone, point, HitTest::Tight) {
                    self.watchdog.schedule(now, self.brake_timeout());
                    return;
                }
                let next = self
                    .zones
                    .classify_with(point, HitTest::Loose)
                    .filter(|next| *next != zone);
                match next {
                    Some(next) => {
                        // Never command two directions without a stop between them
                        info!("Gaze moved from {} to {}, stopping", zone, next);
                        self.stop(now, false);
                    }
                    None => {
                        info!("Gaze left {}, stopping", zone);
                        self.stop(now, true);
                    }
                }
            }
        }
    }

    fn start_dwell(&mut self, zone: Zone, now: Instant) {
        debug!("Dwelling on {}", zone);
        self.state.phase = Phase::Dwelling {
            zone,
            since: now,
            triggered: false,
        };
    }

    fn activate(&mut self, zone: Zone, now: Instant) {
        if !zone.is_directional() {
            info!("Stop zone selected");
            self.sink.send(DriveCommand::Stop);
            if let Phase::Dwelling { triggered, .. } = &mut self.state.phase {
                *triggered = true;
            }
            return;
        }

        let command = command_for(zone);
        info!("Dwell complete on {}, sending {}", zone, command);
        self.repeat_stop.cancel();
        self.sink.send(command);
        self.state.phase = Phase::Moving { zone };
        self.state.last_move_zone = Some(zone);
        self.watchdog.schedule(now, self.brake_timeout());
    }

    fn on_tracking_lost(&mut self, now: Instant) {
        match self.state.phase {
            Phase::Moving { zone } => {
                warn!("Tracking lost while moving {}, emergency stop", zone);
                self.stop(now, true);
            }
            Phase::Dwelling { zone, .. } => {
                debug!("Tracking lost, dwell on {} abandoned", zone);
                self.state.phase = Phase::Idle;
            }
            Phase::Idle => {}
        }
    }

    /// Send stop now (and again after the repeat delay if `repeat`), then go idle
    fn stop(&mut self, now: Instant, repeat: bool) {
        self.sink.send(DriveCommand::Stop);
        if repeat {
            self.repeat_stop
                .schedule(now, Duration::from_millis(self.config.stop_repeat_delay_ms));
        }
        self.watchdog.cancel();
        self.state.phase = Phase::Idle;
    }

    /// Stop immediately regardless of state.
    ///
    /// Safe to call while the link is down (the send is dropped).
    pub fn emergency_stop(&mut self, now: Instant) {
        let was_moving = self.state.is_moving();
        warn!("Emergency stop");
        self.stop(now, was_moving);
    }

    /// Earliest pending timer, if any
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.watchdog.deadline(), self.repeat_stop.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Run any timers due at `now`
    pub fn on_timer(&mut self, now: Instant) {
        if self.repeat_stop.fire(now) {
            debug!("Repeating stop");
            self.sink.send(DriveCommand::Stop);
        }

        if self.watchdog.fire(now) {
            if let Phase::Moving { zone } = self.state.phase {
                warn!(
                    "No gaze on {} for {} ms, braking",
                    zone, self.config.brake_timeout_ms
                );
                self.stop(now, true);
            }
        }
    }

    /// React to a link state change.
    ///
    /// Losing the link drops back to idle and cancels timers: nothing can be
    /// sent, and gaze is not acted on until the link returns.
    pub fn on_connection_change(&mut self, connected: bool) {
        if connected == self.link_up {
            return;
        }
        self.link_up = connected;

        if connected {
            info!("Vehicle link restored, gaze control resumed");
        } else {
            warn!("Vehicle link lost, gaze control suspended");
            self.watchdog.cancel();
            self.repeat_stop.cancel();
            self.state.phase = Phase::Idle;
        }
    }

    /// Set the speed (percent, clamped to the configured maximum) and send it
    pub fn set_speed(&mut self, percent: u16) -> u16 {
        let speed = percent.min(self.config.max_speed);
        if speed != percent {
            debug!("Speed {} clamped to {}", percent, speed);
        }
        self.speed = speed;
        info!("Setting speed to {}%", speed);
        self.sink.send(DriveCommand::Speed(speed));
        speed
    }

    pub fn speed(&self) -> u16 {
        self.speed
    }

    /// Dwell progress toward activation (0..=100)
    pub fn dwell_progress(&self, now: Instant) -> u8 {
        match self.state.phase {
            Phase::Idle => 0,
            Phase::Moving { .. } => 100,
            Phase::Dwelling {
                triggered: true, ..
            } => 100,
            Phase::Dwelling { since, .. } => {
                let elapsed = now.duration_since(since).as_millis() as u64;
                (elapsed.saturating_mul(100) / self.config.dwell_ms.max(1)).min(100) as u8
            }
        }
    }

    /// Cancel timers and reset state. Sends a final stop if still moving.
    pub fn teardown(&mut self) {
        if self.state.is_moving() {
            info!("Stopping before teardown");
            self.sink.send(DriveCommand::Stop);
        }
        self.watchdog.cancel();
        self.repeat_stop.cancel();
        self.state.reset();
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn zones(&self) -> &ZoneMap {
        &self.zones
    }

    pub fn zones_mut(&mut self) -> &mut ZoneMap {
        &mut self.zones
    }

    pub fn sink(&self) -> &C {
        &self.sink
    }

    fn dwell(&self) -> Duration {
        Duration::from_millis(self.config.dwell_ms)
    }

    fn brake_timeout(&self) -> Duration {
        Duration::from_millis(self.config.brake_timeout_ms)
    }
}
