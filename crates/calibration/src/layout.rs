//! Calibration anchor layouts and configuration

use gaze_source::{ScreenPoint, Viewport};
use serde::{Deserialize, Serialize};

/// Calibration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Anchor arrangement
    pub layout: AnchorLayout,
    /// Clicks needed on each anchor
    pub required_clicks: u32,
    /// Minimum accuracy for a result to be usable (percent)
    pub min_accuracy: u8,
    /// Maximum result age before recalibration is required
    pub max_age_days: u32,
    /// Fixation window for the accuracy measurement
    pub measurement_window_ms: u64,
    /// Keep the center anchor hidden until every other anchor is satisfied
    pub hide_center_until_last: bool,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self::nine_point()
    }
}

impl CalibrationConfig {
    /// 9 anchors, 5 clicks each, center shown last
    pub fn nine_point() -> Self {
        Self {
            layout: AnchorLayout::NinePoint,
            required_clicks: 5,
            min_accuracy: 70,
            max_age_days: 7,
            measurement_window_ms: 5000,
            hide_center_until_last: true,
        }
    }

    /// 13 anchors, 3 clicks each
    pub fn thirteen_point() -> Self {
        Self {
            layout: AnchorLayout::ThirteenPoint,
            required_clicks: 3,
            hide_center_until_last: false,
            ..Self::nine_point()
        }
    }

    /// One anchor at each of the five drive controls, 5 clicks each
    pub fn wheelchair_buttons() -> Self {
        Self {
            layout: AnchorLayout::WheelchairButtons,
            required_clicks: 5,
            hide_center_until_last: false,
            ..Self::nine_point()
        }
    }
}

/// Anchor arrangement on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorLayout {
    /// 3x3 grid
    NinePoint,
    /// 3x3 grid plus four inner points
    ThirteenPoint,
    /// The five drive control positions
    WheelchairButtons,
}

impl AnchorLayout {
    /// Anchor ids with positions as viewport fractions
    fn fractions(&self) -> Vec<(String, f64, f64)> {
        const GRID: [f64; 3] = [0.1, 0.5, 0.9];

        let grid = || {
            GRID.iter().enumerate().flat_map(|(row, &fy)| {
                GRID.iter()
                    .enumerate()
                    .map(move |(col, &fx)| (format!("pt{}", row * 3 + col + 1), fx, fy))
            })
        };

        match self {
            AnchorLayout::NinePoint => grid().collect(),
            AnchorLayout::ThirteenPoint => grid()
                .chain(
                    [(0.3, 0.3), (0.7, 0.3), (0.3, 0.7), (0.7, 0.7)]
                        .iter()
                        .enumerate()
                        .map(|(i, &(fx, fy))| (format!("pt{}", 10 + i), fx, fy)),
                )
                .collect(),
            AnchorLayout::WheelchairButtons => [
                ("forward", 0.5, 0.25),
                ("left", 0.25, 0.5),
                ("stop", 0.5, 0.5),
                ("right", 0.75, 0.5),
                ("backward", 0.5, 0.75),
            ]
            .iter()
            .map(|&(id, fx, fy)| (id.to_string(), fx, fy))
            .collect(),
        }
    }

    /// Id of the anchor at the screen center
    pub fn center_id(&self) -> &'static str {
        match self {
            AnchorLayout::NinePoint | AnchorLayout::ThirteenPoint => "pt5",
            AnchorLayout::WheelchairButtons => "stop",
        }
    }

    /// Fresh anchors (zero clicks) laid out on `viewport`
    pub fn anchors(&self, viewport: Viewport, required_clicks: u32) -> Vec<CalibrationAnchor> {
        self.fractions()
            .into_iter()
            .map(|(id, fx, fy)| CalibrationAnchor {
                id,
                required_clicks,
                clicks_so_far: 0,
                position: viewport.at_fraction(fx, fy),
            })
            .collect()
    }
}

/// A click target used during calibration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationAnchor {
    pub id: String,
    pub required_clicks: u32,
    pub clicks_so_far: u32,
    /// Screen position (pixels)
    pub position: ScreenPoint,
}

impl CalibrationAnchor {
    pub fn is_satisfied(&self) -> bool {
        self.clicks_so_far >= self.required_clicks
    }

    /// Fraction of required clicks collected (0.0..=1.0)
    pub fn progress(&self) -> f64 {
        if self.required_clicks == 0 {
            return 1.0;
        }
        f64::from(self.clicks_so_far.min(self.required_clicks)) / f64::from(self.required_clicks)
    }
}
