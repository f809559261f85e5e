//! Gaze sample types

use serde::{Deserialize, Serialize};

use crate::GazeError;

/// A point in screen pixels (origin top-left)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &ScreenPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Screen (window) dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Center of the viewport, used as the fixation target
    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(self.width / 2.0, self.height / 2.0)
    }

    /// Convert a fractional position (0.0..=1.0 on each axis) to pixels
    pub fn at_fraction(&self, fx: f64, fy: f64) -> ScreenPoint {
        ScreenPoint::new(self.width * fx, self.height * fy)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

/// A single gaze estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeSample {
    /// Horizontal position (pixels)
    pub x: f64,
    /// Vertical position (pixels)
    pub y: f64,
    /// Estimator confidence (0.0 - 1.0)
    pub confidence: f64,
    /// Estimator timestamp (monotonic milliseconds)
    pub timestamp_ms: u64,
}

impl GazeSample {
    pub fn new(x: f64, y: f64, confidence: f64, timestamp_ms: u64) -> Self {
        Self {
            x,
            y,
            confidence,
            timestamp_ms,
        }
    }

    pub fn point(&self) -> ScreenPoint {
        ScreenPoint::new(self.x, self.y)
    }
}

/// One tick of the gaze stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GazeFrame {
    /// Face and eyes detected
    Sample(GazeSample),
    /// No face/eyes detected this tick
    Absent { timestamp_ms: u64 },
}

/// Wire shape of a frame; any missing coordinate means absent
#[derive(Debug, Deserialize)]
struct RawFrame {
    x: Option<f64>,
    y: Option<f64>,
    confidence: Option<f64>,
    #[serde(default)]
    timestamp_ms: u64,
}

impl GazeFrame {
    pub fn timestamp_ms(&self) -> u64 {
        match self {
            GazeFrame::Sample(sample) => sample.timestamp_ms,
            GazeFrame::Absent { timestamp_ms } => *timestamp_ms,
        }
    }

    pub fn sample(&self) -> Option<&GazeSample> {
        match self {
            GazeFrame::Sample(sample) => Some(sample),
            GazeFrame::Absent { .. } => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, GazeFrame::Absent { .. })
    }

    /// Parse one line of the estimator's JSON stream.
    ///
    /// Accepts `null`, `{"timestamp_ms": ..}` and full samples. Non-finite
    /// coordinates are treated as absent.
    pub fn from_json_line(line: &str) -> Result<Self, GazeError> {
        let raw: Option<RawFrame> = serde_json::from_str(line.trim())
            .map_err(|e| GazeError::MalformedFrame(e.to_string()))?;

        let Some(raw) = raw else {
            return Ok(GazeFrame::Absent { timestamp_ms: 0 });
        };

        match (raw.x, raw.y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => {
                Ok(GazeFrame::Sample(GazeSample {
                    x,
                    y,
                    confidence: raw.confidence.unwrap_or(1.0).clamp(0.0, 1.0),
                    timestamp_ms: raw.timestamp_ms,
                }))
            }
            _ => Ok(GazeFrame::Absent {
                timestamp_ms: raw.timestamp_ms,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_center() {
        let viewport = Viewport::new(1920.0, 1080.0);
        assert_eq!(viewport.center(), ScreenPoint::new(960.0, 540.0));
    }

    #[test]
    fn test_distance() {
        let a = ScreenPoint::new(0.0, 0.0);
        let b = ScreenPoint::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_full_sample() {
        let frame =
            GazeFrame::from_json_line(r#"{"x":10.5,"y":20,"confidence":0.8,"timestamp_ms":42}"#)
                .unwrap();
        assert_eq!(frame, GazeFrame::Sample(GazeSample::new(10.5, 20.0, 0.8, 42)));
    }

    #[test]
    fn test_parse_absent_frames() {
        assert!(GazeFrame::from_json_line("null").unwrap().is_absent());

        let frame = GazeFrame::from_json_line(r#"{"x":null,"y":3,"timestamp_ms":7}"#).unwrap();
        assert_eq!(frame, GazeFrame::Absent { timestamp_ms: 7 });
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(
            GazeFrame::from_json_line("{not json"),
            Err(GazeError::MalformedFrame(_))
        ));
    }
}
