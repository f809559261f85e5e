//! Zone region geometry

use gaze_source::ScreenPoint;
use serde::{Deserialize, Serialize};

/// A static screen region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum Region {
    /// Axis-aligned rectangle
    Rect {
        left: f64,
        top: f64,
        width: f64,
        height: f64,
    },
    Circle {
        cx: f64,
        cy: f64,
        radius: f64,
    },
    /// Simple polygon, vertices in order (either winding)
    Polygon { points: Vec<ScreenPoint> },
}

impl Region {
    pub fn rect(left: f64, top: f64, width: f64, height: f64) -> Self {
        Region::Rect {
            left,
            top,
            width,
            height,
        }
    }

    pub fn circle(cx: f64, cy: f64, radius: f64) -> Self {
        Region::Circle { cx, cy, radius }
    }

    pub fn polygon(points: Vec<ScreenPoint>) -> Self {
        Region::Polygon { points }
    }

    /// Signed distance from `point` to the region boundary.
    ///
    /// Negative inside, zero on the boundary, positive outside.
    pub fn signed_distance(&self, point: &ScreenPoint) -> f64 {
        match self {
            Region::Rect {
                left,
                top,
                width,
                height,
            } => {
                let cx = left + width / 2.0;
                let cy = top + height / 2.0;
                let dx = (point.x - cx).abs() - width / 2.0;
                let dy = (point.y - cy).abs() - height / 2.0;
                let outside = (dx.max(0.0).powi(2) + dy.max(0.0).powi(2)).sqrt();
                let inside = dx.max(dy).min(0.0);
                outside + inside
            }
            Region::Circle { cx, cy, radius } => {
                point.distance_to(&ScreenPoint::new(*cx, *cy)) - radius
            }
            Region::Polygon { points } => {
                let distance = edges(points)
                    .map(|(a, b)| distance_to_segment(point, a, b))
                    .fold(f64::INFINITY, f64::min);
                if polygon_contains(points, point) {
                    -distance
                } else {
                    distance
                }
            }
        }
    }

    /// Check containment with `padding` pixels of growth (negative shrinks)
    pub fn contains(&self, point: &ScreenPoint, padding: f64) -> bool {
        self.signed_distance(point) <= padding
    }

    /// Largest extent of the region (width/height, diameter, bounding box)
    pub fn size(&self) -> f64 {
        match self {
            Region::Rect { width, height, .. } => width.max(*height),
            Region::Circle { radius, .. } => radius * 2.0,
            Region::Polygon { points } => {
                let (min_x, max_x, min_y, max_y) = bounds(points);
                (max_x - min_x).max(max_y - min_y)
            }
        }
    }

    /// Describe why the region cannot be used, if it cannot
    pub fn degenerate_reason(&self) -> Option<String> {
        match self {
            Region::Rect { width, height, .. } if !(*width > 0.0 && *height > 0.0) => {
                Some(format!("rectangle size {}x{}", width, height))
            }
            Region::Circle { radius, .. } if !(*radius > 0.0) => {
                Some(format!("circle radius {}", radius))
            }
            Region::Polygon { points } if points.len() < 3 => {
                Some(format!("polygon with {} points", points.len()))
            }
            _ => None,
        }
    }

    /// Check if two regions share interior area (touching edges do not count)
    pub fn overlaps(&self, other: &Region) -> bool {
        match (self, other) {
            (Region::Circle { cx, cy, radius }, shape) | (shape, Region::Circle { cx, cy, radius }) => {
                shape.signed_distance(&ScreenPoint::new(*cx, *cy)) < *radius
            }
            (a, b) => {
                let pa = a.outline();
                let pb = b.outline();
                let crossing = edges(&pa)
                    .any(|(a1, a2)| edges(&pb).any(|(b1, b2)| segments_cross(a1, a2, b1, b2)));
                crossing
                    || pa.iter().any(|p| b.signed_distance(p) < 0.0)
                    || pb.iter().any(|p| a.signed_distance(p) < 0.0)
            }
        }
    }

    /// Vertices of a polygonal region
    fn outline(&self) -> Vec<ScreenPoint> {
        match self {
            Region::Rect {
                left,
                top,
                width,
                height,
            } => vec![
                ScreenPoint::new(*left, *top),
                ScreenPoint::new(left + width, *top),
                ScreenPoint::new(left + width, top + height),
                ScreenPoint::new(*left, top + height),
            ],
            Region::Circle { .. } => Vec::new(),
            Region::Polygon { points } => points.clone(),
        }
    }
}

fn edges(points: &[ScreenPoint]) -> impl Iterator<Item = (&ScreenPoint, &ScreenPoint)> {
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .take(points.len())
}

fn bounds(points: &[ScreenPoint]) -> (f64, f64, f64, f64) {
    points.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
        |(min_x, max_x, min_y, max_y), p| {
            (min_x.min(p.x), max_x.max(p.x), min_y.min(p.y), max_y.max(p.y))
        },
    )
}

fn distance_to_segment(p: &ScreenPoint, a: &ScreenPoint, b: &ScreenPoint) -> f64 {
    let abx = b.x - a.x;
    let aby = b.y - a.y;
    let len_sq = abx * abx + aby * aby;
    if len_sq == 0.0 {
        return p.distance_to(a);
    }
    let t = (((p.x - a.x) * abx + (p.y - a.y) * aby) / len_sq).clamp(0.0, 1.0);
    p.distance_to(&ScreenPoint::new(a.x + t * abx, a.y + t * aby))
}

/// Even-odd ray casting
fn polygon_contains(points: &[ScreenPoint], p: &ScreenPoint) -> bool {
    let mut inside = false;
    for (a, b) in edges(points) {
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x_cross {
                inside = !inside;
            }
        }
    }
    inside
}

fn cross(o: &ScreenPoint, a: &ScreenPoint, b: &ScreenPoint) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Proper crossing only; collinear or touching segments do not cross
fn segments_cross(a1: &ScreenPoint, a2: &ScreenPoint, b1: &ScreenPoint, b2: &ScreenPoint) -> bool {
    let d1 = cross(b1, b2, a1);
    let d2 = cross(b1, b2, a2);
    let d3 = cross(a1, a2, b1);
    let d4 = cross(a1, a2, b2);
    d1 * d2 < 0.0 && d3 * d4 < 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Region {
        Region::polygon(vec![
            ScreenPoint::new(0.0, 0.0),
            ScreenPoint::new(100.0, 0.0),
            ScreenPoint::new(0.0, 100.0),
        ])
    }

    #[test]
    fn test_rect_signed_distance() {
        let rect = Region::rect(0.0, 0.0, 100.0, 50.0);
        assert_eq!(rect.signed_distance(&ScreenPoint::new(50.0, 25.0)), -25.0);
        assert_eq!(rect.signed_distance(&ScreenPoint::new(100.0, 25.0)), 0.0);
        assert_eq!(rect.signed_distance(&ScreenPoint::new(110.0, 25.0)), 10.0);
        assert_eq!(rect.signed_distance(&ScreenPoint::new(103.0, 54.0)), 5.0);
    }

    #[test]
    fn test_circle_padding() {
        let circle = Region::circle(50.0, 50.0, 10.0);
        let p = ScreenPoint::new(65.0, 50.0);
        assert!(!circle.contains(&p, 0.0));
        assert!(circle.contains(&p, 5.0));
        assert!(!circle.contains(&ScreenPoint::new(52.0, 50.0), -9.0));
    }

    #[test]
    fn test_polygon_inside_outside() {
        let tri = triangle();
        assert!(tri.signed_distance(&ScreenPoint::new(10.0, 10.0)) < 0.0);
        assert!(tri.signed_distance(&ScreenPoint::new(80.0, 80.0)) > 0.0);
        assert!((tri.signed_distance(&ScreenPoint::new(-5.0, 50.0)) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_regions() {
        assert!(Region::rect(0.0, 0.0, 0.0, 10.0).degenerate_reason().is_some());
        assert!(Region::circle(0.0, 0.0, -1.0).degenerate_reason().is_some());
        assert!(Region::polygon(vec![ScreenPoint::new(0.0, 0.0)])
            .degenerate_reason()
            .is_some());
        assert!(triangle().degenerate_reason().is_none());
    }

    #[test]
    fn test_overlap_detection() {
        let a = Region::rect(0.0, 0.0, 100.0, 100.0);
        let touching = Region::rect(100.0, 0.0, 100.0, 100.0);
        let crossing = Region::rect(50.0, 50.0, 100.0, 100.0);
        let nested = Region::rect(10.0, 10.0, 10.0, 10.0);

        assert!(!a.overlaps(&touching));
        assert!(a.overlaps(&crossing));
        assert!(a.overlaps(&nested));
        assert!(nested.overlaps(&a));
        assert!(a.overlaps(&Region::circle(105.0, 50.0, 10.0)));
        assert!(!a.overlaps(&Region::circle(120.0, 50.0, 10.0)));
        assert!(triangle().overlaps(&Region::rect(20.0, 20.0, 100.0, 100.0)));
        assert!(!triangle().overlaps(&Region::rect(60.0, 60.0, 100.0, 100.0)));
    }
}
