//! Zone map and hit-testing

use gaze_source::{ScreenPoint, Viewport};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{Region, Zone, ZoneError};

/// Padding policy for a hit test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTest {
    /// Region as laid out
    Exact,
    /// Region grown by the entry padding; used to detect a newly entered zone
    Loose,
    /// Region shrunk by the exit inset; used to detect leaving the active zone
    Tight,
}

/// Hysteresis padding (pixels)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HitPadding {
    /// Outward growth when entering a zone
    pub entry_px: f64,
    /// Inward shrink when testing whether gaze is still inside the active zone
    pub exit_inset_px: f64,
}

impl Default for HitPadding {
    fn default() -> Self {
        Self {
            entry_px: 20.0,
            exit_inset_px: 10.0,
        }
    }
}

impl HitPadding {
    /// No hysteresis
    pub fn none() -> Self {
        Self {
            entry_px: 0.0,
            exit_inset_px: 0.0,
        }
    }
}

/// A zone bound to its region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSpec {
    pub zone: Zone,
    pub region: Region,
}

impl ZoneSpec {
    pub fn new(zone: Zone, region: Region) -> Self {
        Self { zone, region }
    }
}

/// Static partition of the screen into control zones
#[derive(Debug, Clone)]
pub struct ZoneMap {
    zones: Vec<ZoneSpec>,
    padding: HitPadding,
    /// Entry hit-area multiplier derived from calibration accuracy (1.0 = off)
    entry_scale: f64,
}

impl ZoneMap {
    /// Build a zone map, rejecting duplicate, degenerate or overlapping zones
    pub fn new(zones: Vec<ZoneSpec>, padding: HitPadding) -> Result<Self, ZoneError> {
        for (i, spec) in zones.iter().enumerate() {
            if let Some(reason) = spec.region.degenerate_reason() {
                return Err(ZoneError::DegenerateRegion {
                    zone: spec.zone,
                    reason,
                });
            }
            for other in &zones[i + 1..] {
                if other.zone == spec.zone {
                    return Err(ZoneError::DuplicateZone(spec.zone));
                }
                if spec.region.overlaps(&other.region) {
                    return Err(ZoneError::Overlap(spec.zone, other.zone));
                }
            }
        }

        info!("Zone map created with {} zones", zones.len());
        Ok(Self {
            zones,
            padding,
            entry_scale: 1.0,
        })
    }

    /// The five-control 3x3 grid layout: forward top-center, left and right
    /// middle row, stop in the center, backward bottom-center.
    pub fn wheelchair_grid(viewport: Viewport, gap_px: f64, padding: HitPadding) -> Result<Self, ZoneError> {
        let cell_w = (viewport.width - 4.0 * gap_px) / 3.0;
        let cell_h = (viewport.height - 4.0 * gap_px) / 3.0;
        let cell = |col: u8, row: u8| {
            Region::rect(
                gap_px + f64::from(col) * (cell_w + gap_px),
                gap_px + f64::from(row) * (cell_h + gap_px),
                cell_w,
                cell_h,
            )
        };

        Self::new(
            vec![
                ZoneSpec::new(Zone::Forward, cell(1, 0)),
                ZoneSpec::new(Zone::Left, cell(0, 1)),
                ZoneSpec::new(Zone::Stop, cell(1, 1)),
                ZoneSpec::new(Zone::Right, cell(2, 1)),
                ZoneSpec::new(Zone::Backward, cell(1, 2)),
            ],
            padding,
        )
    }

    /// Widen the entry area to match calibration accuracy.
    ///
    /// Each zone's hit size becomes `size * (1 + (100 - accuracy) / 100)`,
    /// or `size * 1.5` when uncalibrated or at 0 %; the extra is split evenly around
    /// the region. The configured entry padding remains the minimum.
    pub fn scale_entry_for_accuracy(&mut self, accuracy: Option<u8>) {
        self.entry_scale = match accuracy {
            Some(accuracy) if accuracy > 0 => 1.0 + f64::from(100 - accuracy.min(100)) / 100.0,
            _ => 1.5,
        };
        debug!("Zone entry scale set to {:.2}", self.entry_scale);
    }

    fn entry_padding(&self, spec: &ZoneSpec) -> f64 {
        let scaled = (spec.region.size() * self.entry_scale - spec.region.size()) / 2.0;
        self.padding.entry_px.max(scaled)
    }

    fn padding_for(&self, spec: &ZoneSpec, test: HitTest) -> f64 {
        match test {
            HitTest::Exact => 0.0,
            HitTest::Loose => self.entry_padding(spec),
            HitTest::Tight => -self.padding.exit_inset_px,
        }
    }

    /// Classify a point against the regions as laid out
    pub fn classify(&self, point: &ScreenPoint) -> Option<Zone> {
        self.classify_with(point, HitTest::Exact)
    }

    /// Classify a point with the given padding policy.
    ///
    /// An exact hit always wins. Otherwise, with grown regions that may
    /// overlap near shared borders, the zone whose boundary is nearest wins.
    pub fn classify_with(&self, point: &ScreenPoint, test: HitTest) -> Option<Zone> {
        if let Some(spec) = self
            .zones
            .iter()
            .find(|spec| spec.region.contains(point, self.padding_for(spec, test).min(0.0)))
        {
            return Some(spec.zone);
        }
        if test != HitTest::Loose {
            return None;
        }

        self.zones
            .iter()
            .map(|spec| (spec, spec.region.signed_distance(point)))
            .filter(|(spec, distance)| *distance <= self.entry_padding(spec))
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(spec, _)| spec.zone)
    }

    /// Check if `point` is inside `zone` under the given padding policy
    pub fn contains(&self, zone: Zone, point: &ScreenPoint, test: HitTest) -> bool {
        self.zones
            .iter()
            .find(|spec| spec.zone == zone)
            .map_or(false, |spec| {
                spec.region.contains(point, self.padding_for(spec, test))
            })
    }

    pub fn region(&self, zone: Zone) -> Option<&Region> {
        self.zones
            .iter()
            .find(|spec| spec.zone == zone)
            .map(|spec| &spec.region)
    }

    pub fn zones(&self) -> impl Iterator<Item = Zone> + '_ {
        self.zones.iter().map(|spec| spec.zone)
    }

    pub fn padding(&self) -> HitPadding {
        self.padding
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn grid() -> ZoneMap {
        ZoneMap::wheelchair_grid(Viewport::new(1200.0, 900.0), 0.0, HitPadding::default()).unwrap()
    }

    #[test]
    fn test_grid_classification() {
        let map = grid();
        assert_eq!(map.classify(&ScreenPoint::new(600.0, 150.0)), Some(Zone::Forward));
        assert_eq!(map.classify(&ScreenPoint::new(600.0, 750.0)), Some(Zone::Backward));
        assert_eq!(map.classify(&ScreenPoint::new(200.0, 450.0)), Some(Zone::Left));
        assert_eq!(map.classify(&ScreenPoint::new(1000.0, 450.0)), Some(Zone::Right));
        assert_eq!(map.classify(&ScreenPoint::new(600.0, 450.0)), Some(Zone::Stop));
        // Corner cells are not controls
        assert_eq!(map.classify(&ScreenPoint::new(100.0, 100.0)), None);
    }

    #[test]
    fn test_loose_entry_and_tight_exit() {
        let map = grid();
        // 15px left of the forward cell (x = 400..800, y = 0..300)
        let near = ScreenPoint::new(385.0, 150.0);
        assert_eq!(map.classify(&near), None);
        assert_eq!(map.classify_with(&near, HitTest::Loose), Some(Zone::Forward));

        // 5px inside the forward cell's left edge
        let edge = ScreenPoint::new(405.0, 150.0);
        assert!(map.contains(Zone::Forward, &edge, HitTest::Exact));
        assert!(!map.contains(Zone::Forward, &edge, HitTest::Tight));
        assert_eq!(map.classify_with(&edge, HitTest::Tight), None);
    }

    #[test]
    fn test_loose_prefers_nearest_zone() {
        let map = ZoneMap::new(
            vec![
                ZoneSpec::new(Zone::Left, Region::rect(0.0, 0.0, 100.0, 100.0)),
                ZoneSpec::new(Zone::Right, Region::rect(130.0, 0.0, 100.0, 100.0)),
            ],
            HitPadding::default(),
        )
        .unwrap();
        assert_eq!(
            map.classify_with(&ScreenPoint::new(112.0, 50.0), HitTest::Loose),
            Some(Zone::Left)
        );
        assert_eq!(
            map.classify_with(&ScreenPoint::new(118.0, 50.0), HitTest::Loose),
            Some(Zone::Right)
        );
    }

    #[test]
    fn test_accuracy_scaled_entry() {
        let mut map = ZoneMap::new(
            vec![ZoneSpec::new(Zone::Forward, Region::rect(0.0, 0.0, 100.0, 100.0))],
            HitPadding::none(),
        )
        .unwrap();
        let outside = ScreenPoint::new(120.0, 50.0);
        assert_eq!(map.classify_with(&outside, HitTest::Loose), None);

        // Uncalibrated: 150px hit area, 25px each side
        map.scale_entry_for_accuracy(None);
        assert_eq!(map.classify_with(&outside, HitTest::Loose), Some(Zone::Forward));

        // 90% accurate: 110px hit area, 5px each side
        map.scale_entry_for_accuracy(Some(90));
        assert_eq!(map.classify_with(&outside, HitTest::Loose), None);
        assert_eq!(
            map.classify_with(&ScreenPoint::new(104.0, 50.0), HitTest::Loose),
            Some(Zone::Forward)
        );
    }

    #[test]
    fn test_zero_accuracy_scales_like_uncalibrated() {
        let mut map = ZoneMap::new(
            vec![ZoneSpec::new(Zone::Forward, Region::rect(0.0, 0.0, 100.0, 100.0))],
            HitPadding::none(),
        )
        .unwrap();
        // 1.5x gives 25px each side; 2.0x would reach 50px
        let edge = ScreenPoint::new(124.0, 50.0);
        let beyond = ScreenPoint::new(130.0, 50.0);

        map.scale_entry_for_accuracy(Some(0));
        assert_eq!(map.classify_with(&edge, HitTest::Loose), Some(Zone::Forward));
        assert_eq!(map.classify_with(&beyond, HitTest::Loose), None);

        map.scale_entry_for_accuracy(Some(1));
        assert_eq!(map.classify_with(&beyond, HitTest::Loose), Some(Zone::Forward));
    }

    #[test]
    fn test_rejects_invalid_layouts() {
        let rect = Region::rect(0.0, 0.0, 10.0, 10.0);
        assert_eq!(
            ZoneMap::new(
                vec![
                    ZoneSpec::new(Zone::Stop, rect.clone()),
                    ZoneSpec::new(Zone::Stop, Region::rect(50.0, 0.0, 10.0, 10.0)),
                ],
                HitPadding::default()
            )
            .unwrap_err(),
            ZoneError::DuplicateZone(Zone::Stop)
        );
        assert_eq!(
            ZoneMap::new(
                vec![
                    ZoneSpec::new(Zone::Left, rect.clone()),
                    ZoneSpec::new(Zone::Right, Region::rect(5.0, 5.0, 10.0, 10.0)),
                ],
                HitPadding::default()
            )
            .unwrap_err(),
            ZoneError::Overlap(Zone::Left, Zone::Right)
        );
        assert!(matches!(
            ZoneMap::new(
                vec![ZoneSpec::new(Zone::Left, Region::circle(0.0, 0.0, 0.0))],
                HitPadding::default()
            ),
            Err(ZoneError::DegenerateRegion { zone: Zone::Left, .. })
        ));
    }

    proptest! {
        #[test]
        fn exact_hit_is_unique(x in -100.0f64..1300.0, y in -100.0f64..1000.0) {
            let map = ZoneMap::wheelchair_grid(Viewport::new(1200.0, 900.0), 16.0, HitPadding::default())
                .unwrap();
            let point = ScreenPoint::new(x, y);
            let hits = map.zones().filter(|z| map.contains(*z, &point, HitTest::Exact)).count();
            match map.classify(&point) {
                Some(zone) => {
                    prop_assert!(map.contains(zone, &point, HitTest::Exact));
                    prop_assert_eq!(hits, 1);
                }
                None => prop_assert_eq!(hits, 0),
            }
        }

        #[test]
        fn tight_within_exact_within_loose(x in -100.0f64..1300.0, y in -100.0f64..1000.0) {
            let map = grid();
            let point = ScreenPoint::new(x, y);
            for zone in Zone::ALL {
                if map.contains(zone, &point, HitTest::Tight) {
                    prop_assert!(map.contains(zone, &point, HitTest::Exact));
                }
                if map.contains(zone, &point, HitTest::Exact) {
                    prop_assert!(map.contains(zone, &point, HitTest::Loose));
                }
            }
        }
    }
}
