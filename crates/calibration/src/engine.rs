//! Calibration engine
//!
//! Owns one calibration session: the anchor click counts, the gaze
//! estimator's training/buffering hooks and the accuracy measurement
//! countdown. At most one measurement deadline is pending at a time.

use chrono::Utc;
use gaze_source::{GazeTracker, Viewport};
use std::time::Duration;
use storage::KeyValueStore;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    compute_accuracy, CalibrationAnchor, CalibrationConfig, CalibrationError, CalibrationResult,
    CalibrationStatus, CalibrationStore,
};

/// Result of a registered click
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickOutcome {
    /// Clicks on the anchor after this one (capped)
    pub clicks: u32,
    /// This click satisfied the anchor
    pub newly_complete: bool,
    /// Every anchor is now satisfied
    pub all_complete: bool,
}

pub struct CalibrationEngine<G, S> {
    config: CalibrationConfig,
    viewport: Viewport,
    tracker: G,
    store: CalibrationStore<S>,
    anchors: Vec<CalibrationAnchor>,
    completed_anchors: usize,
    started: bool,
    /// Pending accuracy measurement deadline
    measurement_deadline: Option<Instant>,
    last_result: Option<CalibrationResult>,
}

impl<G: GazeTracker, S: KeyValueStore> CalibrationEngine<G, S> {
    pub fn new(config: CalibrationConfig, viewport: Viewport, tracker: G, store: S) -> Self {
        info!(
            "Creating calibration engine: {:?} layout, {} clicks per anchor",
            config.layout, config.required_clicks
        );
        let anchors = config.layout.anchors(viewport, config.required_clicks);
        Self {
            config,
            viewport,
            tracker,
            store: CalibrationStore::new(store),
            anchors,
            completed_anchors: 0,
            started: false,
            measurement_deadline: None,
            last_result: None,
        }
    }

    /// Start the gaze estimator and open a fresh session.
    ///
    /// If the estimator cannot start, the error is returned and no anchor
    /// state changes.
    pub fn start(&mut self) -> Result<(), CalibrationError> {
        if let Err(e) = self.tracker.begin() {
            warn!("Calibration cannot start: {}", e);
            return Err(CalibrationError::TrackerInit(e));
        }

        self.reset_session();
        self.started = true;
        info!("Calibration session started");
        Ok(())
    }

    /// Cancel any pending measurement and stop the estimator
    pub fn teardown(&mut self) {
        self.cancel_measurement();
        if self.tracker.is_running() {
            self.tracker.end();
        }
        self.started = false;
        info!("Calibration session torn down");
    }

    fn reset_session(&mut self) {
        self.cancel_measurement();
        for anchor in &mut self.anchors {
            anchor.clicks_so_far = 0;
        }
        self.completed_anchors = 0;
        self.last_result = None;
    }

    /// Register a click on an anchor and feed it to the estimator's training.
    ///
    /// Counts are capped at the required clicks; clicks on a satisfied
    /// anchor are ignored.
    pub fn register_click(&mut self, anchor_id: &str) -> Result<ClickOutcome, CalibrationError> {
        if !self.started {
            return Err(CalibrationError::NotStarted);
        }
        if !self.is_anchor_visible(anchor_id) {
            return Err(CalibrationError::AnchorHidden(anchor_id.to_string()));
        }

        let anchor = self
            .anchors
            .iter_mut()
            .find(|a| a.id == anchor_id)
            .ok_or_else(|| CalibrationError::UnknownAnchor(anchor_id.to_string()))?;

        if anchor.is_satisfied() {
            debug!("Anchor {} already satisfied, click ignored", anchor_id);
            return Ok(ClickOutcome {
                clicks: anchor.clicks_so_far,
                newly_complete: false,
                all_complete: self.all_anchors_complete(),
            });
        }

        anchor.clicks_so_far += 1;
        let clicks = anchor.clicks_so_far;
        let newly_complete = anchor.is_satisfied();
        self.tracker.train_on_click(anchor.position);

        if newly_complete {
            self.completed_anchors += 1;
            info!(
                "Anchor {} complete ({}/{})",
                anchor_id,
                self.completed_anchors,
                self.anchors.len()
            );
        } else {
            debug!("Anchor {} click {}", anchor_id, clicks);
        }

        Ok(ClickOutcome {
            clicks,
            newly_complete,
            all_complete: self.all_anchors_complete(),
        })
    }

    /// True iff every anchor has its required clicks
    pub fn all_anchors_complete(&self) -> bool {
        self.anchors.iter().all(CalibrationAnchor::is_satisfied)
    }

    /// Number of anchors satisfied so far
    pub fn completed_anchors(&self) -> usize {
        self.completed_anchors
    }

    pub fn anchors(&self) -> &[CalibrationAnchor] {
        &self.anchors
    }

    pub fn anchor(&self, id: &str) -> Option<&CalibrationAnchor> {
        self.anchors.iter().find(|a| a.id == id)
    }

    /// Click progress of every anchor (0.0..=1.0)
    pub fn progress(&self) -> Vec<(&str, f64)> {
        self.anchors
            .iter()
            .map(|a| (a.id.as_str(), a.progress()))
            .collect()
    }

    /// Whether an anchor can be clicked yet.
    ///
    /// With `hide_center_until_last`, the center anchor appears only once
    /// every other anchor is satisfied.
    pub fn is_anchor_visible(&self, id: &str) -> bool {
        if !self.config.hide_center_until_last || id != self.config.layout.center_id() {
            return true;
        }
        self.anchors
            .iter()
            .filter(|a| a.id != id)
            .all(CalibrationAnchor::is_satisfied)
    }

    /// Start buffering raw gaze points for the fixation window.
    ///
    /// Returns the deadline after which [`Self::finish_measurement`] may be
    /// called. Starting again replaces any pending measurement.
    pub fn begin_measurement(&mut self, now: Instant) -> Result<Instant, CalibrationError> {
        if !self.started {
            return Err(CalibrationError::NotStarted);
        }
        if !self.all_anchors_complete() {
            warn!("Accuracy measurement requested before calibration completed");
            return Err(CalibrationError::NotReady {
                completed: self.completed_anchors,
                total: self.anchors.len(),
            });
        }

        self.cancel_measurement();
        self.tracker.begin_buffering();
        let deadline = now + Duration::from_millis(self.config.measurement_window_ms);
        self.measurement_deadline = Some(deadline);
        info!(
            "Accuracy measurement started ({} ms window)",
            self.config.measurement_window_ms
        );
        Ok(deadline)
    }

    pub fn measurement_deadline(&self) -> Option<Instant> {
        self.measurement_deadline
    }

    /// Score the buffered points and persist the result.
    ///
    /// Fails with `MeasurementPending` if the window has not fully elapsed.
    pub fn finish_measurement(&mut self, now: Instant) -> Result<CalibrationResult, CalibrationError> {
        let deadline = self
            .measurement_deadline
            .ok_or(CalibrationError::NoMeasurement)?;
        if now < deadline {
            return Err(CalibrationError::MeasurementPending {
                remaining_ms: (deadline - now).as_millis() as u64,
            });
        }

        self.measurement_deadline = None;
        let points = self.tracker.end_buffering();
        let accuracy = compute_accuracy(&points, self.viewport);
        let result = CalibrationResult::new(accuracy, Utc::now());
        info!(
            "Accuracy measurement finished: {}% over {} points",
            accuracy,
            points.len()
        );

        self.store.save(&result, &self.anchors)?;
        self.last_result = Some(result);
        Ok(result)
    }

    /// Cancel a pending measurement, discarding buffered points
    pub fn cancel_measurement(&mut self) {
        if self.measurement_deadline.take().is_some() {
            let discarded = self.tracker.end_buffering();
            debug!("Accuracy measurement cancelled, {} points discarded", discarded.len());
        }
    }

    /// Run a full accuracy measurement: buffer for the fixation window, then score
    pub async fn run_accuracy_measurement(&mut self) -> Result<CalibrationResult, CalibrationError> {
        let deadline = self.begin_measurement(Instant::now())?;
        tokio::time::sleep_until(deadline).await;
        self.finish_measurement(Instant::now())
    }

    /// Result of the last measurement in this session
    pub fn last_result(&self) -> Option<CalibrationResult> {
        self.last_result
    }

    /// Restart the session: zero every anchor and discard trained data.
    /// The saved calibration is kept until a new measurement replaces it.
    pub fn recalibrate(&mut self) {
        self.reset_session();
        self.tracker.clear_trained_data();
        info!("Recalibrating");
    }

    /// Zero every anchor, clear the saved calibration and discard trained data
    pub fn clear_calibration(&mut self) -> Result<(), CalibrationError> {
        self.reset_session();
        self.tracker.clear_trained_data();
        self.store.clear()
    }

    /// Status of the saved calibration
    pub fn status(&self) -> Result<CalibrationStatus, CalibrationError> {
        self.store.status(&self.config, Utc::now())
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn tracker(&self) -> &G {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut G {
        &mut self.tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gaze_source::{GazeError, GazeFrame, ScreenPoint};
    use std::sync::Arc;
    use storage::MemoryStore;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct FakeTracker {
        running: bool,
        fail_begin: bool,
        buffering: bool,
        trained: Vec<ScreenPoint>,
        fixations: Vec<ScreenPoint>,
        cleared: usize,
    }

    impl GazeTracker for FakeTracker {
        fn begin(&mut self) -> Result<(), GazeError> {
            if self.fail_begin {
                return Err(GazeError::CameraUnavailable("permission denied".into()));
            }
            self.running = true;
            Ok(())
        }

        fn end(&mut self) {
            self.running = false;
        }

        fn is_running(&self) -> bool {
            self.running
        }

        fn set_listener(&mut self, _listener: mpsc::Sender<GazeFrame>) {}

        fn train_on_click(&mut self, position: ScreenPoint) {
            self.trained.push(position);
        }

        fn begin_buffering(&mut self) {
            self.buffering = true;
        }

        fn end_buffering(&mut self) -> Vec<ScreenPoint> {
            self.buffering = false;
            self.fixations.clone()
        }

        fn clear_trained_data(&mut self) {
            self.trained.clear();
            self.cleared += 1;
        }
    }

    fn engine(config: CalibrationConfig) -> CalibrationEngine<FakeTracker, Arc<MemoryStore>> {
        CalibrationEngine::new(
            config,
            Viewport::new(1000.0, 800.0),
            FakeTracker::default(),
            Arc::new(MemoryStore::new()),
        )
    }

    fn complete_all(engine: &mut CalibrationEngine<FakeTracker, Arc<MemoryStore>>) {
        let ids: Vec<String> = engine.anchors().iter().map(|a| a.id.clone()).collect();
        let required = engine.config().required_clicks;
        for _ in 0..required {
            for id in &ids {
                let _ = engine.register_click(id);
            }
        }
        // The center anchor may only have become visible on the last round
        for _ in 0..required {
            let _ = engine.register_click(engine.config().layout.center_id());
        }
    }

    #[test]
    fn test_start_failure_leaves_anchors_untouched() {
        let mut engine = engine(CalibrationConfig::wheelchair_buttons());
        engine.tracker_mut().fail_begin = true;

        assert!(matches!(engine.start(), Err(CalibrationError::TrackerInit(_))));
        assert!(!engine.is_started());
        assert!(matches!(
            engine.register_click("forward"),
            Err(CalibrationError::NotStarted)
        ));
        assert!(engine.anchors().iter().all(|a| a.clicks_so_far == 0));
    }

    #[test]
    fn test_clicks_clamped_and_trained() {
        let mut engine = engine(CalibrationConfig::wheelchair_buttons());
        engine.start().unwrap();

        for i in 1..=4 {
            let outcome = engine.register_click("left").unwrap();
            assert_eq!(outcome.clicks, i);
            assert!(!outcome.newly_complete);
        }
        let outcome = engine.register_click("left").unwrap();
        assert!(outcome.newly_complete);
        assert_eq!(engine.completed_anchors(), 1);

        let outcome = engine.register_click("left").unwrap();
        assert_eq!(outcome.clicks, 5);
        assert!(!outcome.newly_complete);
        assert_eq!(engine.completed_anchors(), 1);
        assert_eq!(engine.tracker().trained.len(), 5);
        assert_eq!(engine.tracker().trained[0], ScreenPoint::new(250.0, 400.0));
    }

    #[test]
    fn test_unknown_anchor() {
        let mut engine = engine(CalibrationConfig::wheelchair_buttons());
        engine.start().unwrap();
        assert!(matches!(
            engine.register_click("upward"),
            Err(CalibrationError::UnknownAnchor(_))
        ));
    }

    #[test]
    fn test_center_anchor_revealed_last() {
        let mut engine = engine(CalibrationConfig::nine_point());
        engine.start().unwrap();
        assert!(!engine.is_anchor_visible("pt5"));
        assert!(matches!(
            engine.register_click("pt5"),
            Err(CalibrationError::AnchorHidden(_))
        ));

        for id in ["pt1", "pt2", "pt3", "pt4", "pt6", "pt7", "pt8", "pt9"] {
            for _ in 0..5 {
                engine.register_click(id).unwrap();
            }
        }
        assert_eq!(engine.completed_anchors(), 8);
        assert!(engine.is_anchor_visible("pt5"));
        assert!(!engine.all_anchors_complete());

        for _ in 0..5 {
            engine.register_click("pt5").unwrap();
        }
        assert!(engine.all_anchors_complete());
    }

    #[test]
    fn test_measurement_before_complete_is_not_ready() {
        let mut engine = engine(CalibrationConfig::wheelchair_buttons());
        engine.start().unwrap();
        engine.register_click("stop").unwrap();

        match engine.begin_measurement(Instant::now()) {
            Err(CalibrationError::NotReady { completed, total }) => {
                assert_eq!(completed, 0);
                assert_eq!(total, 5);
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(!engine.tracker().buffering);
        assert!(engine.last_result().is_none());
    }

    #[test]
    fn test_finish_before_window_elapsed() {
        let mut engine = engine(CalibrationConfig::wheelchair_buttons());
        engine.start().unwrap();
        complete_all(&mut engine);

        let start = Instant::now();
        let deadline = engine.begin_measurement(start).unwrap();
        assert_eq!(deadline - start, Duration::from_millis(5000));
        assert!(matches!(
            engine.finish_measurement(start + Duration::from_millis(4000)),
            Err(CalibrationError::MeasurementPending { remaining_ms: 1000 })
        ));
        assert!(engine.tracker().buffering);

        engine.tracker_mut().fixations = vec![ScreenPoint::new(500.0, 400.0); 10];
        let result = engine.finish_measurement(deadline).unwrap();
        assert_eq!(result.accuracy_percent, 100);
        assert!(engine.measurement_deadline().is_none());
        assert!(matches!(
            engine.finish_measurement(deadline),
            Err(CalibrationError::NoMeasurement)
        ));
    }

    #[test]
    fn test_teardown_cancels_measurement() {
        let mut engine = engine(CalibrationConfig::wheelchair_buttons());
        engine.start().unwrap();
        complete_all(&mut engine);
        engine.begin_measurement(Instant::now()).unwrap();

        engine.teardown();
        assert!(engine.measurement_deadline().is_none());
        assert!(!engine.tracker().buffering);
        assert!(!engine.tracker().is_running());
    }

    #[test]
    fn test_recalibrate_keeps_saved_result() {
        let mut engine = engine(CalibrationConfig::wheelchair_buttons());
        engine.start().unwrap();
        complete_all(&mut engine);
        engine.tracker_mut().fixations = vec![ScreenPoint::new(500.0, 400.0); 5];
        let deadline = engine.begin_measurement(Instant::now()).unwrap();
        engine.finish_measurement(deadline).unwrap();

        engine.recalibrate();
        assert_eq!(engine.completed_anchors(), 0);
        assert!(!engine.all_anchors_complete());
        assert!(engine.tracker().trained.is_empty());
        assert!(engine.is_started());
        assert_eq!(
            engine.status().unwrap(),
            CalibrationStatus::Calibrated { accuracy: 100 }
        );
    }

    #[test]
    fn test_clear_calibration() {
        let mut engine = engine(CalibrationConfig::wheelchair_buttons());
        engine.start().unwrap();
        complete_all(&mut engine);
        engine.tracker_mut().fixations = vec![ScreenPoint::new(500.0, 400.0); 5];
        let deadline = engine.begin_measurement(Instant::now()).unwrap();
        engine.finish_measurement(deadline).unwrap();

        engine.clear_calibration().unwrap();
        assert!(engine.anchors().iter().all(|a| a.clicks_so_far == 0));
        assert_eq!(engine.tracker().cleared, 1);
        assert_eq!(engine.status().unwrap(), CalibrationStatus::NotCalibrated);
    }
}
