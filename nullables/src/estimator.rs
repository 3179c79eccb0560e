//! Nullable landmark estimator: deterministic results, counted lifecycle.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use vigil_face::landmarks::{CHIN, FOREHEAD, LEFT_CHEEK, NOSE_TIP, RIGHT_CHEEK};
use vigil_face::{EstimatorOptions, FaceError, Landmark, LandmarkEstimator, LandmarkResult, VideoFrame};

/// A 478-point face with the nose at (`nose_x`, `nose_y`), cheeks at x
/// 0.3/0.7, forehead at y 0.2 and chin at y 0.8.
pub fn frontal_face(nose_x: f32, nose_y: f32) -> LandmarkResult {
    let mut points = vec![Landmark::new(0.5, 0.5, 0.0); 478];
    points[LEFT_CHEEK] = Landmark::new(0.3, 0.5, 0.0);
    points[RIGHT_CHEEK] = Landmark::new(0.7, 0.5, 0.0);
    points[FOREHEAD] = Landmark::new(0.5, 0.2, 0.0);
    points[CHIN] = Landmark::new(0.5, 0.8, 0.0);
    points[NOSE_TIP] = Landmark::new(nose_x, nose_y, 0.0);
    LandmarkResult::single(points)
}

/// A test estimator returning the same result for every frame.
pub struct NullEstimator {
    result: Mutex<LandmarkResult>,
    latency: Duration,
    load_latency: Duration,
    fail_load: bool,
    loads: AtomicUsize,
    estimates: AtomicUsize,
    closed: AtomicBool,
}

impl NullEstimator {
    pub fn returning(result: LandmarkResult) -> Self {
        Self {
            result: Mutex::new(result),
            latency: Duration::ZERO,
            load_latency: Duration::ZERO,
            fail_load: false,
            loads: AtomicUsize::new(0),
            estimates: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// An estimator that always sees a centred, attentive face.
    pub fn attentive() -> Self {
        Self::returning(frontal_face(0.5, 0.5))
    }

    /// An estimator whose model never loads.
    pub fn broken() -> Self {
        Self {
            fail_load: true,
            ..Self::attentive()
        }
    }

    /// Each estimate takes `latency` (tokio time) before resolving.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// The model takes `latency` (tokio time) to load.
    pub fn with_load_latency(mut self, latency: Duration) -> Self {
        self.load_latency = latency;
        self
    }

    /// Change what subsequent frames resolve to.
    pub fn set_result(&self, result: LandmarkResult) {
        *self.result.lock().unwrap() = result;
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn estimate_count(&self) -> usize {
        self.estimates.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LandmarkEstimator for NullEstimator {
    async fn load(&self, _options: &EstimatorOptions) -> Result<(), FaceError> {
        if !self.load_latency.is_zero() {
            tokio::time::sleep(self.load_latency).await;
        }
        if self.fail_load {
            return Err(FaceError::ModelInit("null model refuses to load".into()));
        }
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn estimate(&self, _frame: &VideoFrame) -> Result<LandmarkResult, FaceError> {
        self.estimates.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(self.result.lock().unwrap().clone())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
