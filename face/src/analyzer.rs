//! Owned landmark-model wrapper with an explicit `new` / `dispose` lifecycle.
//!
//! One analyzer belongs to one exam attempt; nothing is shared across
//! attempts. Results are delivered through a replaceable callback, decoupled
//! from the capture cadence, and at most one analysis is in flight at a time.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use vigil_types::FacePoseSignal;

use crate::{analyze, EstimatorOptions, FaceError, FacePoseThresholds, LandmarkEstimator, VideoFrame};

/// Receives one signal per analysed frame. Must not call back into the
/// analyzer that invoked it.
pub type ResultCallback = Arc<dyn Fn(FacePoseSignal) + Send + Sync>;

/// What happened to a submitted frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Analysis started; the result arrives through the callback.
    Started,
    /// Dropped: the previous frame is still being analysed.
    Busy,
    /// Dropped: the model is not loaded yet.
    NotReady,
    /// Dropped: the analyzer has been disposed.
    Disposed,
}

/// Frame counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AnalyzerStats {
    pub started: u64,
    pub skipped: u64,
    pub delivered: u64,
    pub failed: u64,
}

pub struct FaceAnalyzer {
    estimator: Arc<dyn LandmarkEstimator>,
    thresholds: FacePoseThresholds,
    options: EstimatorOptions,
    initialized: AtomicBool,
    disposed: AtomicBool,
    in_flight: AtomicBool,
    init_lock: tokio::sync::Mutex<()>,
    callback: RwLock<Option<ResultCallback>>,
    started: AtomicU64,
    skipped: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl FaceAnalyzer {
    pub fn new(
        estimator: Arc<dyn LandmarkEstimator>,
        thresholds: FacePoseThresholds,
        options: EstimatorOptions,
    ) -> Arc<Self> {
        Arc::new(Self {
            estimator,
            thresholds,
            options,
            initialized: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            in_flight: AtomicBool::new(false),
            init_lock: tokio::sync::Mutex::new(()),
            callback: RwLock::new(None),
            started: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        })
    }

    /// Load the model once and install `on_result`.
    ///
    /// Calling again after a successful load only swaps the callback; the
    /// model is never loaded twice.
    pub async fn initialize(&self, on_result: ResultCallback) -> Result<(), FaceError> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(FaceError::Disposed);
        }

        let _guard = self.init_lock.lock().await;
        if self.initialized.load(Ordering::Acquire) {
            tracing::debug!("face analyzer already initialised, swapping result callback");
            *self.callback.write() = Some(on_result);
            return Ok(());
        }

        self.estimator.load(&self.options).await?;
        if self.is_disposed() {
            // Disposed while loading; `dispose` saw nothing to close.
            self.estimator.close();
            return Err(FaceError::Disposed);
        }
        *self.callback.write() = Some(on_result);
        self.initialized.store(true, Ordering::Release);
        tracing::info!("face analyzer initialised");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Start analysing `frame` without waiting for the result.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(self: &Arc<Self>, frame: VideoFrame) -> SubmitOutcome {
        if self.is_disposed() {
            return SubmitOutcome::Disposed;
        }
        if !self.is_initialized() {
            return SubmitOutcome::NotReady;
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.skipped.fetch_add(1, Ordering::Relaxed);
            return SubmitOutcome::Busy;
        }

        self.started.fetch_add(1, Ordering::Relaxed);
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let result = this.estimator.estimate(&frame).await;
            this.in_flight.store(false, Ordering::Release);
            match result {
                Ok(landmarks) => this.deliver(analyze(&landmarks, &this.thresholds)),
                Err(e) => {
                    // Frames that are not ready yet fail routinely.
                    this.failed.fetch_add(1, Ordering::Relaxed);
                    tracing::trace!(error = %e, "frame analysis failed");
                }
            }
        });
        SubmitOutcome::Started
    }

    fn deliver(&self, signal: FacePoseSignal) {
        // Holding the read lock across the call means `dispose` cannot
        // return while a delivery is still running.
        let callback = self.callback.read();
        if self.is_disposed() {
            return;
        }
        if let Some(cb) = callback.as_ref() {
            tracing::trace!(status = ?signal.status, yaw = signal.yaw, pitch = signal.pitch, "frame analysed");
            self.delivered.fetch_add(1, Ordering::Relaxed);
            cb(signal);
        }
    }

    /// Release the model. After this returns no callback fires again,
    /// whatever frames are still submitted.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.callback.write().take();
        if self.initialized.swap(false, Ordering::AcqRel) {
            self.estimator.close();
        }
        tracing::info!("face analyzer disposed");
    }

    pub fn stats(&self) -> AnalyzerStats {
        AnalyzerStats {
            started: self.started.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}
