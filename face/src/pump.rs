//! Frame pump: best-effort capture at the display refresh cadence.
//!
//! Each tick captures the current frame and hands it to the analyzer without
//! waiting for the result. Late ticks are skipped rather than bunched up, and
//! backpressure is left to the analyzer's one-in-flight gate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::{FaceAnalyzer, VideoSource};

/// How long `stop` waits for the capture task to wind down.
const STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Handle to a running capture loop. Owns the video source and the analyzer
/// for the lifetime of the exam screen.
pub struct FramePump {
    source: Arc<dyn VideoSource>,
    analyzer: Arc<FaceAnalyzer>,
    captured: Arc<AtomicU64>,
    shutdown_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl FramePump {
    /// Start pumping frames from `source` into `analyzer` at `refresh_hz`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(source: Arc<dyn VideoSource>, analyzer: Arc<FaceAnalyzer>, refresh_hz: u32) -> Self {
        let period = Duration::from_secs(1) / refresh_hz.max(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let captured = Arc::new(AtomicU64::new(0));

        let task = tokio::spawn(run_pump_loop(
            Arc::clone(&source),
            Arc::clone(&analyzer),
            period,
            Arc::clone(&captured),
            shutdown_rx,
        ));
        tracing::info!(refresh_hz, "frame pump started");

        Self {
            source,
            analyzer,
            captured,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }

    /// Frames captured so far.
    pub fn frames_captured(&self) -> u64 {
        self.captured.load(Ordering::Relaxed)
    }

    pub fn analyzer(&self) -> &Arc<FaceAnalyzer> {
        &self.analyzer
    }

    /// Cancel the loop, stop the camera tracks and release the model.
    /// Idempotent.
    pub async fn stop(&mut self) {
        let Some(tx) = self.shutdown_tx.take() else {
            return;
        };
        let _ = tx.send(true);
        if let Some(task) = self.task.take() {
            if tokio::time::timeout(STOP_TIMEOUT, task).await.is_err() {
                tracing::warn!("frame pump did not stop in time");
            }
        }
        self.source.stop();
        self.analyzer.dispose();
        tracing::info!(frames = self.frames_captured(), "frame pump stopped");
    }
}

impl Drop for FramePump {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            self.source.stop();
            self.analyzer.dispose();
        }
    }
}

async fn run_pump_loop(
    source: Arc<dyn VideoSource>,
    analyzer: Arc<FaceAnalyzer>,
    period: Duration,
    captured: Arc<AtomicU64>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut frames = tokio::time::interval(period);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = frames.tick() => {
                if let Some(frame) = source.capture() {
                    captured.fetch_add(1, Ordering::Relaxed);
                    analyzer.submit(frame);
                }
            }
        }
    }
}
