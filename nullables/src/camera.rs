//! Nullable camera: synthetic frames, observable track state.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use vigil_face::{Camera, FaceError, VideoFrame, VideoSource};
use vigil_types::Timestamp;

/// A video source that yields a tiny blank frame on every capture.
///
/// Keeps producing frames after [`stop`](VideoSource::stop), like a dangling
/// video element would, so teardown can be checked end to end.
pub struct NullVideoSource {
    captures: AtomicUsize,
    stopped: AtomicBool,
}

impl NullVideoSource {
    pub fn new() -> Self {
        Self {
            captures: AtomicUsize::new(0),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn capture_count(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl Default for NullVideoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoSource for NullVideoSource {
    fn capture(&self) -> Option<VideoFrame> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        Some(VideoFrame {
            width: 2,
            height: 2,
            captured_at: Timestamp::now(),
            pixels: Arc::from(vec![0u8; 12]),
        })
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// A camera that either grants its one source or denies permission.
pub struct NullCamera {
    source: Option<Arc<NullVideoSource>>,
}

impl NullCamera {
    pub fn granted(source: Arc<NullVideoSource>) -> Self {
        Self {
            source: Some(source),
        }
    }

    pub fn denied() -> Self {
        Self { source: None }
    }
}

#[async_trait]
impl Camera for NullCamera {
    async fn open(&self) -> Result<Arc<dyn VideoSource>, FaceError> {
        match &self.source {
            Some(source) => Ok(Arc::clone(source) as Arc<dyn VideoSource>),
            None => Err(FaceError::CameraUnavailable("permission denied".into())),
        }
    }
}
