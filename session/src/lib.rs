//! Exam session lifecycle for the proctoring client.
//!
//! [`ProctorSession`] assembles one attempt: it loads the session from the
//! backend, opens the camera and landmark model, and spawns the lifecycle
//! controller that runs the countdown, the fullscreen gate, the grace period
//! before arming, the status poll and the one-shot submission.
//!
//! States: `Loading → AwaitingFullscreen → Running → Submitting →
//! Completed | Terminated`. Time expiry and voluntary submission end in
//! `Completed`; a violation or a server-side termination ends in
//! `Terminated`.

pub mod config;
mod controller;
pub mod error;
pub mod events;
pub mod logging;
pub mod metrics;
mod session;
pub mod shutdown;
mod sinks;
mod surface;
pub mod timer;

pub use config::SessionConfig;
pub use error::SessionError;
pub use events::{EndedBy, LifecycleState, SessionEvent, SessionOutcome};
pub use logging::{init_logging, LogFormat};
pub use metrics::ProctorMetrics;
pub use session::{FaceInputs, ProctorSession};
pub use shutdown::{ShutdownCause, ShutdownController};
pub use timer::{format_countdown, ExamTimer, TimerTick};
