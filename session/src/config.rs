//! Session configuration with TOML file support.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use vigil_face::FacePoseThresholds;

use crate::SessionError;

/// Configuration for one proctored exam session.
///
/// Can be loaded from a TOML file via [`SessionConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Base URL of the exam backend.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Per-request HTTP timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Countdown start for a fresh attempt.
    #[serde(default = "default_exam_duration_secs")]
    pub exam_duration_secs: u64,

    /// Delay between entering fullscreen and arming the violation arbiter.
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    /// Cadence of the out-of-band status poll.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Pause before a voluntary submission hits the network.
    #[serde(default = "default_voluntary_submit_delay_ms")]
    pub voluntary_submit_delay_ms: u64,

    /// How long a soft-violation warning stays on screen.
    #[serde(default = "default_warning_display_secs")]
    pub warning_display_secs: u64,

    /// Frame pump cadence.
    #[serde(default = "default_refresh_hz")]
    pub refresh_hz: u32,

    /// Fail the launch when the landmark model cannot load, instead of
    /// continuing with security-event monitoring only.
    #[serde(default)]
    pub require_face_model: bool,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub thresholds: FacePoseThresholds,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_backend_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_exam_duration_secs() -> u64 {
    3600
}

fn default_grace_period_ms() -> u64 {
    3000
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_voluntary_submit_delay_ms() -> u64 {
    1500
}

fn default_warning_display_secs() -> u64 {
    3
}

fn default_refresh_hz() -> u32 {
    60
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl SessionConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, SessionError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| SessionError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, SessionError> {
        toml::from_str(s).map_err(|e| SessionError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("SessionConfig is always serializable to TOML")
    }

    /// Reject values the session loop cannot run with.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.exam_duration_secs == 0 {
            return Err(SessionError::Config("exam_duration_secs must be positive".into()));
        }
        if self.poll_interval_secs == 0 {
            return Err(SessionError::Config("poll_interval_secs must be positive".into()));
        }
        if self.refresh_hz == 0 {
            return Err(SessionError::Config("refresh_hz must be positive".into()));
        }
        self.thresholds
            .validate()
            .map_err(|e| SessionError::Config(e.to_string()))
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn voluntary_submit_delay(&self) -> Duration {
        Duration::from_millis(self.voluntary_submit_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            request_timeout_secs: default_request_timeout_secs(),
            exam_duration_secs: default_exam_duration_secs(),
            grace_period_ms: default_grace_period_ms(),
            poll_interval_secs: default_poll_interval_secs(),
            voluntary_submit_delay_ms: default_voluntary_submit_delay_ms(),
            warning_display_secs: default_warning_display_secs(),
            refresh_hz: default_refresh_hz(),
            require_face_model: false,
            log_format: default_log_format(),
            log_level: default_log_level(),
            thresholds: FacePoseThresholds::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.backend_url, "http://127.0.0.1:8000");
        assert_eq!(cfg.exam_duration_secs, 3600);
        assert_eq!(cfg.grace_period(), Duration::from_secs(3));
        assert_eq!(cfg.poll_interval(), Duration::from_secs(5));
        assert_eq!(cfg.voluntary_submit_delay(), Duration::from_millis(1500));
        assert_eq!(cfg.refresh_hz, 60);
        assert!(!cfg.require_face_model);
        assert_eq!(cfg.log_format, "human");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg = SessionConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, SessionConfig::default());
    }

    #[test]
    fn partial_toml_overrides_fields() {
        let toml = r#"
            exam_duration_secs = 1800
            log_format = "json"

            [thresholds]
            max_yaw = 0.2
        "#;
        let cfg = SessionConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.exam_duration_secs, 1800);
        assert_eq!(cfg.log_format, "json");
        assert!((cfg.thresholds.max_yaw - 0.2).abs() < f32::EPSILON);
        assert!((cfg.thresholds.min_pitch - 0.25).abs() < f32::EPSILON);
        assert_eq!(cfg.grace_period_ms, 3000);
    }

    #[test]
    fn toml_roundtrip() {
        let mut cfg = SessionConfig::default();
        cfg.require_face_model = true;
        cfg.poll_interval_secs = 2;
        let parsed = SessionConfig::from_toml_str(&cfg.to_toml_string()).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn from_toml_file_reads_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vigil.toml");
        std::fs::write(&path, "grace_period_ms = 500\n").unwrap();
        let cfg = SessionConfig::from_toml_file(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.grace_period(), Duration::from_millis(500));
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = SessionConfig::from_toml_file("/nonexistent/vigil.toml").unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));
    }

    #[test]
    fn validate_rejects_zero_durations() {
        let cfg = SessionConfig {
            exam_duration_secs: 0,
            ..SessionConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = SessionConfig {
            refresh_hz: 0,
            ..SessionConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_pitch_band() {
        let mut cfg = SessionConfig::default();
        cfg.thresholds.min_pitch = 0.9;
        assert!(matches!(cfg.validate(), Err(SessionError::Config(_))));
    }
}
