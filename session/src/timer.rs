//! Exam countdown.

/// Result of one countdown step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerTick {
    Running(u64),
    /// Reached zero on this tick. Reported exactly once.
    Expired,
    /// Already at zero; nothing left to do.
    Idle,
}

/// Whole-second countdown owned by the lifecycle controller.
#[derive(Clone, Debug)]
pub struct ExamTimer {
    remaining_secs: u64,
}

impl ExamTimer {
    pub fn new(duration_secs: u64) -> Self {
        Self {
            remaining_secs: duration_secs,
        }
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn is_expired(&self) -> bool {
        self.remaining_secs == 0
    }

    /// Advance by one second.
    pub fn tick(&mut self) -> TimerTick {
        match self.remaining_secs {
            0 => TimerTick::Idle,
            1 => {
                self.remaining_secs = 0;
                TimerTick::Expired
            }
            n => {
                self.remaining_secs = n - 1;
                TimerTick::Running(n - 1)
            }
        }
    }
}

/// Countdown display: `mm:ss` under an hour, `h:mm:ss` from an hour up.
pub fn format_countdown(secs: u64) -> String {
    if secs < 3600 {
        format!("{:02}:{:02}", secs / 60, secs % 60)
    } else {
        format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
