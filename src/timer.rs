//! Countdown timer arithmetic.
//!
//! The active timer is a persisted snapshot (start instant + duration);
//! the displayed remaining time is derived from it on every tick, so the
//! timer survives restarts. Scheduling the tick is the caller's business;
//! everything here is pure arithmetic over unix seconds.

use serde::{Deserialize, Serialize};

/// Reload grace window past the nominal duration, in minutes. A snapshot
/// older than duration + grace is discarded as stale on load.
pub const GRACE_MINUTES: i64 = 60;

/// A running countdown bound to a mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub task_id: String,
    pub title: String,
    /// Unix seconds at start.
    pub started_at: i64,
    pub duration_minutes: i64,
}

impl TimerSnapshot {
    pub fn new(task_id: impl Into<String>, title: impl Into<String>, now: i64, duration_minutes: i64) -> Self {
        TimerSnapshot {
            task_id: task_id.into(),
            title: title.into(),
            started_at: now,
            duration_minutes,
        }
    }

    /// Seconds left, clamped at zero.
    pub fn remaining_seconds(&self, now: i64) -> i64 {
        (self.started_at + self.duration_minutes * 60 - now).max(0)
    }

    /// True once the full duration has elapsed.
    pub fn is_finished(&self, now: i64) -> bool {
        self.remaining_seconds(now) == 0
    }

    /// Completion fraction in 0..=100 for a progress bar.
    pub fn progress_percent(&self, now: i64) -> f64 {
        if self.duration_minutes <= 0 {
            return 100.0;
        }
        let elapsed = (now - self.started_at) as f64;
        let total = (self.duration_minutes * 60) as f64;
        (elapsed / total * 100.0).clamp(0.0, 100.0)
    }

    /// Stale snapshots are not worth restoring: the session they belonged
    /// to is long over.
    pub fn is_stale(&self, now: i64) -> bool {
        now - self.started_at >= (self.duration_minutes + GRACE_MINUTES) * 60
    }
}

/// Format remaining seconds as `MM:SS` (or `H:MM:SS` over an hour).
pub fn format_remaining(seconds: i64) -> String {
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timer() -> TimerSnapshot {
        TimerSnapshot::new("t1", "Deep work", 1_000_000, 25)
    }

    #[test]
    fn remaining_counts_down_and_clamps() {
        let t = timer();
        assert_eq!(t.remaining_seconds(1_000_000), 25 * 60);
        assert_eq!(t.remaining_seconds(1_000_000 + 600), 15 * 60);
        assert_eq!(t.remaining_seconds(1_000_000 + 25 * 60 + 5), 0);
        assert!(t.is_finished(1_000_000 + 25 * 60));
    }

    #[test]
    fn progress_spans_zero_to_hundred() {
        let t = timer();
        assert_eq!(t.progress_percent(1_000_000), 0.0);
        assert_eq!(t.progress_percent(1_000_000 + 25 * 30), 50.0);
        assert_eq!(t.progress_percent(1_000_000 + 25 * 600), 100.0);
    }

    #[test]
    fn stale_after_duration_plus_grace() {
        let t = timer();
        let just_inside = 1_000_000 + (25 + GRACE_MINUTES) * 60 - 1;
        let outside = 1_000_000 + (25 + GRACE_MINUTES) * 60;
        assert!(!t.is_stale(just_inside));
        assert!(t.is_stale(outside));
    }

    #[test]
    fn formats_minutes_and_hours() {
        assert_eq!(format_remaining(90), "01:30");
        assert_eq!(format_remaining(3725), "1:02:05");
        assert_eq!(format_remaining(0), "00:00");
    }
}
