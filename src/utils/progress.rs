use std::fmt;
use std::time::{Duration, Instant};

/// Tracks progress of a long loop and decides when a status line is due.
pub struct ProgressTracker {
    total: usize,
    current: usize,
    start_time: Instant,
    last_update: Instant,
    update_interval: Duration,
    title: String,
}

impl ProgressTracker {
    pub fn new(total: usize, title: &str) -> Self {
        let now = Instant::now();
        Self {
            total,
            current: 0,
            start_time: now,
            last_update: now,
            update_interval: Duration::from_secs(1),
            title: title.to_string(),
        }
    }

    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    /// Counts one finished item; returns true when a status line should be shown.
    pub fn increment(&mut self) -> bool {
        self.current = (self.current + 1).min(self.total);
        let now = Instant::now();
        if now.duration_since(self.last_update) >= self.update_interval || self.current == self.total {
            self.last_update = now;
            true
        } else {
            false
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn status(&self) -> String {
        let elapsed = self.last_update.duration_since(self.start_time);
        let pct = if self.total == 0 {
            100.0
        } else {
            (self.current as f64 / self.total as f64) * 100.0
        };
        format!(
            "{}: {}/{} ({:.1}%) in {:.1?}",
            self.title, self.current, self.total, pct, elapsed
        )
    }
}

impl fmt::Display for ProgressTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status())
    }
}
