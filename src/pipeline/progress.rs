//! Per-pass progress counter

use std::time::{Duration, Instant};

/// Units between two progress log lines
pub const PROGRESS_INTERVAL: u64 = 1000;

/// Counts processed units of one pass and logs every [`PROGRESS_INTERVAL`]
#[derive(Debug)]
pub struct Progress {
    pass: &'static str,
    interval: u64,
    count: u64,
    started: Instant,
}

impl Progress {
    /// Start counting for the pass named `pass`
    pub fn new(pass: &'static str) -> Self {
        Self::with_interval(pass, PROGRESS_INTERVAL)
    }

    /// Start counting with a custom log interval (0 is treated as 1)
    pub fn with_interval(pass: &'static str, interval: u64) -> Self {
        Self {
            pass,
            interval: interval.max(1),
            count: 0,
            started: Instant::now(),
        }
    }

    /// Count one unit; returns whether a progress line was logged
    pub fn tick(&mut self) -> bool {
        self.count += 1;
        if self.count % self.interval == 0 {
            tracing::info!(
                pass = self.pass,
                count = self.count,
                elapsed_ms = self.started.elapsed().as_millis() as u64,
                "Progress"
            );
            return true;
        }
        false
    }

    /// Units counted so far
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Time since the pass started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Log the final count and elapsed time, returning the elapsed time
    pub fn finish(&self) -> Duration {
        let elapsed = self.elapsed();
        tracing::info!(
            pass = self.pass,
            count = self.count,
            elapsed_secs = elapsed.as_secs_f64(),
            "Pass finished"
        );
        elapsed
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logs_on_every_interval() {
        let mut progress = Progress::with_interval("test", 3);
        let logged: Vec<bool> = (0..7).map(|_| progress.tick()).collect();

        assert_eq!(logged, vec![false, false, true, false, false, true, false]);
        assert_eq!(progress.count(), 7);
    }

    #[test]
    fn zero_interval_is_clamped() {
        let mut progress = Progress::with_interval("test", 0);
        assert!(progress.tick());
        assert!(progress.tick());
    }

    #[test]
    fn default_interval_is_a_thousand() {
        let mut progress = Progress::new("test");
        let logged = (0..PROGRESS_INTERVAL).filter(|_| progress.tick()).count();
        assert_eq!(logged, 1);
        assert!(progress.finish() >= Duration::ZERO);
    }
}
