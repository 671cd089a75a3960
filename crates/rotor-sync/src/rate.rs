use std::time::{Duration, Instant};

/// Length of one counting window.
pub const RATE_WINDOW: Duration = Duration::from_secs(1);

/// Counts applied snapshots per wall-clock second.
///
/// The reported figure is the whole count of the last closed window, not a
/// smoothed average.
#[derive(Debug, Clone)]
pub struct RateMonitor {
    count: u32,
    window_start: Instant,
    rate: u32,
}

impl RateMonitor {
    pub fn new(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
            rate: 0,
        }
    }

    /// Count one applied snapshot in the current window.
    pub fn record(&mut self) {
        self.count = self.count.saturating_add(1);
    }

    /// Close the window if a full second has passed since it opened.
    /// Returns the freshly published rate when it did.
    pub fn roll(&mut self, now: Instant) -> Option<u32> {
        if now.saturating_duration_since(self.window_start) < RATE_WINDOW {
            return None;
        }
        self.rate = self.count;
        self.count = 0;
        self.window_start = now;
        Some(self.rate)
    }

    /// Rate reported by the last closed window.
    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Snapshots counted so far in the open window.
    pub fn pending(&self) -> u32 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_whole_second_count() {
        let start = Instant::now();
        let mut monitor = RateMonitor::new(start);
        for i in 0..42u64 {
            monitor.record();
            assert_eq!(monitor.roll(start + Duration::from_millis(i * 20)), None);
        }
        assert_eq!(monitor.pending(), 42);
        assert_eq!(monitor.roll(start + RATE_WINDOW), Some(42));
        assert_eq!(monitor.rate(), 42);
        assert_eq!(monitor.pending(), 0);
    }

    #[test]
    fn window_restarts_at_rollover() {
        let start = Instant::now();
        let mut monitor = RateMonitor::new(start);
        monitor.record();
        let rolled_at = start + Duration::from_millis(1_300);
        assert_eq!(monitor.roll(rolled_at), Some(1));
        monitor.record();
        monitor.record();
        assert_eq!(monitor.roll(rolled_at + Duration::from_millis(999)), None);
        assert_eq!(monitor.roll(rolled_at + RATE_WINDOW), Some(2));
    }

    #[test]
    fn idle_window_reports_zero() {
        let start = Instant::now();
        let mut monitor = RateMonitor::new(start);
        monitor.record();
        monitor.roll(start + RATE_WINDOW);
        assert_eq!(monitor.roll(start + RATE_WINDOW * 2), Some(0));
        assert_eq!(monitor.rate(), 0);
    }
}
