use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic clock used to time trials and frames.
pub trait Timer: Clone + Send + Sync {
    type Timestamp: Copy + Clone + Send + Sync;
    fn now(&self) -> Self::Timestamp;
    fn elapsed(&self, ts: Self::Timestamp) -> Duration;
    fn record_frame(&mut self, d: Duration);
    fn frame_stats(&self) -> FrameTimingStats;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameTimingStats {
    pub samples: usize,
    pub average_frame_time_ns: f64,
    pub jitter_ns: f64,
    pub min_frame_time_ns: f64,
    pub max_frame_time_ns: f64,
}

impl FrameTimingStats {
    fn from_samples(frame_times: &[Duration]) -> Self {
        if frame_times.is_empty() {
            return Self::default();
        }
        let times: Vec<f64> = frame_times.iter().map(|d| d.as_nanos() as f64).collect();
        let n = times.len() as f64;
        let avg = times.iter().sum::<f64>() / n;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / n;
        let min = times.iter().copied().fold(f64::INFINITY, f64::min);
        let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self {
            samples: times.len(),
            average_frame_time_ns: avg,
            jitter_ns: var.sqrt(),
            min_frame_time_ns: min,
            max_frame_time_ns: max,
        }
    }
}

/// Converts a nanosecond span to whole milliseconds, rounding halves up.
pub fn nanos_to_millis(ns: u64) -> u64 {
    (ns + 500_000) / 1_000_000
}

fn push_sample(frame_times: &mut Vec<Duration>, max_samples: usize, d: Duration) {
    if frame_times.len() >= max_samples {
        frame_times.remove(0);
    }
    frame_times.push(d);
}

/// Wall clock backed by [`Instant`], timestamps in nanoseconds since creation.
#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    pub start: Instant,
    pub frame_times: Vec<Duration>,
    pub max_samples: usize,
}

impl Timer for HighPrecisionTimer {
    type Timestamp = u64;
    fn now(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }
    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }
    fn record_frame(&mut self, d: Duration) {
        push_sample(&mut self.frame_times, self.max_samples, d);
    }
    fn frame_stats(&self) -> FrameTimingStats {
        FrameTimingStats::from_samples(&self.frame_times)
    }
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            frame_times: Vec::with_capacity(1000),
            max_samples: 1000,
        }
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Clock that only moves when told to. Clones share the same time source,
/// so a test can keep one handle and advance the clock seen by a trial.
#[derive(Debug, Clone, Default)]
pub struct ManualTimer {
    now_ns: Arc<AtomicU64>,
    frame_times: Vec<Duration>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, d: Duration) {
        self.now_ns.fetch_add(d.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, ns: u64) {
        self.now_ns.store(ns, Ordering::SeqCst);
    }
}

impl Timer for ManualTimer {
    type Timestamp = u64;
    fn now(&self) -> u64 {
        self.now_ns.load(Ordering::SeqCst)
    }
    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }
    fn record_frame(&mut self, d: Duration) {
        push_sample(&mut self.frame_times, 1000, d);
    }
    fn frame_stats(&self) -> FrameTimingStats {
        FrameTimingStats::from_samples(&self.frame_times)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_timer_clones_share_time() {
        let t = ManualTimer::new();
        let seen_by_trial = t.clone();
        let start = seen_by_trial.now();
        t.advance(Duration::from_millis(250));
        assert_eq!(seen_by_trial.elapsed(start), Duration::from_millis(250));
    }

    #[test]
    fn elapsed_never_underflows() {
        let t = ManualTimer::new();
        t.set(10);
        assert_eq!(t.elapsed(1_000), Duration::ZERO);
    }

    #[test]
    fn millis_round_half_up() {
        assert_eq!(nanos_to_millis(0), 0);
        assert_eq!(nanos_to_millis(499_999), 0);
        assert_eq!(nanos_to_millis(500_000), 1);
        assert_eq!(nanos_to_millis(1_834_200_000), 1834);
    }

    #[test]
    fn frame_stats_summarise_samples() {
        let mut t = ManualTimer::new();
        assert_eq!(t.frame_stats().samples, 0);
        t.record_frame(Duration::from_nanos(100));
        t.record_frame(Duration::from_nanos(300));
        let s = t.frame_stats();
        assert_eq!(s.samples, 2);
        assert_eq!(s.average_frame_time_ns, 200.0);
        assert_eq!(s.jitter_ns, 100.0);
        assert_eq!(s.min_frame_time_ns, 100.0);
        assert_eq!(s.max_frame_time_ns, 300.0);
    }

    #[test]
    fn high_precision_timer_is_monotonic() {
        let t = HighPrecisionTimer::new();
        let a = t.now();
        let b = t.now();
        assert!(b >= a);
    }
}
