use std::fmt;
use std::time::Duration;

/// Committed offset observed at `elapsed` since the run started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSample {
    pub offset: usize,
    pub elapsed: Duration,
}

impl ProgressSample {
    pub fn new(offset: usize, elapsed: Duration) -> Self {
        Self { offset, elapsed }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Eta {
    Unknown,
    Known(Duration),
}

impl fmt::Display for Eta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Eta::Unknown => f.write_str("unknown"),
            Eta::Known(remaining) => {
                let secs = remaining.as_secs();
                write!(f, "{}m {}s", secs / 60, secs % 60)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressReport {
    pub offset: usize,
    pub total: usize,
    pub percent: f64,
    /// Chars/sec between the previous and the current sample.
    pub instant_rate: Option<f64>,
    /// Chars/sec since the run started, counting only this run's commits.
    pub cumulative_rate: Option<f64>,
    pub eta: Eta,
}

impl fmt::Display for ProgressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Progress: {:.1}% ({}/{} chars)",
            self.percent, self.offset, self.total
        )?;
        match self.cumulative_rate {
            Some(rate) => write!(f, " | Speed: {rate:.1} chars/sec")?,
            None => f.write_str(" | Speed: n/a")?,
        }
        write!(f, " | ETA: {}", self.eta)
    }
}

/// Throughput and ETA from two samples. Never divides by zero: a rate is
/// `None` when no time has elapsed, and the ETA is unknown unless the
/// cumulative rate is positive.
pub fn report(
    previous: ProgressSample,
    current: ProgressSample,
    start_offset: usize,
    total: usize,
) -> ProgressReport {
    let instant_rate = rate(
        current.offset.saturating_sub(previous.offset),
        current.elapsed.saturating_sub(previous.elapsed),
    );
    let cumulative_rate = rate(current.offset.saturating_sub(start_offset), current.elapsed);
    let remaining = total.saturating_sub(current.offset);

    let eta = if remaining == 0 {
        Eta::Known(Duration::ZERO)
    } else {
        match cumulative_rate {
            Some(rate) if rate > 0.0 && rate.is_finite() => {
                Duration::try_from_secs_f64(remaining as f64 / rate).map_or(Eta::Unknown, Eta::Known)
            }
            _ => Eta::Unknown,
        }
    };

    let percent = if total == 0 {
        100.0
    } else {
        (current.offset.min(total) as f64 / total as f64) * 100.0
    };

    ProgressReport {
        offset: current.offset,
        total,
        percent,
        instant_rate,
        cumulative_rate,
        eta,
    }
}

fn rate(chars: usize, elapsed: Duration) -> Option<f64> {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        Some(chars as f64 / secs)
    } else {
        None
    }
}

/// Keeps the previous sample so callers only feed the current one.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    start_offset: usize,
    total: usize,
    last: ProgressSample,
}

impl ProgressTracker {
    pub fn new(start_offset: usize, total: usize) -> Self {
        Self {
            start_offset,
            total,
            last: ProgressSample::new(start_offset, Duration::ZERO),
        }
    }

    pub fn observe(&mut self, offset: usize, elapsed: Duration) -> ProgressReport {
        let current = ProgressSample::new(offset, elapsed);
        let report = report(self.last, current, self.start_offset, self.total);
        self.last = current;
        report
    }
}
