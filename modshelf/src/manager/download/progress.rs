//! Rate limiting for byte-level download progress.

use std::time::{Duration, Instant};

/// Minimum interval between progress reports.
const REPORT_INTERVAL: Duration = Duration::from_millis(100);

/// Minimum fractional change that forces a report.
const REPORT_STEP: f64 = 0.01;

/// Turns a stream of byte counts into occasional fractional reports.
///
/// A report is produced for the first update, whenever the fraction moved by
/// at least one percent or the report interval elapsed, and on completion.
#[derive(Debug, Default)]
pub struct ProgressThrottle {
    last_report: Option<(Instant, f64)>,
}

impl ProgressThrottle {
    /// Create a throttle that has not reported yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a byte count; returns the fraction to report, if any.
    ///
    /// Without a known total no fraction can be computed and `Some(0.0)` is
    /// reported at the throttled rate so callers can still show activity.
    pub fn update(&mut self, done: u64, total: Option<u64>) -> Option<f64> {
        let fraction = match total {
            Some(total) if total > 0 => (done as f64 / total as f64).min(1.0),
            Some(_) => 1.0,
            None => 0.0,
        };
        let now = Instant::now();

        let due = match self.last_report {
            None => true,
            Some((at, last)) => {
                (fraction >= 1.0 && last < 1.0)
                    || fraction - last >= REPORT_STEP
                    || now.duration_since(at) >= REPORT_INTERVAL
            }
        };

        if due {
            self.last_report = Some((now, fraction));
            Some(fraction)
        } else {
            None
        }
    }
}

/// Format a byte count for progress messages.
pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let bytes = bytes as f64;
    if bytes >= GB {
        format!("{:.1} GB", bytes / GB)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes / MB)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes / KB)
    } else {
        format!("{} B", bytes as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_update_reports() {
        let mut throttle = ProgressThrottle::new();
        assert_eq!(throttle.update(0, Some(100)), Some(0.0));
    }

    #[test]
    fn test_small_steps_are_throttled() {
        let mut throttle = ProgressThrottle::new();
        throttle.update(0, Some(10_000));

        assert_eq!(throttle.update(1, Some(10_000)), None);
        assert_eq!(throttle.update(200, Some(10_000)), Some(0.02));
    }

    #[test]
    fn test_completion_always_reports() {
        let mut throttle = ProgressThrottle::new();
        throttle.update(9_995, Some(10_000));

        assert_eq!(throttle.update(10_000, Some(10_000)), Some(1.0));
    }

    #[test]
    fn test_unknown_total_reports_zero() {
        let mut throttle = ProgressThrottle::new();
        assert_eq!(throttle.update(500, None), Some(0.0));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
