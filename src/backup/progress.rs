//! Progress reporting for backup and restore.

/// One progress update: what is happening and how far along the operation is
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub description: String,
    /// Completed share of the whole operation, `0.0..=1.0`
    pub fraction: f64,
}

/// Caller-supplied progress sink, invoked synchronously on the working thread
pub type ProgressSink<'a> = dyn FnMut(Progress) + 'a;

/// Running byte counter mapped onto a share of the progress range
pub(crate) struct ByteProgress<'a> {
    total: u64,
    processed: u64,
    share: f64,
    sink: &'a mut ProgressSink<'a>,
}

impl<'a> ByteProgress<'a> {
    /// Bulk bytes map onto `0.0..=share`; the rest is left for named phases
    pub(crate) fn new(total: u64, share: f64, sink: &'a mut ProgressSink<'a>) -> Self {
        Self {
            total,
            processed: 0,
            share,
            sink,
        }
    }

    pub(crate) fn advance(&mut self, description: &str, bytes: u64) {
        self.processed += bytes;
        let fraction = self.fraction();
        (self.sink)(Progress {
            description: description.to_string(),
            fraction,
        });
    }

    pub(crate) fn phase(&mut self, description: &str, fraction: f64) {
        (self.sink)(Progress {
            description: description.to_string(),
            fraction: fraction.clamp(0.0, 1.0),
        });
    }

    pub(crate) fn processed(&self) -> u64 {
        self.processed
    }

    fn fraction(&self) -> f64 {
        if self.total == 0 {
            return self.share;
        }
        (self.processed as f64 / self.total as f64).min(1.0) * self.share
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction_scaled_to_share() {
        let mut seen = Vec::new();
        {
            let mut sink = |p: Progress| seen.push(p.fraction);
            let mut tracker = ByteProgress::new(200, 0.95, &mut sink);
            tracker.advance("Restoring: a", 100);
            tracker.advance("Restoring: b", 100);
            tracker.phase("Restore complete", 1.0);
            assert_eq!(tracker.processed(), 200);
        }

        assert!((seen[0] - 0.475).abs() < 1e-9);
        assert!((seen[1] - 0.95).abs() < 1e-9);
        assert_eq!(seen[2], 1.0);
    }

    #[test]
    fn test_empty_total_does_not_divide_by_zero() {
        let mut last = None;
        let mut sink = |p: Progress| last = Some(p.fraction);
        let mut tracker = ByteProgress::new(0, 1.0, &mut sink);
        tracker.advance("Compressing: empty", 0);
        drop(tracker);
        assert_eq!(last, Some(1.0));
    }
}
