/// A single monitoring result reported by a worker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricRecord {
    pub valid_err: f64,
    pub test_err: f64,
}

/// Append-only log of the monitoring results, in arrival order.
///
/// Keeps the running minimum of the validation error for every prefix, so both
/// minimum queries are O(1).
#[derive(Debug, Clone, Default)]
pub struct MetricHistory {
    records: Vec<MetricRecord>,
    prefix_min: Vec<f64>,
}

impl MetricHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record at the end of the log.
    pub fn push(&mut self, record: MetricRecord) {
        let min = match self.prefix_min.last() {
            Some(min) => min.min(record.valid_err),
            None => record.valid_err,
        };

        self.records.push(record);
        self.prefix_min.push(min);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[MetricRecord] {
        &self.records
    }

    /// Minimum validation error over the whole log.
    pub fn min_valid_err(&self) -> Option<f64> {
        self.prefix_min.last().copied()
    }

    /// Minimum validation error over the log without its `k` most recent records.
    ///
    /// # Returns
    /// `None` when the log holds `k` records or fewer.
    pub fn min_valid_err_excluding_recent(&self, k: usize) -> Option<f64> {
        let end = self.len().checked_sub(k)?;
        end.checked_sub(1).map(|idx| self.prefix_min[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(errs: &[f64]) -> MetricHistory {
        let mut history = MetricHistory::new();
        for &valid_err in errs {
            history.push(MetricRecord {
                valid_err,
                test_err: valid_err * 2.,
            });
        }
        history
    }

    #[test]
    fn empty_history_has_no_minimum() {
        let history = MetricHistory::new();
        assert!(history.is_empty());
        assert_eq!(history.min_valid_err(), None);
        assert_eq!(history.min_valid_err_excluding_recent(0), None);
    }

    #[test]
    fn minimum_over_whole_log() {
        let history = history(&[0.5, 0.3, 0.4]);
        assert_eq!(history.len(), 3);
        assert_eq!(history.min_valid_err(), Some(0.3));
        assert_eq!(history.records()[1].test_err, 0.6);
    }

    #[test]
    fn minimum_excluding_recent_entries() {
        let history = history(&[0.5, 0.6, 0.2, 0.7]);
        assert_eq!(history.min_valid_err_excluding_recent(0), Some(0.2));
        assert_eq!(history.min_valid_err_excluding_recent(1), Some(0.2));
        assert_eq!(history.min_valid_err_excluding_recent(2), Some(0.5));
        assert_eq!(history.min_valid_err_excluding_recent(3), Some(0.5));
        assert_eq!(history.min_valid_err_excluding_recent(4), None);
        assert_eq!(history.min_valid_err_excluding_recent(9), None);
    }
}
