/// Stop threshold over a batch run.
///
/// Starts at the configured percentage and, while above 0.1, drops by
/// `decay * index / count` for each example index.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSchedule {
    value: f64,
    decay: f64,
    count: usize,
}

impl ThresholdSchedule {
    pub fn new(start: f64, decay: f64, count: usize) -> Self {
        Self {
            value: start,
            decay,
            count: count.max(1),
        }
    }

    /// Current unrounded threshold.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Step to 1-based example `index` and return the rounded percentage.
    pub fn advance(&mut self, index: usize) -> u32 {
        if self.value > 0.1 {
            self.value -= self.decay * (index as f64 / self.count as f64);
        }
        self.value.round().clamp(0.0, 100.0) as u32
    }
}
