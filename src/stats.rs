//! Descriptive statistics over one batch variable.

// ---

/// Summary statistics fitted over one variable's values in a batch.
#[derive(Debug, Clone, Copy)]
pub struct DescriptiveStats {
    pub mean: f64,
    /// Population standard deviation (divides by n, not n-1).
    pub std_dev: f64,
    pub q1: f64,
    pub q3: f64,
}

impl DescriptiveStats {
    // ---

    /// Fit over a sample. Returns `None` for an empty sample; a single value
    /// fits fine (zero deviation, degenerate quartiles).
    pub fn from_values(values: &[f64]) -> Option<Self> {
        // ---
        if values.is_empty() {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        Some(Self {
            mean,
            std_dev: variance.sqrt(),
            q1: percentile(&sorted, 0.25),
            q3: percentile(&sorted, 0.75),
        })
    }

    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}

/// Percentile by linear interpolation between the two nearest ranks.
/// `sorted` must be non-empty and ascending.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    // ---
    let index = p * (sorted.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;

    if upper >= sorted.len() {
        return sorted[sorted.len() - 1];
    }

    let fraction = index - lower as f64;
    sorted[lower] + fraction * (sorted[upper] - sorted[lower])
}
