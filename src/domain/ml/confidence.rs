use crate::domain::housing::types::ConfidenceInterval;

/// Fixed-percentage band around a point estimate.
///
/// This is a policy choice, not a statistical prediction interval: the
/// band is `estimate * (1 ± relative_width)` regardless of the model's
/// residual distribution, and no coverage guarantee is claimed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceEstimator {
    relative_width: f64,
}

impl ConfidenceEstimator {
    /// `relative_width` is expected in `[0, 1)`; `PredictionPolicy` enforces it.
    pub fn new(relative_width: f64) -> Self {
        Self { relative_width }
    }

    pub fn relative_width(&self) -> f64 {
        self.relative_width
    }

    /// Band around `estimate`, bounds rounded to cents.
    pub fn interval(&self, estimate: f64) -> ConfidenceInterval {
        ConfidenceInterval(
            round_cents(estimate * (1.0 - self.relative_width)),
            round_cents(estimate * (1.0 + self.relative_width)),
        )
    }
}

impl Default for ConfidenceEstimator {
    fn default() -> Self {
        Self::new(0.10)
    }
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
