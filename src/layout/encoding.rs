//! Size and color encodings for domino marks.

/// `-log10(p)`, with `p <= 0` treated as the smallest positive double.
/// NaN is the least significant value possible.
pub fn significance(p_value: f64) -> f64 {
    if p_value.is_nan() {
        return f64::NEG_INFINITY;
    }
    -p_value.max(f64::MIN_POSITIVE).log10()
}

/// Linear map of significance into `[min_size, max_size]` across the
/// observed range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeScale {
    min_size: f64,
    max_size: f64,
    low: f64,
    high: f64,
}

impl SizeScale {
    pub fn fit<I>(p_values: I, min_size: f64, max_size: f64) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut low = f64::INFINITY;
        let mut high = f64::NEG_INFINITY;
        for s in p_values.into_iter().map(significance).filter(|s| s.is_finite()) {
            low = low.min(s);
            high = high.max(s);
        }
        Self {
            min_size,
            max_size,
            low,
            high,
        }
    }

    /// Marker size for a p-value. When every observed p-value is equally
    /// significant all marks get `max_size`.
    pub fn size(&self, p_value: f64) -> f64 {
        let s = significance(p_value);
        let span = self.high - self.low;
        let t = if !span.is_finite() || span <= f64::EPSILON {
            if s.is_finite() { 1.0 } else { 0.0 }
        } else {
            ((s - self.low) / span).clamp(0.0, 1.0)
        };
        self.min_size + t * (self.max_size - self.min_size)
    }
}

/// Clamped linear map of log-fold-change into `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    limit_low: f64,
    limit_high: f64,
}

impl ColorScale {
    pub fn new(limit_low: f64, limit_high: f64) -> Self {
        Self {
            limit_low,
            limit_high,
        }
    }

    pub fn clamp(&self, log_fc: f64) -> f64 {
        log_fc.clamp(self.limit_low, self.limit_high)
    }

    pub fn position(&self, log_fc: f64) -> f64 {
        (self.clamp(log_fc) - self.limit_low) / (self.limit_high - self.limit_low)
    }
}
