//! Moving average indicators.

use rotation_core::error::IndicatorError;
use rotation_core::traits::Indicator;

/// Simple Moving Average (SMA).
///
/// Calculates the arithmetic mean of the last N values.
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
}

impl Sma {
    /// Create a new SMA with the specified period.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }

    /// Create a new SMA, rejecting a zero period.
    pub fn try_new(period: usize) -> Result<Self, IndicatorError> {
        if period == 0 {
            return Err(IndicatorError::InvalidParameter(
                "SMA period must be greater than 0".into(),
            ));
        }
        Ok(Self { period })
    }

    /// Averages aligned one-to-one with `data`; `None` until the window fills.
    pub fn calculate_aligned(&self, data: &[f64]) -> Vec<Option<f64>> {
        let values = self.calculate(data);
        let mut aligned = vec![None; data.len() - values.len()];
        aligned.extend(values.into_iter().map(Some));
        aligned
    }
}

impl Indicator for Sma {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        if data.len() < self.period {
            return vec![];
        }

        let mut result = Vec::with_capacity(data.len() - self.period + 1);
        let period_f64 = self.period as f64;

        // Initial sum
        let mut sum: f64 = data[..self.period].iter().sum();
        result.push(sum / period_f64);

        // Sliding window
        for i in self.period..data.len() {
            sum = sum - data[i - self.period] + data[i];
            result.push(sum / period_f64);
        }

        result
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "SMA"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma() {
        let sma = Sma::new(3);
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = sma.calculate(&data);

        assert_eq!(result.len(), 3);
        assert!((result[0] - 2.0).abs() < 1e-10); // (1+2+3)/3
        assert!((result[1] - 3.0).abs() < 1e-10); // (2+3+4)/3
        assert!((result[2] - 4.0).abs() < 1e-10); // (3+4+5)/3
    }

    #[test]
    fn test_sma_insufficient_data() {
        let sma = Sma::new(5);
        let data = vec![1.0, 2.0, 3.0];
        let result = sma.calculate(&data);

        assert!(result.is_empty());
        assert!(sma.validate_data(&data).is_err());
    }

    #[test]
    fn test_sma_aligned() {
        let sma = Sma::new(3);
        let aligned = sma.calculate_aligned(&[1.0, 2.0, 3.0, 4.0]);

        assert_eq!(aligned.len(), 4);
        assert_eq!(aligned[0], None);
        assert_eq!(aligned[1], None);
        assert_eq!(aligned[2], Some(2.0));
        assert_eq!(aligned[3], Some(3.0));
    }

    #[test]
    fn test_sma_aligned_short_input() {
        let sma = Sma::new(9);
        let aligned = sma.calculate_aligned(&[1.0, 2.0]);
        assert_eq!(aligned, vec![None, None]);
    }

    #[test]
    fn test_sma_constant_series_is_exact() {
        let sma = Sma::new(19);
        let data = vec![42.0; 40];
        assert!(sma.calculate(&data).iter().all(|&v| v == 42.0));
    }

    #[test]
    fn test_try_new_rejects_zero() {
        assert!(Sma::try_new(0).is_err());
        assert_eq!(Sma::try_new(14).unwrap().period(), 14);
    }
}
