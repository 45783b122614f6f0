use crate::curves::TimeOfDayCurve;
use crate::utils::jitter_factor;
use rand::rngs::StdRng;
use thiserror::Error;

/// Smallest rate the estimator will return. The rate is never zero or
/// negative, so a bid derived from it is always positive.
pub const MIN_RATE: f64 = 1e-6;

/// Damping applied to the relative ROI deviation before it becomes an
/// audience bias: square-root scaling keeps large target moves from
/// producing runaway rate predictions.
const BIAS_DAMPING: f64 = 0.5;

/// Hard ceiling on the audience bias magnitude.
const MAX_BIAS: f64 = 0.5;

/// Recoverable estimation failures. Callers substitute the base rate and
/// surface the message as a warning instead of aborting the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimateError {
    #[error("ROI target must be positive, got {0}")]
    NonPositiveTarget(f64),

    #[error("average order value must be positive, got {0}")]
    NonPositiveAov(f64),

    #[error("base rate must be in [0, 1), got {0}")]
    BaseRateOutOfRange(f64),

    #[error("calibration error fraction must be in [0, 1], got {0}")]
    CalibrationOutOfRange(f64),

    #[error("time index {index} outside the {len}-entry time-of-day curve")]
    TimeIndexOutOfRange { index: usize, len: usize },
}

/// Predicts the conversion rate of a click for a given ROI target and time
/// of day. Pure apart from draws on the injected random source.
#[derive(Debug, Clone)]
pub struct ConversionEstimator {
    /// ROI level at which no audience bias is applied
    pub baseline_roi: f64,
    /// Magnitude of the short-term market noise factor
    pub market_noise: f64,
}

impl ConversionEstimator {
    pub fn new(baseline_roi: f64) -> Self {
        Self {
            baseline_roi,
            market_noise: 0.01,
        }
    }

    /// Predict the conversion rate of a click.
    ///
    /// Raising the target above the baseline narrows delivery to a
    /// higher-intent audience and lifts the rate; lowering it broadens
    /// delivery and cuts the rate. The bias is square-root damped and
    /// clamped so feedback through the pacing loop cannot run away.
    pub fn estimate(
        &self,
        target_roi: f64,
        aov: f64,
        time_index: usize,
        base_rate: f64,
        calibration_error: f64,
        click_potential: &TimeOfDayCurve,
        rng: &mut StdRng,
    ) -> Result<f64, EstimateError> {
        if !target_roi.is_finite() || target_roi <= 0.0 {
            return Err(EstimateError::NonPositiveTarget(target_roi));
        }
        if !aov.is_finite() || aov <= 0.0 {
            return Err(EstimateError::NonPositiveAov(aov));
        }
        if !base_rate.is_finite() || !(0.0..1.0).contains(&base_rate) {
            return Err(EstimateError::BaseRateOutOfRange(base_rate));
        }
        if !calibration_error.is_finite() || !(0.0..=1.0).contains(&calibration_error) {
            return Err(EstimateError::CalibrationOutOfRange(calibration_error));
        }
        let time_multiplier = click_potential.multiplier(time_index).ok_or(
            EstimateError::TimeIndexOutOfRange {
                index: time_index,
                len: click_potential.len(),
            },
        )?;

        let relative_deviation = (target_roi - self.baseline_roi) / self.baseline_roi;
        let bias = (relative_deviation.signum()
            * relative_deviation.abs().sqrt()
            * BIAS_DAMPING)
            .clamp(-MAX_BIAS, MAX_BIAS);

        let mut rate = base_rate * (1.0 + bias);
        rate *= time_multiplier;
        rate *= jitter_factor(rng, calibration_error);
        rate *= jitter_factor(rng, self.market_noise);

        Ok(rate.clamp(MIN_RATE, 1.0))
    }
}

/// Bid price for a predicted conversion rate: the value of a click at the
/// target ROI. Strictly decreasing in the target.
pub fn compute_bid(predicted_rate: f64, aov: f64, target_roi: f64) -> f64 {
    predicted_rate * aov / target_roi
}
