use crate::curves::{BidAttainmentCurve, TimeOfDayCurve};
use crate::errors::ConfigError;

/// Market/catalog parameters for one simulated advertiser, immutable for
/// the duration of a run. Scenarios build one, tweak public fields, and
/// pass it by reference into the simulators.
#[derive(Debug, Clone)]
pub struct CatalogProfile {
    /// Average order value (currency per order)
    pub aov: f64,
    /// Base conversion probability of a click at the ROI baseline
    pub base_conversion_rate: f64,
    /// ROI level at which the estimator applies no audience bias
    pub roi_baseline: f64,
    /// Day-to-day click-potential volatility fraction
    pub day_volatility: f64,
    /// Intra-day jitter fraction (click potential and realized CVR)
    pub intraday_volatility: f64,
    /// Magnitude of the estimator's calibration error
    pub calibration_error: f64,
    /// Click volume ceiling at full attainment and unit time-of-day potential
    pub max_clicks_per_hour: f64,
    /// Bid level to click-attainment probability curve
    pub attainment_curve: BidAttainmentCurve,
    /// Time-of-day click-potential multipliers (mean 1.0)
    pub click_potential: TimeOfDayCurve,
}

impl CatalogProfile {
    /// Create a profile with reference curves and moderate volatility.
    pub fn new(aov: f64, base_conversion_rate: f64, roi_baseline: f64) -> Self {
        Self {
            aov,
            base_conversion_rate,
            roi_baseline,
            day_volatility: 0.10,
            intraday_volatility: 0.10,
            calibration_error: 0.10,
            max_clicks_per_hour: 60.0,
            attainment_curve: BidAttainmentCurve::reference(),
            click_potential: TimeOfDayCurve::reference(),
        }
    }

    /// Fail-fast validation of everything a run depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.aov.is_finite() || self.aov <= 0.0 {
            return Err(ConfigError::NonPositiveAov(self.aov));
        }
        if !self.base_conversion_rate.is_finite()
            || self.base_conversion_rate <= 0.0
            || self.base_conversion_rate >= 1.0
        {
            return Err(ConfigError::BaseRateOutOfRange(self.base_conversion_rate));
        }
        if !self.roi_baseline.is_finite() || self.roi_baseline <= 0.0 {
            return Err(ConfigError::NonPositiveRoiBaseline(self.roi_baseline));
        }
        for (name, value) in [
            ("day", self.day_volatility),
            ("intra-day", self.intraday_volatility),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::VolatilityOutOfRange { name, value });
            }
        }
        if !self.calibration_error.is_finite()
            || !(0.0..=1.0).contains(&self.calibration_error)
        {
            return Err(ConfigError::CalibrationOutOfRange(self.calibration_error));
        }
        if !self.max_clicks_per_hour.is_finite() || self.max_clicks_per_hour <= 0.0 {
            return Err(ConfigError::NonPositiveClickCapacity(self.max_clicks_per_hour));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_profile_is_valid() {
        assert!(CatalogProfile::new(300.0, 0.05, 15.0).validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_aov() {
        let profile = CatalogProfile::new(0.0, 0.05, 15.0);
        assert_eq!(profile.validate(), Err(ConfigError::NonPositiveAov(0.0)));
    }

    #[test]
    fn test_rejects_base_rate_of_one() {
        let profile = CatalogProfile::new(300.0, 1.0, 15.0);
        assert_eq!(profile.validate(), Err(ConfigError::BaseRateOutOfRange(1.0)));
    }

    #[test]
    fn test_rejects_volatility_above_one() {
        let mut profile = CatalogProfile::new(300.0, 0.05, 15.0);
        profile.day_volatility = 1.5;
        assert!(matches!(
            profile.validate(),
            Err(ConfigError::VolatilityOutOfRange { name: "day", .. })
        ));
    }
}
