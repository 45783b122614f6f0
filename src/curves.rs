use crate::errors::ConfigError;
use crate::pacing::INTERVALS_PER_DAY;

/// One control point of the bid-attainment curve: at `bid` the campaign
/// reaches `attainment` (fraction of the maximum possible click volume).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttainmentPoint {
    pub bid: f64,
    pub attainment: f64,
}

/// Bid-to-click-attainment curve built from 4 control points.
///
/// Segments, in bid order:
/// - below the first point (the absolute throttle floor): no delivery at all
/// - first..second: convex ramp, auctions are barely competitive and volume
///   grows slowly at first
/// - second..third: the competitive band, linear growth
/// - third..fourth: linear approach into saturation
/// - above the fourth point: saturated, bidding more buys nothing extra
#[derive(Debug, Clone, PartialEq)]
pub struct BidAttainmentCurve {
    points: [AttainmentPoint; 4],
}

impl BidAttainmentCurve {
    /// Build a curve from 4 control points and validate its shape:
    /// bids positive and strictly increasing, attainment values
    /// non-decreasing within [0, 1] and ending at exactly 1.0.
    pub fn new(points: [AttainmentPoint; 4]) -> Result<Self, ConfigError> {
        let mut previous_bid = 0.0;
        for point in &points {
            if point.bid <= previous_bid || !point.bid.is_finite() {
                return Err(ConfigError::AttainmentBidsNotIncreasing);
            }
            previous_bid = point.bid;
        }
        let mut previous_attainment = 0.0;
        for point in &points {
            if point.attainment < previous_attainment
                || !(0.0..=1.0).contains(&point.attainment)
            {
                return Err(ConfigError::AttainmentValuesInvalid);
            }
            previous_attainment = point.attainment;
        }
        if (points[3].attainment - 1.0).abs() > 1e-9 {
            return Err(ConfigError::AttainmentValuesInvalid);
        }
        Ok(Self { points })
    }

    /// Reference curve: throttle floor at 0.10, competitive band between
    /// 0.40 and 0.90, saturation from 1.60 on.
    pub fn reference() -> Self {
        Self::new([
            AttainmentPoint { bid: 0.10, attainment: 0.0 },
            AttainmentPoint { bid: 0.40, attainment: 0.5 },
            AttainmentPoint { bid: 0.90, attainment: 1.0 },
            AttainmentPoint { bid: 1.60, attainment: 1.0 },
        ])
        .expect("reference attainment curve is valid")
    }

    /// The absolute throttle floor: bids below it deliver zero clicks
    /// regardless of budget.
    pub fn throttle_floor(&self) -> f64 {
        self.points[0].bid
    }

    /// Click-attainment factor in [0, 1] for a bid.
    pub fn attainment(&self, bid: f64) -> f64 {
        let [p0, p1, p2, p3] = self.points;
        if !bid.is_finite() || bid < p0.bid {
            return 0.0;
        }
        if bid >= p3.bid {
            return p3.attainment;
        }
        if bid < p1.bid {
            // Convex ramp: squared progress keeps attainment low until the
            // bid approaches the competitive band.
            let t = (bid - p0.bid) / (p1.bid - p0.bid);
            return p0.attainment + (p1.attainment - p0.attainment) * t * t;
        }
        if bid < p2.bid {
            let t = (bid - p1.bid) / (p2.bid - p1.bid);
            return p1.attainment + (p2.attainment - p1.attainment) * t;
        }
        let t = (bid - p2.bid) / (p3.bid - p2.bid);
        p2.attainment + (p3.attainment - p2.attainment) * t
    }
}

/// Time-of-day click-potential curve: a multiplier per hour (24 entries) or
/// per half-hour interval (48 entries), normalized so its mean is 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeOfDayCurve {
    multipliers: Vec<f64>,
}

/// Default diurnal click-potential shape (per hour): a night trough, a
/// morning ramp, a daytime plateau and an evening peak. Normalized to mean
/// 1.0 at construction.
const DEFAULT_CLICK_POTENTIAL: [f64; 24] = [
    0.45, 0.35, 0.30, 0.28, 0.30, 0.40, 0.55, 0.75, 0.95, 1.10, 1.20, 1.25,
    1.30, 1.28, 1.22, 1.18, 1.15, 1.20, 1.35, 1.50, 1.55, 1.45, 1.10, 0.85,
];

impl TimeOfDayCurve {
    /// Build a curve from raw multipliers (24 or 48 entries, all positive)
    /// and normalize it to mean 1.0.
    pub fn new(raw: Vec<f64>) -> Result<Self, ConfigError> {
        if raw.len() != 24 && raw.len() != 48 {
            return Err(ConfigError::TimeOfDayCurveLength(raw.len()));
        }
        if raw.iter().any(|m| !m.is_finite() || *m <= 0.0) {
            return Err(ConfigError::TimeOfDayCurveNotPositive);
        }
        let mean = raw.iter().sum::<f64>() / raw.len() as f64;
        let multipliers = raw.iter().map(|m| m / mean).collect();
        Ok(Self { multipliers })
    }

    /// Default diurnal curve (24 hourly entries).
    pub fn reference() -> Self {
        Self::new(DEFAULT_CLICK_POTENTIAL.to_vec()).expect("reference curve is valid")
    }

    pub fn len(&self) -> usize {
        self.multipliers.len()
    }

    /// Multiplier at a raw curve index.
    pub fn multiplier(&self, index: usize) -> Option<f64> {
        self.multipliers.get(index).copied()
    }

    /// Map an intraday half-hour interval (0..48) to this curve's index
    /// space: identity for 48-entry curves, the containing hour for 24-entry
    /// curves.
    pub fn index_for_intraday(&self, intraday_interval: usize) -> usize {
        if self.multipliers.len() == 48 {
            intraday_interval % 48
        } else {
            (intraday_interval % 48) / 2
        }
    }

    /// Multiplier for an intraday half-hour interval (0..48).
    pub fn at_intraday(&self, intraday_interval: usize) -> f64 {
        self.multipliers[self.index_for_intraday(intraday_interval)]
    }

    /// Mean multiplier over a span of hours [start, end).
    pub fn mean_over_hours(&self, start_hour: usize, end_hour: usize) -> f64 {
        let mut total = 0.0;
        let mut count = 0;
        for hour in start_hour..end_hour {
            total += self.at_intraday((hour % 24) * 2);
            count += 1;
        }
        if count == 0 {
            1.0
        } else {
            total / count as f64
        }
    }

    /// Curve index of the peak multiplier. Warm-up seeds its synthetic
    /// history entry with a conversion estimate taken at this index.
    pub fn peak_index(&self) -> usize {
        let mut best = 0;
        for (index, multiplier) in self.multipliers.iter().enumerate() {
            if *multiplier > self.multipliers[best] {
                best = index;
            }
        }
        best
    }
}

/// Reference intraday spend trajectory: the fraction of the daily budget
/// that should ideally be spent by the end of each half-hour interval.
/// Monotonic non-decreasing, 48 entries, final entry 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct IdealUtilizationCurve {
    cumulative: Vec<f64>,
}

impl IdealUtilizationCurve {
    /// Build from explicit cumulative fractions and validate the shape.
    pub fn new(cumulative: Vec<f64>) -> Result<Self, ConfigError> {
        if cumulative.len() != INTERVALS_PER_DAY {
            return Err(ConfigError::IdealCurveLength {
                expected: INTERVALS_PER_DAY,
                got: cumulative.len(),
            });
        }
        let mut previous = 0.0;
        for value in &cumulative {
            if !value.is_finite() || *value < previous || *value > 1.0 + 1e-9 {
                return Err(ConfigError::IdealCurveShape);
            }
            previous = *value;
        }
        if (previous - 1.0).abs() > 1e-6 {
            return Err(ConfigError::IdealCurveShape);
        }
        Ok(Self { cumulative })
    }

    /// Derive the ideal trajectory from a click-potential curve: budget is
    /// ideally spent in proportion to the available click volume.
    pub fn from_click_potential(curve: &TimeOfDayCurve) -> Self {
        let mut cumulative = Vec::with_capacity(INTERVALS_PER_DAY);
        let mut running = 0.0;
        for interval in 0..INTERVALS_PER_DAY {
            running += curve.at_intraday(interval);
            cumulative.push(running);
        }
        let total = running;
        for value in &mut cumulative {
            *value /= total;
        }
        // Normalization can leave the tail at 1.0 - epsilon; pin it.
        if let Some(last) = cumulative.last_mut() {
            *last = 1.0;
        }
        Self { cumulative }
    }

    /// Uniform trajectory: equal spend in every interval.
    pub fn uniform() -> Self {
        let cumulative = (1..=INTERVALS_PER_DAY)
            .map(|i| i as f64 / INTERVALS_PER_DAY as f64)
            .collect();
        Self { cumulative }
    }

    /// Ideal utilization through the end of `intraday_interval` (0..48).
    pub fn through(&self, intraday_interval: usize) -> f64 {
        self.cumulative[intraday_interval.min(INTERVALS_PER_DAY - 1)]
    }

    /// Ideal utilization before `intraday_interval` starts (0 at day open).
    pub fn before(&self, intraday_interval: usize) -> f64 {
        if intraday_interval == 0 {
            0.0
        } else {
            self.through(intraday_interval - 1)
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::new(self.cumulative.clone()).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve() -> BidAttainmentCurve {
        BidAttainmentCurve::reference()
    }

    #[test]
    fn test_attainment_below_throttle_is_zero() {
        assert_eq!(curve().attainment(0.0), 0.0);
        assert_eq!(curve().attainment(0.09), 0.0);
    }

    #[test]
    fn test_attainment_control_points() {
        let c = curve();
        assert!((c.attainment(0.10) - 0.0).abs() < 1e-12);
        assert!((c.attainment(0.40) - 0.5).abs() < 1e-12);
        assert!((c.attainment(0.90) - 1.0).abs() < 1e-12);
        assert_eq!(c.attainment(5.0), 1.0);
    }

    #[test]
    fn test_attainment_first_segment_is_convex() {
        let c = curve();
        // Halfway through the ramp the convex curve sits below the chord.
        let midpoint = c.attainment(0.25);
        assert!(midpoint < 0.25, "convex ramp midpoint {} not below chord", midpoint);
        assert!(midpoint > 0.0);
    }

    #[test]
    fn test_attainment_competitive_band_is_linear() {
        let c = curve();
        let mid = c.attainment(0.65);
        assert!((mid - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_attainment_monotonic() {
        let c = curve();
        let mut previous = -1.0;
        for i in 0..200 {
            let bid = i as f64 * 0.01;
            let a = c.attainment(bid);
            assert!(a >= previous, "attainment not monotonic at bid {}", bid);
            previous = a;
        }
    }

    #[test]
    fn test_attainment_rejects_unordered_bids() {
        let result = BidAttainmentCurve::new([
            AttainmentPoint { bid: 0.4, attainment: 0.0 },
            AttainmentPoint { bid: 0.2, attainment: 0.5 },
            AttainmentPoint { bid: 0.9, attainment: 1.0 },
            AttainmentPoint { bid: 1.6, attainment: 1.0 },
        ]);
        assert_eq!(result, Err(ConfigError::AttainmentBidsNotIncreasing));
    }

    #[test]
    fn test_time_of_day_normalized_to_unit_mean() {
        let c = TimeOfDayCurve::reference();
        let mean: f64 = (0..c.len()).map(|i| c.multiplier(i).unwrap()).sum::<f64>()
            / c.len() as f64;
        assert!((mean - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_time_of_day_rejects_bad_lengths() {
        assert_eq!(
            TimeOfDayCurve::new(vec![1.0; 12]),
            Err(ConfigError::TimeOfDayCurveLength(12))
        );
    }

    #[test]
    fn test_time_of_day_intraday_mapping() {
        let hourly = TimeOfDayCurve::new(vec![1.0; 24]).unwrap();
        assert_eq!(hourly.index_for_intraday(0), 0);
        assert_eq!(hourly.index_for_intraday(1), 0);
        assert_eq!(hourly.index_for_intraday(47), 23);

        let half_hourly = TimeOfDayCurve::new(vec![1.0; 48]).unwrap();
        assert_eq!(half_hourly.index_for_intraday(47), 47);
    }

    #[test]
    fn test_ideal_curve_from_click_potential_shape() {
        let ideal = IdealUtilizationCurve::from_click_potential(&TimeOfDayCurve::reference());
        assert!(ideal.validate().is_ok());
        assert_eq!(ideal.through(INTERVALS_PER_DAY - 1), 1.0);
        assert_eq!(ideal.before(0), 0.0);
        assert!(ideal.through(0) > 0.0);
    }

    #[test]
    fn test_ideal_curve_rejects_decreasing() {
        let mut values: Vec<f64> = (1..=INTERVALS_PER_DAY)
            .map(|i| i as f64 / INTERVALS_PER_DAY as f64)
            .collect();
        values[10] = 0.05;
        assert_eq!(
            IdealUtilizationCurve::new(values),
            Err(ConfigError::IdealCurveShape)
        );
    }

    #[test]
    fn test_peak_index() {
        let c = TimeOfDayCurve::reference();
        assert_eq!(c.peak_index(), 20);
    }
}
