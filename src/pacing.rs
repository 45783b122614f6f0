use crate::controllers::{
    select_active_module, BudgetPacingProportional, PacingModuleKind, PidState, RoiPacingPid,
};
use crate::curves::IdealUtilizationCurve;
use crate::errors::ConfigError;
use crate::estimator::{compute_bid, ConversionEstimator};
use crate::profile::CatalogProfile;
use crate::rolling::{HistoryEntry, RollingHistory};
use crate::utils::{jitter_factor, lognormal_dist};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::Distribution;

/// Fixed interval grid of the pacing loop: 30-minute intervals.
pub const INTERVALS_PER_HOUR: usize = 2;
pub const INTERVALS_PER_DAY: usize = 24 * INTERVALS_PER_HOUR;
pub const INTERVAL_HOURS: f64 = 1.0 / INTERVALS_PER_HOUR as f64;

/// Configuration of a multi-day pacing run. Built once, validated before
/// the loop starts, read-only afterwards.
#[derive(Debug, Clone)]
pub struct PacingConfig {
    /// Minimum acceptable delivered ROI; the ROI-pacing setpoint
    pub stop_loss_roi: f64,
    /// Target ROI in effect before the first controller update
    pub initial_target_roi: f64,
    /// Assumed delivered ROI used to synthesize the warm-up history entry.
    /// None starts from an empty rolling window.
    pub initial_delivered_roi: Option<f64>,
    /// Budget per simulated day; zero models a paused campaign
    pub daily_budget: f64,
    /// Simulation horizon in days
    pub num_days: usize,
    /// Rolling window size in clicks (N)
    pub window_clicks: f64,
    /// ROI-pacing module; None disables it
    pub roi_pacing: Option<RoiPacingPid>,
    /// Budget-pacing module; None disables it
    pub budget_pacing: Option<BudgetPacingProportional>,
    /// Reference intraday spend trajectory for budget pacing
    pub ideal_utilization: IdealUtilizationCurve,
}

impl PacingConfig {
    /// Config with both modules at their reference gains and a warm-up
    /// assumption equal to the initial target.
    pub fn new(
        stop_loss_roi: f64,
        initial_target_roi: f64,
        daily_budget: f64,
        num_days: usize,
    ) -> Self {
        Self {
            stop_loss_roi,
            initial_target_roi,
            initial_delivered_roi: Some(initial_target_roi),
            daily_budget,
            num_days,
            window_clicks: 300.0,
            roi_pacing: Some(RoiPacingPid::new()),
            budget_pacing: Some(BudgetPacingProportional::new()),
            ideal_utilization: IdealUtilizationCurve::uniform(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.stop_loss_roi.is_finite() || self.stop_loss_roi <= 0.0 {
            return Err(ConfigError::NonPositiveStopLoss(self.stop_loss_roi));
        }
        if !self.initial_target_roi.is_finite() || self.initial_target_roi <= 0.0 {
            return Err(ConfigError::NonPositiveRoiTarget(self.initial_target_roi));
        }
        if let Some(seed) = self.initial_delivered_roi {
            if !seed.is_finite() || seed <= 0.0 {
                return Err(ConfigError::NonPositiveDeliveredSeed(seed));
            }
        }
        if !self.daily_budget.is_finite() || self.daily_budget < 0.0 {
            return Err(ConfigError::NegativeBudget(self.daily_budget));
        }
        if self.num_days == 0 {
            return Err(ConfigError::ZeroHorizon);
        }
        if !self.window_clicks.is_finite() || self.window_clicks <= 0.0 {
            return Err(ConfigError::NonPositiveWindow(self.window_clicks));
        }
        if let Some(roi) = &self.roi_pacing {
            roi.validate()?;
        }
        if let Some(budget) = &self.budget_pacing {
            budget.validate()?;
        }
        self.ideal_utilization.validate()?;
        Ok(())
    }
}

/// All mutable state the loop threads from one interval to the next.
#[derive(Debug, Clone)]
pub struct ControllerState {
    pub history: RollingHistory,
    pub target_roi: f64,
    pub delivered_roi: f64,
    pub pid: PidState,
    pub clicks_since_roi_update: f64,
    pub clicks_since_budget_update: f64,
    /// Fractional orders carried into the next interval before flooring
    pub order_carry: f64,
    pub day_spend: f64,
    pub day_gmv: f64,
    pub day_clicks: f64,
    /// Day-to-day volatility multiplier, redrawn at each day boundary
    pub day_factor: f64,
}

/// One interval of the output stream. Never mutated after emission.
#[derive(Debug, Clone)]
pub struct IntervalResult {
    pub interval: usize,
    pub day: usize,
    pub hour: usize,
    pub interval_of_day: usize,
    pub target_roi: f64,
    pub delivered_roi: f64,
    pub day_roi: f64,
    pub stop_loss_roi: f64,
    pub clicks: f64,
    pub orders: u64,
    pub gmv: f64,
    pub spend: f64,
    pub bid: f64,
    pub predicted_cvr: f64,
    pub day_clicks: f64,
    pub day_gmv: f64,
    pub day_spend: f64,
    pub budget_utilization: f64,
    pub ideal_utilization: f64,
    pub active_module: Option<PacingModuleKind>,
}

/// Synthesize the warm-up history entry: one peak-time estimate, sized to
/// the full rolling window and consistent with the assumed delivered ROI.
/// A pure function of its inputs and the seed, so re-running it reproduces
/// the identical entry.
pub fn warm_up_entry(
    profile: &CatalogProfile,
    estimator: &ConversionEstimator,
    initial_target_roi: f64,
    assumed_delivered_roi: f64,
    window_clicks: f64,
    seed: u64,
) -> HistoryEntry {
    let mut rng = StdRng::seed_from_u64(seed);
    let peak = profile.click_potential.peak_index();
    let rate = estimator
        .estimate(
            initial_target_roi,
            profile.aov,
            peak,
            profile.base_conversion_rate,
            profile.calibration_error,
            &profile.click_potential,
            &mut rng,
        )
        .unwrap_or(profile.base_conversion_rate);
    let bid = compute_bid(rate, profile.aov, initial_target_roi);
    let spend = window_clicks * bid;
    let gmv = spend * assumed_delivered_roi;
    HistoryEntry {
        spend,
        gmv,
        clicks: window_clicks,
        orders: gmv / profile.aov,
    }
}

/// The multi-interval pacing loop, exposed as a bounded lazy iterator.
/// Pull results one at a time; stopping early leaves nothing corrupted.
pub struct PacingSimulation {
    profile: CatalogProfile,
    config: PacingConfig,
    estimator: ConversionEstimator,
    rng: StdRng,
    state: ControllerState,
    interval: usize,
    total_intervals: usize,
    warnings: Vec<String>,
}

impl PacingSimulation {
    /// Validate profile and config, seed the warm-up history, and prepare
    /// the loop. Validation failure here is the only fatal error path.
    pub fn new(
        profile: CatalogProfile,
        config: PacingConfig,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        profile.validate()?;
        config.validate()?;

        let estimator = ConversionEstimator::new(profile.roi_baseline);
        let mut history = RollingHistory::new(config.window_clicks);
        let delivered_roi = match config.initial_delivered_roi {
            Some(assumed) => {
                history.push(warm_up_entry(
                    &profile,
                    &estimator,
                    config.initial_target_roi,
                    assumed,
                    config.window_clicks,
                    seed,
                ));
                assumed
            }
            // No assumption: delivered ROI is undefined until the first
            // spend lands; hold it at the initial target meanwhile.
            None => config.initial_target_roi,
        };

        let state = ControllerState {
            history,
            target_roi: config.initial_target_roi,
            delivered_roi,
            pid: PidState::default(),
            clicks_since_roi_update: 0.0,
            clicks_since_budget_update: 0.0,
            order_carry: 0.0,
            day_spend: 0.0,
            day_gmv: 0.0,
            day_clicks: 0.0,
            day_factor: 1.0,
        };

        let total_intervals = config.num_days * INTERVALS_PER_DAY;
        Ok(Self {
            profile,
            config,
            estimator,
            rng: StdRng::seed_from_u64(seed),
            state,
            interval: 0,
            total_intervals,
            warnings: Vec::new(),
        })
    }

    pub fn total_intervals(&self) -> usize {
        self.total_intervals
    }

    /// Fraction of the horizon already emitted, in [0, 1].
    pub fn progress(&self) -> f64 {
        if self.total_intervals == 0 {
            1.0
        } else {
            self.interval as f64 / self.total_intervals as f64
        }
    }

    /// Estimator fallback warnings accumulated so far.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Advance the loop by one interval and emit its result.
    fn step_interval(&mut self) -> IntervalResult {
        let interval = self.interval;
        let day = interval / INTERVALS_PER_DAY;
        let intraday = interval % INTERVALS_PER_DAY;
        let hour = intraday / INTERVALS_PER_HOUR;

        let profile = &self.profile;
        let config = &self.config;
        let state = &mut self.state;

        if intraday == 0 {
            state.day_spend = 0.0;
            state.day_gmv = 0.0;
            state.day_clicks = 0.0;
            // Day-level demand swings are multiplicative and skewed, same
            // as the market-value distributions elsewhere.
            state.day_factor = if profile.day_volatility > 0.0 {
                Distribution::sample(
                    &lognormal_dist(1.0, profile.day_volatility),
                    &mut self.rng,
                )
            } else {
                1.0
            };
        }

        let remaining_budget = (config.daily_budget - state.day_spend).max(0.0);
        let actual_utilization = if config.daily_budget > 0.0 {
            state.day_spend / config.daily_budget
        } else {
            0.0
        };
        let ideal_before = config.ideal_utilization.before(intraday);

        // Arbitrate, then let only the active module retarget. The inactive
        // module's cadence counter is cleared once due, so a stale candidate
        // can never apply on a later interval.
        let active = select_active_module(
            config.roi_pacing.is_some(),
            config.budget_pacing.is_some(),
            state.delivered_roi,
            config.stop_loss_roi,
            actual_utilization,
            ideal_before,
        );
        match active {
            Some(PacingModuleKind::RoiPacing) => {
                let module = config.roi_pacing.as_ref().expect("arbitration picked enabled module");
                if state.clicks_since_roi_update >= module.update_clicks {
                    let (next_target, next_pid) = module.next_target(
                        &state.pid,
                        state.target_roi,
                        config.stop_loss_roi,
                        state.delivered_roi,
                    );
                    state.target_roi = next_target;
                    state.pid = next_pid;
                    state.clicks_since_roi_update = 0.0;
                }
                if let Some(budget_module) = &config.budget_pacing {
                    if state.clicks_since_budget_update >= budget_module.update_clicks {
                        state.clicks_since_budget_update = 0.0;
                    }
                }
            }
            Some(PacingModuleKind::BudgetPacing) => {
                let module = config.budget_pacing.as_ref().expect("arbitration picked enabled module");
                if state.clicks_since_budget_update >= module.update_clicks {
                    state.target_roi = module.next_target(
                        state.target_roi,
                        actual_utilization,
                        ideal_before,
                    );
                    state.clicks_since_budget_update = 0.0;
                }
                if let Some(roi_module) = &config.roi_pacing {
                    if state.clicks_since_roi_update >= roi_module.update_clicks {
                        state.clicks_since_roi_update = 0.0;
                    }
                }
            }
            None => {}
        }

        // Estimation and bidding run on every interval, budget or not, so
        // the target keeps evolving into the next day.
        let time_index = profile.click_potential.index_for_intraday(intraday);
        let predicted_cvr = match self.estimator.estimate(
            state.target_roi,
            profile.aov,
            time_index,
            profile.base_conversion_rate,
            profile.calibration_error,
            &profile.click_potential,
            &mut self.rng,
        ) {
            Ok(rate) => rate,
            Err(error) => {
                self.warnings
                    .push(format!("interval {}: estimator fallback: {}", interval, error));
                profile.base_conversion_rate
            }
        };
        let bid = compute_bid(predicted_cvr, profile.aov, state.target_roi);

        let attainment = profile.attainment_curve.attainment(bid);
        let click_potential = profile.click_potential.at_intraday(intraday);
        let volume_jitter = jitter_factor(&mut self.rng, profile.intraday_volatility);
        let potential_clicks = profile.max_clicks_per_hour
            * state.day_factor
            * click_potential
            * attainment
            * volume_jitter
            * INTERVAL_HOURS;
        let affordable_clicks = if bid.is_finite() && bid > 0.0 {
            remaining_budget / bid
        } else {
            0.0
        };
        let clicks = potential_clicks.min(affordable_clicks).max(0.0);

        let spend = clicks * bid;
        let actual_cvr = (predicted_cvr
            * jitter_factor(&mut self.rng, profile.intraday_volatility))
        .clamp(0.0, 1.0);
        let continuous_orders = clicks * actual_cvr + state.order_carry;
        let orders = continuous_orders.floor();
        state.order_carry = continuous_orders - orders;
        let gmv = orders * profile.aov;

        if clicks > 0.0 {
            state.history.push(HistoryEntry {
                spend,
                gmv,
                clicks,
                orders,
            });
        }
        state.clicks_since_roi_update += clicks;
        state.clicks_since_budget_update += clicks;
        if let Some(delivered) = state.history.delivered_roi() {
            state.delivered_roi = delivered;
        }

        state.day_spend += spend;
        state.day_gmv += gmv;
        state.day_clicks += clicks;

        let budget_utilization = if config.daily_budget > 0.0 {
            state.day_spend / config.daily_budget
        } else {
            0.0
        };
        let day_roi = if state.day_spend > 0.0 {
            state.day_gmv / state.day_spend
        } else {
            0.0
        };

        self.interval += 1;

        IntervalResult {
            interval,
            day,
            hour,
            interval_of_day: intraday,
            target_roi: state.target_roi,
            delivered_roi: state.delivered_roi,
            day_roi,
            stop_loss_roi: config.stop_loss_roi,
            clicks,
            orders: orders as u64,
            gmv,
            spend,
            bid,
            predicted_cvr,
            day_clicks: state.day_clicks,
            day_gmv: state.day_gmv,
            day_spend: state.day_spend,
            budget_utilization,
            ideal_utilization: config.ideal_utilization.through(intraday),
            active_module: active,
        }
    }
}

impl Iterator for PacingSimulation {
    type Item = IntervalResult;

    fn next(&mut self) -> Option<IntervalResult> {
        if self.interval >= self.total_intervals {
            return None;
        }
        Some(self.step_interval())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curves::TimeOfDayCurve;

    fn test_profile() -> CatalogProfile {
        CatalogProfile::new(300.0, 0.05, 15.0)
    }

    /// Profile with every noise source off, for exact-arithmetic tests.
    fn quiet_profile() -> CatalogProfile {
        let mut profile = test_profile();
        profile.day_volatility = 0.0;
        profile.intraday_volatility = 0.0;
        profile.calibration_error = 0.0;
        profile
    }

    #[test]
    fn test_emits_exactly_horizon_intervals() {
        let config = PacingConfig::new(10.0, 15.0, 300.0, 3);
        let sim = PacingSimulation::new(test_profile(), config, 1).unwrap();
        let results: Vec<_> = sim.collect();
        assert_eq!(results.len(), 3 * INTERVALS_PER_DAY);
        assert_eq!(results[0].day, 0);
        assert_eq!(results[INTERVALS_PER_DAY].day, 1);
        assert_eq!(results[INTERVALS_PER_DAY + 1].interval_of_day, 1);
        assert_eq!(results[INTERVALS_PER_DAY + 1].hour, 0);
        assert_eq!(results[3 * INTERVALS_PER_DAY - 1].hour, 23);
    }

    #[test]
    fn test_daily_spend_never_exceeds_budget() {
        let config = PacingConfig::new(10.0, 15.0, 200.0, 2);
        let sim = PacingSimulation::new(test_profile(), config, 3).unwrap();
        for result in sim {
            assert!(
                result.day_spend <= 200.0 + 1e-6,
                "interval {} overspent: {}",
                result.interval,
                result.day_spend
            );
            assert!(result.budget_utilization >= 0.0);
        }
    }

    #[test]
    fn test_rolling_window_invariant() {
        let mut config = PacingConfig::new(10.0, 15.0, 10_000.0, 1);
        config.window_clicks = 150.0;
        let mut sim = PacingSimulation::new(test_profile(), config, 5).unwrap();
        let mut cumulative_clicks = 150.0; // warm-up seeds a full window
        while let Some(result) = sim.next() {
            cumulative_clicks += result.clicks;
            let window = sim.state().history.total_clicks();
            assert!(window <= 150.0 + 1e-9, "window overflow: {}", window);
            if cumulative_clicks >= 150.0 {
                assert!(
                    (window - 150.0).abs() < 1e-9,
                    "window should be full, holds {}",
                    window
                );
            }
        }
    }

    #[test]
    fn test_order_carry_over_conserves_conversion_mass() {
        let config = PacingConfig::new(10.0, 15.0, 300.0, 2);
        let mut sim = PacingSimulation::new(quiet_profile(), config, 9).unwrap();
        let mut continuous_total = 0.0;
        let mut floored_total = 0.0;
        while let Some(result) = sim.next() {
            // With intraday volatility off the realized rate equals the
            // predicted rate, which the result reports.
            continuous_total += result.clicks * result.predicted_cvr;
            floored_total += result.orders as f64;
        }
        let carried = sim.state().order_carry;
        assert!(
            (continuous_total - (floored_total + carried)).abs() < 1e-6,
            "conversion mass lost: continuous {} vs floored {} + carry {}",
            continuous_total,
            floored_total,
            carried
        );
        assert!((0.0..1.0).contains(&carried));
    }

    #[test]
    fn test_warm_up_is_idempotent() {
        let profile = test_profile();
        let estimator = ConversionEstimator::new(profile.roi_baseline);
        let a = warm_up_entry(&profile, &estimator, 15.0, 12.0, 300.0, 77);
        let b = warm_up_entry(&profile, &estimator, 15.0, 12.0, 300.0, 77);
        assert_eq!(a, b);
        assert!((a.clicks - 300.0).abs() < 1e-12);
        assert!((a.gmv / a.spend - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_budget_day_is_all_zeros_without_error() {
        let config = PacingConfig::new(10.0, 15.0, 0.0, 1);
        let mut sim = PacingSimulation::new(test_profile(), config, 11).unwrap();
        while let Some(result) = sim.next() {
            assert_eq!(result.clicks, 0.0);
            assert_eq!(result.spend, 0.0);
            assert_eq!(result.orders, 0);
            assert_eq!(result.gmv, 0.0);
            assert_eq!(result.budget_utilization, 0.0);
            assert!(result.delivered_roi.is_finite());
            // Estimation still runs so the target can evolve.
            assert!(result.predicted_cvr > 0.0);
            assert!(result.bid > 0.0);
        }
        assert!(sim.warnings().is_empty());
    }

    #[test]
    fn test_budget_exhaustion_still_estimates() {
        // A budget small enough to exhaust within the first hours.
        let config = PacingConfig::new(10.0, 15.0, 20.0, 1);
        let sim = PacingSimulation::new(test_profile(), config, 13).unwrap();
        let results: Vec<_> = sim.collect();
        let exhausted: Vec<_> = results
            .iter()
            .filter(|r| r.clicks == 0.0 && r.day_spend > 0.0)
            .collect();
        assert!(!exhausted.is_empty(), "budget never exhausted");
        for result in exhausted {
            assert!(result.predicted_cvr > 0.0);
            assert!(result.spend == 0.0);
        }
    }

    #[test]
    fn test_iteration_is_incremental_and_ordered() {
        let config = PacingConfig::new(10.0, 15.0, 300.0, 1);
        let mut sim = PacingSimulation::new(test_profile(), config, 17).unwrap();
        let first: Vec<_> = sim.by_ref().take(3).map(|r| r.interval).collect();
        assert_eq!(first, vec![0, 1, 2]);
        assert!((sim.progress() - 3.0 / INTERVALS_PER_DAY as f64).abs() < 1e-12);
        let fourth = sim.next().unwrap();
        assert_eq!(fourth.interval, 3);
    }

    #[test]
    fn test_target_roi_stays_positive() {
        let mut config = PacingConfig::new(10.0, 15.0, 500.0, 3);
        // Deliberately aggressive gains.
        config.roi_pacing = Some(RoiPacingPid {
            gain_p: 5.0,
            gain_i: 1.0,
            gain_d: 2.0,
            update_clicks: 10.0,
            max_step_fraction: 0.25,
        });
        let sim = PacingSimulation::new(test_profile(), config, 23).unwrap();
        for result in sim {
            assert!(
                result.target_roi > 0.0,
                "target went non-positive at interval {}",
                result.interval
            );
        }
    }

    #[test]
    fn test_config_validation_rejects_nonsense() {
        assert_eq!(
            PacingConfig::new(0.0, 15.0, 300.0, 1).validate(),
            Err(ConfigError::NonPositiveStopLoss(0.0))
        );
        assert_eq!(
            PacingConfig::new(10.0, -1.0, 300.0, 1).validate(),
            Err(ConfigError::NonPositiveRoiTarget(-1.0))
        );
        assert_eq!(
            PacingConfig::new(10.0, 15.0, -5.0, 1).validate(),
            Err(ConfigError::NegativeBudget(-5.0))
        );
        assert_eq!(
            PacingConfig::new(10.0, 15.0, 300.0, 0).validate(),
            Err(ConfigError::ZeroHorizon)
        );
        let mut config = PacingConfig::new(10.0, 15.0, 300.0, 1);
        config.window_clicks = 0.0;
        assert_eq!(config.validate(), Err(ConfigError::NonPositiveWindow(0.0)));
    }

    #[test]
    fn test_delivered_roi_held_when_window_has_no_spend() {
        let mut config = PacingConfig::new(10.0, 15.0, 0.0, 1);
        config.initial_delivered_roi = Some(13.0);
        let mut sim = PacingSimulation::new(test_profile(), config, 29).unwrap();
        while let Some(result) = sim.next() {
            assert!((result.delivered_roi - 13.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_time_index_supports_half_hour_curves() {
        let mut profile = test_profile();
        profile.click_potential = TimeOfDayCurve::new(vec![1.0; 48]).unwrap();
        let config = PacingConfig::new(10.0, 15.0, 300.0, 1);
        let sim = PacingSimulation::new(profile, config, 31).unwrap();
        assert_eq!(sim.count(), INTERVALS_PER_DAY);
    }
}
