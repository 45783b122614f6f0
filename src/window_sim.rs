use crate::errors::ConfigError;
use crate::estimator::{compute_bid, ConversionEstimator};
use crate::profile::CatalogProfile;
use crate::utils::jitter_factor;
use rand::rngs::StdRng;

/// The day is split into 4 fixed windows of 6 hours each.
pub const NUM_WINDOWS: usize = 4;
pub const WINDOW_HOURS: usize = 6;

/// Outcome of one 6-hour window.
#[derive(Debug, Clone)]
pub struct WindowResult {
    pub window: usize,
    pub target_roi: f64,
    pub predicted_cvr: f64,
    pub bid: f64,
    pub attainment: f64,
    pub clicks: f64,
    pub orders: u64,
    pub spend: f64,
    pub gmv: f64,
    /// gmv / spend for this window, 0 when nothing was spent
    pub roi: f64,
    /// The budget, not the market, capped this window's clicks
    pub budget_constrained: bool,
}

/// Aggregates across the 4 windows.
#[derive(Debug, Clone)]
pub struct WindowSummary {
    pub total_clicks: f64,
    pub total_orders: u64,
    pub total_spend: f64,
    pub total_gmv: f64,
    pub overall_roi: f64,
    pub budget_utilization: f64,
    /// The budget ran out while later windows still wanted volume
    pub spent_all_budget: bool,
    /// Non-fatal estimator fallbacks encountered during the run
    pub warnings: Vec<String>,
}

/// Full result of a single-day, 4-window simulation.
#[derive(Debug, Clone)]
pub struct WindowOutcome {
    pub windows: Vec<WindowResult>,
    pub summary: WindowSummary,
}

/// Simulate one day as 4 sequential 6-hour windows under a shared budget.
///
/// Each window estimates a conversion rate at its midpoint hour, derives
/// the bid from the window's ROI target, passes it through the attainment
/// curve, and clamps the resulting click volume to what the remaining
/// budget affords. An estimator failure is recovered by substituting the
/// base rate and recording a warning, never by aborting.
pub fn simulate_windows(
    profile: &CatalogProfile,
    estimator: &ConversionEstimator,
    roi_targets: [f64; NUM_WINDOWS],
    budget: f64,
    rng: &mut StdRng,
) -> Result<WindowOutcome, ConfigError> {
    profile.validate()?;
    for target in roi_targets {
        if !target.is_finite() || target <= 0.0 {
            return Err(ConfigError::NonPositiveRoiTarget(target));
        }
    }
    if !budget.is_finite() || budget < 0.0 {
        return Err(ConfigError::NegativeBudget(budget));
    }

    let mut windows = Vec::with_capacity(NUM_WINDOWS);
    let mut warnings = Vec::new();
    let mut remaining_budget = budget;
    let mut spent_all_budget = false;

    for (window, target_roi) in roi_targets.into_iter().enumerate() {
        let start_hour = window * WINDOW_HOURS;
        let midpoint_hour = start_hour + WINDOW_HOURS / 2;
        let time_index = profile
            .click_potential
            .index_for_intraday(midpoint_hour * 2);

        let predicted_cvr = match estimator.estimate(
            target_roi,
            profile.aov,
            time_index,
            profile.base_conversion_rate,
            profile.calibration_error,
            &profile.click_potential,
            rng,
        ) {
            Ok(rate) => rate,
            Err(error) => {
                warnings.push(format!("window {}: estimator fallback: {}", window, error));
                profile.base_conversion_rate
            }
        };

        let bid = compute_bid(predicted_cvr, profile.aov, target_roi);
        let attainment = profile.attainment_curve.attainment(bid);
        let window_potential = profile
            .click_potential
            .mean_over_hours(start_hour, start_hour + WINDOW_HOURS);
        let potential_clicks = profile.max_clicks_per_hour
            * window_potential
            * attainment
            * jitter_factor(rng, profile.intraday_volatility)
            * WINDOW_HOURS as f64;
        let affordable_clicks = if bid.is_finite() && bid > 0.0 {
            remaining_budget / bid
        } else {
            0.0
        };
        let budget_constrained =
            affordable_clicks < potential_clicks && window + 1 < NUM_WINDOWS;
        if budget_constrained {
            spent_all_budget = true;
        }
        let clicks = potential_clicks.min(affordable_clicks).max(0.0);

        let actual_cvr = (predicted_cvr
            * jitter_factor(rng, profile.intraday_volatility))
        .clamp(0.0, 1.0);
        let orders = (clicks * actual_cvr).floor();
        let spend = clicks * bid;
        let gmv = orders * profile.aov;
        let roi = if spend > 0.0 { gmv / spend } else { 0.0 };

        remaining_budget = (remaining_budget - spend).max(0.0);

        windows.push(WindowResult {
            window,
            target_roi,
            predicted_cvr,
            bid,
            attainment,
            clicks,
            orders: orders as u64,
            spend,
            gmv,
            roi,
            budget_constrained,
        });
    }

    let total_clicks: f64 = windows.iter().map(|w| w.clicks).sum();
    let total_orders: u64 = windows.iter().map(|w| w.orders).sum();
    let total_spend: f64 = windows.iter().map(|w| w.spend).sum();
    let total_gmv: f64 = windows.iter().map(|w| w.gmv).sum();
    let overall_roi = if total_spend > 0.0 {
        total_gmv / total_spend
    } else {
        0.0
    };
    let budget_utilization = if budget > 0.0 { total_spend / budget } else { 0.0 };

    Ok(WindowOutcome {
        windows,
        summary: WindowSummary {
            total_clicks,
            total_orders,
            total_spend,
            total_gmv,
            overall_roi,
            budget_utilization,
            spent_all_budget,
            warnings,
        },
    })
}
