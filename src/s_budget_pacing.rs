use crate::controllers::BudgetPacingProportional;
use crate::curves::IdealUtilizationCurve;
use crate::logger::{LogEvent, Logger};
use crate::logln;
use crate::pacing::{IntervalResult, PacingConfig, PacingSimulation};
use crate::profile::CatalogProfile;
use crate::utils::RAND_SEED;
use std::error::Error;
use std::sync::atomic::Ordering;

const DAILY_BUDGET: f64 = 300.0;

fn run_variant(seed: u64, logger: &mut Logger) -> Result<Vec<IntervalResult>, Box<dyn Error>> {
    let mut profile = CatalogProfile::new(300.0, 0.05, 15.0);
    profile.day_volatility = 0.0;
    profile.intraday_volatility = 0.0;
    profile.calibration_error = 0.0;
    profile.max_clicks_per_hour = 150.0;

    let mut config = PacingConfig::new(10.0, 15.0, DAILY_BUDGET, 1);
    config.window_clicks = 200.0;
    config.roi_pacing = None;
    config.budget_pacing = Some(BudgetPacingProportional {
        gain: 8.0,
        update_clicks: 20.0,
    });
    config.ideal_utilization = IdealUtilizationCurve::from_click_potential(&profile.click_potential);

    let mut sim = PacingSimulation::new(profile, config, seed)?;
    let mut results = Vec::with_capacity(sim.total_intervals());
    while let Some(result) = sim.next() {
        logln!(
            logger,
            LogEvent::Interval,
            "i{:02} h{:02} | target {:.3} util {:.3} ideal {:.3} spend {:>7.2}",
            result.interval_of_day,
            result.hour,
            result.target_roi,
            result.budget_utilization,
            result.ideal_utilization,
            result.spend
        );
        results.push(result);
    }
    Ok(results)
}

/// Budget pacing alone, one day with a 300 budget: the proportional loop
/// must track the ideal spend trajectory closely enough that day-end spend
/// lands within a few percent of the full budget, and daily spend must
/// never exceed it.
pub fn run(short_name: &'static str, logger: &mut Logger) -> Result<(), Box<dyn Error>> {
    let seed = RAND_SEED.load(Ordering::Relaxed).wrapping_add(307);
    let results = run_variant(seed, logger)?;

    let mut errors: Vec<String> = Vec::new();

    let final_spend = results.last().map(|r| r.day_spend).unwrap_or(0.0);
    let final_utilization = final_spend / DAILY_BUDGET;
    logln!(
        logger,
        LogEvent::Scenario,
        "day-end spend {:.2} of {:.0} ({:.1}% utilization)",
        final_spend,
        DAILY_BUDGET,
        final_utilization * 100.0
    );

    // Check: day-end spend lands near the full budget.
    if final_utilization < 0.85 {
        errors.push(format!(
            "Expected day-end utilization of at least 85%, got {:.1}%",
            final_utilization * 100.0
        ));
    } else {
        logln!(
            logger,
            LogEvent::Scenario,
            "✓ Day-end utilization {:.1}% within a few percent of the budget",
            final_utilization * 100.0
        );
    }

    // Check: daily spend never exceeds the budget.
    let overspent = results
        .iter()
        .find(|r| r.day_spend > DAILY_BUDGET + 1e-6);
    if let Some(result) = overspent {
        errors.push(format!(
            "Daily spend exceeded the budget at interval {}: {:.4}",
            result.interval, result.day_spend
        ));
    } else {
        logln!(logger, LogEvent::Scenario, "✓ Daily spend never exceeded the budget");
    }

    // Check: only the budget module was ever active.
    if results
        .iter()
        .any(|r| r.active_module.map(|m| m.label()) != Some("budget"))
    {
        errors.push("Expected budget pacing to be the only active module".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(format!("Scenario '{}' validation failed:\n{}", short_name, errors.join("\n")).into())
    }
}

// Register this scenario in the catalog
inventory::submit!(crate::scenarios::ScenarioEntry {
    short_name: "BudgetTracking",
    description: "Budget pacing alone lands day-end spend within a few percent of the daily budget",
    run,
});
