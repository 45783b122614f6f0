use crate::logger::{LogEvent, Logger};
use crate::logln;
use crate::pacing::{PacingConfig, PacingSimulation, INTERVALS_PER_DAY};
use crate::profile::CatalogProfile;
use crate::utils::RAND_SEED;
use std::error::Error;
use std::sync::atomic::Ordering;

/// Degenerate day with a zero budget: every interval must emit zero
/// clicks, spend and revenue without any error or division-by-zero, while
/// estimation keeps running underneath.
pub fn run(short_name: &'static str, logger: &mut Logger) -> Result<(), Box<dyn Error>> {
    let seed = RAND_SEED.load(Ordering::Relaxed).wrapping_add(401);

    let profile = CatalogProfile::new(300.0, 0.05, 15.0);
    let config = PacingConfig::new(10.0, 15.0, 0.0, 1);
    let mut sim = PacingSimulation::new(profile, config, seed)?;

    let mut errors: Vec<String> = Vec::new();
    let mut intervals = 0;

    while let Some(result) = sim.next() {
        intervals += 1;
        if result.clicks != 0.0
            || result.spend != 0.0
            || result.orders != 0
            || result.gmv != 0.0
        {
            errors.push(format!(
                "Interval {} produced volume on a zero budget: clicks {} spend {}",
                result.interval, result.clicks, result.spend
            ));
            break;
        }
        if !result.delivered_roi.is_finite()
            || !result.budget_utilization.is_finite()
            || !result.day_roi.is_finite()
        {
            errors.push(format!(
                "Interval {} produced a non-finite statistic",
                result.interval
            ));
            break;
        }
        if result.predicted_cvr <= 0.0 || result.bid <= 0.0 {
            errors.push(format!(
                "Interval {}: estimation should keep running on a zero budget",
                result.interval
            ));
            break;
        }
    }

    if intervals != INTERVALS_PER_DAY {
        errors.push(format!(
            "Expected {} intervals, got {}",
            INTERVALS_PER_DAY, intervals
        ));
    }
    if !sim.warnings().is_empty() {
        errors.push(format!("Expected no warnings, got {:?}", sim.warnings()));
    }

    if errors.is_empty() {
        logln!(
            logger,
            LogEvent::Scenario,
            "✓ {} zero-budget intervals emitted zero volume and finite statistics",
            intervals
        );
        Ok(())
    } else {
        Err(format!("Scenario '{}' validation failed:\n{}", short_name, errors.join("\n")).into())
    }
}

// Register this scenario in the catalog
inventory::submit!(crate::scenarios::ScenarioEntry {
    short_name: "ZeroBudget",
    description: "A zero daily budget yields zero volume on every interval without errors",
    run,
});
