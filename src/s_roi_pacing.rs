use crate::controllers::RoiPacingPid;
use crate::logger::{LogEvent, Logger};
use crate::logln;
use crate::pacing::{IntervalResult, PacingConfig, PacingSimulation, INTERVALS_PER_DAY};
use crate::profile::CatalogProfile;
use crate::utils::RAND_SEED;
use std::error::Error;
use std::sync::atomic::Ordering;

/// A quiet, high-volume market where only ROI pacing is active: all noise
/// sources off, enough click capacity that the budget never binds.
fn run_variant(seed: u64, logger: &mut Logger) -> Result<Vec<IntervalResult>, Box<dyn Error>> {
    let mut profile = CatalogProfile::new(300.0, 0.05, 15.0);
    profile.day_volatility = 0.0;
    profile.intraday_volatility = 0.0;
    profile.calibration_error = 0.0;
    profile.max_clicks_per_hour = 200.0;

    let mut config = PacingConfig::new(10.0, 15.0, 100_000.0, 1);
    config.window_clicks = 300.0;
    config.budget_pacing = None;
    config.roi_pacing = Some(RoiPacingPid {
        gain_p: 0.10,
        gain_i: 0.002,
        gain_d: 0.05,
        update_clicks: 40.0,
        max_step_fraction: 0.25,
    });

    let mut sim = PacingSimulation::new(profile, config, seed)?;
    let mut results = Vec::with_capacity(sim.total_intervals());
    while let Some(result) = sim.next() {
        logln!(
            logger,
            LogEvent::Interval,
            "i{:02} h{:02} | target {:.3} delivered {:.3} clicks {:>6.1} spend {:>8.2}",
            result.interval_of_day,
            result.hour,
            result.target_roi,
            result.delivered_roi,
            result.clicks,
            result.spend
        );
        results.push(result);
    }
    Ok(results)
}

/// ROI pacing alone, one day: starting from a target (and assumed
/// delivered ROI) of 15 against a stop-loss of 10, the PID loop must pull
/// the delivered ROI toward the stop-loss setpoint over the day.
pub fn run(short_name: &'static str, logger: &mut Logger) -> Result<(), Box<dyn Error>> {
    let seed = RAND_SEED.load(Ordering::Relaxed).wrapping_add(211);
    let results = run_variant(seed, logger)?;

    let mut errors: Vec<String> = Vec::new();

    if results.len() != INTERVALS_PER_DAY {
        errors.push(format!(
            "Expected {} intervals, got {}",
            INTERVALS_PER_DAY,
            results.len()
        ));
    }

    let stop_loss = 10.0;
    let initial_error = (15.0_f64 - stop_loss).abs();
    let final_delivered = results.last().map(|r| r.delivered_roi).unwrap_or(0.0);
    let final_error = (final_delivered - stop_loss).abs();

    logln!(
        logger,
        LogEvent::Scenario,
        "delivered ROI start 15.00 -> end {:.2} (setpoint {:.1})",
        final_delivered,
        stop_loss
    );

    // Check: the tracking error shrank to less than half of its start.
    if final_error >= 0.5 * initial_error {
        errors.push(format!(
            "Expected the delivered-ROI error to at least halve, got {:.3} (from {:.3})",
            final_error, initial_error
        ));
    } else {
        logln!(
            logger,
            LogEvent::Scenario,
            "✓ Tracking error shrank: {:.2} -> {:.2}",
            initial_error,
            final_error
        );
    }

    // Check: the day ends in a band around the setpoint.
    if !(8.0..=12.0).contains(&final_delivered) {
        errors.push(format!(
            "Expected delivered ROI to end within [8, 12], got {:.3}",
            final_delivered
        ));
    } else {
        logln!(
            logger,
            LogEvent::Scenario,
            "✓ Delivered ROI {:.2} within [8, 12]",
            final_delivered
        );
    }

    // Check: the controller actually moved the target downward from 15.
    let final_target = results.last().map(|r| r.target_roi).unwrap_or(0.0);
    if final_target >= 15.0 {
        errors.push(format!(
            "Expected the target ROI to be retargeted below 15, got {:.3}",
            final_target
        ));
    } else {
        logln!(
            logger,
            LogEvent::Scenario,
            "✓ Target ROI retargeted to {:.2}",
            final_target
        );
    }

    // Check: the target stayed strictly positive throughout.
    if results.iter().any(|r| r.target_roi <= 0.0) {
        errors.push("Target ROI went non-positive during the run".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(format!("Scenario '{}' validation failed:\n{}", short_name, errors.join("\n")).into())
    }
}

// Register this scenario in the catalog
inventory::submit!(crate::scenarios::ScenarioEntry {
    short_name: "ROIconvergence",
    description: "ROI pacing alone pulls the delivered ROI toward the stop-loss setpoint within a day",
    run,
});
