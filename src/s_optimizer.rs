use crate::estimator::ConversionEstimator;
use crate::logger::{LogEvent, Logger};
use crate::logln;
use crate::optimizer::{optimize, score_summary, CandidateReport, OptimizerSettings};
use crate::profile::CatalogProfile;
use crate::utils::RAND_SEED;
use crate::window_sim::simulate_windows;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::error::Error;
use std::sync::atomic::Ordering;

/// Hill-climbing optimizer over the 4 window targets: the returned vector
/// must stay inside the valid range, every candidate must reach the
/// progress callback, and the optimized targets must beat the starting
/// point when both are replayed on matched seeds.
pub fn run(short_name: &'static str, logger: &mut Logger) -> Result<(), Box<dyn Error>> {
    let seed = RAND_SEED.load(Ordering::Relaxed).wrapping_add(503);

    let profile = CatalogProfile::new(300.0, 0.05, 15.0);
    let estimator = ConversionEstimator::new(profile.roi_baseline);
    let settings = OptimizerSettings {
        iterations: 25,
        ..OptimizerSettings::default()
    };
    let seller_roi_target = 12.0;
    let budget = 300.0;
    let initial = [15.0; 4];

    let mut reports: Vec<CandidateReport> = Vec::new();
    let mut callback = |report: &CandidateReport| {
        reports.push(report.clone());
    };

    let mut rng = StdRng::seed_from_u64(seed);
    let best = optimize(
        &profile,
        &estimator,
        budget,
        seller_roi_target,
        initial,
        &settings,
        &mut rng,
        Some(&mut callback),
    )?;

    for report in &reports {
        logln!(
            logger,
            LogEvent::Convergence,
            "iter {:>2} | targets [{:.2}, {:.2}, {:.2}, {:.2}] score {:>9.2} roi {:.2} util {:.2}{}",
            report.iteration,
            report.targets[0],
            report.targets[1],
            report.targets[2],
            report.targets[3],
            report.score,
            report.overall_roi,
            report.budget_utilization,
            if report.is_best { " *" } else { "" }
        );
    }
    logln!(
        logger,
        LogEvent::Scenario,
        "optimized targets [{:.2}, {:.2}, {:.2}, {:.2}] after {} candidates",
        best[0],
        best[1],
        best[2],
        best[3],
        reports.len()
    );

    let mut errors: Vec<String> = Vec::new();

    // Check: all returned targets stay in the valid range.
    if best.iter().any(|t| !(1.0..=30.0).contains(t)) {
        errors.push(format!("Optimized targets out of [1, 30]: {:?}", best));
    } else {
        logln!(logger, LogEvent::Scenario, "✓ Optimized targets within [1, 30]");
    }

    // Check: the progress callback saw the search happen.
    if reports.is_empty() {
        errors.push("Progress callback was never invoked".to_string());
    } else if !reports.iter().any(|r| r.is_best) {
        errors.push("No candidate was ever tagged as the best".to_string());
    } else {
        logln!(
            logger,
            LogEvent::Scenario,
            "✓ {} candidates reported, {} improvements",
            reports.len(),
            reports.iter().filter(|r| r.is_best).count()
        );
    }

    // Check: the optimized vector beats the starting point on a majority
    // of matched-seed replays (the objective itself is noisy).
    let mut best_wins = 0;
    let replays = 5;
    for replay in 0..replays {
        let replay_seed = seed.wrapping_add(1000 + replay);
        let mut rng = StdRng::seed_from_u64(replay_seed);
        let initial_outcome = simulate_windows(&profile, &estimator, initial, budget, &mut rng)?;
        let mut rng = StdRng::seed_from_u64(replay_seed);
        let best_outcome = simulate_windows(&profile, &estimator, best, budget, &mut rng)?;
        if score_summary(&best_outcome.summary, seller_roi_target)
            >= score_summary(&initial_outcome.summary, seller_roi_target)
        {
            best_wins += 1;
        }
    }
    if best_wins * 2 < replays {
        errors.push(format!(
            "Optimized targets won only {}/{} matched replays against the start",
            best_wins, replays
        ));
    } else {
        logln!(
            logger,
            LogEvent::Scenario,
            "✓ Optimized targets won {}/{} matched replays",
            best_wins,
            replays
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(format!("Scenario '{}' validation failed:\n{}", short_name, errors.join("\n")).into())
    }
}

// Register this scenario in the catalog
inventory::submit!(crate::scenarios::ScenarioEntry {
    short_name: "Optimizer",
    description: "Hill-climbing target search improves on its starting point and reports every candidate",
    run,
});
