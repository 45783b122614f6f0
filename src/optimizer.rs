use crate::errors::ConfigError;
use crate::estimator::ConversionEstimator;
use crate::profile::CatalogProfile;
use crate::window_sim::{simulate_windows, WindowSummary, NUM_WINDOWS};
use rand::rngs::StdRng;
use rand::Rng;

/// Tuning knobs of the hill climber.
#[derive(Debug, Clone)]
pub struct OptimizerSettings {
    /// Outer iterations
    pub iterations: usize,
    /// Neighbors explored per iteration
    pub neighbors: usize,
    /// Initial per-component perturbation bound
    pub initial_step: f64,
    /// Step shrink factor applied after a batch with no improvement
    pub step_decay: f64,
    /// Chance per iteration of restarting the working point
    pub restart_probability: f64,
    /// Valid ROI target range, inclusive
    pub min_target: f64,
    pub max_target: f64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            iterations: 50,
            neighbors: 4,
            initial_step: 2.0,
            step_decay: 0.98,
            restart_probability: 0.05,
            min_target: 1.0,
            max_target: 30.0,
        }
    }
}

/// One evaluated candidate, reported through the progress callback so a
/// caller can render a live optimization log.
#[derive(Debug, Clone)]
pub struct CandidateReport {
    pub iteration: usize,
    pub targets: [f64; NUM_WINDOWS],
    pub score: f64,
    pub overall_roi: f64,
    pub budget_utilization: f64,
    /// This candidate is the best seen so far
    pub is_best: bool,
}

/// Score a simulated day against the seller's ROI target and full budget
/// delivery. ROI shortfall is punished quadratically, ROI surplus earns a
/// square-root reward; utilization is pushed into the [95%, 100%] band.
pub fn score_summary(summary: &WindowSummary, seller_roi_target: f64) -> f64 {
    let roi = summary.overall_roi;
    let mut score = if roi < seller_roi_target {
        -1000.0 * (seller_roi_target - roi).powi(2)
    } else {
        100.0 * (roi - seller_roi_target).sqrt()
    };

    let utilization = summary.budget_utilization;
    score += if utilization < 0.95 {
        -500.0 * (0.95 - utilization)
    } else if utilization > 1.0 {
        -1000.0 * (utilization - 1.0)
    } else {
        100.0
    };
    score
}

/// Stochastic local search for the 4-window ROI targets that maximize the
/// score, treating the single-window simulator as a black-box objective.
///
/// Greedy first-improvement over random neighbors; the step size shrinks
/// when a whole batch fails, and an occasional restart moves the working
/// point to escape local optima. The best vector ever evaluated is what
/// gets returned, restarts notwithstanding.
pub fn optimize(
    profile: &CatalogProfile,
    estimator: &ConversionEstimator,
    budget: f64,
    seller_roi_target: f64,
    initial_targets: [f64; NUM_WINDOWS],
    settings: &OptimizerSettings,
    rng: &mut StdRng,
    mut progress: Option<&mut dyn FnMut(&CandidateReport)>,
) -> Result<[f64; NUM_WINDOWS], ConfigError> {
    if !seller_roi_target.is_finite() || seller_roi_target <= 0.0 {
        return Err(ConfigError::NonPositiveRoiTarget(seller_roi_target));
    }

    let clamp = |t: f64| t.clamp(settings.min_target, settings.max_target);
    let evaluate = |targets: [f64; NUM_WINDOWS],
                    rng: &mut StdRng|
     -> Result<f64, ConfigError> {
        let outcome = simulate_windows(profile, estimator, targets, budget, rng)?;
        Ok(score_summary(&outcome.summary, seller_roi_target))
    };

    let mut current = initial_targets.map(clamp);
    let initial_outcome = simulate_windows(profile, estimator, current, budget, rng)?;
    let mut current_score = score_summary(&initial_outcome.summary, seller_roi_target);
    let mut best = current;
    let mut best_score = current_score;
    if let Some(callback) = progress.as_deref_mut() {
        callback(&CandidateReport {
            iteration: 0,
            targets: current,
            score: current_score,
            overall_roi: initial_outcome.summary.overall_roi,
            budget_utilization: initial_outcome.summary.budget_utilization,
            is_best: true,
        });
    }

    let mut step = settings.initial_step;
    for iteration in 0..settings.iterations {
        if rng.gen::<f64>() < settings.restart_probability {
            // Random restart of the working point; the best-ever vector is
            // kept aside and is unaffected.
            let mut restarted = [0.0; NUM_WINDOWS];
            for target in &mut restarted {
                *target = rng.gen_range(settings.min_target..=settings.max_target);
            }
            current = restarted;
            current_score = evaluate(current, rng)?;
            step = settings.initial_step;
        }

        let mut improved = false;
        for _ in 0..settings.neighbors {
            let mut neighbor = current;
            for target in &mut neighbor {
                *target = clamp(*target + rng.gen_range(-step..=step));
            }
            let outcome = simulate_windows(profile, estimator, neighbor, budget, rng)?;
            let score = score_summary(&outcome.summary, seller_roi_target);

            let is_best = score > best_score;
            if let Some(callback) = progress.as_deref_mut() {
                callback(&CandidateReport {
                    iteration: iteration + 1,
                    targets: neighbor,
                    score,
                    overall_roi: outcome.summary.overall_roi,
                    budget_utilization: outcome.summary.budget_utilization,
                    is_best,
                });
            }
            if is_best {
                best = neighbor;
                best_score = score;
            }
            if score > current_score {
                // First improvement wins the batch.
                current = neighbor;
                current_score = score;
                improved = true;
                break;
            }
        }

        if !improved {
            step *= settings.step_decay;
        }
    }

    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn profile() -> CatalogProfile {
        CatalogProfile::new(300.0, 0.05, 15.0)
    }

    #[test]
    fn test_score_prefers_roi_at_target_and_full_delivery() {
        let good = WindowSummary {
            total_clicks: 0.0,
            total_orders: 0,
            total_spend: 0.0,
            total_gmv: 0.0,
            overall_roi: 13.0,
            budget_utilization: 0.98,
            spent_all_budget: false,
            warnings: Vec::new(),
        };
        let starved = WindowSummary {
            overall_roi: 13.0,
            budget_utilization: 0.50,
            ..good.clone()
        };
        let below = WindowSummary {
            overall_roi: 6.0,
            budget_utilization: 0.98,
            ..good.clone()
        };
        let target = 12.0;
        assert!(score_summary(&good, target) > score_summary(&starved, target));
        assert!(score_summary(&good, target) > score_summary(&below, target));
    }

    #[test]
    fn test_score_penalizes_overdelivery() {
        let over = WindowSummary {
            total_clicks: 0.0,
            total_orders: 0,
            total_spend: 0.0,
            total_gmv: 0.0,
            overall_roi: 13.0,
            budget_utilization: 1.10,
            spent_all_budget: true,
            warnings: Vec::new(),
        };
        let full = WindowSummary {
            budget_utilization: 0.99,
            ..over.clone()
        };
        assert!(score_summary(&full, 12.0) > score_summary(&over, 12.0));
    }

    #[test]
    fn test_optimizer_returns_bounded_targets() {
        let profile = profile();
        let estimator = ConversionEstimator::new(profile.roi_baseline);
        let mut rng = StdRng::seed_from_u64(99);
        let settings = OptimizerSettings {
            iterations: 10,
            ..OptimizerSettings::default()
        };
        let best = optimize(
            &profile,
            &estimator,
            300.0,
            12.0,
            [15.0; NUM_WINDOWS],
            &settings,
            &mut rng,
            None,
        )
        .unwrap();
        for target in best {
            assert!((1.0..=30.0).contains(&target), "target {} out of range", target);
        }
    }

    #[test]
    fn test_optimizer_never_returns_worse_than_start() {
        let profile = profile();
        let estimator = ConversionEstimator::new(profile.roi_baseline);
        let settings = OptimizerSettings {
            iterations: 20,
            ..OptimizerSettings::default()
        };

        let mut rng = StdRng::seed_from_u64(7);
        let initial = [15.0; NUM_WINDOWS];
        let best = optimize(
            &profile,
            &estimator,
            300.0,
            12.0,
            initial,
            &settings,
            &mut rng,
            None,
        )
        .unwrap();

        // Re-score both vectors on a fresh seed; the optimum must hold up
        // on average, so compare across a few replications.
        let mut best_wins = 0;
        for seed in 0..5 {
            let mut rng = StdRng::seed_from_u64(1000 + seed);
            let initial_outcome =
                simulate_windows(&profile, &estimator, initial, 300.0, &mut rng).unwrap();
            let mut rng = StdRng::seed_from_u64(1000 + seed);
            let best_outcome =
                simulate_windows(&profile, &estimator, best, 300.0, &mut rng).unwrap();
            if score_summary(&best_outcome.summary, 12.0)
                >= score_summary(&initial_outcome.summary, 12.0)
            {
                best_wins += 1;
            }
        }
        assert!(best_wins >= 3, "optimized targets won only {}/5 replays", best_wins);
    }

    #[test]
    fn test_progress_callback_sees_every_candidate() {
        let profile = profile();
        let estimator = ConversionEstimator::new(profile.roi_baseline);
        let mut rng = StdRng::seed_from_u64(11);
        let settings = OptimizerSettings {
            iterations: 8,
            restart_probability: 0.0,
            ..OptimizerSettings::default()
        };
        let mut reports = Vec::new();
        let mut callback = |report: &CandidateReport| reports.push(report.clone());
        optimize(
            &profile,
            &estimator,
            300.0,
            12.0,
            [15.0; NUM_WINDOWS],
            &settings,
            &mut rng,
            Some(&mut callback),
        )
        .unwrap();

        // The initial point plus at most neighbors-per-iteration batches;
        // early-exit batches report fewer, but never zero.
        assert!(!reports.is_empty());
        assert!(reports.len() <= 1 + settings.iterations * settings.neighbors);
        assert!(reports[0].is_best, "initial candidate seeds the best score");
        assert!(reports.iter().filter(|r| r.is_best).count() >= 1);
    }

    #[test]
    fn test_rejects_non_positive_seller_target() {
        let profile = profile();
        let estimator = ConversionEstimator::new(profile.roi_baseline);
        let mut rng = StdRng::seed_from_u64(1);
        let result = optimize(
            &profile,
            &estimator,
            300.0,
            0.0,
            [15.0; NUM_WINDOWS],
            &OptimizerSettings::default(),
            &mut rng,
            None,
        );
        assert_eq!(result.unwrap_err(), ConfigError::NonPositiveRoiTarget(0.0));
    }
}
