mod charts;
mod controllers;
mod curves;
mod errors;
mod estimator;
mod logger;
mod optimizer;
mod pacing;
mod profile;
mod rolling;
mod scenarios;
mod utils;
mod window_sim;

// Include scenario files so their constructors run
mod s_budget_pacing;
mod s_optimizer;
mod s_roi_pacing;
mod s_single_window;
mod s_zero_budget;

use curves::IdealUtilizationCurve;
use logger::{sanitize_filename, ConsoleReceiver, FileReceiver, LogEvent, Logger};
use pacing::{PacingConfig, PacingSimulation, INTERVALS_PER_DAY};
use profile::CatalogProfile;
use scenarios::get_scenario_catalog;
use std::error::Error;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use utils::RAND_SEED;

/// Run a reference 3-day pacing simulation and log day summaries.
fn run_demo(logger: &mut Logger) -> Result<(), Box<dyn Error>> {
    let profile = CatalogProfile::new(300.0, 0.05, 15.0);
    let mut config = PacingConfig::new(10.0, 15.0, 300.0, 3);
    config.ideal_utilization = IdealUtilizationCurve::from_click_potential(&profile.click_potential);

    logln!(
        logger,
        LogEvent::Variant,
        "=== Pacing demo: 3 days, 300/day budget, stop-loss ROI 10, initial target 15 ==="
    );

    let mut sim = PacingSimulation::new(profile, config, RAND_SEED.load(Ordering::Relaxed))?;
    while let Some(result) = sim.next() {
        logln!(
            logger,
            LogEvent::Interval,
            "d{} i{:02} h{:02} | target {:>6.2} delivered {:>6.2} clicks {:>6.1} spend {:>7.2} util {:.2} [{}]",
            result.day,
            result.interval_of_day,
            result.hour,
            result.target_roi,
            result.delivered_roi,
            result.clicks,
            result.spend,
            result.budget_utilization,
            result.active_module.map(|m| m.label()).unwrap_or("-")
        );
        if result.interval_of_day == INTERVALS_PER_DAY - 1 {
            logln!(
                logger,
                LogEvent::Variant,
                "day {} | spend {:>7.2} ({:>5.1}% of budget) gmv {:>8.2} day ROI {:>5.2} delivered ROI {:>5.2} target {:>5.2}",
                result.day,
                result.day_spend,
                result.budget_utilization * 100.0,
                result.day_gmv,
                result.day_roi,
                result.delivered_roi,
                result.target_roi
            );
        }
    }
    for warning in sim.warnings() {
        logln!(logger, LogEvent::Variant, "warning: {}", warning);
    }
    Ok(())
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    // Check if "charts" argument is provided
    if args.len() > 1 && args[1] == "charts" {
        match charts::generate_demo_charts() {
            Ok(()) => {
                println!("Chart generation completed successfully.");
            }
            Err(e) => {
                eprintln!("Error generating charts: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    if args.len() > 1 {
        let scenario_arg = &args[1];

        // Parse iterations parameter if present
        let iterations = if args.len() > 2 {
            match args[2].parse::<u64>() {
                Ok(n) => n,
                Err(_) => {
                    eprintln!(
                        "Error: Invalid iterations parameter '{}'. Expected a number.",
                        args[2]
                    );
                    std::process::exit(1);
                }
            }
        } else {
            1
        };

        // Get all scenarios from the catalog
        let all_scenarios = get_scenario_catalog();

        // Filter scenarios: if "all", use all scenarios; otherwise filter to the named scenario
        let scenarios: Vec<_> = if scenario_arg == "all" {
            all_scenarios.clone()
        } else {
            let found = all_scenarios.iter().find(|s| s.short_name == scenario_arg);
            match found {
                Some(scenario) => vec![scenario.clone()],
                None => {
                    eprintln!("Error: Scenario '{}' not found.", scenario_arg);
                    eprintln!("Available scenarios:");
                    for s in &all_scenarios {
                        eprintln!("  - {}: {}", s.short_name, s.description);
                    }
                    std::process::exit(1);
                }
            }
        };

        // Set up logger with console and validation file receivers.
        // When running a specific scenario, also show its scenario-level output.
        let mut logger = Logger::new();
        if scenario_arg == "all" {
            logger.add_receiver(ConsoleReceiver::new(vec![LogEvent::Validation]));
        } else {
            logger.add_receiver(ConsoleReceiver::new(vec![
                LogEvent::Validation,
                LogEvent::Scenario,
            ]));
        }

        // Add validation receiver (for validation events)
        let summary_receiver_id = logger.add_receiver(FileReceiver::new(
            &PathBuf::from("log/summary.log"),
            vec![LogEvent::Validation],
        ));

        if scenario_arg == "all" {
            if iterations > 1 {
                logln!(&mut logger, LogEvent::Validation, "Running all scenarios {} times...\n", iterations);
            } else {
                logln!(&mut logger, LogEvent::Validation, "Running all scenarios...\n");
            }
        } else if iterations > 1 {
            logln!(&mut logger, LogEvent::Validation, "Running scenario '{}' {} times...\n", scenario_arg, iterations);
        } else {
            logln!(&mut logger, LogEvent::Validation, "Running scenario '{}'...\n", scenario_arg);
        }

        // Outer loop for scenarios
        for scenario in &scenarios {
            log!(&mut logger, LogEvent::Validation, "{}: ", scenario.short_name);

            // Add scenario-level receiver
            let scenario_receiver_id = logger.add_receiver(FileReceiver::new(
                &PathBuf::from(format!(
                    "log/{}/scenario.log",
                    sanitize_filename(scenario.short_name)
                )),
                vec![LogEvent::Scenario, LogEvent::Variant, LogEvent::Convergence],
            ));

            // Inner loop for iterations
            for i in 0..iterations {
                if iterations > 1 {
                    log!(&mut logger, LogEvent::Validation, "[{}/{}] ", i + 1, iterations);
                }

                // Set RAND_SEED to iteration number
                RAND_SEED.store(i, Ordering::Relaxed);

                match (scenario.run)(scenario.short_name, &mut logger) {
                    Ok(()) => {
                        if iterations > 1 {
                            logln!(&mut logger, LogEvent::Validation, "✓");
                        } else {
                            logln!(&mut logger, LogEvent::Validation, "✓ PASSED");
                        }
                    }
                    Err(e) => {
                        if iterations > 1 {
                            logln!(&mut logger, LogEvent::Validation, "✗");
                        } else {
                            logln!(&mut logger, LogEvent::Validation, "✗ FAILED: {}", e);
                        }
                    }
                }

                // Flush to ensure validation is written to summary.log
                let _ = logger.flush();
            }

            // Remove scenario-level receiver
            logger.remove_receiver(scenario_receiver_id);
        }

        // Remove validation receiver
        logger.remove_receiver(summary_receiver_id);
    } else {
        // Default behavior: run the pacing demo with day-level console output,
        // interval detail going to a log file.
        let mut logger = Logger::new();
        logger.add_receiver(ConsoleReceiver::new(vec![
            LogEvent::Variant,
            LogEvent::Convergence,
        ]));
        logger.add_receiver(FileReceiver::new(
            &PathBuf::from("log/demo_intervals.log"),
            vec![LogEvent::Interval],
        ));
        if let Err(e) = run_demo(&mut logger) {
            eprintln!("Error running demo: {}", e);
            std::process::exit(1);
        }
    }
}
