use crate::pacing::{IntervalResult, PacingConfig, PacingSimulation};
use crate::profile::CatalogProfile;
use plotters::prelude::*;
use std::error::Error;
use std::fs;

/// Render delivered vs target vs stop-loss ROI across a pacing run.
pub fn render_roi_chart(results: &[IntervalResult], path: &str) -> Result<(), Box<dyn Error>> {
    if results.is_empty() {
        return Err("no interval results to chart".into());
    }
    let x_max = results.len() as f64;
    let y_max = results
        .iter()
        .flat_map(|r| [r.target_roi, r.delivered_roi, r.stop_loss_roi])
        .fold(0.0_f64, f64::max)
        * 1.1;

    let root = BitMapBackend::new(path, (1024, 640)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("ROI tracking", ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..x_max, 0.0..y_max)?;
    chart
        .configure_mesh()
        .x_desc("interval")
        .y_desc("ROI")
        .draw()?;

    chart
        .draw_series(LineSeries::new(
            results.iter().map(|r| (r.interval as f64, r.target_roi)),
            &BLUE,
        ))?
        .label("target ROI")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));
    chart
        .draw_series(LineSeries::new(
            results.iter().map(|r| (r.interval as f64, r.delivered_roi)),
            &RED,
        ))?
        .label("delivered ROI")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));
    chart
        .draw_series(LineSeries::new(
            results.iter().map(|r| (r.interval as f64, r.stop_loss_roi)),
            &BLACK,
        ))?
        .label("stop-loss ROI")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLACK));

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

/// Render actual vs ideal day-budget utilization across a pacing run.
pub fn render_budget_chart(results: &[IntervalResult], path: &str) -> Result<(), Box<dyn Error>> {
    if results.is_empty() {
        return Err("no interval results to chart".into());
    }
    let x_max = results.len() as f64;

    let root = BitMapBackend::new(path, (1024, 640)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("Budget utilization", ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..x_max, 0.0..1.1_f64)?;
    chart
        .configure_mesh()
        .x_desc("interval")
        .y_desc("fraction of daily budget")
        .draw()?;

    chart
        .draw_series(LineSeries::new(
            results
                .iter()
                .map(|r| (r.interval as f64, r.budget_utilization)),
            &BLUE,
        ))?
        .label("actual")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));
    chart
        .draw_series(LineSeries::new(
            results
                .iter()
                .map(|r| (r.interval as f64, r.ideal_utilization)),
            &GREEN,
        ))?
        .label("ideal")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &GREEN));

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

/// Run a reference two-day pacing simulation and render both charts into
/// the charts/ directory.
pub fn generate_demo_charts() -> Result<(), Box<dyn Error>> {
    fs::create_dir_all("charts")?;

    let profile = CatalogProfile::new(300.0, 0.05, 15.0);
    let mut config = PacingConfig::new(10.0, 15.0, 300.0, 2);
    config.ideal_utilization =
        crate::curves::IdealUtilizationCurve::from_click_potential(&profile.click_potential);
    let sim = PacingSimulation::new(profile, config, 42)?;
    let results: Vec<IntervalResult> = sim.collect();

    render_roi_chart(&results, "charts/roi_tracking.png")?;
    render_budget_chart(&results, "charts/budget_utilization.png")?;
    Ok(())
}
