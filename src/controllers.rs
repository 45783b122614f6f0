use crate::errors::ConfigError;

/// The closed set of pacing strategies the controller can arbitrate
/// between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingModuleKind {
    /// PID loop tracking the stop-loss ROI with the rolling delivered ROI
    RoiPacing,
    /// Proportional loop tracking the ideal intraday spend trajectory
    BudgetPacing,
}

impl PacingModuleKind {
    /// Short label for log lines.
    pub fn label(self) -> &'static str {
        match self {
            PacingModuleKind::RoiPacing => "roi",
            PacingModuleKind::BudgetPacing => "budget",
        }
    }
}

/// Mutable accumulators of the ROI-pacing PID loop, carried in the
/// controller state between updates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PidState {
    pub integral: f64,
    pub previous_error: Option<f64>,
}

/// ROI-pacing PID module: multiplicative retargeting of the ROI target
/// from the normalized stop-loss error.
///
/// Each applied step is clamped to `max_step_fraction` of the current
/// target. Unclamped steps were tried and the loop oscillated on noisy
/// delivered-ROI readings.
#[derive(Debug, Clone)]
pub struct RoiPacingPid {
    pub gain_p: f64,
    pub gain_i: f64,
    pub gain_d: f64,
    /// Clicks that must accumulate between two updates
    pub update_clicks: f64,
    /// Largest relative change one update may apply to the target
    pub max_step_fraction: f64,
}

impl RoiPacingPid {
    pub fn new() -> Self {
        Self {
            gain_p: 0.10,
            gain_i: 0.002,
            gain_d: 0.05,
            update_clicks: 50.0,
            max_step_fraction: 0.25,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for gain in [self.gain_p, self.gain_i, self.gain_d] {
            if !gain.is_finite() {
                return Err(ConfigError::NonFiniteGain(gain));
            }
        }
        if !self.update_clicks.is_finite() || self.update_clicks <= 0.0 {
            return Err(ConfigError::NonPositiveCadence(self.update_clicks));
        }
        if !self.max_step_fraction.is_finite()
            || self.max_step_fraction <= 0.0
            || self.max_step_fraction > 1.0
        {
            return Err(ConfigError::StepFractionOutOfRange(self.max_step_fraction));
        }
        Ok(())
    }

    /// One PID update. Returns the new target and the advanced accumulator
    /// state; the caller decides whether the update is actually applied.
    ///
    /// The error is the normalized distance of the delivered ROI from the
    /// stop-loss: positive when delivery is below the stop-loss (target
    /// must rise to protect ROI), negative when there is headroom.
    pub fn next_target(
        &self,
        pid: &PidState,
        current_target: f64,
        stop_loss_roi: f64,
        delivered_roi: f64,
    ) -> (f64, PidState) {
        let error = (stop_loss_roi - delivered_roi) / stop_loss_roi;
        let integral = pid.integral + error;
        let derivative = match pid.previous_error {
            Some(previous) => error - previous,
            None => 0.0,
        };

        let adjustment = (self.gain_p * error
            + self.gain_i * integral
            + self.gain_d * derivative)
            .clamp(-self.max_step_fraction, self.max_step_fraction);

        let candidate = current_target * (1.0 + adjustment);
        // A step must never drive the target to zero or below; the clamp
        // above already guarantees it, this is the explicit guard.
        let next_target = if candidate > 0.0 { candidate } else { current_target };

        (
            next_target,
            PidState {
                integral,
                previous_error: Some(error),
            },
        )
    }
}

impl Default for RoiPacingPid {
    fn default() -> Self {
        Self::new()
    }
}

/// Budget-pacing proportional module: additive retargeting from the gap
/// between actual and ideal day-budget utilization. Overspending against
/// the reference trajectory raises the target (lower bid, slower spend);
/// underspending lowers it.
#[derive(Debug, Clone)]
pub struct BudgetPacingProportional {
    pub gain: f64,
    /// Clicks that must accumulate between two updates
    pub update_clicks: f64,
}

impl BudgetPacingProportional {
    pub fn new() -> Self {
        Self {
            gain: 8.0,
            update_clicks: 25.0,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.gain.is_finite() {
            return Err(ConfigError::NonFiniteGain(self.gain));
        }
        if !self.update_clicks.is_finite() || self.update_clicks <= 0.0 {
            return Err(ConfigError::NonPositiveCadence(self.update_clicks));
        }
        Ok(())
    }

    /// One proportional update. Rejects (holds the current target) any step
    /// that would drive the target to zero or below.
    pub fn next_target(
        &self,
        current_target: f64,
        actual_utilization: f64,
        ideal_utilization: f64,
    ) -> f64 {
        let error = actual_utilization - ideal_utilization;
        let candidate = current_target + self.gain * error;
        if candidate > 0.0 {
            candidate
        } else {
            current_target
        }
    }
}

impl Default for BudgetPacingProportional {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick the module whose candidate update applies this interval.
///
/// Priority order, a pure function of its inputs:
/// 1. delivered ROI at or below the stop-loss: protect ROI first;
/// 2. day spend ahead of the ideal trajectory: slow down;
/// 3. otherwise ROI pacing by default.
pub fn select_active_module(
    roi_enabled: bool,
    budget_enabled: bool,
    delivered_roi: f64,
    stop_loss_roi: f64,
    actual_utilization: f64,
    ideal_utilization: f64,
) -> Option<PacingModuleKind> {
    match (roi_enabled, budget_enabled) {
        (false, false) => None,
        (true, false) => Some(PacingModuleKind::RoiPacing),
        (false, true) => Some(PacingModuleKind::BudgetPacing),
        (true, true) => {
            if delivered_roi <= stop_loss_roi {
                Some(PacingModuleKind::RoiPacing)
            } else if actual_utilization > ideal_utilization {
                Some(PacingModuleKind::BudgetPacing)
            } else {
                Some(PacingModuleKind::RoiPacing)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pid_raises_target_when_roi_below_stop_loss() {
        let pid = RoiPacingPid::new();
        let (target, state) = pid.next_target(&PidState::default(), 15.0, 10.0, 8.0);
        assert!(target > 15.0, "target {} should rise", target);
        assert!(state.integral > 0.0);
        assert_eq!(state.previous_error, Some(0.2));
    }

    #[test]
    fn test_pid_lowers_target_when_roi_has_headroom() {
        let pid = RoiPacingPid::new();
        let (target, _) = pid.next_target(&PidState::default(), 15.0, 10.0, 14.0);
        assert!(target < 15.0, "target {} should fall", target);
    }

    #[test]
    fn test_pid_step_is_clamped() {
        let pid = RoiPacingPid {
            gain_p: 100.0,
            ..RoiPacingPid::new()
        };
        let (target, _) = pid.next_target(&PidState::default(), 10.0, 10.0, 0.5);
        assert!((target - 12.5).abs() < 1e-9, "step must clamp at 25%: {}", target);
        let (target, _) = pid.next_target(&PidState::default(), 10.0, 10.0, 50.0);
        assert!((target - 7.5).abs() < 1e-9, "step must clamp at -25%: {}", target);
    }

    #[test]
    fn test_pid_integral_accumulates_across_updates() {
        let pid = RoiPacingPid::new();
        let (_, s1) = pid.next_target(&PidState::default(), 15.0, 10.0, 8.0);
        let (_, s2) = pid.next_target(&s1, 15.0, 10.0, 8.0);
        assert!((s2.integral - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_pid_derivative_zero_on_first_update() {
        let pid = RoiPacingPid {
            gain_p: 0.0,
            gain_i: 0.0,
            gain_d: 1.0,
            ..RoiPacingPid::new()
        };
        let (target, state) = pid.next_target(&PidState::default(), 15.0, 10.0, 8.0);
        assert_eq!(target, 15.0);
        // Second update with a changed error engages the derivative term.
        let (target, _) = pid.next_target(&state, 15.0, 10.0, 6.0);
        assert!(target > 15.0);
    }

    #[test]
    fn test_budget_module_direction() {
        let module = BudgetPacingProportional::new();
        let ahead = module.next_target(15.0, 0.40, 0.30);
        assert!(ahead > 15.0, "overspending must raise the target");
        let behind = module.next_target(15.0, 0.20, 0.30);
        assert!(behind < 15.0, "underspending must lower the target");
    }

    #[test]
    fn test_budget_module_rejects_non_positive_candidate() {
        let module = BudgetPacingProportional {
            gain: 100.0,
            update_clicks: 25.0,
        };
        let held = module.next_target(2.0, 0.0, 0.5);
        assert_eq!(held, 2.0, "a step to a non-positive target is rejected");
    }

    #[test]
    fn test_arbitration_is_pure_and_prioritized() {
        // Stop-loss breached: ROI pacing wins even while overspending.
        assert_eq!(
            select_active_module(true, true, 9.0, 10.0, 0.9, 0.3),
            Some(PacingModuleKind::RoiPacing)
        );
        // Healthy ROI but ahead of the ideal curve: budget pacing.
        assert_eq!(
            select_active_module(true, true, 14.0, 10.0, 0.5, 0.3),
            Some(PacingModuleKind::BudgetPacing)
        );
        // Healthy ROI, on/behind the curve: ROI pacing by default.
        assert_eq!(
            select_active_module(true, true, 14.0, 10.0, 0.2, 0.3),
            Some(PacingModuleKind::RoiPacing)
        );
        // Single-module configurations pass straight through.
        assert_eq!(
            select_active_module(true, false, 14.0, 10.0, 0.9, 0.3),
            Some(PacingModuleKind::RoiPacing)
        );
        assert_eq!(
            select_active_module(false, true, 9.0, 10.0, 0.2, 0.3),
            Some(PacingModuleKind::BudgetPacing)
        );
        assert_eq!(select_active_module(false, false, 9.0, 10.0, 0.2, 0.3), None);
        // Same inputs, same choice: no hidden state.
        for _ in 0..3 {
            assert_eq!(
                select_active_module(true, true, 14.0, 10.0, 0.5, 0.3),
                Some(PacingModuleKind::BudgetPacing)
            );
        }
    }
}
