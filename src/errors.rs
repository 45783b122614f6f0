//! Typed configuration/validation errors.
//!
//! Every fail-fast validation in the crate rejects bad input with one of
//! these variants rather than a free-form string, so callers can match on
//! the specific failure. Messages are descriptive for the `Display`/`Error`
//! path used by the CLI and scenario runners.

use thiserror::Error;

/// Errors produced while validating run configuration and curve inputs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("AOV must be finite and positive, got {0}")]
    NonPositiveAov(f64),

    #[error("base conversion rate must be in (0, 1), got {0}")]
    BaseRateOutOfRange(f64),

    #[error("ROI baseline must be finite and positive, got {0}")]
    NonPositiveRoiBaseline(f64),

    #[error("{name} volatility must be in [0, 1], got {value}")]
    VolatilityOutOfRange { name: &'static str, value: f64 },

    #[error("calibration error must be in [0, 1], got {0}")]
    CalibrationOutOfRange(f64),

    #[error("max clicks per hour must be finite and positive, got {0}")]
    NonPositiveClickCapacity(f64),

    #[error("ROI target must be finite and positive, got {0}")]
    NonPositiveRoiTarget(f64),

    #[error("budget must not be negative, got {0}")]
    NegativeBudget(f64),

    #[error("stop-loss ROI must be finite and positive, got {0}")]
    NonPositiveStopLoss(f64),

    #[error("delivered-ROI seed must be finite and positive, got {0}")]
    NonPositiveDeliveredSeed(f64),

    #[error("horizon must be at least one day")]
    ZeroHorizon,

    #[error("rolling window size must be finite and positive, got {0}")]
    NonPositiveWindow(f64),

    #[error("attainment curve bids must be strictly increasing")]
    AttainmentBidsNotIncreasing,

    #[error("attainment curve values are invalid")]
    AttainmentValuesInvalid,

    #[error("time-of-day curve has wrong length: {0}")]
    TimeOfDayCurveLength(usize),

    #[error("time-of-day curve values must be positive")]
    TimeOfDayCurveNotPositive,

    #[error("ideal utilization curve has wrong length: expected {expected}, got {got}")]
    IdealCurveLength { expected: usize, got: usize },

    #[error("ideal utilization curve must be monotonic and end at 1.0")]
    IdealCurveShape,

    #[error("controller gain must be finite, got {0}")]
    NonFiniteGain(f64),

    #[error("controller update cadence must be finite and positive, got {0}")]
    NonPositiveCadence(f64),

    #[error("max step fraction must be in (0, 1], got {0}")]
    StepFractionOutOfRange(f64),
}
