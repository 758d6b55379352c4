use crate::domain::period::PayPeriod;
use crate::error::WatchError;
use serde::{Deserialize, Serialize};

/// Rate used when no wage has been configured yet (a persisted 0 means unset).
pub const DEFAULT_WAGE: f64 = 7.25;

/// A configured wage rate, denominated in currency units per one pay period.
///
/// This is a wrapper around `f64` to enforce domain-specific rules: the rate
/// must be finite and strictly positive, so downstream tick-interval and
/// secondly-rate derivations can never divide by zero.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Wage(f64);

impl Wage {
    pub fn new(value: f64) -> Result<Self, WatchError> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(WatchError::Validation(
                "Wage must be finite and positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Currency units earned per elapsed second at this rate.
    pub fn per_second(&self, period: PayPeriod) -> f64 {
        self.0 / period.seconds()
    }
}

impl TryFrom<f64> for Wage {
    type Error = WatchError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl Default for Wage {
    fn default() -> Self {
        Self(DEFAULT_WAGE)
    }
}

impl From<Wage> for f64 {
    fn from(wage: Wage) -> Self {
        wage.0
    }
}
