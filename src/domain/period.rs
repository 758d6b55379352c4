use serde::{Deserialize, Serialize};
use std::fmt;

/// The time unit a wage rate is denominated against.
///
/// The set is fixed: four variants with fixed real-valued durations. A month
/// is the mean Gregorian month (30.436875 days) and a year is the mean
/// Gregorian year (365.25 days), matching the durations the persisted index
/// has always referred to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayPeriod {
    Hour,
    Day,
    Month,
    Year,
}

impl PayPeriod {
    pub const ALL: [PayPeriod; 4] = [
        PayPeriod::Hour,
        PayPeriod::Day,
        PayPeriod::Month,
        PayPeriod::Year,
    ];

    /// Duration of one period in seconds.
    pub fn seconds(&self) -> f64 {
        match self {
            PayPeriod::Hour => 3_600.0,
            PayPeriod::Day => 86_400.0,
            PayPeriod::Month => 2_629_800.0,
            PayPeriod::Year => 31_557_600.0,
        }
    }

    /// Position in the persisted index encoding.
    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|p| p == self).unwrap_or(0)
    }

    /// Decodes a persisted index, falling back to `Hour` for anything
    /// out of range (corrupt values are treated as absent).
    pub fn from_index(index: usize) -> Self {
        Self::ALL.get(index).copied().unwrap_or(PayPeriod::Hour)
    }
}

impl Default for PayPeriod {
    fn default() -> Self {
        PayPeriod::Hour
    }
}

impl fmt::Display for PayPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PayPeriod::Hour => "per hour",
            PayPeriod::Day => "per day",
            PayPeriod::Month => "per month",
            PayPeriod::Year => "per year",
        };
        write!(f, "{label}")
    }
}
