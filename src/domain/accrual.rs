use crate::error::{Result, WatchError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Smallest displayed currency increment; each tick advances the published
/// value by roughly this much.
pub const DISPLAY_INCREMENT: f64 = 0.01;

/// Lower clamp on the tick cadence, so very high wage rates cannot request a
/// pathological timer interval.
pub const MIN_TICK: Duration = Duration::from_millis(50);

/// Upper clamp, so very low wage rates still republish at least once a second.
pub const MAX_TICK: Duration = Duration::from_secs(1);

/// The accrual state machine.
///
/// `Idle --start--> Running`, `Running --stop--> Idle`, and
/// `Idle --reset--> Idle` (only when something has been banked). No other
/// transitions exist. The invariant is structural: a start timestamp exists
/// iff the state is Running, and `accumulated` never decreases except via
/// `reset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "state")]
pub enum AccrualState {
    Idle {
        accumulated: f64,
    },
    Running {
        accumulated: f64,
        started_at: DateTime<Utc>,
    },
}

impl Default for AccrualState {
    fn default() -> Self {
        AccrualState::Idle { accumulated: 0.0 }
    }
}

impl AccrualState {
    /// Reconstructs the state from persisted scalars: a present start
    /// timestamp means the engine was running when the process last exited.
    pub fn from_persisted(accumulated: f64, started_at: Option<DateTime<Utc>>) -> Self {
        match started_at {
            Some(started_at) => AccrualState::Running {
                accumulated,
                started_at,
            },
            None => AccrualState::Idle { accumulated },
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, AccrualState::Running { .. })
    }

    /// The amount banked before the current run (or simply the banked amount
    /// while idle).
    pub fn accumulated(&self) -> f64 {
        match self {
            AccrualState::Idle { accumulated } => *accumulated,
            AccrualState::Running { accumulated, .. } => *accumulated,
        }
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        match self {
            AccrualState::Idle { .. } => None,
            AccrualState::Running { started_at, .. } => Some(*started_at),
        }
    }

    /// The currently displayed total: the banked amount plus, while running,
    /// the time-proportional accrual since the last start.
    pub fn derived_earnings(&self, rate_per_second: f64, now: DateTime<Utc>) -> f64 {
        match self {
            AccrualState::Idle { accumulated } => *accumulated,
            AccrualState::Running {
                accumulated,
                started_at,
            } => accumulated + elapsed_seconds(*started_at, now) * rate_per_second,
        }
    }

    /// Transitions to Running, stamping the start of the run.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<()> {
        match self {
            AccrualState::Idle { accumulated } => {
                *self = AccrualState::Running {
                    accumulated: *accumulated,
                    started_at: now,
                };
                Ok(())
            }
            AccrualState::Running { .. } => Err(WatchError::Transition(
                "already running".to_string(),
            )),
        }
    }

    /// Folds the elapsed accrual into the banked amount and transitions to
    /// Idle. Returns the new banked amount.
    pub fn stop(&mut self, rate_per_second: f64, now: DateTime<Utc>) -> Result<f64> {
        match self {
            AccrualState::Running { .. } => {
                let banked = self.derived_earnings(rate_per_second, now);
                *self = AccrualState::Idle {
                    accumulated: banked,
                };
                Ok(banked)
            }
            AccrualState::Idle { .. } => {
                Err(WatchError::Transition("not running".to_string()))
            }
        }
    }

    /// Folds the accrual earned so far into the banked amount and restamps
    /// the run at `now`, so a subsequent rate change never reprices the
    /// completed segment. No-op while idle. Returns the new banked amount
    /// when running.
    pub fn rebase(&mut self, rate_per_second: f64, now: DateTime<Utc>) -> Option<f64> {
        match self {
            AccrualState::Running { .. } => {
                let banked = self.derived_earnings(rate_per_second, now);
                *self = AccrualState::Running {
                    accumulated: banked,
                    started_at: now,
                };
                Some(banked)
            }
            AccrualState::Idle { .. } => None,
        }
    }

    /// Zeroes the banked amount. Only permitted while idle with a positive
    /// balance; the running state has no reset edge.
    pub fn reset(&mut self) -> Result<()> {
        match self {
            AccrualState::Idle { accumulated } if *accumulated > 0.0 => {
                *accumulated = 0.0;
                Ok(())
            }
            AccrualState::Idle { .. } => Err(WatchError::Transition(
                "nothing accumulated".to_string(),
            )),
            AccrualState::Running { .. } => Err(WatchError::Transition(
                "cannot reset while running".to_string(),
            )),
        }
    }
}

/// Seconds elapsed since `started_at`, clamped at zero so a start timestamp
/// slightly in the future (clock adjustment) can never shrink earnings.
pub fn elapsed_seconds(started_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let millis = now.signed_duration_since(started_at).num_milliseconds();
    (millis.max(0) as f64) / 1_000.0
}

/// Cadence of the recomputation timer: the time it takes to earn one display
/// increment, clamped into `[MIN_TICK, MAX_TICK]`.
pub fn tick_interval(rate_per_second: f64) -> Duration {
    if !rate_per_second.is_finite() || rate_per_second <= 0.0 {
        return MAX_TICK;
    }
    let seconds = (DISPLAY_INCREMENT / rate_per_second)
        .clamp(MIN_TICK.as_secs_f64(), MAX_TICK.as_secs_f64());
    Duration::from_secs_f64(seconds)
}
