//! Exponential importance decay.

use crate::model::{MILLIS_PER_DAY, MemoryRecord};

/// Decay and pruning parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayPolicy {
    /// Exponential rate per day.
    pub rate: f64,
    /// Decayed importance never goes below this.
    pub floor: f64,
    /// Records below this importance are prune candidates.
    pub prune_below: f64,
    /// Prune candidates must also be older than this many days.
    pub prune_after_days: i64,
}

impl Default for DecayPolicy {
    fn default() -> Self {
        Self {
            rate: 0.05,
            floor: 0.05,
            prune_below: 0.1,
            prune_after_days: 365,
        }
    }
}

/// Importance of `record` aged from its last access to `now` (epoch millis).
///
/// `max(floor, importance * exp(-rate * age_days))`, with age clamped at zero.
pub fn decayed_importance(record: &MemoryRecord, now: i64, policy: &DecayPolicy) -> f64 {
    let age_millis = now.saturating_sub(record.last_accessed).max(0);
    let age_days = age_millis as f64 / MILLIS_PER_DAY as f64;
    let decayed = record.importance * (-policy.rate * age_days).exp();
    decayed.max(policy.floor)
}
