//! Relative duration strings such as `7d` or `30m`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    #[error("invalid duration '{0}': expected <number><s|m|h|d>, e.g. 7d")]
    Malformed(String),
    #[error("duration '{0}' is too large")]
    Overflow(String),
}

/// Parse `<n>s`, `<n>m`, `<n>h`, or `<n>d` into milliseconds.
pub fn parse_duration_millis(value: &str) -> Result<i64, DurationError> {
    let value = value.trim();
    let malformed = || DurationError::Malformed(value.to_string());
    let split = value
        .char_indices()
        .last()
        .map(|(index, _)| index)
        .ok_or_else(malformed)?;
    let (amount, unit) = value.split_at(split);
    let amount: i64 = amount.parse().map_err(|_| malformed())?;
    if amount < 0 {
        return Err(malformed());
    }
    let unit_millis: i64 = match unit {
        "s" => 1_000,
        "m" => 60 * 1_000,
        "h" => 60 * 60 * 1_000,
        "d" => 24 * 60 * 60 * 1_000,
        _ => return Err(malformed()),
    };
    amount
        .checked_mul(unit_millis)
        .ok_or_else(|| DurationError::Overflow(value.to_string()))
}
