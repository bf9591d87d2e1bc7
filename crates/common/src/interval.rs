//! Polling interval validation shared by the panel and the server.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntervalError {
    #[error("Interval is empty")]
    Empty,
    #[error("Interval must be a whole number, got '{0}'")]
    NotANumber(String),
    #[error("Interval must be greater than zero, got {0}")]
    NotPositive(i64),
    #[error("Interval is too large: {0}")]
    TooLarge(i64),
}

/// Parses the raw text of an interval cell into seconds.
///
/// Surrounding whitespace is ignored. Anything that is not an integer, or is
/// not strictly positive, is rejected.
pub fn parse_interval(raw: &str) -> Result<u32, IntervalError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(IntervalError::Empty);
    }

    let value: i64 = trimmed
        .parse()
        .map_err(|_| IntervalError::NotANumber(trimmed.to_string()))?;

    if value <= 0 {
        return Err(IntervalError::NotPositive(value));
    }
    u32::try_from(value).map_err(|_| IntervalError::TooLarge(value))
}

/// Checks an interval that already arrived as a number (e.g. in a JSON body).
pub fn validate_interval(value: u32) -> Result<u32, IntervalError> {
    if value == 0 {
        return Err(IntervalError::NotPositive(0));
    }
    Ok(value)
}
