//! Input validation applied before rows are written.

use thiserror::Error;

/// Smallest accepted retention window (one hour).
pub const MIN_RETENTION_HOURS: i64 = 1;
/// Largest accepted retention window (one year).
pub const MAX_RETENTION_HOURS: i64 = 8760;

/// Validation failures for caller-supplied values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
        value: i64,
    },

    #[error("invalid time {0:?}, expected HH:MM")]
    InvalidTime(String),

    #[error("invalid day of week {0}, expected 0 (Monday) through 6 (Sunday)")]
    InvalidDayOfWeek(i64),

    #[error("weekly schedules require a day of week")]
    MissingDayOfWeek,

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Check a retention window in hours.
pub fn validate_retention_hours(hours: i64) -> Result<(), ValidationError> {
    if !(MIN_RETENTION_HOURS..=MAX_RETENTION_HOURS).contains(&hours) {
        return Err(ValidationError::OutOfRange {
            field: "retention_hours",
            min: MIN_RETENTION_HOURS,
            max: MAX_RETENTION_HOURS,
            value: hours,
        });
    }
    Ok(())
}

/// Check a summary lookback window in hours.
pub fn validate_period_hours(hours: i64) -> Result<(), ValidationError> {
    if !(MIN_RETENTION_HOURS..=MAX_RETENTION_HOURS).contains(&hours) {
        return Err(ValidationError::OutOfRange {
            field: "summary_period_hours",
            min: MIN_RETENTION_HOURS,
            max: MAX_RETENTION_HOURS,
            value: hours,
        });
    }
    Ok(())
}

/// Parse a wall-clock time of the form "HH:MM" into (hour, minute).
pub fn parse_schedule_time(time: &str) -> Result<(u32, u32), ValidationError> {
    let invalid = || ValidationError::InvalidTime(time.to_string());

    let (h, m) = time.split_once(':').ok_or_else(invalid)?;
    let hour: u32 = h.parse().map_err(|_| invalid())?;
    let minute: u32 = m.parse().map_err(|_| invalid())?;
    if hour > 23 || minute > 59 {
        return Err(invalid());
    }
    Ok((hour, minute))
}

/// Check a weekly day-of-week value (0 = Monday .. 6 = Sunday).
pub fn validate_day_of_week(day: i64) -> Result<(), ValidationError> {
    if !(0..=6).contains(&day) {
        return Err(ValidationError::InvalidDayOfWeek(day));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retention_bounds() {
        assert!(validate_retention_hours(1).is_ok());
        assert!(validate_retention_hours(8760).is_ok());
        assert!(validate_retention_hours(0).is_err());
        assert!(validate_retention_hours(8761).is_err());
        assert!(validate_retention_hours(-5).is_err());
    }

    #[test]
    fn schedule_time_parsing() {
        assert_eq!(parse_schedule_time("09:30").unwrap(), (9, 30));
        assert_eq!(parse_schedule_time("0:05").unwrap(), (0, 5));
        assert_eq!(parse_schedule_time("23:59").unwrap(), (23, 59));
        assert!(parse_schedule_time("24:00").is_err());
        assert!(parse_schedule_time("12:60").is_err());
        assert!(parse_schedule_time("noon").is_err());
        assert!(parse_schedule_time("12").is_err());
    }

    #[test]
    fn day_of_week_bounds() {
        assert!(validate_day_of_week(0).is_ok());
        assert!(validate_day_of_week(6).is_ok());
        assert!(validate_day_of_week(7).is_err());
        assert!(validate_day_of_week(-1).is_err());
    }
}
