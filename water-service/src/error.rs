use time::Date;
use water_client::{domain::UserId, StoreError};

/// Errors produced by the engine and the cost analyzer.
///
/// Everything except `Store` is a deterministic, user-correctable input error.
#[derive(thiserror::Error, Debug)]
pub enum TrackerError {
    #[error("Reading for date {0} already exists.")]
    DuplicateDate(Date),

    #[error("Reading date {0} is in the future.")]
    FutureDate(Date),

    #[error("New reading value {value} is less than previous reading {previous}.")]
    NonMonotonic { value: f64, previous: f64 },

    #[error("New reading value {value} is greater than the subsequent reading {next}.")]
    InvertedOrder { value: f64, next: f64 },

    #[error("Meter value must be a non-negative number, got {0}.")]
    InvalidValue(f64),

    #[error("Cost cannot be negative, got {0}.")]
    InvalidCost(f64),

    #[error("User {0} does not exist.")]
    UnknownOwner(UserId),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl TrackerError {
    /// Stable label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            TrackerError::DuplicateDate(_) => "duplicate_date",
            TrackerError::FutureDate(_) => "future_date",
            TrackerError::NonMonotonic { .. } => "non_monotonic",
            TrackerError::InvertedOrder { .. } => "inverted_order",
            TrackerError::InvalidValue(_) => "invalid_value",
            TrackerError::InvalidCost(_) => "invalid_cost",
            TrackerError::UnknownOwner(_) => "unknown_owner",
            TrackerError::Store(_) => "store",
        }
    }

    pub fn is_input_error(&self) -> bool {
        !matches!(self, TrackerError::Store(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn error_display_names_the_date() {
        let err = TrackerError::DuplicateDate(date!(2024-01-08));
        assert_eq!(err.to_string(), "Reading for date 2024-01-08 already exists.");
    }

    #[test]
    fn only_store_errors_are_internal() {
        assert!(TrackerError::FutureDate(date!(2030-01-01)).is_input_error());
        assert!(TrackerError::InvalidCost(-1.0).is_input_error());
        assert!(TrackerError::UnknownOwner(7).is_input_error());
        assert!(!TrackerError::Store(StoreError::UniqueViolation("x".into())).is_input_error());
    }
}
