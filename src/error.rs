//! Error types for the lunkalendaro crate.

use crate::time_scales::Timestamp;

/// Error type for all fallible operations in the lunkalendaro crate.
///
/// Fallbacks that keep a calendar buildable (crescent, day boundary,
/// Virgo-Feet) never surface here; they are flagged on the result instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalendarError {
    /// The ephemeris returned nothing for a query that must always succeed.
    #[error("ephemeris unavailable: {query} at JD {}", .at.0)]
    EphemerisUnavailable {
        /// What was asked for.
        query: &'static str,
        /// When it was asked for.
        at: Timestamp,
    },

    /// A bounded search exhausted its window.
    #[error("no {search} within {limit_days} days of JD {}", .from.0)]
    NoQualifyingEvent {
        /// Which search ran dry.
        search: &'static str,
        /// Start of the search window.
        from: Timestamp,
        /// Length of the search window in days.
        limit_days: f64,
    },

    /// The spring equinox could not be found; no year can be anchored.
    #[error("no spring equinox for year {year} within {limit_days} days of JD {}", .from.0)]
    EquinoxNotFound {
        /// Civil year whose equinox was searched (astronomical numbering).
        year: i32,
        /// Start of the search window.
        from: Timestamp,
        /// Length of the search window in days.
        limit_days: f64,
    },

    /// A month start could not be found while building a year.
    #[error("cannot find the start of month {month} of year {year}")]
    MonthStartSearchExhausted {
        /// Year being built (astronomical numbering).
        year: i32,
        /// Month whose start was searched.
        month: usize,
    },

    /// A lookup fell outside the built year(s).
    #[error("{position} is outside lunar year {year}")]
    OutOfRangeLookup {
        /// Year that was searched (astronomical numbering).
        year: i32,
        /// Description of what was looked up.
        position: String,
    },

    /// Returned when a configuration or setting is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl CalendarError {
    /// `true` for errors the caller can work around (a different window, the
    /// adjacent year), `false` for errors that make a calendar unbuildable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NoQualifyingEvent { .. } | Self::OutOfRangeLookup { .. }
        )
    }
}

/// Result alias for the crate.
pub type Result<T> = std::result::Result<T, CalendarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        let err = CalendarError::NoQualifyingEvent {
            search: "full moon",
            from: Timestamp(2460676.5),
            limit_days: 35.0,
        };
        assert_eq!("no full moon within 35 days of JD 2460676.5", err.to_string());
        assert!(err.is_recoverable());

        let err = CalendarError::EquinoxNotFound {
            year: 2025,
            from: Timestamp(2460676.5),
            limit_days: 120.0,
        };
        assert_eq!(
            "no spring equinox for year 2025 within 120 days of JD 2460676.5",
            err.to_string()
        );
        assert!(!err.is_recoverable());

        let err = CalendarError::EphemerisUnavailable {
            query: "moon equatorial coordinates",
            at: Timestamp(2451545.0),
        };
        assert_eq!(
            "ephemeris unavailable: moon equatorial coordinates at JD 2451545",
            err.to_string()
        );
        assert!(!err.is_recoverable());

        let err = CalendarError::OutOfRangeLookup {
            year: 2025,
            position: "2024-01-01".into(),
        };
        assert_eq!("2024-01-01 is outside lunar year 2025", err.to_string());
    }
}
