//! Instants at which lunar days begin.
//!
//! A lunar day is named by the civil date its daylight falls on. With a
//! morning start it begins at dawn of that date; with an evening start it
//! begins at dusk of the date before.

use tracing::warn;

use super::Resolver;
use crate::config::DayStartTime;
use crate::date::Date;
use crate::ephemeris::{Body, Direction, Ephemeris};
use crate::error::{CalendarError, Result};
use crate::time_scales::Timestamp;

/// Search window for a single day boundary.
const DAY_WINDOW: f64 = 1.0;
/// A month's first day is found within this many days of its event.
const FIRST_DAY_SEARCH: i32 = 4;

/// Start of a lunar day.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DayStart {
    pub at: Timestamp,
    /// No sun crossing was found; `at` is the fixed local clock hour.
    pub clock_fallback: bool,
}

/// First day of a month, with the start of the day before it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FirstDay {
    pub date: Date,
    pub start: DayStart,
    pub previous: Timestamp,
}

impl<E: Ephemeris + ?Sized> Resolver<'_, E> {
    /// Searches the start of the lunar day whose daylight falls on `date`.
    ///
    /// Fails with [`CalendarError::NoQualifyingEvent`] when the sun does not
    /// reach the configured altitude within a day, as happens near the poles.
    pub fn search_day_start(&self, date: Date) -> Result<Timestamp> {
        let lon = self.location.longitude;
        let (from, direction) = match self.config.day_start_time {
            DayStartTime::Morning => (Timestamp::local_midnight(date, lon), Direction::Rise),
            DayStartTime::Evening => (Timestamp::local_noon(date - 1, lon), Direction::Set),
        };
        let angle = self.config.day_start_angle;
        let found = if angle == 0.0 {
            self.ephemeris
                .search_rise_set(Body::Sun, &self.location, direction, from, DAY_WINDOW)
        } else {
            self.ephemeris.search_altitude(
                Body::Sun,
                &self.location,
                direction,
                from,
                DAY_WINDOW,
                -angle,
            )
        };
        found.ok_or(CalendarError::NoQualifyingEvent {
            search: "day start",
            from,
            limit_days: DAY_WINDOW,
        })
    }

    /// Start of the lunar day whose daylight falls on `date`, falling back to
    /// a fixed local clock hour when the sun gives none.
    pub fn day_start(&self, date: Date) -> DayStart {
        match self.search_day_start(date) {
            Ok(at) => DayStart {
                at,
                clock_fallback: false,
            },
            Err(err) => {
                let time = self.config.day_start_time;
                let hour = self.settings.fallback_hour(time);
                let clock_date = match time {
                    DayStartTime::Morning => date,
                    DayStartTime::Evening => date - 1,
                };
                warn!(%date, %err, hour, "no day boundary, using local clock hour");
                DayStart {
                    at: Timestamp::local_time(clock_date, self.location.longitude, hour),
                    clock_fallback: true,
                }
            }
        }
    }

    /// First lunar day starting at or after `event`.
    pub fn first_day_at_or_after(&self, event: Timestamp) -> FirstDay {
        let earliest = event.local_date(self.location.longitude) - 1;
        let mut date = earliest;
        let mut start = self.day_start(date);
        let mut previous = None;
        while start.at < event && date - earliest < FIRST_DAY_SEARCH {
            previous = Some(start.at);
            date = date + 1;
            start = self.day_start(date);
        }
        let previous = previous.unwrap_or_else(|| self.day_start(date - 1).at);
        FirstDay {
            date,
            start,
            previous,
        }
    }
}
