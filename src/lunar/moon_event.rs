//! Events that start months.

use tracing::{debug, warn};

use super::Resolver;
use crate::config::{DayStartTime, MonthStartEvent};
use crate::ephemeris::{Body, Direction, Ephemeris, MoonPhase};
use crate::error::{CalendarError, Result};
use crate::time_scales::Timestamp;

/// Offset past an event from which the following event is searched.
const HALF_MONTH: f64 = 15.0;
/// Offset before an event from which the preceding event is searched.
const MONTH_AND_A_HALF: f64 = 45.0;

/// A located month start event.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MoonEvent {
    pub at: Timestamp,
    /// No crescent was seen in time; `at` is the conjunction.
    pub fallback: bool,
}

impl<E: Ephemeris + ?Sized> Resolver<'_, E> {
    pub(crate) fn search_phase(&self, phase: MoonPhase, from: Timestamp) -> Result<Timestamp> {
        let limit_days = self.settings.synodic_window_days();
        self.ephemeris
            .search_moon_phase(phase, from, limit_days)
            .ok_or(CalendarError::NoQualifyingEvent {
                search: match phase {
                    MoonPhase::New => "new moon",
                    MoonPhase::Full => "full moon",
                },
                from,
                limit_days,
            })
    }

    /// Next configured month start event after `from`.
    pub fn next_moon_event(&self, from: Timestamp) -> Result<MoonEvent> {
        let phase = match self.config.month_start_event {
            MonthStartEvent::Dark | MonthStartEvent::Crescent => MoonPhase::New,
            MonthStartEvent::Full => MoonPhase::Full,
        };
        let at = self.search_phase(phase, from)?;
        if self.config.month_start_event != MonthStartEvent::Crescent {
            return Ok(MoonEvent {
                at,
                fallback: false,
            });
        }
        match self.first_crescent(at)? {
            Some(evening) => Ok(MoonEvent {
                at: evening,
                fallback: false,
            }),
            None => {
                warn!(
                    conjunction = at.0,
                    days = self.settings.crescent_max_days(),
                    "crescent not visible, month starts at conjunction"
                );
                Ok(MoonEvent { at, fallback: true })
            }
        }
    }

    /// First sunset after `conjunction` at which the moon stands at least the
    /// visibility threshold away from the sun.
    fn first_crescent(&self, conjunction: Timestamp) -> Result<Option<Timestamp>> {
        let lon = self.location.longitude;
        let max_days = self.settings.crescent_max_days();
        let first = conjunction.local_date(lon);
        for offset in 0..=max_days as i32 {
            let date = first + offset;
            let from = Timestamp::local_noon(date, lon);
            let sunset = self
                .ephemeris
                .search_rise_set(Body::Sun, &self.location, Direction::Set, from, 1.0)
                .unwrap_or_else(|| {
                    Timestamp::local_time(date, lon, self.settings.fallback_hour(DayStartTime::Evening))
                });
            if sunset <= conjunction {
                continue;
            }
            if sunset - conjunction > max_days as f64 {
                break;
            }
            let separation = self.sun_moon_separation(sunset)?;
            debug!(evening = %date, separation, "crescent check");
            if separation >= self.config.crescent_visibility_threshold {
                return Ok(Some(sunset));
            }
        }
        Ok(None)
    }

    fn sun_moon_separation(&self, at: Timestamp) -> Result<f64> {
        let moon = self
            .ephemeris
            .equatorial(Body::Moon, at, &self.location)
            .ok_or(CalendarError::EphemerisUnavailable {
                query: "moon equatorial coordinates",
                at,
            })?;
        let sun = self
            .ephemeris
            .equatorial(Body::Sun, at, &self.location)
            .ok_or(CalendarError::EphemerisUnavailable {
                query: "sun equatorial coordinates",
                at,
            })?;
        Ok(moon.separation(&sun))
    }

    /// The event following `event`.
    pub fn following_moon_event(&self, event: MoonEvent) -> Result<MoonEvent> {
        self.next_moon_event(event.at + HALF_MONTH)
    }

    /// The event preceding `event`.
    pub fn preceding_moon_event(&self, event: MoonEvent) -> Result<MoonEvent> {
        self.next_moon_event(event.at - MONTH_AND_A_HALF)
    }

    /// First event at or after `t`.
    ///
    /// A crescent seen after `t` counts even when its conjunction came
    /// before `t`.
    pub fn first_moon_event_at_or_after(&self, t: Timestamp) -> Result<MoonEvent> {
        let lookback = match self.config.month_start_event {
            MonthStartEvent::Crescent => self.settings.crescent_max_days() as f64 + 1.0,
            _ => 0.0,
        };
        let mut event = self.next_moon_event(t - lookback)?;
        while event.at < t {
            event = self.following_moon_event(event)?;
        }
        Ok(event)
    }
}
