//! Which month-start event opens a year.
//!
//! All three rules anchor on the spring equinox of the civil year:
//!
//! - [`YearStartRule::Equinox`]: the first event at or after the equinox.
//! - [`YearStartRule::PassoverAfterEquinox`]: the earliest event whose month
//!   has its 15th day on or after the equinox date, so the year may open up
//!   to two weeks before the equinox.
//! - [`YearStartRule::VirgoFeet`]: the first full moon seen past Spica in
//!   right ascension, tried for a bounded number of months.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::uncertainty::{self, Uncertainty};
use super::{MoonEvent, Resolver};
use crate::config::{MonthStartEvent, YearStartRule};
use crate::date::Date;
use crate::ephemeris::{Body, Ephemeris, MoonPhase};
use crate::error::{CalendarError, Result};
use crate::time_scales::Timestamp;

/// Right ascension of Spica at J2000.0, in degrees.
pub const SPICA_RA_J2000: f64 = 201.298;
/// Yearly increase of Spica's right ascension from precession, in degrees.
pub const SPICA_RA_PER_YEAR: f64 = 0.0139;

/// Days searched for the equinox from January 1.
const EQUINOX_WINDOW: f64 = 120.0;
/// Lunar day 15 is this many days after day 1.
const PASSOVER_OFFSET: i32 = 14;
/// Full moons searched for Virgo-Feet start this long before the equinox.
const VIRGO_LOOKBACK: f64 = 30.0;
/// A month's opening event precedes its full moon by less than this.
const FULL_MOON_LEAD: f64 = 20.0;
/// Mean motion of the moon in right ascension, degrees per hour.
const MOON_RA_PER_HOUR: f64 = 0.549;

/// Spica's right ascension in `year`, in degrees.
///
/// # Example
///
/// ```
/// use lunkalendaro::lunar::year_start::spica_right_ascension;
///
/// assert_eq!(201.298, spica_right_ascension(2000));
/// assert!((spica_right_ascension(1535) - 194.8345).abs() < 1e-9);
/// ```
pub fn spica_right_ascension(year: i32) -> f64 {
    SPICA_RA_J2000 + (year - 2000) as f64 * SPICA_RA_PER_YEAR
}

/// One full moon tried by the Virgo-Feet search.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirgoSearchAttempt {
    pub full_moon: Timestamp,
    pub moon_right_ascension: f64,
    pub spica_right_ascension: f64,
    /// Moon minus Spica, degrees.
    pub difference: f64,
    pub qualifies: bool,
}

/// Outcome of a Virgo-Feet search, with every attempt made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirgoSearch {
    pub year: i32,
    /// The qualifying full moon, or with `fallback_used` the full moon
    /// nearest the equinox.
    pub full_moon: Timestamp,
    pub attempts: Vec<VirgoSearchAttempt>,
    pub fallback_used: bool,
}

impl VirgoSearch {
    /// The attempt that qualified, if any.
    pub fn qualifying(&self) -> Option<&VirgoSearchAttempt> {
        self.attempts.iter().find(|a| a.qualifies)
    }
}

/// Resolved start of a year.
#[derive(Debug, Clone, PartialEq)]
pub struct YearStart {
    pub year: i32,
    pub equinox: Timestamp,
    /// Event opening month 1.
    pub event: MoonEvent,
    /// Set under [`YearStartRule::VirgoFeet`].
    pub virgo: Option<VirgoSearch>,
    /// Chance that the year really opens a month earlier or later.
    pub uncertainty: Option<Uncertainty>,
}

impl<E: Ephemeris + ?Sized> Resolver<'_, E> {
    /// The spring equinox of civil `year`.
    ///
    /// No fallback exists; [`CalendarError::EquinoxNotFound`] makes the year
    /// unbuildable.
    pub fn spring_equinox(&self, year: i32) -> Result<Timestamp> {
        let from = Timestamp::start_of(Date::new_year(year));
        self.ephemeris
            .search_equinox(from, EQUINOX_WINDOW)
            .ok_or(CalendarError::EquinoxNotFound {
                year,
                from,
                limit_days: EQUINOX_WINDOW,
            })
    }

    /// Resolves the start of `year` under the configured rule.
    pub fn year_start(&self, year: i32) -> Result<YearStart> {
        let equinox = self.spring_equinox(year)?;
        self.year_start_with(year, equinox, None)
    }

    /// Like [`year_start`](Self::year_start) with the equinox already known,
    /// reusing `virgo` if given.
    pub fn year_start_with(
        &self,
        year: i32,
        equinox: Timestamp,
        virgo: Option<VirgoSearch>,
    ) -> Result<YearStart> {
        let start = match self.config.year_start_rule {
            YearStartRule::Equinox => self.equinox_start(year, equinox)?,
            YearStartRule::PassoverAfterEquinox => self.passover_start(year, equinox)?,
            YearStartRule::VirgoFeet => {
                let search = match virgo {
                    Some(search) => search,
                    None => self.virgo_search(year, equinox)?,
                };
                self.virgo_start(year, equinox, search)?
            }
        };
        debug!(year, start = start.event.at.0, "year start resolved");
        Ok(start)
    }

    fn margin_hours(&self, at: Timestamp) -> f64 {
        self.settings.uncertainty().margin_hours(at.decimal_year())
    }

    fn equinox_start(&self, year: i32, equinox: Timestamp) -> Result<YearStart> {
        let event = self.first_moon_event_at_or_after(equinox)?;
        let previous = self.preceding_moon_event(event)?;
        let margin = self.margin_hours(equinox);
        Ok(YearStart {
            year,
            equinox,
            event,
            virgo: None,
            uncertainty: uncertainty::estimate(
                equinox.0,
                margin / 24.0,
                previous.at.0,
                event.at.0,
                margin,
            ),
        })
    }

    fn passover_date(&self, event: MoonEvent) -> Date {
        self.first_day_at_or_after(event.at).date + PASSOVER_OFFSET
    }

    fn passover_start(&self, year: i32, equinox: Timestamp) -> Result<YearStart> {
        let lon = self.location.longitude;
        let equinox_date = equinox.local_date(lon);
        let candidate = self.first_moon_event_at_or_after(equinox)?;
        let previous = self.preceding_moon_event(candidate)?;
        let (event, rejected) = if self.passover_date(previous) >= equinox_date {
            (previous, self.preceding_moon_event(previous)?)
        } else {
            (candidate, previous)
        };
        // The chosen month stays compliant while the equinox date is no later
        // than its day 15; the rejected one becomes compliant once the
        // equinox date is no later than its own day 15.
        let later = Timestamp::local_midnight(self.passover_date(event) + 1, lon);
        let earlier = Timestamp::local_midnight(self.passover_date(rejected) + 1, lon);
        let margin = self.margin_hours(equinox);
        Ok(YearStart {
            year,
            equinox,
            event,
            virgo: None,
            uncertainty: uncertainty::estimate(
                equinox.0,
                margin / 24.0,
                earlier.0,
                later.0,
                margin,
            ),
        })
    }

    fn virgo_start(&self, year: i32, equinox: Timestamp, search: VirgoSearch) -> Result<YearStart> {
        let event = match self.config.month_start_event {
            MonthStartEvent::Full => MoonEvent {
                at: search.full_moon,
                fallback: false,
            },
            _ => self.first_moon_event_at_or_after(search.full_moon - FULL_MOON_LEAD)?,
        };
        let uncertainty = search
            .attempts
            .iter()
            .position(|a| a.qualifies)
            .and_then(|idx| {
                let chosen = &search.attempts[idx];
                let margin = self.margin_hours(chosen.full_moon);
                let earlier = match idx {
                    0 => f64::NEG_INFINITY,
                    _ => search.attempts[idx - 1].difference,
                };
                uncertainty::estimate(
                    0.0,
                    margin * MOON_RA_PER_HOUR,
                    earlier,
                    chosen.difference,
                    margin,
                )
            });
        Ok(YearStart {
            year,
            equinox,
            event,
            virgo: Some(search),
            uncertainty,
        })
    }

    /// Searches the Virgo-Feet full moon of `year`.
    ///
    /// Starting with the first full moon less than a month before the
    /// equinox, tries successive full moons until the moon's right ascension
    /// exceeds Spica's. If none does, the full moon nearest the equinox is
    /// returned with `fallback_used` set.
    #[instrument(skip(self, equinox), fields(lat = self.location.latitude, lon = self.location.longitude))]
    pub fn virgo_search(&self, year: i32, equinox: Timestamp) -> Result<VirgoSearch> {
        let spica = spica_right_ascension(year);
        let max_attempts = self.settings.virgo_max_attempts();
        let mut attempts = Vec::with_capacity(max_attempts);
        let mut from = equinox - VIRGO_LOOKBACK;
        for _ in 0..max_attempts {
            let full_moon = self.search_phase(MoonPhase::Full, from)?;
            let moon = self
                .ephemeris
                .equatorial(Body::Moon, full_moon, &self.location)
                .ok_or(CalendarError::EphemerisUnavailable {
                    query: "moon equatorial coordinates",
                    at: full_moon,
                })?;
            let difference = moon.right_ascension - spica;
            let attempt = VirgoSearchAttempt {
                full_moon,
                moon_right_ascension: moon.right_ascension,
                spica_right_ascension: spica,
                difference,
                qualifies: difference > 0.0,
            };
            debug!(full_moon = full_moon.0, moon_ra = moon.right_ascension, difference, "virgo attempt");
            attempts.push(attempt);
            if attempt.qualifies {
                return Ok(VirgoSearch {
                    year,
                    full_moon,
                    attempts,
                    fallback_used: false,
                });
            }
            from = full_moon + 1.0;
        }

        let nearest = attempts
            .iter()
            .map(|a| a.full_moon)
            .min_by(|a, b| (*a - equinox).abs().total_cmp(&(*b - equinox).abs()))
            .ok_or(CalendarError::InvalidConfiguration(
                "at least one Virgo-Feet attempt is required".into(),
            ))?;
        warn!(year, attempts = attempts.len(), "no full moon past Spica, using the one nearest the equinox");
        Ok(VirgoSearch {
            year,
            full_moon: nearest,
            attempts,
            fallback_used: true,
        })
    }
}
