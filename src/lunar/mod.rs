//! Lunar calendar years resolved from astronomical events.
//!
//! A [`Year`] is built from the event opening its first month and the event
//! opening the next year's first month; months in between follow the
//! configured moon event, and every day is bounded by the configured sun
//! event at the year's location.
//!
//! # Example
//!
//! ```
//! use lunkalendaro::ephemeris::AnalyticEphemeris;
//! use lunkalendaro::lunar::{Resolver, Year, YearOptions};
//! use lunkalendaro::{Configuration, Date, EngineSettings, Location, MonthStartEvent};
//!
//! let eph = AnalyticEphemeris::new();
//! let settings = EngineSettings::default();
//! let config = Configuration::default().with_month_start(MonthStartEvent::Dark);
//! let resolver = Resolver::new(&eph, Location::JERUSALEM, config, &settings);
//!
//! let start = resolver.year_start(2025).unwrap();
//! let next = resolver.year_start(2026).unwrap();
//! let year = Year::build(&resolver, start, &next, YearOptions::default()).unwrap();
//!
//! assert!((12..=13).contains(&year.months.len()));
//! let day = year.day_info(1, 15).unwrap();
//! let found = year.find_lunar_day(day.date).unwrap();
//! assert_eq!((1, 15), (found.month, found.day));
//! ```

use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::config::{Configuration, EngineSettings, Location};
use crate::date::{Date, Weekday};
use crate::ephemeris::Ephemeris;
use crate::error::{CalendarError, Result};
use crate::time_scales::Timestamp;

pub mod day_boundary;
pub mod fmt;
pub mod moon_event;
pub mod uncertainty;
pub mod year_start;

pub use day_boundary::{DayStart, FirstDay};
pub use moon_event::MoonEvent;
pub use uncertainty::{Skew, Uncertainty};
pub use year_start::{VirgoSearch, VirgoSearchAttempt, YearStart};

/// Events closer than this are the same event found from different starts.
const SAME_EVENT_DAYS: f64 = 1.0;
const MIN_MONTHS: usize = 12;
const MAX_MONTHS: usize = 13;

/// Everything a resolution needs: where, under which rules, asking whom.
pub struct Resolver<'a, E: ?Sized> {
    ephemeris: &'a E,
    location: Location,
    config: Configuration,
    settings: &'a EngineSettings,
}

impl<'a, E: Ephemeris + ?Sized> Resolver<'a, E> {
    pub fn new(
        ephemeris: &'a E,
        location: Location,
        config: Configuration,
        settings: &'a EngineSettings,
    ) -> Self {
        Self {
            ephemeris,
            location,
            config,
            settings,
        }
    }
    pub fn location(&self) -> &Location {
        &self.location
    }
    pub fn config(&self) -> &Configuration {
        &self.config
    }
}

/// Options for building a year.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearOptions {
    /// Attach [`Uncertainty`] to months and to the year start.
    pub include_uncertainty: bool,
}

impl Default for YearOptions {
    fn default() -> Self {
        Self {
            include_uncertainty: true,
        }
    }
}

/// A lunar day.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Day {
    /// `1..=30`.
    pub lunar_day: u32,
    /// Civil date the day's daylight falls on.
    pub date: Date,
    /// When the day begins.
    pub start: Timestamp,
    /// Weekday of `date`.
    pub weekday: Weekday,
    /// The start is a fixed local clock hour, not a sun event.
    pub clock_fallback: bool,
}

impl Day {
    /// `0` for Sunday through `6` for Saturday.
    pub fn weekday_index(&self) -> u8 {
        self.weekday.index()
    }
    pub fn weekday_name(&self) -> &'static str {
        self.weekday.name()
    }
    /// See [`fmt::lunar_week_position`].
    pub fn week_position(&self) -> Option<u32> {
        fmt::lunar_week_position(self.lunar_day)
    }
}

/// A lunar month. Owns its days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Month {
    /// `1..=13`.
    pub number: u32,
    /// Civil date of day 1.
    pub date: Date,
    /// Start of day 1.
    pub start: Timestamp,
    /// The moon event the month is counted from.
    pub moon_event: Timestamp,
    /// No crescent was seen; counted from the conjunction.
    pub event_fallback: bool,
    pub days: Vec<Day>,
    /// Chance that day 1 really falls a day earlier or later.
    pub uncertainty: Option<Uncertainty>,
}

impl Month {
    /// 29 or 30 for months bounded by regular events.
    pub fn day_count(&self) -> u32 {
        self.days.len() as u32
    }
    /// Day `n`, counted from 1.
    pub fn day(&self, n: u32) -> Option<&Day> {
        self.days.get((n as usize).checked_sub(1)?)
    }
    /// E.g. `"1st Month"`.
    pub fn name(&self) -> String {
        fmt::month(self.number)
    }
}

/// A position in a lunar year.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct LunarDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// Indicates that a date lies outside a year, and on which side.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum OtherYear {
    Before,
    After,
}

/// A lunar year at one location under one configuration.
///
/// Immutable once built; a different configuration or location means a new
/// year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Year {
    /// Astronomical numbering: `0` is 1 BC.
    pub year: i32,
    pub location: Location,
    pub configuration: Configuration,
    pub spring_equinox: Timestamp,
    /// Chance that the year really opens a month earlier or later.
    pub start_uncertainty: Option<Uncertainty>,
    /// The Virgo-Feet search the year start came from, if that rule is used.
    pub virgo: Option<VirgoSearch>,
    /// 12 or 13 months.
    pub months: Vec<Month>,
    /// Start of the first day after this year.
    pub end: Timestamp,
    /// The next year's start gave fewer than 12 or more than 13 months and
    /// the count was forced into range.
    pub month_count_clamped: bool,
}

impl Year {
    /// Builds the year opened by `start`, ending where `next` opens the
    /// following year.
    ///
    /// Fails with [`CalendarError::MonthStartSearchExhausted`] when a month
    /// start cannot be found; a year is never silently truncated.
    #[instrument(skip_all, fields(year = start.year))]
    pub fn build<E: Ephemeris + ?Sized>(
        resolver: &Resolver<'_, E>,
        start: YearStart,
        next: &YearStart,
        options: YearOptions,
    ) -> Result<Self> {
        let year = start.year;
        let following = |event: MoonEvent, month: usize| {
            resolver
                .following_moon_event(event)
                .map_err(|err| match err {
                    CalendarError::NoQualifyingEvent { .. } => {
                        CalendarError::MonthStartSearchExhausted { year, month }
                    }
                    err => err,
                })
        };
        let reached = |event: MoonEvent| event.at.0 > next.event.at.0 - SAME_EVENT_DAYS;

        let mut events = vec![start.event];
        let mut candidate = following(start.event, 2)?;
        while !reached(candidate) && events.len() < MAX_MONTHS {
            events.push(candidate);
            candidate = following(candidate, events.len() + 1)?;
        }
        let mut clamped = !reached(candidate);
        let mut boundary = if clamped { candidate } else { next.event };
        while events.len() < MIN_MONTHS {
            clamped = true;
            events.push(candidate);
            candidate = following(candidate, events.len() + 1)?;
            boundary = candidate;
        }
        if clamped {
            warn!(year, months = events.len(), "month count forced into 12..=13");
        }

        let firsts: Vec<FirstDay> = events
            .iter()
            .chain([&boundary])
            .map(|event| resolver.first_day_at_or_after(event.at))
            .collect();
        let margin_hours = resolver
            .settings
            .uncertainty()
            .margin_hours(start.event.at.decimal_year());

        let mut months = Vec::with_capacity(events.len());
        for (idx, (event, pair)) in events.iter().zip(firsts.windows(2)).enumerate() {
            let (first, next_first) = (&pair[0], &pair[1]);
            let days = (0..next_first.date - first.date)
                .map(|offset| {
                    let date = first.date + offset;
                    let start = if offset == 0 {
                        first.start
                    } else {
                        resolver.day_start(date)
                    };
                    Day {
                        lunar_day: offset as u32 + 1,
                        date,
                        start: start.at,
                        weekday: date.weekday(),
                        clock_fallback: start.clock_fallback,
                    }
                })
                .collect();
            let uncertainty = if options.include_uncertainty {
                uncertainty::estimate(
                    event.at.0,
                    margin_hours / 24.0,
                    first.previous.0,
                    first.start.at.0,
                    margin_hours,
                )
            } else {
                None
            };
            months.push(Month {
                number: idx as u32 + 1,
                date: first.date,
                start: first.start.at,
                moon_event: event.at,
                event_fallback: event.fallback,
                days,
                uncertainty,
            });
        }

        let end = firsts
            .last()
            .map(|first| first.start.at)
            .unwrap_or(next.event.at);
        Ok(Year {
            year,
            location: resolver.location,
            configuration: resolver.config,
            spring_equinox: start.equinox,
            start_uncertainty: if options.include_uncertainty {
                start.uncertainty
            } else {
                None
            },
            virgo: start.virgo,
            months,
            end,
            month_count_clamped: clamped,
        })
    }

    /// Start of day 1 of month 1.
    pub fn start(&self) -> Timestamp {
        self.months.first().map_or(self.end, |m| m.start)
    }

    /// Month `n`, counted from 1.
    pub fn month(&self, n: u32) -> Option<&Month> {
        self.months.get((n as usize).checked_sub(1)?)
    }

    /// Day `day` of month `month`.
    pub fn day_info(&self, month: u32, day: u32) -> Option<&Day> {
        self.month(month)?.day(day)
    }

    /// All days in order.
    pub fn days(&self) -> impl Iterator<Item = &Day> {
        self.months.iter().flat_map(|m| &m.days)
    }

    /// Total number of days.
    pub fn day_count(&self) -> u32 {
        self.months.iter().map(Month::day_count).sum()
    }

    /// The lunar day containing `instant`.
    ///
    /// Returns `Err` if the instant is outside the year, saying on which
    /// side.
    pub fn locate(&self, instant: Timestamp) -> std::result::Result<LunarDate, OtherYear> {
        if instant < self.start() {
            return Err(OtherYear::Before);
        } else if instant >= self.end {
            return Err(OtherYear::After);
        }
        let m = self.months.partition_point(|m| m.start <= instant);
        let month = &self.months[m - 1];
        let d = month.days.partition_point(|d| d.start <= instant);
        Ok(LunarDate {
            year: self.year,
            month: month.number,
            day: d as u32,
        })
    }

    /// The lunar day holding local noon of the civil `date`.
    ///
    /// Day boundaries are sun events, not midnights, so the lookup goes by
    /// instant rather than by matching civil dates.
    pub fn find_lunar_day(&self, date: Date) -> std::result::Result<LunarDate, OtherYear> {
        self.locate(Timestamp::local_noon(date, self.location.longitude))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{DayStartTime, MonthStartEvent, YearStartRule};
    use crate::ephemeris::{AnalyticEphemeris, Body, Direction, Equatorial, MoonPhase};
    use proptest::prelude::*;

    /// Delegates to `inner` but answers coordinate queries with `equatorial`,
    /// and finds no equinox unless `equinox` is set.
    pub struct Wrapped<E, F> {
        pub inner: E,
        pub equatorial: F,
        pub equinox: bool,
    }

    impl<E, F> Ephemeris for Wrapped<E, F>
    where
        E: Ephemeris,
        F: Fn(Body, Timestamp) -> Option<Equatorial>,
    {
        fn search_moon_phase(&self, phase: MoonPhase, from: Timestamp, limit_days: f64) -> Option<Timestamp> {
            self.inner.search_moon_phase(phase, from, limit_days)
        }
        fn search_equinox(&self, from: Timestamp, limit_days: f64) -> Option<Timestamp> {
            if !self.equinox {
                return None;
            }
            self.inner.search_equinox(from, limit_days)
        }
        fn search_rise_set(
            &self,
            body: Body,
            observer: &Location,
            direction: Direction,
            from: Timestamp,
            limit_days: f64,
        ) -> Option<Timestamp> {
            self.inner.search_rise_set(body, observer, direction, from, limit_days)
        }
        fn search_altitude(
            &self,
            body: Body,
            observer: &Location,
            direction: Direction,
            from: Timestamp,
            limit_days: f64,
            altitude: f64,
        ) -> Option<Timestamp> {
            self.inner
                .search_altitude(body, observer, direction, from, limit_days, altitude)
        }
        fn equatorial(&self, body: Body, at: Timestamp, _: &Location) -> Option<Equatorial> {
            (self.equatorial)(body, at)
        }
    }

    fn build(year: i32, location: Location, config: Configuration) -> Year {
        let eph = AnalyticEphemeris::new();
        let settings = EngineSettings::default();
        let resolver = Resolver::new(&eph, location, config, &settings);
        let start = resolver.year_start(year).unwrap();
        let next = resolver.year_start(year + 1).unwrap();
        Year::build(&resolver, start, &next, YearOptions::default()).unwrap()
    }

    fn dark_morning() -> Configuration {
        Configuration::default()
            .with_month_start(MonthStartEvent::Dark)
            .with_day_start(DayStartTime::Morning, 12.0)
            .with_year_start(YearStartRule::Equinox)
            .with_crescent_threshold(18.0)
    }

    fn check_structure(year: &Year) {
        assert!((12..=13).contains(&year.months.len()), "{}", year.year);
        assert!((354..=385).contains(&year.day_count()), "{}", year.year);
        for (idx, month) in year.months.iter().enumerate() {
            assert_eq!(idx as u32 + 1, month.number);
            assert!((29..=30).contains(&month.day_count()), "{} month {}", year.year, month.number);
            assert_eq!(month.start, month.days[0].start);
            assert_eq!(month.date, month.days[0].date);
        }
        let days: Vec<_> = year.days().collect();
        for pair in days.windows(2) {
            assert_eq!(pair[0].weekday.succ(), pair[1].weekday);
            assert_eq!(pair[0].date + 1, pair[1].date);
            assert!(pair[0].start < pair[1].start);
        }
        assert!(days.last().unwrap().start < year.end);
    }

    #[test]
    fn jerusalem_2025() {
        let year = build(2025, Location::JERUSALEM, dark_morning());
        check_structure(&year);
        let equinox_date = year.spring_equinox.local_date(Location::JERUSALEM.longitude);
        let first = year.day_info(1, 1).unwrap();
        assert!(first.date >= equinox_date);
        // Conjunction 2025-03-29 10:58 UT; nautical dawn of the 30th opens
        // the year.
        assert_eq!("2025-03-30", first.date.to_string());
        assert_eq!(Weekday::Sunday, first.weekday);
        assert_eq!("Sunday", first.weekday_name());
        assert!(!year.month_count_clamped);
        assert!(year.virgo.is_none());
    }

    #[test]
    fn consecutive_years_meet() {
        let this = build(2025, Location::JERUSALEM, dark_morning());
        let next = build(2026, Location::JERUSALEM, dark_morning());
        assert_eq!(this.end, next.start());
        let last = this.days().last().unwrap();
        let first = next.day_info(1, 1).unwrap();
        assert_eq!(last.date + 1, first.date);
        assert_eq!(last.weekday.succ(), first.weekday);
    }

    #[test]
    fn evening_days() {
        let config = dark_morning().with_day_start(DayStartTime::Evening, 0.0);
        let year = build(2024, Location::JERUSALEM, config);
        check_structure(&year);
        for day in year.days().take(40) {
            // Sunset of the previous civil day, local mean time.
            let local_hours = (day.start.0 - Timestamp::local_midnight(day.date, 35.2137).0) * 24.0;
            assert!((-8.0..-4.0).contains(&local_hours), "{local_hours}");
        }
    }

    #[test]
    fn lookups() {
        let year = build(2025, Location::JERUSALEM, dark_morning());
        for month in &year.months {
            for day in &month.days {
                let found = year.find_lunar_day(day.date).unwrap();
                assert_eq!(
                    LunarDate {
                        year: 2025,
                        month: month.number,
                        day: day.lunar_day
                    },
                    found
                );
            }
        }
        let first = year.day_info(1, 1).unwrap().date;
        assert_eq!(Err(OtherYear::Before), year.find_lunar_day(first - 1));
        let last = year.days().last().unwrap().date;
        assert_eq!(Err(OtherYear::After), year.find_lunar_day(last + 1));
        assert_eq!(None, year.day_info(14, 1));
        assert_eq!(None, year.day_info(1, 31));
        assert_eq!(None, year.day_info(0, 1));
        assert_eq!(None, year.day_info(1, 0));
    }

    #[test]
    fn options_drop_uncertainty() {
        let eph = AnalyticEphemeris::new();
        let settings = EngineSettings::default().with_uncertainty(crate::config::UncertaintyModel {
            base_hours: 36.0,
            hours_per_millennium_squared: 0.0,
            reference_year: 2000.0,
        });
        let resolver = Resolver::new(&eph, Location::JERUSALEM, dark_morning(), &settings);
        let start = resolver.year_start(2025).unwrap();
        let next = resolver.year_start(2026).unwrap();
        let with = Year::build(&resolver, start.clone(), &next, YearOptions::default()).unwrap();
        // A ±36h margin always straddles a day boundary.
        assert!(with.months.iter().all(|m| m.uncertainty.is_some()));
        let without = Year::build(
            &resolver,
            start,
            &next,
            YearOptions {
                include_uncertainty: false,
            },
        )
        .unwrap();
        assert!(without.months.iter().all(|m| m.uncertainty.is_none()));
        assert_eq!(None, without.start_uncertainty);
        assert_eq!(with.day_count(), without.day_count());
    }

    #[test]
    fn year_30_opens_after_equinox() {
        let config = dark_morning();
        let year = build(30, Location::JERUSALEM, config);
        check_structure(&year);
        let month1 = year.month(1).unwrap();
        assert!(month1.moon_event >= year.spring_equinox);
        // The conjunction just before the equinox would have opened the year
        // a month earlier.
        let gap = month1.moon_event - year.spring_equinox;
        assert!(gap < 30.0);
        // Ancient dates carry a wider margin.
        let u = month1.uncertainty;
        if let Some(u) = u {
            assert!(u.margin_hours > 2.0);
        }
    }

    #[test]
    fn crescent_months() {
        let config = dark_morning().with_month_start(MonthStartEvent::Crescent);
        let year = build(2024, Location::JERUSALEM, config);
        assert!((12..=13).contains(&year.months.len()));
        for month in &year.months {
            assert!(month.start >= month.moon_event);
        }
    }

    #[test]
    fn forced_month_count_is_flagged() {
        let eph = AnalyticEphemeris::new();
        let settings = EngineSettings::default();
        let resolver = Resolver::new(&eph, Location::JERUSALEM, dark_morning(), &settings);
        let start = resolver.year_start(2025).unwrap();
        // A next year opening two years later overflows 13 months.
        let far = resolver.year_start(2027).unwrap();
        let year = Year::build(&resolver, start.clone(), &far, YearOptions::default()).unwrap();
        assert!(year.month_count_clamped);
        assert_eq!(13, year.months.len());
        // One opening half a year later is too short.
        let near = YearStart {
            event: resolver
                .first_moon_event_at_or_after(start.event.at + 180.0)
                .unwrap(),
            ..start.clone()
        };
        let year = Year::build(&resolver, start, &near, YearOptions::default()).unwrap();
        assert!(year.month_count_clamped);
        assert_eq!(12, year.months.len());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(6))]

        #[test]
        fn any_year_is_well_formed(y in -1500i32..2500, full in any::<bool>()) {
            let event = if full { MonthStartEvent::Full } else { MonthStartEvent::Dark };
            let year = build(y, Location::JERUSALEM, dark_morning().with_month_start(event));
            check_structure(&year);
            let day = year.day_info(2, 10).unwrap();
            let found = year.find_lunar_day(day.date).unwrap();
            prop_assert_eq!((2, 10), (found.month, found.day));
        }
    }
}
