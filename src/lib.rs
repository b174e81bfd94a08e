//! Lunar calendars resolved from astronomical events.
//!
//! This crate builds lunisolar years whose months open at a moon event (dark
//! moon, full moon or first crescent), whose days open at a sun event
//! (sunrise, sunset or a twilight), and whose years open by one of several
//! spring rules. Years are proleptic: the same rules apply in antiquity, with
//! the timing uncertainty of ancient dates reported instead of hidden.
//!
//! Astronomy comes from an [`ephemeris::Ephemeris`]; a low-precision
//! [`ephemeris::AnalyticEphemeris`] is bundled.
//!
//! # Examples
//!
//! Dates with [`Date`]:
//!
//! ```
//! use lunkalendaro::{Date, Weekday};
//!
//! let date = Date::from_civil(2000, 1, 1).unwrap();
//!
//! assert_eq!(Weekday::Saturday, date.weekday());
//! assert_eq!(2451545, date.jdn());
//! ```
//!
//! A lunar year:
//!
//! ```
//! use lunkalendaro::ephemeris::AnalyticEphemeris;
//! use lunkalendaro::lunar::YearOptions;
//! use lunkalendaro::{Configuration, DayStartTime, Engine, Location, MonthStartEvent, YearStartRule};
//!
//! let mut engine = Engine::new(AnalyticEphemeris::new());
//! engine
//!     .configure(
//!         Configuration::default()
//!             .with_month_start(MonthStartEvent::Dark)
//!             .with_day_start(DayStartTime::Morning, 12.0)
//!             .with_year_start(YearStartRule::Equinox),
//!     )
//!     .unwrap();
//!
//! let year = engine
//!     .generate_year(2025, &Location::JERUSALEM, YearOptions::default())
//!     .unwrap();
//! let day = year.day_info(1, 1).unwrap();
//!
//! assert_eq!("2025-03-30", day.date.to_string());
//! ```

pub mod cache;
pub mod config;
pub mod date;
pub mod engine;
pub mod ephemeris;
pub mod error;
pub mod lunar;
pub mod time_scales;

pub use config::{
    Configuration, DayStartTime, EngineSettings, Location, MonthStartEvent, UncertaintyModel,
    YearStartRule,
};
pub use date::{Date, Weekday, YearType};
pub use engine::Engine;
pub use error::{CalendarError, Result};
pub use time_scales::{civil_to_timestamp, timestamp_to_civil, CivilDateTime, Timestamp};
