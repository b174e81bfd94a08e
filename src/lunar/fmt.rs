//! Text labels for calendar values.

use crate::config::{DayStartTime, MonthStartEvent};
use crate::date::Weekday;

/// English name of a weekday.
///
/// # Example
///
/// ```
/// use lunkalendaro::{lunar, Weekday};
///
/// assert_eq!("Saturday", lunar::fmt::weekday(Weekday::Saturday));
/// ```
pub fn weekday(w: Weekday) -> &'static str {
    const NAMES: &[&str] = &[
        "Sunday",
        "Monday",
        "Tuesday",
        "Wednesday",
        "Thursday",
        "Friday",
        "Saturday",
    ];
    NAMES[w.index() as usize]
}

/// English ordinal of `n`: `1st`, `2nd`, `11th`, `23rd`, ...
pub fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

/// Name of a lunar month, e.g. `"1st Month"`.
pub fn month(number: u32) -> String {
    ordinal(number) + " Month"
}

/// Position of a lunar day in the week counted from the month start.
///
/// Day 1 (the month's opening day) stands outside the week and gives `None`;
/// days 2 to 8 are positions 1 to 7, and so on. Position 7 is the Sabbath.
///
/// # Example
///
/// ```
/// use lunkalendaro::lunar::fmt::lunar_week_position;
///
/// assert_eq!(None, lunar_week_position(1));
/// assert_eq!(Some(1), lunar_week_position(2));
/// assert_eq!(Some(7), lunar_week_position(15));
/// ```
pub fn lunar_week_position(day: u32) -> Option<u32> {
    match day {
        0 | 1 => None,
        _ => Some((day - 2) % 7 + 1),
    }
}

/// Label for a week position from [`lunar_week_position`].
pub fn week_position(pos: u32) -> String {
    match pos {
        7 => "Sabbath (7th day of the week)".to_owned(),
        1 => "1st day of the week (day after Sabbath)".to_owned(),
        _ => ordinal(pos) + " day of the week",
    }
}

/// Name of the event that starts a day.
///
/// # Example
///
/// ```
/// use lunkalendaro::{lunar, DayStartTime};
///
/// assert_eq!("Nautical Dawn", lunar::fmt::day_start_event_name(DayStartTime::Morning, 12.0));
/// assert_eq!("Sunset", lunar::fmt::day_start_event_name(DayStartTime::Evening, 0.0));
/// ```
pub fn day_start_event_name(time: DayStartTime, angle: f64) -> &'static str {
    let step = if angle.fract() == 0.0 { Some(angle as i32) } else { None };
    match (time, step) {
        (DayStartTime::Morning, Some(0)) => "Sunrise",
        (DayStartTime::Morning, Some(6)) => "Civil Dawn",
        (DayStartTime::Morning, Some(12)) => "Nautical Dawn",
        (DayStartTime::Morning, Some(18)) => "Astronomical Dawn",
        (DayStartTime::Morning, _) => "Morning",
        (DayStartTime::Evening, Some(0)) => "Sunset",
        (DayStartTime::Evening, Some(6)) => "Civil Twilight",
        (DayStartTime::Evening, Some(12)) => "Nautical Twilight",
        (DayStartTime::Evening, Some(18)) => "Astronomical Twilight",
        (DayStartTime::Evening, _) => "Evening",
    }
}

/// Name of a month start event.
pub fn moon_event(event: MonthStartEvent) -> &'static str {
    match event {
        MonthStartEvent::Dark => "Dark Moon",
        MonthStartEvent::Full => "Full Moon",
        MonthStartEvent::Crescent => "Crescent Moon",
    }
}
