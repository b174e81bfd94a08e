//! Calendar-independant date.

use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// Julian day number of 1582-10-15, the first day of the Gregorian calendar.
///
/// Civil dates strictly before it are proleptic Julian, dates on or after it
/// are Gregorian. Not configurable.
pub const GREGORIAN_REFORM_JDN: i32 = 2299161;

/// A calendar-independant date, counted as a Julian day number (JDN).
///
/// Signed, so any year of the astronomical numbering is representable (year
/// `0` is 1 BC, `-1` is 2 BC, etc.).
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct Date {
    jdn: i32,
}

/// Which civil calendar a date is expressed in.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CalendarRegime {
    Julian,
    Gregorian,
}

impl CalendarRegime {
    /// The regime civil dates use for the given `(year, month, day)`.
    pub fn for_civil(year: i32, month: i32, day: i32) -> Self {
        if (year, month, day) < (1582, 10, 15) {
            Self::Julian
        } else {
            Self::Gregorian
        }
    }
    /// The regime civil dates use for the given JDN.
    pub fn for_jdn(jdn: i32) -> Self {
        if jdn < GREGORIAN_REFORM_JDN {
            Self::Julian
        } else {
            Self::Gregorian
        }
    }
}

impl Date {
    /// Creates a `Date` with a Julian day number (JDN).
    pub fn from_jdn(jdn: i32) -> Self {
        Self { jdn }
    }
    /// Returns the Julian day number (JDN) of the date.
    pub fn jdn(&self) -> i32 {
        self.jdn
    }

    /// Creates a `Date` from a civil date, Julian before 1582-10-15 and
    /// Gregorian on or after.
    ///
    /// `year` should be an astronomical year number, i.e. 1 BC is `0`, 2
    /// BC is `-1`, etc.
    ///
    /// Returns `None` for impossible dates, including 1582-10-05 through
    /// 1582-10-14 which were skipped by the reform.
    ///
    /// # Example
    ///
    /// ```
    /// use lunkalendaro::Date;
    ///
    /// let date = Date::from_civil(2000, 1, 1).unwrap();
    /// assert_eq!(2451545, date.jdn());
    /// let date = Date::from_civil(1582, 10, 4).unwrap();
    /// assert_eq!(1, Date::from_civil(1582, 10, 15).unwrap() - date);
    /// assert!(Date::from_civil(1582, 10, 10).is_none());
    /// ```
    pub fn from_civil(year: i32, month: i32, day: i32) -> Option<Self> {
        match CalendarRegime::for_civil(year, month, day) {
            CalendarRegime::Julian => Self::from_julian(year, month, day),
            CalendarRegime::Gregorian => Self::from_gregorian(year, month, day),
        }
        .filter(|date| CalendarRegime::for_jdn(date.jdn) == CalendarRegime::for_civil(year, month, day))
    }

    /// Creates a `Date` with a proleptic Gregorian calendar date.
    ///
    /// Returns `None` if the month or day is out of range.
    ///
    /// # Example
    ///
    /// ```
    /// use lunkalendaro::Date;
    ///
    /// let date = Date::from_gregorian(2000, 1, 1).unwrap();
    /// assert_eq!(2451545, date.jdn());
    /// ```
    pub fn from_gregorian(year: i32, month: i32, day: i32) -> Option<Self> {
        if !valid_day(month, day, YearType::from_gregorian(year)) {
            return None;
        }
        let (yy, mm) = shifted_year_month(year, month);
        Some(Self::from_jdn(
            day + (153 * mm + 2) / 5 + 365 * yy + yy.div_euclid(4) - yy.div_euclid(100)
                + yy.div_euclid(400)
                - 32045,
        ))
    }

    /// Creates a `Date` with a proleptic Julian calendar date.
    ///
    /// # Example
    ///
    /// ```
    /// use lunkalendaro::Date;
    ///
    /// let date = Date::from_julian(1582, 10, 4).unwrap();
    /// assert_eq!(2299160, date.jdn());
    /// ```
    pub fn from_julian(year: i32, month: i32, day: i32) -> Option<Self> {
        if !valid_day(month, day, YearType::from_julian(year)) {
            return None;
        }
        let (yy, mm) = shifted_year_month(year, month);
        Some(Self::from_jdn(
            day + (153 * mm + 2) / 5 + 365 * yy + yy.div_euclid(4) - 32083,
        ))
    }

    /// January 1 of `year` in the civil calendar in force.
    ///
    /// # Example
    ///
    /// ```
    /// use lunkalendaro::Date;
    ///
    /// assert_eq!(Date::from_julian(30, 1, 1), Some(Date::new_year(30)));
    /// assert_eq!(Date::from_gregorian(2025, 1, 1), Some(Date::new_year(2025)));
    /// ```
    pub fn new_year(year: i32) -> Self {
        let (yy, mm) = shifted_year_month(year, 1);
        let julian = 1 + (153 * mm + 2) / 5 + 365 * yy + yy.div_euclid(4) - 32083;
        if year <= 1582 {
            Self::from_jdn(julian)
        } else {
            Self::from_jdn(julian + 38 - yy.div_euclid(100) + yy.div_euclid(400))
        }
    }

    /// Represents the date in the civil calendar in force on that day.
    ///
    /// Returns in `(year, month, day)` format.
    ///
    /// # Example
    ///
    /// ```
    /// use lunkalendaro::Date;
    ///
    /// assert_eq!((2000, 1, 1), Date::from_jdn(2451545).civil());
    /// assert_eq!((1582, 10, 4), Date::from_jdn(2299160).civil());
    /// ```
    pub fn civil(&self) -> (i32, i32, i32) {
        match CalendarRegime::for_jdn(self.jdn) {
            CalendarRegime::Julian => self.julian(),
            CalendarRegime::Gregorian => self.gregorian(),
        }
    }
    /// Represents the date in the proleptic Gregorian calendar.
    pub fn gregorian(&self) -> (i32, i32, i32) {
        let a = self.jdn + 32044;
        let b = (4 * a + 3).div_euclid(146097);
        let c = a - (146097 * b).div_euclid(4);
        let (y, m, d) = split_julian_cycle(c);
        (100 * b + y, m, d)
    }
    /// Represents the date in the proleptic Julian calendar.
    pub fn julian(&self) -> (i32, i32, i32) {
        split_julian_cycle(self.jdn + 32082)
    }
    /// Formats the civil date in ISO 8601 style, with a sign for years
    /// before 1 BC (astronomical numbering).
    ///
    /// # Example
    ///
    /// ```
    /// use lunkalendaro::Date;
    ///
    /// let date = Date::from_civil(2021, 9, 8).unwrap();
    /// assert_eq!("2021-09-08", date.iso_civil());
    /// let date = Date::from_civil(-1445, 4, 2).unwrap();
    /// assert_eq!("-1445-04-02", date.iso_civil());
    /// ```
    pub fn iso_civil(&self) -> String {
        let (y, m, d) = self.civil();
        if y < 0 {
            format!("-{:04}-{:02}-{:02}", -y, m, d)
        } else {
            format!("{:04}-{:02}-{:02}", y, m, d)
        }
    }

    /// Returns the day of week of the date.
    ///
    /// # Example
    ///
    /// ```
    /// use lunkalendaro::{Date, Weekday};
    ///
    /// let date = Date::from_civil(2000, 1, 1).unwrap();
    /// assert_eq!(Weekday::Saturday, date.weekday());
    /// ```
    pub fn weekday(&self) -> Weekday {
        Weekday::from_index((self.jdn + 1).rem_euclid(7) as u8)
    }
}

// NOTE: both directions shift the year to begin in March, so the leap day
// is the last day of the shifted year.
fn shifted_year_month(year: i32, month: i32) -> (i32, i32) {
    let a = (14 - month) / 12;
    (year + 4800 - a, month + 12 * a - 3)
}

fn split_julian_cycle(c: i32) -> (i32, i32, i32) {
    let d = (4 * c + 3).div_euclid(1461);
    let e = c - (1461 * d).div_euclid(4);
    let m = (5 * e + 2) / 153;
    let day = e - (153 * m + 2) / 5 + 1;
    let month = m + 3 - 12 * (m / 10);
    let year = d - 4800 + m / 10;
    (year, month, day)
}

fn valid_day(month: i32, day: i32, year_type: YearType) -> bool {
    (1..=12).contains(&month) && day >= 1 && day <= days_in_month(month, year_type)
}

/// Number of days in `month` for a year of the given type.
pub fn days_in_month(month: i32, year_type: YearType) -> i32 {
    match month {
        2 => 28 + year_type.is_leap() as i32,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

impl Add<i32> for Date {
    type Output = Date;
    fn add(self, rhs: i32) -> Self::Output {
        Date::from_jdn(self.jdn + rhs)
    }
}
impl Sub<i32> for Date {
    type Output = Date;
    fn sub(self, rhs: i32) -> Self::Output {
        Date::from_jdn(self.jdn - rhs)
    }
}
impl Sub<Date> for Date {
    type Output = i32;
    fn sub(self, rhs: Date) -> Self::Output {
        self.jdn - rhs.jdn
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.iso_civil())
    }
}

/// Day of week, indexed `0..=6` from Sunday.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    const ALL: [Weekday; 7] = [
        Weekday::Sunday,
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    /// Weekday for an index, taken modulo 7.
    pub fn from_index(index: u8) -> Self {
        Self::ALL[(index % 7) as usize]
    }
    /// `0` for Sunday through `6` for Saturday.
    pub fn index(&self) -> u8 {
        *self as u8
    }
    /// The following weekday.
    pub fn succ(&self) -> Self {
        Self::from_index(self.index() + 1)
    }
    /// English name of the weekday.
    pub fn name(&self) -> &'static str {
        crate::lunar::fmt::weekday(*self)
    }
}

/// Indicates whether a year is a leap year or common year.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum YearType {
    Common,
    Leap,
}

impl YearType {
    /// Determines if `year` is a leap year in Gregorian calendar.
    pub fn from_gregorian(year: i32) -> Self {
        if year % 4 == 0 && year % 100 != 0 || year % 400 == 0 {
            Self::Leap
        } else {
            Self::Common
        }
    }
    /// Determines if `year` is a leap year in Julian calendar.
    pub fn from_julian(year: i32) -> Self {
        if year.rem_euclid(4) == 0 {
            Self::Leap
        } else {
            Self::Common
        }
    }
    /// Returns `true` if `self` is `Leap`, otherwise `false`.
    pub fn is_leap(&self) -> bool {
        matches!(self, YearType::Leap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn it_works() {
        let date = Date::from_jdn(2440588);
        assert_eq!(2440588, date.jdn());
    }

    #[test]
    fn from_civil() {
        for ((y, m, d), std) in [
            ((1970, 1, 1), 2440588),
            ((2021, 9, 8), 2459466),
            ((1582, 10, 15), 2299161),
            ((1582, 10, 4), 2299160),
            ((1, 1, 1), 1721424),
            ((0, 12, 31), 1721423),
            ((-4712, 1, 1), 0),
        ] {
            assert_eq!(
                Some(std),
                Date::from_civil(y, m, d).map(|date| date.jdn()),
                "{y:04}-{m:02}-{d:02}"
            );
        }
    }

    #[test]
    fn to_civil() {
        for (jdn, std) in [
            (2440588, (1970, 1, 1)),
            (2459466, (2021, 9, 8)),
            (2451545, (2000, 1, 1)),
            (2299160, (1582, 10, 4)),
            (2299161, (1582, 10, 15)),
            (0, (-4712, 1, 1)),
            (-1, (-4713, 12, 31)),
        ] {
            assert_eq!(std, Date::from_jdn(jdn).civil(), "jdn {jdn}");
        }
    }

    #[test]
    fn skipped_reform_days() {
        for d in 5..=14 {
            assert_eq!(None, Date::from_civil(1582, 10, d), "1582-10-{d:02}");
        }
        assert_eq!(None, Date::from_civil(2023, 2, 29));
        assert!(Date::from_civil(1500, 2, 29).is_some()); // Julian leap year
        assert_eq!(None, Date::from_civil(1700, 2, 29));
    }

    #[test]
    fn to_weekday() {
        use Weekday::*;
        for ((y, m, d), std) in [
            ((1970, 1, 1), Thursday),
            ((2000, 1, 1), Saturday),
            ((2021, 9, 8), Wednesday),
            ((1582, 10, 4), Thursday),
            ((1582, 10, 15), Friday),
        ] {
            let date = Date::from_civil(y, m, d).unwrap();
            assert_eq!(std, date.weekday(), "{y:04}-{m:02}-{d:02}");
        }
        assert_eq!(6, Date::from_jdn(2451545).weekday().index());
        assert_eq!(Sunday, Saturday.succ());
    }

    #[test]
    fn iso_format() {
        assert_eq!("2021-09-08", Date::from_civil(2021, 9, 8).unwrap().iso_civil());
        assert_eq!("0000-03-01", Date::from_civil(0, 3, 1).unwrap().to_string());
    }

    proptest! {
        #[test]
        fn civil_round_trip(jdn in -1_000_000i32..4_000_000) {
            let date = Date::from_jdn(jdn);
            let (y, m, d) = date.civil();
            prop_assert_eq!(Some(date), Date::from_civil(y, m, d));
        }

        #[test]
        fn weekday_advances_daily(jdn in -1_000_000i32..4_000_000) {
            let date = Date::from_jdn(jdn);
            prop_assert_eq!(date.weekday().succ(), (date + 1).weekday());
        }
    }
}
