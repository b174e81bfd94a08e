//! Instants on a continuous day count, and the conversions between them and
//! civil dates.
//!
//! Every instant the engine handles is a [`Timestamp`]: a Julian date in
//! Universal Time. Local civil dates are derived with local mean time
//! (longitude / 15 hours east of UT), which is the only notion of a time zone
//! that stays meaningful for ancient years.
//!
//! Ephemeris computations run on [`Tt`]; conversion goes through the ΔT
//! estimate in [`delta_t`].

use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

use crate::date::Date;

/// An instant, represented as a Julian date (JD) in Universal Time.
///
/// Adding `n` adds `n` days; ordering is chronological.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Timestamp(pub f64);

/// [Terristrial time](https://en.wikipedia.org/wiki/Terrestrial_Time),
/// represented in Julian date (JD).
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd)]
pub struct Tt(pub f64);

impl From<Timestamp> for Tt {
    fn from(ut: Timestamp) -> Tt {
        Tt(ut.0 + delta_t(ut.decimal_year()) / 86400.0)
    }
}

/// A civil date with time of day, to the minute.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct CivilDateTime {
    pub year: i32,
    pub month: i32,
    pub day: i32,
    pub hour: i32,
    pub minute: i32,
}

impl Timestamp {
    /// Converts a civil date and time (UT) into a timestamp.
    ///
    /// Julian calendar before 1582-10-15, Gregorian on and after; `year` is
    /// an astronomical year number. Returns `None` for impossible dates.
    ///
    /// # Example
    ///
    /// ```
    /// use lunkalendaro::Timestamp;
    ///
    /// let ts = Timestamp::from_civil(2000, 1, 1, 12, 0, 0.0).unwrap();
    /// assert_eq!(2451545.0, ts.0);
    /// ```
    pub fn from_civil(
        year: i32,
        month: i32,
        day: i32,
        hour: i32,
        minute: i32,
        second: f64,
    ) -> Option<Self> {
        let date = Date::from_civil(year, month, day)?;
        let day_fraction = (hour as f64 + minute as f64 / 60.0 + second / 3600.0) / 24.0;
        Some(Self::start_of(date) + day_fraction)
    }

    /// Midnight UT at the beginning of `date`.
    pub fn start_of(date: Date) -> Self {
        Self(date.jdn() as f64 - 0.5)
    }

    /// Splits the timestamp into a civil date (UT) and time of day, rounded to
    /// the nearest minute.
    ///
    /// # Example
    ///
    /// ```
    /// use lunkalendaro::Timestamp;
    ///
    /// let civil = Timestamp(2299160.5).civil();
    /// assert_eq!((1582, 10, 15, 0, 0), (civil.year, civil.month, civil.day, civil.hour, civil.minute));
    /// ```
    pub fn civil(&self) -> CivilDateTime {
        let x = self.0 + 0.5;
        let mut jdn = x.floor();
        let mut minutes = ((x - jdn) * 1440.0).round() as i32;
        if minutes >= 1440 {
            jdn += 1.0;
            minutes -= 1440;
        }
        let (year, month, day) = Date::from_jdn(jdn as i32).civil();
        CivilDateTime {
            year,
            month,
            day,
            hour: minutes / 60,
            minute: minutes % 60,
        }
    }

    /// The UT civil date the instant falls on.
    pub fn date(&self) -> Date {
        Date::from_jdn((self.0 + 0.5).floor() as i32)
    }
    /// The local (mean time) civil date at `longitude` degrees east.
    pub fn local_date(&self, longitude: f64) -> Date {
        Date::from_jdn((self.0 + 0.5 + longitude / 360.0).floor() as i32)
    }
    /// The instant `hours` after local mean midnight of `date` at `longitude`.
    pub fn local_time(date: Date, longitude: f64, hours: f64) -> Self {
        Self(date.jdn() as f64 - 0.5 - longitude / 360.0 + hours / 24.0)
    }
    /// Local mean midnight beginning `date` at `longitude`.
    pub fn local_midnight(date: Date, longitude: f64) -> Self {
        Self::local_time(date, longitude, 0.0)
    }
    /// Local mean noon of `date` at `longitude`.
    pub fn local_noon(date: Date, longitude: f64) -> Self {
        Self::local_time(date, longitude, 12.0)
    }

    /// Approximate year with fraction, in the astronomical numbering.
    pub fn decimal_year(&self) -> f64 {
        (self.0 - 2451544.5) / 365.2425 + 2000.0
    }
    /// Difference in hours, `self - other`.
    pub fn hours_since(&self, other: Timestamp) -> f64 {
        (self.0 - other.0) * 24.0
    }
}

impl Add<f64> for Timestamp {
    type Output = Timestamp;
    fn add(self, days: f64) -> Self::Output {
        Timestamp(self.0 + days)
    }
}
impl Sub<f64> for Timestamp {
    type Output = Timestamp;
    fn sub(self, days: f64) -> Self::Output {
        Timestamp(self.0 - days)
    }
}
impl Sub<Timestamp> for Timestamp {
    type Output = f64;
    fn sub(self, rhs: Timestamp) -> Self::Output {
        self.0 - rhs.0
    }
}

/// Converts civil date and time (UT) into a [`Timestamp`].
///
/// Free-function form of [`Timestamp::from_civil`].
pub fn civil_to_timestamp(
    year: i32,
    month: i32,
    day: i32,
    hour: i32,
    minute: i32,
    second: f64,
) -> Option<Timestamp> {
    Timestamp::from_civil(year, month, day, hour, minute, second)
}

/// Inverse of [`civil_to_timestamp`].
pub fn timestamp_to_civil(ts: Timestamp) -> CivilDateTime {
    ts.civil()
}

/// Estimated ΔT (TT − UT) in seconds for a decimal year.
///
/// Espenak-Meeus polynomials (NASA Five Millennium Canon), with the
/// Morrison-Stephenson parabola outside -500..2150.
pub fn delta_t(year: f64) -> f64 {
    let y = year;
    let parabola = |y: f64| {
        let u = (y - 1820.0) / 100.0;
        -20.0 + 32.0 * u * u
    };
    if y < -500.0 {
        parabola(y)
    } else if y < 500.0 {
        poly(
            y / 100.0,
            &[10583.6, -1014.41, 33.78311, -5.952053, -0.1798452, 0.022174192, 0.0090316521],
        )
    } else if y < 1600.0 {
        poly(
            (y - 1000.0) / 100.0,
            &[1574.2, -556.01, 71.23472, 0.319781, -0.8503463, -0.005050998, 0.0083572073],
        )
    } else if y < 1700.0 {
        poly(y - 1600.0, &[120.0, -0.9808, -0.01532, 1.0 / 7129.0])
    } else if y < 1800.0 {
        poly(
            y - 1700.0,
            &[8.83, 0.1603, -0.0059285, 0.00013336, -1.0 / 1_174_000.0],
        )
    } else if y < 1860.0 {
        poly(
            y - 1800.0,
            &[
                13.72,
                -0.332447,
                0.0068612,
                0.0041116,
                -0.00037436,
                0.0000121272,
                -0.0000001699,
                0.000000000875,
            ],
        )
    } else if y < 1900.0 {
        poly(
            y - 1860.0,
            &[7.62, 0.5737, -0.251754, 0.01680668, -0.0004473624, 1.0 / 233_174.0],
        )
    } else if y < 1920.0 {
        poly(y - 1900.0, &[-2.79, 1.494119, -0.0598939, 0.0061966, -0.000197])
    } else if y < 1941.0 {
        poly(y - 1920.0, &[21.20, 0.84493, -0.076100, 0.0020936])
    } else if y < 1961.0 {
        poly(y - 1950.0, &[29.07, 0.407, -1.0 / 233.0, 1.0 / 2547.0])
    } else if y < 1986.0 {
        poly(y - 1975.0, &[45.45, 1.067, -1.0 / 260.0, -1.0 / 718.0])
    } else if y < 2005.0 {
        poly(
            y - 2000.0,
            &[63.86, 0.3345, -0.060374, 0.0017275, 0.000651814, 0.00002373599],
        )
    } else if y < 2050.0 {
        poly(y - 2000.0, &[62.92, 0.32217, 0.005589])
    } else if y < 2150.0 {
        parabola(y) - 0.5628 * (2150.0 - y)
    } else {
        parabola(y)
    }
}

/// Evaluates `c[0] + c[1] t + c[2] t² + …`.
fn poly(t: f64, c: &[f64]) -> f64 {
    c.iter().rev().fold(0.0, |acc, &k| acc * t + k)
}
