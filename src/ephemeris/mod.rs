//! The astronomical ephemeris the calendar engine consumes.
//!
//! The engine never computes positions itself; it asks an [`Ephemeris`] for
//! event times and coordinates. [`analytic`] bundles a low-precision
//! implementation usable across several millennia.

use serde::{Deserialize, Serialize};

use crate::config::Location;
use crate::time_scales::Timestamp;

pub mod analytic;

pub use analytic::AnalyticEphemeris;

/// Body an ephemeris query is about.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Body {
    Sun,
    Moon,
}

/// Whether a body is rising through or setting through an altitude.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Direction {
    Rise,
    Set,
}

/// Moon phase as the sun-moon ecliptic longitude difference.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MoonPhase {
    /// Conjunction, 0°.
    New,
    /// Opposition, 180°.
    Full,
}

impl MoonPhase {
    /// Target elongation in degrees.
    pub fn degrees(&self) -> f64 {
        match self {
            MoonPhase::New => 0.0,
            MoonPhase::Full => 180.0,
        }
    }
}

/// Apparent equatorial coordinates in degrees.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equatorial {
    pub right_ascension: f64,
    pub declination: f64,
}

impl Equatorial {
    /// Great-circle separation from `other`, in degrees.
    ///
    /// # Example
    ///
    /// ```
    /// use lunkalendaro::ephemeris::Equatorial;
    ///
    /// let a = Equatorial { right_ascension: 10.0, declination: 0.0 };
    /// let b = Equatorial { right_ascension: 40.0, declination: 0.0 };
    /// assert!((a.separation(&b) - 30.0).abs() < 1e-9);
    /// ```
    pub fn separation(&self, other: &Equatorial) -> f64 {
        let (d1, d2) = (
            self.declination.to_radians(),
            other.declination.to_radians(),
        );
        let dra = (self.right_ascension - other.right_ascension).to_radians();
        let cos = d1.sin() * d2.sin() + d1.cos() * d2.cos() * dra.cos();
        cos.clamp(-1.0, 1.0).acos().to_degrees()
    }
}

/// Pure, synchronous astronomical searches.
///
/// Searches return `None` when no event occurs within `limit_days` of
/// `from`; that is a value, not a failure. Implementations must be
/// deterministic: the engine caches on the assumption that the same query
/// gives the same answer.
pub trait Ephemeris {
    /// Next time after `from` the moon reaches `phase`.
    fn search_moon_phase(&self, phase: MoonPhase, from: Timestamp, limit_days: f64)
    -> Option<Timestamp>;

    /// Next time after `from` the sun's apparent ecliptic longitude crosses 0°.
    fn search_equinox(&self, from: Timestamp, limit_days: f64) -> Option<Timestamp>;

    /// Next rise or set of `body` as seen by `observer`.
    fn search_rise_set(
        &self,
        body: Body,
        observer: &Location,
        direction: Direction,
        from: Timestamp,
        limit_days: f64,
    ) -> Option<Timestamp>;

    /// Next time `body` rises or sets through `altitude` degrees.
    fn search_altitude(
        &self,
        body: Body,
        observer: &Location,
        direction: Direction,
        from: Timestamp,
        limit_days: f64,
        altitude: f64,
    ) -> Option<Timestamp>;

    /// Apparent equatorial coordinates of `body` at `at` for `observer`.
    fn equatorial(&self, body: Body, at: Timestamp, observer: &Location) -> Option<Equatorial>;
}
