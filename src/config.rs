//! Rule set and engine settings.
//!
//! A [`Configuration`] is the five-parameter rule set deciding when months,
//! days and years begin. [`EngineSettings`] holds the knobs that do not
//! change the calendar's definition (cache size, search windows, the
//! uncertainty model).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CalendarError;

/// Lunar event marking the start of a month.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MonthStartEvent {
    /// Conjunction (new moon).
    Dark,
    /// Full moon.
    #[default]
    Full,
    /// First visible crescent after the conjunction.
    Crescent,
}

/// Which end of the night the day starts at.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DayStartTime {
    #[default]
    Morning,
    Evening,
}

/// Rule selecting the month that begins the year.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum YearStartRule {
    /// First month-start event on or after the spring equinox.
    #[default]
    Equinox,
    /// Earliest month whose 15th day is on or after the spring equinox.
    #[serde(alias = "13daysBefore", alias = "14daysBefore")]
    PassoverAfterEquinox,
    /// First full moon seen past Spica ("moon under Virgo's feet").
    VirgoFeet,
}

macro_rules! impl_from_str {
    ($ty:ty, $what:literal, { $($name:literal => $variant:expr),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = CalendarError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($variant),)+
                    _ => Err(CalendarError::InvalidConfiguration(format!(
                        concat!("unknown ", $what, " {:?}"),
                        s
                    ))),
                }
            }
        }
    };
}

impl_from_str!(MonthStartEvent, "month start event", {
    "dark" => MonthStartEvent::Dark,
    "full" => MonthStartEvent::Full,
    "crescent" => MonthStartEvent::Crescent,
});
impl_from_str!(DayStartTime, "day start time", {
    "morning" => DayStartTime::Morning,
    "evening" => DayStartTime::Evening,
});
impl_from_str!(YearStartRule, "year start rule", {
    "equinox" => YearStartRule::Equinox,
    "passoverAfterEquinox" => YearStartRule::PassoverAfterEquinox,
    "13daysBefore" => YearStartRule::PassoverAfterEquinox,
    "14daysBefore" => YearStartRule::PassoverAfterEquinox,
    "virgoFeet" => YearStartRule::VirgoFeet,
});

/// The rule set a calendar is resolved with.
///
/// Immutable once handed to the engine; build it with the `with_*` methods.
///
/// # Example
///
/// ```
/// use lunkalendaro::{Configuration, DayStartTime, MonthStartEvent, YearStartRule};
///
/// let config = Configuration::default()
///     .with_month_start(MonthStartEvent::Dark)
///     .with_day_start(DayStartTime::Evening, 0.0)
///     .with_year_start(YearStartRule::Equinox);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub month_start_event: MonthStartEvent,
    pub day_start_time: DayStartTime,
    /// Sun depression at day start in degrees: 0 is the horizon, 6/12/18
    /// civil/nautical/astronomical twilight.
    pub day_start_angle: f64,
    pub year_start_rule: YearStartRule,
    /// Minimum sun-moon separation at sunset, in degrees, for a crescent to
    /// count as visible.
    pub crescent_visibility_threshold: f64,
}

impl Default for Configuration {
    /// Full moon, morning at nautical dawn, equinox year start.
    fn default() -> Self {
        Self {
            month_start_event: MonthStartEvent::Full,
            day_start_time: DayStartTime::Morning,
            day_start_angle: 12.0,
            year_start_rule: YearStartRule::Equinox,
            crescent_visibility_threshold: 18.0,
        }
    }
}

impl Configuration {
    /// Sets the month start event.
    pub fn with_month_start(mut self, event: MonthStartEvent) -> Self {
        self.month_start_event = event;
        self
    }
    /// Sets the day start time and the sun depression angle.
    pub fn with_day_start(mut self, time: DayStartTime, angle: f64) -> Self {
        self.day_start_time = time;
        self.day_start_angle = angle;
        self
    }
    /// Sets the year start rule.
    pub fn with_year_start(mut self, rule: YearStartRule) -> Self {
        self.year_start_rule = rule;
        self
    }
    /// Sets the crescent visibility threshold in degrees.
    pub fn with_crescent_threshold(mut self, degrees: f64) -> Self {
        self.crescent_visibility_threshold = degrees;
        self
    }

    /// Validates this configuration.
    ///
    /// The day start angle must lie in `0..=18` and the crescent threshold in
    /// `(0, 90]`.
    pub fn validate(&self) -> Result<(), CalendarError> {
        if !self.day_start_angle.is_finite() || !(0.0..=18.0).contains(&self.day_start_angle) {
            return Err(CalendarError::InvalidConfiguration(format!(
                "day start angle {} not in 0..=18 degrees",
                self.day_start_angle
            )));
        }
        let threshold = self.crescent_visibility_threshold;
        if !threshold.is_finite() || threshold <= 0.0 || threshold > 90.0 {
            return Err(CalendarError::InvalidConfiguration(format!(
                "crescent visibility threshold {threshold} not in (0, 90] degrees"
            )));
        }
        Ok(())
    }

    /// Fingerprint of the rule set, used in cache keys.
    ///
    /// FNV-1a over the rule variants and the bit patterns of the angles, so
    /// the value is the same on every build and platform.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut bytes = [0u8; 19];
        bytes[0] = self.month_start_event as u8;
        bytes[1] = self.day_start_time as u8;
        bytes[2] = self.year_start_rule as u8;
        bytes[3..11].copy_from_slice(&self.day_start_angle.to_bits().to_le_bytes());
        bytes[11..19].copy_from_slice(&self.crescent_visibility_threshold.to_bits().to_le_bytes());
        Fingerprint(fnv1a(&bytes))
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, &b| (hash ^ u64::from(b)).wrapping_mul(PRIME))
}

/// Hash of a [`Configuration`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Fingerprint(pub u64);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Observer position. Latitude and longitude in degrees (east positive),
/// elevation in metres.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub elevation: f64,
}

impl Location {
    /// Jerusalem, the reference location of the biblical calendar.
    pub const JERUSALEM: Location = Location {
        latitude: 31.7683,
        longitude: 35.2137,
        elevation: 0.0,
    };

    /// Creates a location at sea level.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation: 0.0,
        }
    }
    /// Sets the elevation in metres.
    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = elevation;
        self
    }
}

/// Heuristic for the timing uncertainty of ancient events (mostly ΔT).
///
/// The margin grows quadratically with distance from the reference epoch:
/// `base_hours + hours_per_millennium_squared * (Δyears / 1000)²`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyModel {
    pub base_hours: f64,
    pub hours_per_millennium_squared: f64,
    pub reference_year: f64,
}

impl Default for UncertaintyModel {
    fn default() -> Self {
        Self {
            base_hours: 0.25,
            hours_per_millennium_squared: 0.5,
            reference_year: 2000.0,
        }
    }
}

impl UncertaintyModel {
    /// Margin in hours for events around `year`.
    pub fn margin_hours(&self, year: f64) -> f64 {
        let millennia = (year - self.reference_year) / 1000.0;
        self.base_hours + self.hours_per_millennium_squared * millennia * millennia
    }
}

/// Engine knobs that do not change what a calendar means.
///
/// # Example
///
/// ```
/// use lunkalendaro::EngineSettings;
///
/// let settings = EngineSettings::default().with_cache_capacity(8);
/// assert!(settings.validate().is_ok());
/// assert_eq!(8, settings.cache_capacity());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    cache_capacity: usize,
    uncertainty: UncertaintyModel,
    synodic_window_days: f64,
    virgo_max_attempts: usize,
    crescent_max_days: u32,
    morning_fallback_hour: f64,
    evening_fallback_hour: f64,
}

impl Default for EngineSettings {
    /// Defaults: 50 cached entries, 35-day phase window, 7 Virgo-Feet
    /// attempts, 3 crescent look-ahead days, 06:00/18:00 clock fallbacks.
    fn default() -> Self {
        Self {
            cache_capacity: 50,
            uncertainty: UncertaintyModel::default(),
            synodic_window_days: 35.0,
            virgo_max_attempts: 7,
            crescent_max_days: 3,
            morning_fallback_hour: 6.0,
            evening_fallback_hour: 18.0,
        }
    }
}

impl EngineSettings {
    /// Sets the number of entries each cache keeps.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }
    /// Sets the uncertainty heuristic.
    pub fn with_uncertainty(mut self, model: UncertaintyModel) -> Self {
        self.uncertainty = model;
        self
    }
    /// Sets the window, in days, handed to moon phase searches.
    pub fn with_synodic_window(mut self, days: f64) -> Self {
        self.synodic_window_days = days;
        self
    }
    /// Sets how many full moons the Virgo-Feet search tries.
    pub fn with_virgo_max_attempts(mut self, attempts: usize) -> Self {
        self.virgo_max_attempts = attempts;
        self
    }
    /// Sets how many evenings after conjunction a crescent is looked for.
    pub fn with_crescent_max_days(mut self, days: u32) -> Self {
        self.crescent_max_days = days;
        self
    }
    /// Sets the local clock hours used when no day boundary is found.
    pub fn with_fallback_hours(mut self, morning: f64, evening: f64) -> Self {
        self.morning_fallback_hour = morning;
        self.evening_fallback_hour = evening;
        self
    }

    pub fn cache_capacity(&self) -> usize {
        self.cache_capacity
    }
    pub fn uncertainty(&self) -> &UncertaintyModel {
        &self.uncertainty
    }
    pub fn synodic_window_days(&self) -> f64 {
        self.synodic_window_days
    }
    pub fn virgo_max_attempts(&self) -> usize {
        self.virgo_max_attempts
    }
    pub fn crescent_max_days(&self) -> u32 {
        self.crescent_max_days
    }
    /// Local clock hour standing in for a day boundary of the given kind.
    pub fn fallback_hour(&self, time: DayStartTime) -> f64 {
        match time {
            DayStartTime::Morning => self.morning_fallback_hour,
            DayStartTime::Evening => self.evening_fallback_hour,
        }
    }

    /// Validates the settings.
    ///
    /// The synodic window must skip at least one full month (≥ 32 days), the
    /// cache must hold at least one entry and at least one Virgo-Feet attempt
    /// must be allowed.
    pub fn validate(&self) -> Result<(), CalendarError> {
        if self.cache_capacity == 0 {
            return Err(CalendarError::InvalidConfiguration(
                "cache capacity must be at least 1".into(),
            ));
        }
        if !self.synodic_window_days.is_finite() || self.synodic_window_days < 32.0 {
            return Err(CalendarError::InvalidConfiguration(format!(
                "synodic window of {} days cannot skip a full month",
                self.synodic_window_days
            )));
        }
        if self.virgo_max_attempts == 0 {
            return Err(CalendarError::InvalidConfiguration(
                "at least one Virgo-Feet attempt is required".into(),
            ));
        }
        let model = &self.uncertainty;
        if !(model.base_hours >= 0.0 && model.hours_per_millennium_squared >= 0.0) {
            return Err(CalendarError::InvalidConfiguration(
                "uncertainty margins must be non-negative".into(),
            ));
        }
        for hour in [self.morning_fallback_hour, self.evening_fallback_hour] {
            if !(0.0..24.0).contains(&hour) {
                return Err(CalendarError::InvalidConfiguration(format!(
                    "fallback hour {hour} not in 0..24"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation() {
        let config = Configuration::default();
        assert!(config.validate().is_ok());
        for bad in [
            config.with_day_start(DayStartTime::Morning, -6.0),
            config.with_day_start(DayStartTime::Morning, 24.0),
            config.with_day_start(DayStartTime::Morning, f64::NAN),
            config.with_crescent_threshold(0.0),
            config.with_crescent_threshold(120.0),
        ] {
            assert!(matches!(
                bad.validate(),
                Err(CalendarError::InvalidConfiguration(_))
            ));
        }

        assert!(EngineSettings::default().validate().is_ok());
        assert!(EngineSettings::default().with_synodic_window(20.0).validate().is_err());
        assert!(EngineSettings::default().with_cache_capacity(0).validate().is_err());
        assert!(EngineSettings::default().with_virgo_max_attempts(0).validate().is_err());
        assert!(EngineSettings::default().with_fallback_hours(6.0, 24.0).validate().is_err());
    }

    #[test]
    fn rule_names() {
        for (name, std) in [
            ("equinox", YearStartRule::Equinox),
            ("13daysBefore", YearStartRule::PassoverAfterEquinox),
            ("14daysBefore", YearStartRule::PassoverAfterEquinox),
            ("virgoFeet", YearStartRule::VirgoFeet),
        ] {
            assert_eq!(Ok(std), name.parse());
        }
        assert!("equinoxx".parse::<YearStartRule>().is_err());
        assert_eq!(Ok(MonthStartEvent::Crescent), "crescent".parse());
        assert_eq!(Ok(DayStartTime::Evening), "evening".parse());
    }

    #[test]
    fn fingerprints() {
        // Published FNV-1a test vectors.
        assert_eq!(0xcbf2_9ce4_8422_2325, fnv1a(b""));
        assert_eq!(0xaf63_dc4c_8601_ec8c, fnv1a(b"a"));
        assert_eq!(0x8594_4171_f739_67e8, fnv1a(b"foobar"));

        let a = Configuration::default();
        assert_eq!(a.fingerprint(), a.fingerprint());
        assert_ne!(a.fingerprint(), a.with_crescent_threshold(12.0).fingerprint());
        assert_ne!(
            a.fingerprint(),
            a.with_year_start(YearStartRule::VirgoFeet).fingerprint()
        );
    }

    #[test]
    fn serde_round_trip() {
        let json = r#"{
            "monthStartEvent": "dark",
            "dayStartTime": "evening",
            "dayStartAngle": 0.0,
            "yearStartRule": "14daysBefore",
            "crescentVisibilityThreshold": 18.0
        }"#;
        let config: Configuration = serde_json::from_str(json).unwrap();
        assert_eq!(YearStartRule::PassoverAfterEquinox, config.year_start_rule);
        assert_eq!(MonthStartEvent::Dark, config.month_start_event);
        let back: Configuration =
            serde_json::from_str(&serde_json::to_string(&config).unwrap()).unwrap();
        assert_eq!(config, back);

        let loc: Location = serde_json::from_str(r#"{"latitude": 1.0, "longitude": 2.0}"#).unwrap();
        assert_eq!(Location::new(1.0, 2.0), loc);
    }

    #[test]
    fn uncertainty_margin_grows() {
        let model = UncertaintyModel::default();
        assert_eq!(0.25, model.margin_hours(2000.0));
        assert!(model.margin_hours(30.0) > model.margin_hours(1500.0));
        assert!(model.margin_hours(-1445.0) > 5.0);
    }
}
