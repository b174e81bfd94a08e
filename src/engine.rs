//! The calendar engine: configuration, caching and the public queries.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::cache::{BoundedCache, CacheKey, CacheStats};
use crate::config::{Configuration, EngineSettings, Location, YearStartRule};
use crate::date::Date;
use crate::ephemeris::Ephemeris;
use crate::error::{CalendarError, Result};
use crate::lunar::{LunarDate, OtherYear, Resolver, VirgoSearch, Year, YearOptions, YearStart};
use crate::time_scales::Timestamp;

/// Builds and caches lunar calendar years.
///
/// The engine owns its caches; two engines never share entries. It is
/// [`Send`] + [`Sync`] when the ephemeris is, so independent years can be
/// built from several threads through a shared reference. A single year is
/// always built on one thread, each month start depending on the previous.
///
/// # Example
///
/// ```
/// use lunkalendaro::ephemeris::AnalyticEphemeris;
/// use lunkalendaro::lunar::YearOptions;
/// use lunkalendaro::{Configuration, Engine, Location, MonthStartEvent};
///
/// let mut engine = Engine::new(AnalyticEphemeris::new());
/// engine
///     .configure(Configuration::default().with_month_start(MonthStartEvent::Dark))
///     .unwrap();
///
/// let year = engine
///     .generate_year(2025, &Location::JERUSALEM, YearOptions::default())
///     .unwrap();
/// assert!((12..=13).contains(&year.months.len()));
///
/// let start = engine.year_start_point(2025, &Location::JERUSALEM).unwrap();
/// assert_eq!(year.start(), start);
/// ```
pub struct Engine<E> {
    ephemeris: E,
    configuration: Configuration,
    settings: EngineSettings,
    years: BoundedCache<CacheKey, Arc<Year>>,
    virgo: BoundedCache<CacheKey, Arc<VirgoSearch>>,
}

impl<E> std::fmt::Debug for Engine<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("configuration", &self.configuration)
            .field("settings", &self.settings)
            .field("cached_years", &self.years.len())
            .finish_non_exhaustive()
    }
}

impl<E: Ephemeris> Engine<E> {
    /// Creates an engine with the default configuration and settings.
    pub fn new(ephemeris: E) -> Self {
        let settings = EngineSettings::default();
        Self {
            ephemeris,
            configuration: Configuration::default(),
            years: BoundedCache::new(settings.cache_capacity()),
            virgo: BoundedCache::new(settings.cache_capacity()),
            settings,
        }
    }

    /// Creates an engine with custom settings.
    pub fn with_settings(ephemeris: E, settings: EngineSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            ephemeris,
            configuration: Configuration::default(),
            years: BoundedCache::new(settings.cache_capacity()),
            virgo: BoundedCache::new(settings.cache_capacity()),
            settings,
        })
    }

    /// Replaces the rule set used by later queries.
    ///
    /// Cached years stay valid: entries are keyed by configuration.
    pub fn configure(&mut self, configuration: Configuration) -> Result<()> {
        configuration.validate()?;
        debug!(fingerprint = %configuration.fingerprint(), "configured");
        self.configuration = configuration;
        Ok(())
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }
    pub fn ephemeris(&self) -> &E {
        &self.ephemeris
    }

    fn resolver(&self, location: &Location) -> Resolver<'_, E> {
        Resolver::new(&self.ephemeris, *location, self.configuration, &self.settings)
    }

    fn key(&self, year: i32, location: &Location) -> CacheKey {
        CacheKey::new(year, location, self.configuration.fingerprint())
    }

    /// The Virgo-Feet search for `year`, cached separately from years.
    pub fn virgo_search(&self, year: i32, location: &Location) -> Result<Arc<VirgoSearch>> {
        let key = self.key(year, location);
        if let Some(found) = self.virgo.get(&key) {
            return Ok(found);
        }
        let resolver = self.resolver(location);
        let equinox = resolver.spring_equinox(year)?;
        let search = Arc::new(resolver.virgo_search(year, equinox)?);
        self.virgo.insert(key, Arc::clone(&search));
        Ok(search)
    }

    fn year_start(&self, resolver: &Resolver<'_, E>, year: i32) -> Result<YearStart> {
        let equinox = resolver.spring_equinox(year)?;
        let virgo = match self.configuration.year_start_rule {
            YearStartRule::VirgoFeet => {
                Some(VirgoSearch::clone(&*self.virgo_search(year, resolver.location())?))
            }
            _ => None,
        };
        resolver.year_start_with(year, equinox, virgo)
    }

    /// Builds lunar year `year` at `location`, or returns it from the cache.
    #[instrument(skip(self, location), fields(lat = location.latitude, lon = location.longitude))]
    pub fn generate_year(
        &self,
        year: i32,
        location: &Location,
        options: YearOptions,
    ) -> Result<Arc<Year>> {
        let key = self
            .key(year, location)
            .with_uncertainty(options.include_uncertainty);
        if let Some(found) = self.years.get(&key) {
            debug!("cache hit");
            return Ok(found);
        }
        let resolver = self.resolver(location);
        let start = self.year_start(&resolver, year)?;
        let next = self.year_start(&resolver, year + 1)?;
        let built = Arc::new(Year::build(&resolver, start, &next, options)?);
        debug!(months = built.months.len(), days = built.day_count(), "year built");
        self.years.insert(key, Arc::clone(&built));
        Ok(built)
    }

    /// Start of day 1 of month 1 of `year`.
    ///
    /// Uses a cached year if there is one; otherwise resolves only the year
    /// start.
    pub fn year_start_point(&self, year: i32, location: &Location) -> Result<Timestamp> {
        for included in [true, false] {
            let key = self.key(year, location).with_uncertainty(included);
            if let Some(found) = self.years.get(&key) {
                return Ok(found.start());
            }
        }
        let resolver = self.resolver(location);
        let start = self.year_start(&resolver, year)?;
        Ok(resolver.first_day_at_or_after(start.event.at).start.at)
    }

    /// The lunar date containing `instant` at `location`.
    ///
    /// Tries the lunar year numbered like the instant's civil year, then the
    /// adjacent one on the side the instant lies.
    pub fn locate(&self, instant: Timestamp, location: &Location) -> Result<LunarDate> {
        let options = YearOptions::default();
        let guess = instant.local_date(location.longitude).civil().0;
        let year = self.generate_year(guess, location, options)?;
        let other = match year.locate(instant) {
            Ok(found) => return Ok(found),
            Err(OtherYear::Before) => guess - 1,
            Err(OtherYear::After) => guess + 1,
        };
        self.generate_year(other, location, options)?
            .locate(instant)
            .map_err(|_| CalendarError::OutOfRangeLookup {
                year: other,
                position: format!("JD {}", instant.0),
            })
    }

    /// The lunar date whose daylight falls on the civil `date` at `location`.
    ///
    /// # Example
    ///
    /// ```
    /// use lunkalendaro::ephemeris::AnalyticEphemeris;
    /// use lunkalendaro::{Configuration, Date, Engine, Location, MonthStartEvent};
    ///
    /// let mut engine = Engine::new(AnalyticEphemeris::new());
    /// engine
    ///     .configure(Configuration::default().with_month_start(MonthStartEvent::Dark))
    ///     .unwrap();
    ///
    /// // Early January belongs to the lunar year that began the spring before.
    /// let date = Date::from_civil(2025, 1, 5).unwrap();
    /// let found = engine.lunar_date_for(date, &Location::JERUSALEM).unwrap();
    /// assert_eq!(2024, found.year);
    /// assert!(found.month >= 10);
    /// ```
    pub fn lunar_date_for(&self, date: Date, location: &Location) -> Result<LunarDate> {
        self.locate(Timestamp::local_noon(date, location.longitude), location)
            .map_err(|err| match err {
                CalendarError::OutOfRangeLookup { year, .. } => CalendarError::OutOfRangeLookup {
                    year,
                    position: date.to_string(),
                },
                err => err,
            })
    }

    /// Empties both caches.
    pub fn clear_caches(&self) {
        self.years.clear();
        self.virgo.clear();
    }

    /// Number of years currently cached.
    pub fn cached_years(&self) -> usize {
        self.years.len()
    }

    /// Counters of the year cache.
    pub fn year_cache_stats(&self) -> CacheStats {
        self.years.stats()
    }
    /// Counters of the Virgo-Feet cache.
    pub fn virgo_cache_stats(&self) -> CacheStats {
        self.virgo.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DayStartTime, MonthStartEvent};
    use crate::ephemeris::{AnalyticEphemeris, Body, Equatorial};
    use crate::lunar::tests::Wrapped;

    fn engine(config: Configuration) -> Engine<AnalyticEphemeris> {
        let mut engine = Engine::new(AnalyticEphemeris::new());
        engine.configure(config).unwrap();
        engine
    }

    fn dark() -> Configuration {
        Configuration::default()
            .with_month_start(MonthStartEvent::Dark)
            .with_day_start(DayStartTime::Morning, 12.0)
    }

    #[test]
    fn rejects_invalid_configuration() {
        let mut engine = Engine::new(AnalyticEphemeris::new());
        let bad = Configuration::default().with_day_start(DayStartTime::Morning, 30.0);
        assert!(matches!(
            engine.configure(bad),
            Err(CalendarError::InvalidConfiguration(_))
        ));
        assert_eq!(&Configuration::default(), engine.configuration());

        let settings = EngineSettings::default().with_synodic_window(10.0);
        assert!(Engine::with_settings(AnalyticEphemeris::new(), settings).is_err());
    }

    #[test]
    fn years_are_cached() {
        let engine = engine(dark());
        let loc = Location::JERUSALEM;
        let a = engine.generate_year(2025, &loc, YearOptions::default()).unwrap();
        let b = engine.generate_year(2025, &loc, YearOptions::default()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(1, engine.cached_years());
        assert_eq!(1, engine.year_cache_stats().hits);

        // Rounded to 1e-4 degrees.
        let nearby = Location::new(loc.latitude + 1e-6, loc.longitude);
        let c = engine.generate_year(2025, &nearby, YearOptions::default()).unwrap();
        assert!(Arc::ptr_eq(&a, &c));

        engine.clear_caches();
        assert_eq!(0, engine.cached_years());
        let d = engine.generate_year(2025, &loc, YearOptions::default()).unwrap();
        assert!(!Arc::ptr_eq(&a, &d));
        assert_eq!(*a, *d);
    }

    #[test]
    fn configuration_changes_rebuild() {
        let mut engine = engine(dark());
        let loc = Location::JERUSALEM;
        let dark_year = engine.generate_year(2025, &loc, YearOptions::default()).unwrap();
        engine
            .configure(dark().with_month_start(MonthStartEvent::Full))
            .unwrap();
        let full_year = engine.generate_year(2025, &loc, YearOptions::default()).unwrap();
        assert_ne!(dark_year.months[0].moon_event, full_year.months[0].moon_event);
        assert_eq!(2, engine.cached_years());
        // The earlier year is untouched.
        assert_eq!(MonthStartEvent::Dark, dark_year.configuration.month_start_event);
    }

    #[test]
    fn cache_is_bounded() {
        let settings = EngineSettings::default().with_cache_capacity(2);
        let mut engine = Engine::with_settings(AnalyticEphemeris::new(), settings).unwrap();
        engine.configure(dark()).unwrap();
        let loc = Location::JERUSALEM;
        for year in [2024, 2025, 2026] {
            engine.generate_year(year, &loc, YearOptions::default()).unwrap();
        }
        assert_eq!(2, engine.cached_years());
    }

    #[test]
    fn year_start_point_matches_year() {
        let engine = engine(dark());
        let loc = Location::JERUSALEM;
        let uncached = engine.year_start_point(2026, &loc).unwrap();
        let year = engine.generate_year(2026, &loc, YearOptions::default()).unwrap();
        assert_eq!(year.start(), uncached);
        assert_eq!(year.start(), engine.year_start_point(2026, &loc).unwrap());
    }

    #[test]
    fn locate_crosses_years() {
        let engine = engine(dark());
        let loc = Location::JERUSALEM;
        let year = engine.generate_year(2025, &loc, YearOptions::default()).unwrap();
        let last = year.days().last().unwrap();
        // Early 2026 civil dates still belong to lunar 2025.
        let found = engine.lunar_date_for(last.date, &loc).unwrap();
        assert_eq!(2025, found.year);
        assert_eq!(year.months.len() as u32, found.month);
        let found = engine.lunar_date_for(last.date + 1, &loc).unwrap();
        assert_eq!(LunarDate { year: 2026, month: 1, day: 1 }, found);

        let found = engine.locate(year.start() + 0.5, &loc).unwrap();
        assert_eq!(LunarDate { year: 2025, month: 1, day: 1 }, found);
    }

    #[test]
    fn virgo_searches_are_cached_apart() {
        let engine = engine(dark().with_year_start(YearStartRule::VirgoFeet));
        let loc = Location::JERUSALEM;
        let year = engine.generate_year(2025, &loc, YearOptions::default()).unwrap();
        // 2025 and 2026 starts were both resolved.
        assert_eq!(2, engine.virgo_cache_stats().entries);
        engine.clear_caches();
        let search = engine.virgo_search(2025, &loc).unwrap();
        assert_eq!(Some(search.as_ref()), year.virgo.as_ref());
        assert_eq!(0, engine.cached_years());
    }

    #[test]
    fn missing_equinox_fails_the_year() {
        let mut engine = Engine::new(Wrapped {
            inner: AnalyticEphemeris::new(),
            equatorial: |_: Body, _: Timestamp| None::<Equatorial>,
            equinox: false,
        });
        engine.configure(dark()).unwrap();
        let Err(err) = engine.generate_year(2025, &Location::JERUSALEM, YearOptions::default())
        else {
            panic!("year built without an equinox");
        };
        assert!(matches!(err, CalendarError::EquinoxNotFound { year: 2025, .. }), "{err:?}");
        assert!(!err.is_recoverable());
        assert_eq!(0, engine.cached_years());
        assert!(engine.year_start_point(2025, &Location::JERUSALEM).is_err());
    }

    #[test]
    fn virgo_fallback_reaches_the_built_year() {
        let mut engine = Engine::new(Wrapped {
            inner: AnalyticEphemeris::new(),
            equatorial: |_: Body, _: Timestamp| {
                Some(Equatorial {
                    right_ascension: 0.0,
                    declination: 0.0,
                })
            },
            equinox: true,
        });
        engine
            .configure(
                Configuration::default()
                    .with_month_start(MonthStartEvent::Full)
                    .with_year_start(YearStartRule::VirgoFeet),
            )
            .unwrap();
        let year = engine
            .generate_year(2025, &Location::JERUSALEM, YearOptions::default())
            .unwrap();
        let search = year.virgo.as_ref().unwrap();
        assert!(search.fallback_used);
        assert!(search.attempts.iter().all(|a| !a.qualifies));
        assert_eq!(search.full_moon, year.months[0].moon_event);
        assert!((12..=13).contains(&year.months.len()));
    }

    #[test]
    fn independent_years_in_parallel() {
        let engine = Arc::new(engine(dark()));
        let handles: Vec<_> = [2023, 2024, 2025]
            .into_iter()
            .map(|y| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    engine
                        .generate_year(y, &Location::JERUSALEM, YearOptions::default())
                        .map(|year| year.months.len())
                })
            })
            .collect();
        for handle in handles {
            let months = handle.join().unwrap().unwrap();
            assert!((12..=13).contains(&months));
        }
        assert_eq!(3, engine.cached_years());
    }
}
