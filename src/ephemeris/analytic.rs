//! Low-precision analytic ephemeris.
//!
//! Truncated series after Meeus, *Astronomical Algorithms* (2nd ed.):
//! solar longitude (ch. 25), lunar longitude, latitude and distance
//! (ch. 47, main terms), obliquity (ch. 22), sidereal time (ch. 12) and
//! lunar parallax (ch. 40). Positions are evaluated in TT; UT instants are
//! converted with [`delta_t`](crate::time_scales::delta_t).
//!
//! Event searches scan with a coarse step and refine sign changes by
//! bisection. Expected accuracy: phases and equinoxes within minutes in the
//! modern era (ancient dates add ΔT error), rise/set within a couple of
//! minutes away from the polar circles.

use std::f64::consts::PI;

use super::{Body, Direction, Ephemeris, Equatorial, MoonPhase};
use crate::config::Location;
use crate::time_scales::{Timestamp, Tt};

/// Altitude of the upper limb at rise/set with standard refraction.
const RISE_SET_ALTITUDE: f64 = -0.8333;
const EARTH_RADIUS_KM: f64 = 6378.14;

const LONGITUDE_STEP_DAYS: f64 = 1.0;
const ALTITUDE_STEP_DAYS: f64 = 1.0 / 48.0;
const CONVERGENCE_DAYS: f64 = 0.5 / 86400.0;
const MAX_BISECTIONS: usize = 60;

/// Analytic sun and moon ephemeris. Stateless and cheap to copy.
#[derive(Debug, Copy, Clone, Default)]
pub struct AnalyticEphemeris;

impl AnalyticEphemeris {
    pub fn new() -> Self {
        Self
    }
}

impl Ephemeris for AnalyticEphemeris {
    fn search_moon_phase(
        &self,
        phase: MoonPhase,
        from: Timestamp,
        limit_days: f64,
    ) -> Option<Timestamp> {
        let target = phase.degrees();
        find_crossing(from, limit_days, LONGITUDE_STEP_DAYS, true, |t| {
            let tt = Tt::from(t);
            normalize_pm180(moon_ecliptic(tt).longitude - sun_longitude(tt) - target)
        })
    }

    fn search_equinox(&self, from: Timestamp, limit_days: f64) -> Option<Timestamp> {
        find_crossing(from, limit_days, LONGITUDE_STEP_DAYS, true, |t| {
            normalize_pm180(sun_longitude(Tt::from(t)))
        })
    }

    fn search_rise_set(
        &self,
        body: Body,
        observer: &Location,
        direction: Direction,
        from: Timestamp,
        limit_days: f64,
    ) -> Option<Timestamp> {
        self.search_altitude(body, observer, direction, from, limit_days, RISE_SET_ALTITUDE)
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
        let rising = direction == Direction::Rise;
        find_crossing(from, limit_days, ALTITUDE_STEP_DAYS, rising, |t| {
            altitude_of(body, observer, t) - altitude
        })
    }

    fn equatorial(&self, body: Body, at: Timestamp, observer: &Location) -> Option<Equatorial> {
        let coords = equatorial_of(body, observer, at);
        (coords.right_ascension.is_finite() && coords.declination.is_finite()).then_some(coords)
    }
}

/// Finds the first time after `from` where `f` crosses zero upwards
/// (`rising`) or downwards, within `limit_days`.
///
/// Jumps larger than 270 are wrap-arounds of an angle, not crossings.
fn find_crossing<F>(from: Timestamp, limit_days: f64, step: f64, rising: bool, f: F) -> Option<Timestamp>
where
    F: Fn(Timestamp) -> f64,
{
    let sign = if rising { 1.0 } else { -1.0 };
    let g = |t: Timestamp| sign * f(t);
    let end = from + limit_days;

    let mut t_a = from;
    let mut g_a = g(t_a);
    while t_a < end {
        let t_b = if t_a + step < end { t_a + step } else { end };
        let g_b = g(t_b);
        if g_a < 0.0 && g_b >= 0.0 && (g_b - g_a) < 270.0 {
            return Some(bisect(t_a, t_b, &g));
        }
        t_a = t_b;
        g_a = g_b;
    }
    None
}

fn bisect<G: Fn(Timestamp) -> f64>(mut t_a: Timestamp, mut t_b: Timestamp, g: &G) -> Timestamp {
    for _ in 0..MAX_BISECTIONS {
        if t_b - t_a < CONVERGENCE_DAYS {
            break;
        }
        let mid = Timestamp(0.5 * (t_a.0 + t_b.0));
        if g(mid) < 0.0 {
            t_a = mid;
        } else {
            t_b = mid;
        }
    }
    Timestamp(0.5 * (t_a.0 + t_b.0))
}

/// Wraps an angle into `(-180, 180]`.
fn normalize_pm180(deg: f64) -> f64 {
    let d = deg.rem_euclid(360.0);
    if d > 180.0 { d - 360.0 } else { d }
}

fn sin_deg(deg: f64) -> f64 {
    deg.to_radians().sin()
}
fn cos_deg(deg: f64) -> f64 {
    deg.to_radians().cos()
}

fn centuries(tt: Tt) -> f64 {
    (tt.0 - 2451545.0) / 36525.0
}

fn ascending_node(t: f64) -> f64 {
    125.04452 - 1934.136261 * t
}

/// Apparent geocentric longitude of the sun, degrees in `[0, 360)`.
fn sun_longitude(tt: Tt) -> f64 {
    let t = centuries(tt);
    let l0 = 280.46646 + 36000.76983 * t + 0.0003032 * t * t;
    let m = 357.52911 + 35999.05029 * t - 0.0001537 * t * t;
    let c = (1.914602 - 0.004817 * t - 0.000014 * t * t) * sin_deg(m)
        + (0.019993 - 0.000101 * t) * sin_deg(2.0 * m)
        + 0.000289 * sin_deg(3.0 * m);
    let omega = ascending_node(t);
    (l0 + c - 0.00569 - 0.00478 * sin_deg(omega)).rem_euclid(360.0)
}

struct Ecliptic {
    longitude: f64,
    latitude: f64,
    distance_km: f64,
}

// (D, M, M', F, Σl [1e-6 deg], Σr [1e-3 km])
#[rustfmt::skip]
const MOON_LR: &[(i8, i8, i8, i8, f64, f64)] = &[
    (0, 0, 1, 0, 6288774.0, -20905355.0),
    (2, 0, -1, 0, 1274027.0, -3699111.0),
    (2, 0, 0, 0, 658314.0, -2955968.0),
    (0, 0, 2, 0, 213618.0, -569925.0),
    (0, 1, 0, 0, -185116.0, 48888.0),
    (0, 0, 0, 2, -114332.0, -3149.0),
    (2, 0, -2, 0, 58793.0, 246158.0),
    (2, -1, -1, 0, 57066.0, -152138.0),
    (2, 0, 1, 0, 53322.0, -170733.0),
    (2, -1, 0, 0, 45758.0, -204586.0),
    (0, 1, -1, 0, -40923.0, -129620.0),
    (1, 0, 0, 0, -34720.0, 108743.0),
    (0, 1, 1, 0, -30383.0, 104755.0),
    (2, 0, 0, -2, 15327.0, 10321.0),
    (0, 0, 1, 2, -12528.0, 0.0),
    (0, 0, 1, -2, 10980.0, 79661.0),
    (4, 0, -1, 0, 10675.0, -34782.0),
    (0, 0, 3, 0, 10034.0, -23210.0),
    (4, 0, -2, 0, 8548.0, -21636.0),
    (2, 1, -1, 0, -7888.0, 24208.0),
    (2, 1, 0, 0, -6766.0, 30824.0),
    (1, 0, -1, 0, -5163.0, -8379.0),
    (1, 1, 0, 0, 4987.0, -16675.0),
    (2, -1, 1, 0, 4036.0, -12831.0),
    (2, 0, 2, 0, 3994.0, -10445.0),
    (4, 0, 0, 0, 3861.0, -11650.0),
    (2, 0, -3, 0, 3665.0, 14403.0),
    (0, 1, -2, 0, -2689.0, -7003.0),
    (2, 0, -1, 2, -2602.0, 0.0),
    (2, -1, -2, 0, 2390.0, 10056.0),
    (1, 0, 1, 0, -2348.0, 6322.0),
    (2, -2, 0, 0, 2236.0, -9884.0),
    (0, 1, 2, 0, -2120.0, 5751.0),
    (0, 2, 0, 0, -2069.0, 0.0),
];

// (D, M, M', F, Σb [1e-6 deg])
#[rustfmt::skip]
const MOON_B: &[(i8, i8, i8, i8, f64)] = &[
    (0, 0, 0, 1, 5128122.0),
    (0, 0, 1, 1, 280602.0),
    (0, 0, 1, -1, 277693.0),
    (2, 0, 0, -1, 173237.0),
    (2, 0, -1, 1, 55413.0),
    (2, 0, -1, -1, 46271.0),
    (2, 0, 0, 1, 32573.0),
    (0, 0, 2, 1, 17198.0),
    (2, 0, 1, -1, 9266.0),
    (0, 0, 2, -1, 8822.0),
    (2, -1, 0, -1, 8216.0),
    (2, 0, -2, -1, 4324.0),
    (2, 0, 1, 1, 4200.0),
    (2, 1, 0, -1, -3359.0),
];

/// Apparent geocentric ecliptic position of the moon.
fn moon_ecliptic(tt: Tt) -> Ecliptic {
    let t = centuries(tt);
    let (t2, t3, t4) = (t * t, t * t * t, t * t * t * t);
    let lp = 218.3164477 + 481267.88123421 * t - 0.0015786 * t2 + t3 / 538841.0
        - t4 / 65194000.0;
    let d = 297.8501921 + 445267.1114034 * t - 0.0018819 * t2 + t3 / 545868.0
        - t4 / 113065000.0;
    let m = 357.5291092 + 35999.0502909 * t - 0.0001536 * t2 + t3 / 24490000.0;
    let mp = 134.9633964 + 477198.8675055 * t + 0.0087414 * t2 + t3 / 69699.0
        - t4 / 14712000.0;
    let f = 93.2720950 + 483202.0175233 * t - 0.0036539 * t2 - t3 / 3526000.0
        + t4 / 863310000.0;
    let e = 1.0 - 0.002516 * t - 0.0000074 * t2;
    let a1 = 119.75 + 131.849 * t;
    let a2 = 53.09 + 479264.290 * t;
    let a3 = 313.45 + 481266.484 * t;

    let eccentricity = |cm: i8| match cm.abs() {
        1 => e,
        2 => e * e,
        _ => 1.0,
    };
    let argument =
        |cd: i8, cm: i8, cmp: i8, cf: i8| cd as f64 * d + cm as f64 * m + cmp as f64 * mp + cf as f64 * f;

    let mut sum_l = 0.0;
    let mut sum_r = 0.0;
    for &(cd, cm, cmp, cf, l, r) in MOON_LR {
        let arg = argument(cd, cm, cmp, cf);
        let k = eccentricity(cm);
        sum_l += k * l * sin_deg(arg);
        sum_r += k * r * cos_deg(arg);
    }
    let mut sum_b = 0.0;
    for &(cd, cm, cmp, cf, b) in MOON_B {
        sum_b += eccentricity(cm) * b * sin_deg(argument(cd, cm, cmp, cf));
    }
    sum_l += 3958.0 * sin_deg(a1) + 1962.0 * sin_deg(lp - f) + 318.0 * sin_deg(a2);
    sum_b += -2235.0 * sin_deg(lp) + 382.0 * sin_deg(a3) + 175.0 * sin_deg(a1 - f)
        + 175.0 * sin_deg(a1 + f)
        + 127.0 * sin_deg(lp - mp)
        - 115.0 * sin_deg(lp + mp);

    let nutation = -0.00478 * sin_deg(ascending_node(t));
    Ecliptic {
        longitude: (lp + sum_l / 1e6 + nutation).rem_euclid(360.0),
        latitude: sum_b / 1e6,
        distance_km: 385000.56 + sum_r / 1000.0,
    }
}

/// True obliquity of the ecliptic in degrees.
fn obliquity(tt: Tt) -> f64 {
    let t = centuries(tt);
    let mean = 23.439291111 - 0.013004167 * t - 1.6389e-7 * t * t + 5.036e-7 * t * t * t;
    mean + 0.00256 * cos_deg(ascending_node(t))
}

fn ecliptic_to_equatorial(longitude: f64, latitude: f64, obliquity: f64) -> Equatorial {
    let (l, b, eps) = (
        longitude.to_radians(),
        latitude.to_radians(),
        obliquity.to_radians(),
    );
    let ra = (l.sin() * eps.cos() - b.tan() * eps.sin()).atan2(l.cos());
    let dec = (b.sin() * eps.cos() + b.cos() * eps.sin() * l.sin()).asin();
    Equatorial {
        right_ascension: ra.to_degrees().rem_euclid(360.0),
        declination: dec.to_degrees(),
    }
}

/// Greenwich mean sidereal time in degrees for a UT instant.
fn sidereal_time(ut: Timestamp) -> f64 {
    let days = ut.0 - 2451545.0;
    let t = days / 36525.0;
    (280.46061837 + 360.98564736629 * days + 0.000387933 * t * t - t * t * t / 38710000.0)
        .rem_euclid(360.0)
}

/// Shifts geocentric coordinates of a body at `distance_km` to the observer.
fn topocentric(geo: Equatorial, distance_km: f64, observer: &Location, lst: f64) -> Equatorial {
    let phi = observer.latitude.to_radians();
    let u = (0.99664719 * phi.tan()).atan();
    let height = observer.elevation / 6378140.0;
    let rho_sin = 0.99664719 * u.sin() + height * phi.sin();
    let rho_cos = u.cos() + height * phi.cos();
    let sin_pi = EARTH_RADIUS_KM / distance_km;

    let h = (lst - geo.right_ascension).to_radians();
    let dec = geo.declination.to_radians();
    let denom = dec.cos() - rho_cos * sin_pi * h.cos();
    let d_ra = (-rho_cos * sin_pi * h.sin()).atan2(denom);
    let dec_topo = ((dec.sin() - rho_sin * sin_pi) * d_ra.cos()).atan2(denom);
    Equatorial {
        right_ascension: (geo.right_ascension + d_ra.to_degrees()).rem_euclid(360.0),
        declination: dec_topo.to_degrees(),
    }
}

fn equatorial_of(body: Body, observer: &Location, ut: Timestamp) -> Equatorial {
    let tt = Tt::from(ut);
    let eps = obliquity(tt);
    match body {
        Body::Sun => ecliptic_to_equatorial(sun_longitude(tt), 0.0, eps),
        Body::Moon => {
            let moon = moon_ecliptic(tt);
            let geo = ecliptic_to_equatorial(moon.longitude, moon.latitude, eps);
            let lst = sidereal_time(ut) + observer.longitude;
            topocentric(geo, moon.distance_km, observer, lst)
        }
    }
}

/// Geometric altitude of `body` above the observer's horizon, in degrees.
fn altitude_of(body: Body, observer: &Location, ut: Timestamp) -> f64 {
    let eq = equatorial_of(body, observer, ut);
    let lst = sidereal_time(ut) + observer.longitude;
    let h = (lst - eq.right_ascension).to_radians();
    let (phi, dec) = (observer.latitude.to_radians(), eq.declination.to_radians());
    let sin_alt = phi.sin() * dec.sin() + phi.cos() * dec.cos() * h.cos();
    sin_alt.clamp(-1.0, 1.0).asin() * 180.0 / PI
}
