use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use std::fmt;
use std::num::ParseFloatError;
use std::str::FromStr;

#[derive(Debug, Snafu)]
pub enum ParseError {
    #[snafu(display("expected LAT,LNG, got {input:?}"))]
    MissingComma { input: String },
    #[snafu(display("bad {axis} {input:?}"))]
    BadNumber {
        axis: &'static str,
        input: String,
        source: ParseFloatError,
    },
    #[snafu(display("coordinates out of range: {lat},{lng}"))]
    OutOfRange { lat: f64, lng: f64 },
    #[snafu(display("unsupported workout type: {value:?}"))]
    UnknownKind { value: String },
}

/// A geographic position, stored as `[lat, lng]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coords {
    pub lat: f64,
    pub lng: f64,
}

impl Coords {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<[f64; 2]> for Coords {
    fn from([lat, lng]: [f64; 2]) -> Self {
        Self { lat, lng }
    }
}

impl From<Coords> for [f64; 2] {
    fn from(c: Coords) -> Self {
        [c.lat, c.lng]
    }
}

impl fmt::Display for Coords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5},{:.5}", self.lat, self.lng)
    }
}

/// Parses `"LAT,LNG"`.
impl FromStr for Coords {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lng) = s
            .split_once(',')
            .ok_or_else(|| MissingCommaSnafu { input: s }.build())?;
        let lat: f64 = lat.trim().parse().context(BadNumberSnafu {
            axis: "latitude",
            input: lat,
        })?;
        let lng: f64 = lng.trim().parse().context(BadNumberSnafu {
            axis: "longitude",
            input: lng,
        })?;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return OutOfRangeSnafu { lat, lng }.fail();
        }
        Ok(Self { lat, lng })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkoutId(String);

impl WorkoutId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WorkoutId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for WorkoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Restored ids further ahead of the clock than this are not trusted.
const MAX_CLOCK_SKEW_MS: i64 = 24 * 60 * 60 * 1000;

/// Issues ids from the creation timestamp (milliseconds), bumped so that every id is
/// strictly greater than the previous one even within the same millisecond.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: i64,
}

impl IdGenerator {
    pub fn next(&mut self, now: DateTime<Utc>) -> WorkoutId {
        let ms = now.timestamp_millis().max(self.last.saturating_add(1));
        self.last = ms;
        WorkoutId(ms.to_string())
    }

    /// Makes sure ids issued later never collide with restored ones.
    ///
    /// Ids more than a day ahead of `now` are ignored.
    pub fn observe(&mut self, id: &WorkoutId, now: DateTime<Utc>) {
        let Ok(ms) = id.as_str().parse::<i64>() else {
            return;
        };
        if ms > now.timestamp_millis().saturating_add(MAX_CLOCK_SKEW_MS) {
            tracing::warn!(id = %id, "restored id is ahead of the clock; not tracking it");
            return;
        }
        self.last = self.last.max(ms);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkoutKind {
    Running,
    Cycling,
}

impl WorkoutKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Cycling => "cycling",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Cycling => "Cycling",
        }
    }
}

impl fmt::Display for WorkoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkoutKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "cycling" => Ok(Self::Cycling),
            other => UnknownKindSnafu { value: other }.fail(),
        }
    }
}

/// Fields shared by every workout variant.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutBase {
    pub id: WorkoutId,
    pub created_at: DateTime<Utc>,
    pub coords: Coords,
    pub distance_km: f64,
    pub duration_min: f64,
    pub clicks: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Running {
    base: WorkoutBase,
    cadence_spm: f64,
    pace_min_per_km: f64,
}

impl Running {
    /// No validation happens here; a zero distance yields an infinite or NaN pace.
    pub fn new(base: WorkoutBase, cadence_spm: f64) -> Self {
        let pace_min_per_km = base.duration_min / base.distance_km;
        Self {
            base,
            cadence_spm,
            pace_min_per_km,
        }
    }

    pub const fn cadence_spm(&self) -> f64 {
        self.cadence_spm
    }

    pub const fn pace_min_per_km(&self) -> f64 {
        self.pace_min_per_km
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cycling {
    base: WorkoutBase,
    elevation_gain_m: f64,
    speed_km_per_h: f64,
}

impl Cycling {
    pub fn new(base: WorkoutBase, elevation_gain_m: f64) -> Self {
        let speed_km_per_h = base.distance_km / (base.duration_min / 60.0);
        Self {
            base,
            elevation_gain_m,
            speed_km_per_h,
        }
    }

    pub const fn elevation_gain_m(&self) -> f64 {
        self.elevation_gain_m
    }

    pub const fn speed_km_per_h(&self) -> f64 {
        self.speed_km_per_h
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Workout {
    Running(Running),
    Cycling(Cycling),
}

impl Workout {
    const fn base(&self) -> &WorkoutBase {
        match self {
            Self::Running(r) => &r.base,
            Self::Cycling(c) => &c.base,
        }
    }

    pub const fn kind(&self) -> WorkoutKind {
        match self {
            Self::Running(_) => WorkoutKind::Running,
            Self::Cycling(_) => WorkoutKind::Cycling,
        }
    }

    pub const fn id(&self) -> &WorkoutId {
        &self.base().id
    }

    pub const fn created_at(&self) -> DateTime<Utc> {
        self.base().created_at
    }

    pub const fn coords(&self) -> Coords {
        self.base().coords
    }

    pub const fn distance_km(&self) -> f64 {
        self.base().distance_km
    }

    pub const fn duration_min(&self) -> f64 {
        self.base().duration_min
    }

    pub const fn clicks(&self) -> u32 {
        self.base().clicks
    }

    /// Pace (min/km) for running, speed (km/h) for cycling.
    pub const fn derived_metric(&self) -> f64 {
        match self {
            Self::Running(r) => r.pace_min_per_km,
            Self::Cycling(c) => c.speed_km_per_h,
        }
    }

    /// Cadence (spm) for running, elevation gain (m) for cycling.
    pub const fn secondary_metric(&self) -> f64 {
        match self {
            Self::Running(r) => r.cadence_spm,
            Self::Cycling(c) => c.elevation_gain_m,
        }
    }

    /// The only mutation a workout allows after construction.
    pub fn register_click(&mut self) {
        let base = match self {
            Self::Running(r) => &mut r.base,
            Self::Cycling(c) => &mut c.base,
        };
        base.clicks = base.clicks.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn base(distance_km: f64, duration_min: f64) -> WorkoutBase {
        WorkoutBase {
            id: WorkoutId::from("1"),
            created_at: Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap(),
            coords: Coords::new(51.5, -0.12),
            distance_km,
            duration_min,
            clicks: 0,
        }
    }

    #[test]
    fn running_pace_example() {
        let r = Running::new(base(5.0, 30.0), 150.0);
        assert!((r.pace_min_per_km() - 6.0).abs() < 1e-12);
        assert!((r.cadence_spm() - 150.0).abs() < f64::EPSILON);
    }

    #[test]
    fn cycling_speed_example() {
        let c = Cycling::new(base(20.0, 60.0), 100.0);
        assert!((c.speed_km_per_h() - 20.0).abs() < 1e-12);
    }

    #[test]
    fn zero_distance_is_not_guarded_by_the_model() {
        let r = Running::new(base(0.0, 30.0), 150.0);
        assert!(r.pace_min_per_km().is_infinite());
        let c = Cycling::new(base(0.0, 0.0), 0.0);
        assert!(c.speed_km_per_h().is_nan());
    }

    #[test]
    fn click_is_the_only_mutation() {
        let mut w = Workout::Running(Running::new(base(5.0, 30.0), 150.0));
        let before = w.clone();
        w.register_click();
        w.register_click();
        assert_eq!(w.clicks(), 2);
        assert_eq!(w.id(), before.id());
        assert!((w.derived_metric() - before.derived_metric()).abs() < f64::EPSILON);
    }

    #[test]
    fn ids_within_one_millisecond_are_distinct() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let mut ids = IdGenerator::default();
        let a = ids.next(now);
        let b = ids.next(now);
        let c = ids.next(now);
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert!(a.as_str().parse::<i64>().unwrap() < b.as_str().parse::<i64>().unwrap());
    }

    #[test]
    fn observed_ids_push_the_generator_forward() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let mut ids = IdGenerator::default();
        let future = WorkoutId::from((now.timestamp_millis() + 5000).to_string().as_str());
        ids.observe(&future, now);
        let next = ids.next(now);
        assert!(next.as_str().parse::<i64>().unwrap() > future.as_str().parse::<i64>().unwrap());
    }

    #[test]
    fn far_future_ids_do_not_poison_the_generator() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let mut ids = IdGenerator::default();
        ids.observe(&WorkoutId::from(i64::MAX.to_string().as_str()), now);
        let a = ids.next(now);
        let b = ids.next(now);
        assert_eq!(a.as_str(), now.timestamp_millis().to_string());
        assert!(a.as_str().parse::<i64>().unwrap() < b.as_str().parse::<i64>().unwrap());
    }

    #[test]
    fn next_saturates_instead_of_overflowing() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let mut ids = IdGenerator { last: i64::MAX };
        assert_eq!(ids.next(now).as_str(), i64::MAX.to_string());
    }

    #[test]
    fn coords_parse() {
        let c: Coords = "51.5, -0.12".parse().unwrap();
        assert_eq!(c, Coords::new(51.5, -0.12));
        assert!(matches!("51.5".parse::<Coords>(), Err(ParseError::MissingComma { .. })));
        assert!(matches!(
            "x,0".parse::<Coords>(),
            Err(ParseError::BadNumber { axis: "latitude", .. })
        ));
        assert!(matches!("91,0".parse::<Coords>(), Err(ParseError::OutOfRange { .. })));
    }

    #[test]
    fn kind_parse_rejects_unknown() {
        assert_eq!("cycling".parse::<WorkoutKind>().unwrap(), WorkoutKind::Cycling);
        let err = "swimming".parse::<WorkoutKind>().unwrap_err();
        assert_eq!(err.to_string(), "unsupported workout type: \"swimming\"");
        assert!("Running".parse::<WorkoutKind>().is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_running_pace_is_duration_over_distance(
            distance in 0.01f64..500.0,
            duration in 0.01f64..2000.0,
        ) {
            let r = Running::new(base(distance, duration), 160.0);
            prop_assert!((r.pace_min_per_km() - duration / distance).abs() <= 1e-9 * (duration / distance));
        }

        #[test]
        fn prop_cycling_speed_is_distance_over_hours(
            distance in 0.01f64..500.0,
            duration in 0.01f64..2000.0,
        ) {
            let c = Cycling::new(base(distance, duration), 0.0);
            let expected = distance / (duration / 60.0);
            prop_assert!((c.speed_km_per_h() - expected).abs() <= 1e-9 * expected);
        }
    }
}
