use crate::types::WorkoutKind;
use chrono::{DateTime, Duration, Utc};
use snafu::Snafu;

/// Which numeric field a rejection refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Type,
    Distance,
    Duration,
    Cadence,
    Elevation,
}

impl Field {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::Distance => "distance",
            Self::Duration => "duration",
            Self::Cadence => "cadence",
            Self::Elevation => "elevation",
        }
    }
}

/// Why a submission did not create a workout.
#[derive(Debug, Clone, PartialEq, Snafu)]
pub enum Rejection {
    #[snafu(display("{} must be a positive number, got {raw:?}", field.name()))]
    NotPositive { field: Field, raw: String },
    #[snafu(display("{} must be a finite non-zero number, got {raw:?}", field.name()))]
    ZeroOrNotFinite { field: Field, raw: String },
    #[snafu(display("{} must be a finite number, got {raw:?}", field.name()))]
    NotFinite { field: Field, raw: String },
    #[snafu(display("unsupported workout type: {value:?}"))]
    UnsupportedKind { value: String },
    #[snafu(display("no map location selected"))]
    NoLocation,
}

/// Whether a cycling workout may record zero elevation gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ElevationPolicy {
    /// Elevation must be finite and non-zero.
    #[default]
    NonZero,
    /// Elevation must be finite; zero means a flat route.
    AllowFlat,
}

/// Coerces raw input text the way a browser number coercion does:
/// blank is zero, anything unparseable is NaN.
pub fn coerce_number(raw: &str) -> f64 {
    let s = raw.trim();
    if s.is_empty() {
        return 0.0;
    }
    s.parse::<f64>().unwrap_or(f64::NAN)
}

/// Validated values ready to build a workout from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entry {
    pub kind: WorkoutKind,
    pub distance_km: f64,
    pub duration_min: f64,
    /// Cadence for running, elevation gain for cycling.
    pub secondary: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Hidden,
    Visible,
}

/// CSS display of the form container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    None,
    Grid,
}

/// Raw form controls plus visibility.
#[derive(Debug, Clone)]
pub struct FormState {
    pub kind: String,
    pub distance: String,
    pub duration: String,
    pub cadence: String,
    pub elevation: String,
    visibility: Visibility,
    layout_restore_at: Option<DateTime<Utc>>,
    cadence_row_hidden: bool,
    elevation_row_hidden: bool,
    focus: Option<Field>,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            kind: WorkoutKind::Running.as_str().to_string(),
            distance: String::new(),
            duration: String::new(),
            cadence: String::new(),
            elevation: String::new(),
            visibility: Visibility::Hidden,
            layout_restore_at: None,
            cadence_row_hidden: false,
            elevation_row_hidden: true,
            focus: None,
        }
    }
}

impl FormState {
    pub const fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub const fn is_visible(&self) -> bool {
        matches!(self.visibility, Visibility::Visible)
    }

    pub const fn focus(&self) -> Option<Field> {
        self.focus
    }

    pub const fn cadence_row_hidden(&self) -> bool {
        self.cadence_row_hidden
    }

    pub const fn elevation_row_hidden(&self) -> bool {
        self.elevation_row_hidden
    }

    /// Layout display; stays `None` until the restore deadline passes.
    pub const fn display(&self) -> Display {
        if self.layout_restore_at.is_some() {
            Display::None
        } else {
            Display::Grid
        }
    }

    pub fn show(&mut self) {
        self.visibility = Visibility::Visible;
        self.focus = Some(Field::Type);
    }

    /// Hides the form and keeps its layout suppressed for `delay`.
    pub fn hide(&mut self, now: DateTime<Utc>, delay: Duration) {
        self.visibility = Visibility::Hidden;
        self.focus = None;
        self.layout_restore_at = Some(now + delay);
    }

    /// Returns true when the layout was restored by this call.
    pub fn tick(&mut self, now: DateTime<Utc>) -> bool {
        match self.layout_restore_at {
            Some(at) if now >= at => {
                self.layout_restore_at = None;
                true
            }
            _ => false,
        }
    }

    /// Changes the type selector and swaps the cadence and elevation rows.
    pub fn select_kind(&mut self, value: &str) {
        self.kind = value.to_string();
        self.cadence_row_hidden = !self.cadence_row_hidden;
        self.elevation_row_hidden = !self.elevation_row_hidden;
    }

    /// Empties the numeric inputs; the type selector keeps its value.
    pub fn clear(&mut self) {
        self.distance.clear();
        self.duration.clear();
        self.cadence.clear();
        self.elevation.clear();
    }

    pub fn validate(&self, policy: ElevationPolicy) -> Result<Entry, Rejection> {
        let distance_km = positive(Field::Distance, &self.distance)?;
        let duration_min = positive(Field::Duration, &self.duration)?;

        let kind: WorkoutKind = self.kind.parse().map_err(|_| Rejection::UnsupportedKind {
            value: self.kind.clone(),
        })?;

        let secondary = match kind {
            WorkoutKind::Running => positive(Field::Cadence, &self.cadence)?,
            WorkoutKind::Cycling => elevation(&self.elevation, policy)?,
        };

        Ok(Entry {
            kind,
            distance_km,
            duration_min,
            secondary,
        })
    }
}

fn positive(field: Field, raw: &str) -> Result<f64, Rejection> {
    let v = coerce_number(raw);
    if v.is_finite() && v > 0.0 {
        Ok(v)
    } else {
        Err(Rejection::NotPositive {
            field,
            raw: raw.to_string(),
        })
    }
}

fn elevation(raw: &str, policy: ElevationPolicy) -> Result<f64, Rejection> {
    let v = coerce_number(raw);
    match policy {
        ElevationPolicy::NonZero if !v.is_finite() || v == 0.0 => {
            Err(Rejection::ZeroOrNotFinite {
                field: Field::Elevation,
                raw: raw.to_string(),
            })
        }
        ElevationPolicy::AllowFlat if !v.is_finite() => Err(Rejection::NotFinite {
            field: Field::Elevation,
            raw: raw.to_string(),
        }),
        _ => Ok(v),
    }
}
