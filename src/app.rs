use crate::dlog;
use crate::form::{ElevationPolicy, FormState, Rejection};
use crate::geo::Geolocator;
use crate::map::{DEFAULT_TILE_URL, DEFAULT_ZOOM, MapWidget, Marker};
use crate::render::{RenderedEntry, popup_content, popup_options, render_entry};
use crate::storage::{SessionStore, load_workouts, save_workouts};
use crate::types::{Coords, Cycling, IdGenerator, Running, Workout, WorkoutBase, WorkoutId, WorkoutKind};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, FixedOffset, Local, Utc};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub zoom: u8,
    pub tile_url: String,
    /// How long the hidden form keeps `display: none` before its layout returns.
    pub form_restore_delay: Duration,
    pub elevation_policy: ElevationPolicy,
    /// Offset used for the dates shown in titles.
    pub utc_offset: FixedOffset,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            zoom: DEFAULT_ZOOM,
            tile_url: DEFAULT_TILE_URL.to_string(),
            form_restore_delay: Duration::milliseconds(1000),
            elevation_policy: ElevationPolicy::default(),
            utc_offset: *Local::now().offset(),
        }
    }
}

/// What a click in the workout list landed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListTarget {
    Entry(WorkoutId),
    Form,
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Created(WorkoutId),
    Rejected(Rejection),
}

type Clock = Box<dyn Fn() -> DateTime<Utc>>;

/// Owns the map, the form and the session's workouts; every event goes through here.
pub struct App<M: MapWidget, S: SessionStore> {
    config: AppConfig,
    map: M,
    store: S,
    map_loaded: bool,
    workouts: Vec<Workout>,
    /// Display order: newest first, right under the form.
    entries: Vec<RenderedEntry>,
    pending_click: Option<Coords>,
    form: FormState,
    ids: IdGenerator,
    clock: Clock,
}

impl<M: MapWidget, S: SessionStore> App<M, S> {
    pub fn new(config: AppConfig, map: M, store: S) -> Self {
        Self {
            config,
            map,
            store,
            map_loaded: false,
            workouts: Vec::new(),
            entries: Vec::new(),
            pending_click: None,
            form: FormState::default(),
            ids: IdGenerator::default(),
            clock: Box::new(Utc::now),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Asks for the device position once and loads the map there.
    ///
    /// Without a position the map never loads and map-driven events are ignored.
    /// Returns the number of restored workouts.
    pub fn initialize<G: Geolocator + ?Sized>(&mut self, geo: &G) -> Result<usize> {
        let position = geo
            .current_position()
            .context("Getting device position")?;
        Ok(self.load_map(position))
    }

    pub fn load_map(&mut self, position: Coords) -> usize {
        self.map.set_view(position, self.config.zoom, false);
        self.map.add_tile_layer(&self.config.tile_url);
        let restored = self.restore_session();
        self.map_loaded = true;
        tracing::info!(center = %position, restored, "map loaded");
        restored
    }

    fn restore_session(&mut self) -> usize {
        let restored = load_workouts(&self.store);
        let now = (self.clock)();
        for w in &restored {
            self.ids.observe(w.id(), now);
        }
        self.workouts = restored;
        for i in 0..self.workouts.len() {
            self.render(i);
        }
        self.workouts.len()
    }

    /// Remembers where the map was clicked and opens the form there.
    pub fn handle_map_click(&mut self, at: Coords) -> bool {
        if !self.map_loaded {
            tracing::warn!(%at, "map click before map loaded; ignoring");
            return false;
        }
        dlog!("map_click at={at}");
        self.pending_click = Some(at);
        self.form.show();
        true
    }

    /// Type selector change.
    pub fn select_kind(&mut self, value: &str) {
        self.form.select_kind(value);
    }

    pub fn form_mut(&mut self) -> &mut FormState {
        &mut self.form
    }

    /// Validates the form and, if it holds, records a workout at the clicked spot.
    ///
    /// A rejected submission clears the fields and creates nothing; the form stays open.
    pub fn submit(&mut self) -> Result<SubmitOutcome> {
        let Some(at) = self.pending_click else {
            self.form.clear();
            return Ok(SubmitOutcome::Rejected(Rejection::NoLocation));
        };

        let entry = match self.form.validate(self.config.elevation_policy) {
            Ok(e) => e,
            Err(r) => {
                dlog!("submit_rejected reason={r}");
                self.form.clear();
                return Ok(SubmitOutcome::Rejected(r));
            }
        };

        let now = (self.clock)();
        let base = WorkoutBase {
            id: self.ids.next(now),
            created_at: now,
            coords: at,
            distance_km: entry.distance_km,
            duration_min: entry.duration_min,
            clicks: 0,
        };
        let workout = match entry.kind {
            WorkoutKind::Running => Workout::Running(Running::new(base, entry.secondary)),
            WorkoutKind::Cycling => Workout::Cycling(Cycling::new(base, entry.secondary)),
        };
        let id = workout.id().clone();

        // Nothing is shown until the session holding it is saved.
        self.workouts.push(workout);
        if let Err(e) = save_workouts(&mut self.store, &self.workouts) {
            self.workouts.pop();
            return Err(e).context("Persisting session");
        }
        self.render(self.workouts.len() - 1);

        self.form.clear();
        self.form.hide(now, self.config.form_restore_delay);
        self.pending_click = None;

        tracing::info!(id = %id, kind = %entry.kind, %at, "workout created");
        Ok(SubmitOutcome::Created(id))
    }

    fn render(&mut self, idx: usize) {
        let w = &self.workouts[idx];
        let tz = self.config.utc_offset;
        self.entries.insert(0, render_entry(w, &tz));
        self.map.add_marker(Marker {
            at: w.coords(),
            popup: popup_options(w.kind()),
            content: popup_content(w, &tz),
            open: true,
        });
    }

    /// Click inside the workout list. An entry recenters the map on its workout and
    /// counts the click; anything else is ignored.
    pub fn handle_list_click(&mut self, target: &ListTarget) -> Result<bool> {
        let ListTarget::Entry(id) = target else {
            return Ok(false);
        };
        if !self.map_loaded {
            return Ok(false);
        }
        let Some(w) = self.workouts.iter_mut().find(|w| w.id() == id) else {
            tracing::warn!(id = %id, "clicked entry has no workout");
            return Ok(false);
        };

        w.register_click();
        let at = w.coords();
        let clicks = w.clicks();
        self.map.set_view(at, self.config.zoom, true);
        save_workouts(&mut self.store, &self.workouts).context("Persisting session")?;
        dlog!("entry_selected id={id} clicks={clicks}");
        Ok(true)
    }

    /// Lets the hidden form's layout come back once its delay has passed.
    pub fn tick(&mut self, now: DateTime<Utc>) -> bool {
        self.form.tick(now)
    }

    /// Clears the stored session and reloads: everything in memory and on the map
    /// is dropped, and the app has to be initialized again.
    pub fn reset(&mut self) -> Result<()> {
        self.store.clear().context("Clearing session storage")?;
        self.map.reset();
        self.map_loaded = false;
        self.workouts.clear();
        self.entries.clear();
        self.pending_click = None;
        self.form = FormState::default();
        self.ids = IdGenerator::default();
        tracing::info!("session reset");
        Ok(())
    }

    pub const fn is_map_loaded(&self) -> bool {
        self.map_loaded
    }

    pub fn workouts(&self) -> &[Workout] {
        &self.workouts
    }

    pub fn entries(&self) -> &[RenderedEntry] {
        &self.entries
    }

    pub const fn form(&self) -> &FormState {
        &self.form
    }

    pub const fn pending_click(&self) -> Option<Coords> {
        self.pending_click
    }

    pub const fn map(&self) -> &M {
        &self.map
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn config(&self) -> &AppConfig {
        &self.config
    }
}
