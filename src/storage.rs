use crate::dlog;
use crate::types::{Coords, Cycling, Running, Workout, WorkoutBase, WorkoutId};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::Path;

pub const WORKOUTS_KEY: &str = "workouts";

/// Key/value storage scoped to one session (one browser tab).
pub trait SessionStore {
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    fn set_item(&mut self, key: &str, value: &str) -> Result<()>;

    /// Removes every key of this session.
    fn clear(&mut self) -> Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    items: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.items.clear();
        Ok(())
    }
}

/// Sessions kept as `(session, key, value)` rows in a SQLite file.
pub struct SqliteSessionStore {
    conn: Connection,
    session: String,
}

impl SqliteSessionStore {
    pub fn open(path: &Path, session: &str) -> Result<Self> {
        let display = path.display();
        let conn =
            Connection::open(path).with_context(|| format!("Opening session store: {display}"))?;
        Self::with_connection(conn, session)
    }

    pub fn in_memory(session: &str) -> Result<Self> {
        let conn = Connection::open_in_memory().context("Opening in-memory session store")?;
        Self::with_connection(conn, session)
    }

    fn with_connection(conn: Connection, session: &str) -> Result<Self> {
        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS session_storage (
              session  TEXT NOT NULL,
              key      TEXT NOT NULL,
              value    TEXT NOT NULL,
              PRIMARY KEY (session, key)
            );
            ",
        )
        .context("Ensuring session_storage table")?;

        Ok(Self {
            conn,
            session: session.to_string(),
        })
    }

    pub fn session(&self) -> &str {
        &self.session
    }
}

impl SessionStore for SqliteSessionStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM session_storage WHERE session = ?1 AND key = ?2",
                params![self.session, key],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("Reading {key:?} from session {:?}", self.session))
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                r"
                INSERT INTO session_storage (session, key, value) VALUES (?1, ?2, ?3)
                ON CONFLICT (session, key) DO UPDATE SET value = excluded.value
                ",
                params![self.session, key, value],
            )
            .with_context(|| format!("Writing {key:?} to session {:?}", self.session))?;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        let removed = self
            .conn
            .execute(
                "DELETE FROM session_storage WHERE session = ?1",
                params![self.session],
            )
            .with_context(|| format!("Clearing session {:?}", self.session))?;
        dlog!("session_cleared session={} rows={removed}", self.session);
        Ok(())
    }
}

/// Shape of a workout inside the stored JSON array.
///
/// Derived metrics are written for readers of the raw data but recomputed on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum StoredWorkout {
    Running {
        #[serde(flatten)]
        common: StoredCommon,
        cadence: f64,
        #[serde(default, skip_deserializing)]
        pace: f64,
    },
    Cycling {
        #[serde(flatten)]
        common: StoredCommon,
        #[serde(rename = "elevationGain")]
        elevation_gain: f64,
        #[serde(default, skip_deserializing)]
        speed: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredCommon {
    id: WorkoutId,
    date: DateTime<Utc>,
    coords: Coords,
    distance: f64,
    duration: f64,
    #[serde(default)]
    clicks: u32,
}

impl From<&Workout> for StoredWorkout {
    fn from(w: &Workout) -> Self {
        let common = StoredCommon {
            id: w.id().clone(),
            date: w.created_at(),
            coords: w.coords(),
            distance: w.distance_km(),
            duration: w.duration_min(),
            clicks: w.clicks(),
        };
        match w {
            Workout::Running(r) => Self::Running {
                common,
                cadence: r.cadence_spm(),
                pace: r.pace_min_per_km(),
            },
            Workout::Cycling(c) => Self::Cycling {
                common,
                elevation_gain: c.elevation_gain_m(),
                speed: c.speed_km_per_h(),
            },
        }
    }
}

impl StoredCommon {
    fn into_base(self) -> WorkoutBase {
        WorkoutBase {
            id: self.id,
            created_at: self.date,
            coords: self.coords,
            distance_km: self.distance,
            duration_min: self.duration,
            clicks: self.clicks,
        }
    }
}

impl StoredWorkout {
    /// Rebuilds the typed variant; derived metrics come from the constructor.
    fn into_workout(self) -> Workout {
        match self {
            Self::Running {
                common, cadence, ..
            } => Workout::Running(Running::new(common.into_base(), cadence)),
            Self::Cycling {
                common,
                elevation_gain,
                ..
            } => Workout::Cycling(Cycling::new(common.into_base(), elevation_gain)),
        }
    }
}

pub fn encode_workouts(workouts: &[Workout]) -> Result<String> {
    let stored: Vec<StoredWorkout> = workouts.iter().map(StoredWorkout::from).collect();
    serde_json::to_string(&stored).context("Serializing workouts")
}

/// Decodes a stored session. A document that is not a JSON array is an empty
/// session; array elements that fail to decode are skipped.
pub fn decode_workouts(raw: &str) -> Vec<Workout> {
    let items: Vec<JsonValue> = match serde_json::from_str(raw) {
        Ok(JsonValue::Array(items)) => items,
        Ok(other) => {
            tracing::warn!(kind = json_kind(&other), "stored workouts are not an array; ignoring");
            return Vec::new();
        }
        Err(e) => {
            tracing::warn!(err = %e, "stored workouts are malformed; ignoring");
            return Vec::new();
        }
    };

    let mut out = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<StoredWorkout>(item) {
            Ok(s) => out.push(s.into_workout()),
            Err(e) => tracing::warn!(idx, err = %e, "skipping stored workout"),
        }
    }
    out
}

const fn json_kind(v: &JsonValue) -> &'static str {
    match v {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

pub fn save_workouts<S: SessionStore + ?Sized>(store: &mut S, workouts: &[Workout]) -> Result<()> {
    let json = encode_workouts(workouts)?;
    store.set_item(WORKOUTS_KEY, &json)?;
    dlog!("session_saved workouts={}", workouts.len());
    Ok(())
}

/// Absent data is an empty session; so is a failed read.
pub fn load_workouts<S: SessionStore + ?Sized>(store: &S) -> Vec<Workout> {
    match store.get_item(WORKOUTS_KEY) {
        Ok(Some(raw)) => decode_workouts(&raw),
        Ok(None) => Vec::new(),
        Err(e) => {
            tracing::warn!(err = %e, "reading stored workouts failed; starting empty");
            Vec::new()
        }
    }
}
