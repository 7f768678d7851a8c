//! Event log schema
//!
//! Two shapes of the same thing:
//! - [`LogRecord`]: the wire/storage form. `session`, `type`, `t` and `frame`
//!   are fixed columns; every other key is an open payload map.
//! - [`SimEvent`]: the typed form the simulation emits and the replayer
//!   compares. Payload values are already rounded to log precision.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::consts::STARTING_LIVES;
use crate::sim::Species;

pub const SESSION_START: &str = "session_start";
pub const MOUSE_MOVE: &str = "mouse_move";
pub const PLAYER_HIT: &str = "player_hit";
pub const SCORE_CHANGE: &str = "score_change";
pub const GAME_OVER: &str = "game_over";

/// One persisted event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Stable per-session identifier
    pub session: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Wall-clock milliseconds
    pub t: f64,
    pub frame: u64,
    /// Type-specific payload
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl LogRecord {
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

/// Failure to read a typed event out of a record
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EventError {
    #[error("unknown event type `{0}`")]
    UnknownType(String),

    #[error("`{kind}` event is missing field `{field}`")]
    MissingField { kind: String, field: &'static str },

    #[error("`{kind}` event has an invalid `{field}` value")]
    InvalidField { kind: String, field: &'static str },
}

/// Typed event payloads
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    SessionStart {
        seed: u32,
        lives: i32,
    },
    MouseMove {
        x: i64,
        y: i64,
        angle: f64,
    },
    Spawn {
        species: Species,
        x: i64,
        y: i64,
        sz: f64,
        color: String,
        vx: f64,
        vy: f64,
        wander_angle: f64,
    },
    Scared {
        species: Species,
        force: f64,
        cx: i64,
        cy: i64,
    },
    Fled {
        species: Species,
        cx: i64,
        cy: i64,
    },
    PlayerHit {
        entity: Species,
        lives: i32,
        cx: i64,
        cy: i64,
    },
    ScoreChange {
        score: i64,
        delta: i64,
    },
    GameOver {
        score: i64,
    },
}

impl EventPayload {
    /// The `type` tag on the wire
    pub fn type_name(&self) -> String {
        match self {
            EventPayload::SessionStart { .. } => SESSION_START.to_string(),
            EventPayload::MouseMove { .. } => MOUSE_MOVE.to_string(),
            EventPayload::Spawn { species, .. } => format!("{}_spawn", species.as_str()),
            EventPayload::Scared { species, .. } => format!("{}_scared", species.as_str()),
            EventPayload::Fled { species, .. } => format!("{}_fled", species.as_str()),
            EventPayload::PlayerHit { .. } => PLAYER_HIT.to_string(),
            EventPayload::ScoreChange { .. } => SCORE_CHANGE.to_string(),
            EventPayload::GameOver { .. } => GAME_OVER.to_string(),
        }
    }

    /// Produced by the simulation itself (and therefore by replay)
    pub fn is_derived(&self) -> bool {
        !matches!(
            self,
            EventPayload::SessionStart { .. } | EventPayload::MouseMove { .. }
        )
    }

    /// Derived, and compared by `verify` (everything but spawns)
    pub fn is_verified(&self) -> bool {
        self.is_derived() && !matches!(self, EventPayload::Spawn { .. })
    }

    fn to_data(&self) -> Map<String, Value> {
        let value = match self {
            EventPayload::SessionStart { seed, lives } => json!({ "seed": seed, "lives": lives }),
            EventPayload::MouseMove { x, y, angle } => json!({ "x": x, "y": y, "angle": angle }),
            EventPayload::Spawn {
                x,
                y,
                sz,
                color,
                vx,
                vy,
                wander_angle,
                ..
            } => json!({
                "x": x, "y": y, "sz": sz, "color": color,
                "vx": vx, "vy": vy, "wanderAngle": wander_angle,
            }),
            EventPayload::Scared { force, cx, cy, .. } => {
                json!({ "force": force, "cx": cx, "cy": cy })
            }
            EventPayload::Fled { cx, cy, .. } => json!({ "cx": cx, "cy": cy }),
            EventPayload::PlayerHit {
                entity,
                lives,
                cx,
                cy,
            } => json!({ "entity": entity.as_str(), "lives": lives, "cx": cx, "cy": cy }),
            EventPayload::ScoreChange { score, delta } => json!({ "score": score, "delta": delta }),
            EventPayload::GameOver { score } => json!({ "score": score }),
        };
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    /// Parse a payload from its type tag and field map
    pub fn from_parts(kind: &str, data: &Map<String, Value>) -> Result<Self, EventError> {
        let f = Fields { kind, data };
        match kind {
            SESSION_START => Ok(EventPayload::SessionStart {
                seed: u32::try_from(f.int("seed")?).map_err(|_| f.invalid("seed"))?,
                lives: f.opt_int("lives")?.map_or(Ok(STARTING_LIVES), |l| {
                    i32::try_from(l).map_err(|_| f.invalid("lives"))
                })?,
            }),
            MOUSE_MOVE => Ok(EventPayload::MouseMove {
                x: f.int("x")?,
                y: f.int("y")?,
                angle: f.float("angle")?,
            }),
            PLAYER_HIT => Ok(EventPayload::PlayerHit {
                entity: f.str("entity")?.parse().map_err(|_| f.invalid("entity"))?,
                lives: i32::try_from(f.int("lives")?).map_err(|_| f.invalid("lives"))?,
                cx: f.int("cx")?,
                cy: f.int("cy")?,
            }),
            SCORE_CHANGE => Ok(EventPayload::ScoreChange {
                score: f.int("score")?,
                delta: f.int("delta")?,
            }),
            GAME_OVER => Ok(EventPayload::GameOver {
                score: f.int("score")?,
            }),
            _ => {
                let (species, suffix) = split_species_tag(kind)
                    .ok_or_else(|| EventError::UnknownType(kind.to_string()))?;
                match suffix {
                    "spawn" => Ok(EventPayload::Spawn {
                        species,
                        x: f.int("x")?,
                        y: f.int("y")?,
                        sz: f.float("sz")?,
                        color: f.str("color")?.to_string(),
                        vx: f.float("vx")?,
                        vy: f.float("vy")?,
                        wander_angle: f.float("wanderAngle")?,
                    }),
                    "scared" => Ok(EventPayload::Scared {
                        species,
                        force: f.float("force")?,
                        cx: f.int("cx")?,
                        cy: f.int("cy")?,
                    }),
                    "fled" => Ok(EventPayload::Fled {
                        species,
                        cx: f.int("cx")?,
                        cy: f.int("cy")?,
                    }),
                    _ => Err(EventError::UnknownType(kind.to_string())),
                }
            }
        }
    }
}

/// `cat_scared` -> (Cat, "scared")
pub fn split_species_tag(kind: &str) -> Option<(Species, &str)> {
    let (prefix, suffix) = kind.split_once('_')?;
    Some((prefix.parse().ok()?, suffix))
}

/// Type tags the simulation produces
pub fn is_derived_type(kind: &str) -> bool {
    match kind {
        PLAYER_HIT | SCORE_CHANGE | GAME_OVER => true,
        _ => matches!(
            split_species_tag(kind),
            Some((_, "spawn" | "scared" | "fled"))
        ),
    }
}

/// Derived type tags that `verify` compares
pub fn is_verified_type(kind: &str) -> bool {
    is_derived_type(kind) && !matches!(split_species_tag(kind), Some((_, "spawn")))
}

/// Typed field access over a payload map
struct Fields<'a> {
    kind: &'a str,
    data: &'a Map<String, Value>,
}

impl Fields<'_> {
    fn get(&self, field: &'static str) -> Result<&Value, EventError> {
        self.data.get(field).ok_or_else(|| EventError::MissingField {
            kind: self.kind.to_string(),
            field,
        })
    }

    fn invalid(&self, field: &'static str) -> EventError {
        EventError::InvalidField {
            kind: self.kind.to_string(),
            field,
        }
    }

    fn float(&self, field: &'static str) -> Result<f64, EventError> {
        self.get(field)?.as_f64().ok_or_else(|| self.invalid(field))
    }

    /// Integers may arrive as `3` or `3.0`
    fn int(&self, field: &'static str) -> Result<i64, EventError> {
        as_integer(self.get(field)?).ok_or_else(|| self.invalid(field))
    }

    fn opt_int(&self, field: &'static str) -> Result<Option<i64>, EventError> {
        match self.data.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => as_integer(v).map(Some).ok_or_else(|| self.invalid(field)),
        }
    }

    fn str(&self, field: &'static str) -> Result<&str, EventError> {
        self.get(field)?.as_str().ok_or_else(|| self.invalid(field))
    }
}

/// Integral JSON number, or None
pub fn as_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
            .map(|f| f as i64)
    })
}

/// A typed event stamped with its frame
#[derive(Debug, Clone, PartialEq)]
pub struct SimEvent {
    pub frame: u64,
    pub payload: EventPayload,
}

impl SimEvent {
    pub fn new(frame: u64, payload: EventPayload) -> Self {
        Self { frame, payload }
    }

    pub fn type_name(&self) -> String {
        self.payload.type_name()
    }

    /// Wire form for the given session and wall-clock time
    pub fn to_record(&self, session: &str, t: f64) -> LogRecord {
        LogRecord {
            session: session.to_string(),
            kind: self.payload.type_name(),
            t,
            frame: self.frame,
            data: self.payload.to_data(),
        }
    }
}

impl TryFrom<&LogRecord> for SimEvent {
    type Error = EventError;

    fn try_from(record: &LogRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            frame: record.frame,
            payload: EventPayload::from_parts(&record.kind, &record.data)?,
        })
    }
}
