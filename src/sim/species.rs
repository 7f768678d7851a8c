//! Species tags and their tuning tables
//!
//! Cats, dogs and yinzis share one behaviour model; everything that differs
//! between them is a constant in [`SpeciesParams`].

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Critter species, in the fixed order the frame loop visits them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Cat,
    Dog,
    Yinzi,
}

impl Species {
    /// Spawn, update, wind, collision and flee order. Part of the replay contract.
    pub const ALL: [Species; 3] = [Species::Cat, Species::Dog, Species::Yinzi];

    pub fn as_str(&self) -> &'static str {
        match self {
            Species::Cat => "cat",
            Species::Dog => "dog",
            Species::Yinzi => "yinzi",
        }
    }

    /// Slot in per-species arrays
    pub fn index(&self) -> usize {
        match self {
            Species::Cat => 0,
            Species::Dog => 1,
            Species::Yinzi => 2,
        }
    }

    pub fn params(&self) -> &'static SpeciesParams {
        match self {
            Species::Cat => &CAT,
            Species::Dog => &DOG,
            Species::Yinzi => &YINZI,
        }
    }
}

/// A species tag that names no species
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown species {0:?}")]
pub struct UnknownSpecies(pub String);

impl FromStr for Species {
    type Err = UnknownSpecies;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cat" => Ok(Species::Cat),
            "dog" => Ok(Species::Dog),
            "yinzi" => Ok(Species::Yinzi),
            _ => Err(UnknownSpecies(s.to_string())),
        }
    }
}

/// How a species enters the lawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpawnPolicy {
    /// One at a time while the population is under `cap`
    Steady {
        cap: usize,
        base: f64,
        slope: f64,
        floor: f64,
    },
    /// Locked until the score passes `unlock_score`, then arrives in waves that
    /// only start once the previous wave is gone. Wave size doubles each time,
    /// up to `max_batch`.
    Waves {
        unlock_score: i64,
        max_batch: usize,
        base: f64,
        slope: f64,
        floor: f64,
    },
}

impl SpawnPolicy {
    /// Frames between spawns at the given score, never below the floor
    pub fn interval(&self, score: i64) -> f64 {
        let (base, slope, floor) = match *self {
            SpawnPolicy::Steady {
                base, slope, floor, ..
            }
            | SpawnPolicy::Waves {
                base, slope, floor, ..
            } => (base, slope, floor),
        };
        (base - score as f64 * slope).max(floor)
    }
}

/// Per-species tuning
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesParams {
    /// Spawn distance outside the canvas edge
    pub edge_offset: f64,
    pub size_min: f64,
    pub size_jitter: f64,
    pub speed_min: f64,
    pub speed_jitter: f64,
    /// Body colours. One draw from the seeded stream when there is more than one.
    pub palette: &'static [&'static str],
    /// Wander speed clamp while calm
    pub max_speed: f64,
    /// Pull toward the player while calm (keeps wanderers off the edges)
    pub attraction: f64,
    /// Velocity gained per unit of wind force
    pub wind_gain: f64,
    /// Speed clamp right after a gust
    pub wind_cap: f64,
    /// Frames a gust keeps the critter scared
    pub scare_frames: u32,
    /// Distance past any canvas edge at which the critter has fled
    pub gone_margin: f64,
    pub points: i64,
    /// Cosmetic wobble advance per frame
    pub wobble_step: f64,
    /// Shouted on the calm-to-scared edge. Picking one costs a seeded draw.
    pub catchphrases: &'static [&'static str],
    pub spawn: SpawnPolicy,
}

/// Random steering added to the wander heading each calm frame: (r - 0.5) * jitter
pub const WANDER_JITTER: f64 = 0.09;
pub const WANDER_ACCEL: f64 = 0.06;
/// Within this distance of an edge, calm critters get pushed back in
pub const EDGE_MARGIN: f64 = 40.0;
pub const EDGE_PUSH: f64 = 0.12;
/// Velocity multiplier per scared frame
pub const SCARED_DAMPING: f64 = 0.975;
/// Frames the "!" stays up after a fresh scare
pub const EXCLAM_FRAMES: i32 = 40;

pub static CAT: SpeciesParams = SpeciesParams {
    edge_offset: 35.0,
    size_min: 16.0,
    size_jitter: 5.0,
    speed_min: 0.55,
    speed_jitter: 0.4,
    palette: &["#c8883c", "#888888", "#e8d8b0", "#2a2a2a", "#c0784a"],
    max_speed: 1.6,
    attraction: 0.0,
    wind_gain: 7.0,
    wind_cap: 13.0,
    scare_frames: 100,
    gone_margin: 90.0,
    points: 1,
    wobble_step: 0.12,
    catchphrases: &[],
    spawn: SpawnPolicy::Steady {
        cap: 8,
        base: 140.0,
        slope: 4.0,
        floor: 55.0,
    },
};

pub static DOG: SpeciesParams = SpeciesParams {
    edge_offset: 40.0,
    size_min: 20.0,
    size_jitter: 7.0,
    speed_min: 0.7,
    speed_jitter: 0.2,
    palette: &["#c8843c", "#5c3318", "#9aabb8", "#f0f0f0", "#d4a055"],
    max_speed: 2.0,
    attraction: 0.02,
    wind_gain: 4.0,
    wind_cap: 10.0,
    scare_frames: 60,
    gone_margin: 100.0,
    points: 3,
    wobble_step: 0.10,
    catchphrases: &[],
    spawn: SpawnPolicy::Steady {
        cap: 3,
        base: 200.0,
        slope: 3.0,
        floor: 90.0,
    },
};

pub static YINZI: SpeciesParams = SpeciesParams {
    edge_offset: 45.0,
    size_min: 24.0,
    size_jitter: 5.0,
    speed_min: 0.6,
    speed_jitter: 0.3,
    palette: &["#ff6fa0"],
    max_speed: 1.8,
    attraction: 0.02,
    wind_gain: 3.0,
    wind_cap: 8.0,
    scare_frames: 45,
    gone_margin: 110.0,
    points: 5,
    wobble_step: 0.11,
    catchphrases: &["Yinzi, luggages!", "Logan", "im a dj"],
    spawn: SpawnPolicy::Waves {
        unlock_score: 20,
        max_batch: 64,
        base: 250.0,
        slope: 2.0,
        floor: 120.0,
    },
};
