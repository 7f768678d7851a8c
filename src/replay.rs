//! Deterministic session replayer
//!
//! Re-seeds the simulation from a recorded `session_start`, feeds back the
//! logged aim angles and runs the frame loop headless. The output is the
//! derived event stream the live session should have logged.

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::fmt;

use log::debug;

use crate::consts::STARTING_LIVES;
use crate::events::{
    EventError, EventPayload, LogRecord, MOUSE_MOVE, SESSION_START, SimEvent, as_integer,
    is_verified_type,
};
use crate::sim::{GameState, SimOptions, TickInput, tick};

/// Why a log could not be replayed
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReplayError {
    #[error("session_start event with numeric seed is required")]
    MissingSeed,

    #[error("session_start seed {0} is not a 32-bit unsigned integer")]
    InvalidSeed(f64),

    #[error("mouse_move at frame {frame} has angle {angle} outside (-pi, pi]")]
    InvalidAngle { frame: u64, angle: f64 },

    #[error("malformed event at frame {frame}: {source}")]
    Malformed {
        frame: u64,
        #[source]
        source: EventError,
    },
}

/// Seed and starting lives from the first `session_start`
fn session_params(records: &[LogRecord]) -> Result<(u32, i32), ReplayError> {
    let start = records
        .iter()
        .find(|r| r.kind == SESSION_START)
        .ok_or(ReplayError::MissingSeed)?;

    let seed = start
        .field("seed")
        .filter(|v| v.is_number())
        .ok_or(ReplayError::MissingSeed)?;
    let seed = as_integer(seed)
        .and_then(|s| u32::try_from(s).ok())
        .ok_or_else(|| ReplayError::InvalidSeed(seed.as_f64().unwrap_or(f64::NAN)))?;

    let lives = start
        .field("lives")
        .and_then(as_integer)
        .and_then(|l| i32::try_from(l).ok())
        .unwrap_or(STARTING_LIVES);

    Ok((seed, lives))
}

/// Replay a recorded session, returning the derived events it produces
///
/// Runs every frame up to the highest recorded frame, or until game over.
/// The aim holds its last logged value between `mouse_move` samples and
/// starts at 0.
pub fn replay(records: &[LogRecord]) -> Result<Vec<SimEvent>, ReplayError> {
    let (seed, lives) = session_params(records)?;

    let mut aims = BTreeMap::new();
    for record in records.iter().filter(|r| r.kind == MOUSE_MOVE) {
        let event = SimEvent::try_from(record).map_err(|source| ReplayError::Malformed {
            frame: record.frame,
            source,
        })?;
        if let EventPayload::MouseMove { angle, .. } = event.payload {
            if !(angle > -PI && angle <= PI) {
                return Err(ReplayError::InvalidAngle {
                    frame: event.frame,
                    angle,
                });
            }
            aims.insert(event.frame, angle);
        }
    }

    let max_frame = records.iter().map(|r| r.frame).max().unwrap_or(0);
    let mut state = GameState::with_options(seed, lives, SimOptions::HEADLESS);
    let mut input = TickInput::default();
    let mut produced = Vec::new();

    while state.frame < max_frame && !state.is_over() {
        if let Some(&aim) = aims.get(&(state.frame + 1)) {
            input.aim = aim;
        }
        produced.extend(tick(&mut state, &input));
    }

    debug!(
        "Replayed seed {} for {} frames: {} events",
        seed,
        state.frame,
        produced.len()
    );
    Ok(produced)
}

/// Where a recorded stream and its replay first disagree
#[derive(Debug, Clone, PartialEq)]
pub struct Divergence {
    /// Position in the derived event stream
    pub index: usize,
    pub recorded: Option<SimEvent>,
    pub replayed: Option<SimEvent>,
}

/// Outcome of checking a recorded session against its replay
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyReport {
    pub session: String,
    /// Compared events in the log
    pub recorded: usize,
    /// Compared events produced by replay
    pub replayed: usize,
    pub first_divergence: Option<Divergence>,
}

impl VerifyReport {
    pub fn is_match(&self) -> bool {
        self.first_divergence.is_none()
    }
}

impl fmt::Display for VerifyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.first_divergence {
            None => write!(
                f,
                "{}: OK ({} derived events reproduced)",
                self.session, self.replayed
            ),
            Some(d) => {
                write!(
                    f,
                    "{}: MISMATCH at derived event {} (recorded {}, replayed {})",
                    self.session, d.index, self.recorded, self.replayed
                )?;
                if let Some(e) = &d.recorded {
                    write!(f, "\n  recorded: frame {} {:?}", e.frame, e.payload)?;
                }
                if let Some(e) = &d.replayed {
                    write!(f, "\n  replayed: frame {} {:?}", e.frame, e.payload)?;
                }
                Ok(())
            }
        }
    }
}

/// Replay a session and compare against the derived events it recorded
///
/// Spawns are left out of the comparison: they follow from the seed alone and
/// older clients never logged them. Scared, fled, score, hit and game over
/// events are compared in order.
pub fn verify(records: &[LogRecord]) -> Result<VerifyReport, ReplayError> {
    let replayed: Vec<SimEvent> = replay(records)?
        .into_iter()
        .filter(|e| e.payload.is_verified())
        .collect();

    let recorded = records
        .iter()
        .filter(|r| is_verified_type(&r.kind))
        .map(|r| {
            SimEvent::try_from(r).map_err(|source| ReplayError::Malformed {
                frame: r.frame,
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let first_divergence = (0..recorded.len().max(replayed.len()))
        .find(|&i| recorded.get(i) != replayed.get(i))
        .map(|index| Divergence {
            index,
            recorded: recorded.get(index).cloned(),
            replayed: replayed.get(index).cloned(),
        });

    Ok(VerifyReport {
        session: records
            .first()
            .map(|r| r.session.clone())
            .unwrap_or_default(),
        recorded: recorded.len(),
        replayed: replayed.len(),
        first_divergence,
    })
}
