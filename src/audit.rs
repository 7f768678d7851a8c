//! Structural checks over a recorded session log
//!
//! These hold for any honest log regardless of seed or input, so they can run
//! on production data without replaying it.

use std::collections::HashSet;
use std::f64::consts::PI;

use crate::consts::STARTING_LIVES;
use crate::events::{
    EventPayload, GAME_OVER, LogRecord, MOUSE_MOVE, SESSION_START, SimEvent, is_derived_type,
};

/// One broken rule, with the position of the offending record in the session
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AuditViolation {
    #[error("session has no events")]
    Empty,

    #[error("#{index}: session must open with session_start at frame 0, found {kind} at frame {frame}")]
    BadStart {
        index: usize,
        kind: String,
        frame: u64,
    },

    #[error("#{index}: second session_start")]
    DuplicateStart { index: usize },

    #[error("#{index}: event belongs to session {found}, expected {expected}")]
    MixedSessions {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("#{index}: frame {frame} goes back from {previous}")]
    FrameOrder {
        index: usize,
        previous: u64,
        frame: u64,
    },

    #[error("#{index}: timestamp {t} goes back from {previous}")]
    TimeOrder { index: usize, previous: f64, t: f64 },

    #[error("#{index}: unknown event type {kind}")]
    UnknownType { index: usize, kind: String },

    #[error("#{index}: {reason}")]
    Malformed { index: usize, reason: String },

    #[error("#{index}: mouse_move angle {angle} outside (-pi, pi]")]
    AngleOutOfRange { index: usize, angle: f64 },

    #[error("#{index}: scared force {force} outside [0, 1]")]
    ForceOutOfRange { index: usize, force: f64 },

    #[error("#{index}: score_change delta {delta} is not positive")]
    NonPositiveDelta { index: usize, delta: i64 },

    #[error("#{index}: score {found} does not match running total {expected}")]
    ScoreMismatch {
        index: usize,
        expected: i64,
        found: i64,
    },

    #[error("#{index}: score_change at frame {frame} has no fled event on that frame")]
    UnpairedScore { index: usize, frame: u64 },

    #[error("#{index}: second game_over")]
    DuplicateGameOver { index: usize },

    #[error("#{index}: event after game_over")]
    AfterGameOver { index: usize },

    #[error("#{index}: game_over after only {hits} hits with {lives} lives")]
    PrematureGameOver { index: usize, hits: usize, lives: i32 },
}

/// Check every structural rule over one session's records, in log order
pub fn audit_session(records: &[LogRecord]) -> Vec<AuditViolation> {
    let Some(first) = records.first() else {
        return vec![AuditViolation::Empty];
    };

    let mut violations = Vec::new();
    if first.kind != SESSION_START || first.frame != 0 {
        violations.push(AuditViolation::BadStart {
            index: 0,
            kind: first.kind.clone(),
            frame: first.frame,
        });
    }

    let fled_frames: HashSet<u64> = records
        .iter()
        .filter(|r| r.kind.ends_with("_fled"))
        .map(|r| r.frame)
        .collect();

    let mut lives = STARTING_LIVES;
    let mut running = 0i64;
    let mut hits = 0usize;
    let mut game_over_seen = false;

    for (index, record) in records.iter().enumerate() {
        if record.session != first.session {
            violations.push(AuditViolation::MixedSessions {
                index,
                expected: first.session.clone(),
                found: record.session.clone(),
            });
        }
        if index > 0 {
            let prev = &records[index - 1];
            if record.frame < prev.frame {
                violations.push(AuditViolation::FrameOrder {
                    index,
                    previous: prev.frame,
                    frame: record.frame,
                });
            }
            if record.t < prev.t {
                violations.push(AuditViolation::TimeOrder {
                    index,
                    previous: prev.t,
                    t: record.t,
                });
            }
            if record.kind == SESSION_START {
                violations.push(AuditViolation::DuplicateStart { index });
            }
        }
        if game_over_seen {
            violations.push(if record.kind == GAME_OVER {
                AuditViolation::DuplicateGameOver { index }
            } else {
                AuditViolation::AfterGameOver { index }
            });
        }

        if record.kind != SESSION_START && record.kind != MOUSE_MOVE && !is_derived_type(&record.kind)
        {
            violations.push(AuditViolation::UnknownType {
                index,
                kind: record.kind.clone(),
            });
            continue;
        }
        let event = match SimEvent::try_from(record) {
            Ok(event) => event,
            Err(e) => {
                violations.push(AuditViolation::Malformed {
                    index,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        match event.payload {
            EventPayload::SessionStart { lives: l, .. } if index == 0 => lives = l,
            EventPayload::MouseMove { angle, .. } if !(angle > -PI && angle <= PI) => {
                violations.push(AuditViolation::AngleOutOfRange { index, angle });
            }
            EventPayload::Scared { force, .. } if !(0.0..=1.0).contains(&force) => {
                violations.push(AuditViolation::ForceOutOfRange { index, force });
            }
            EventPayload::PlayerHit { .. } => hits += 1,
            EventPayload::ScoreChange { score, delta } => {
                if delta <= 0 {
                    violations.push(AuditViolation::NonPositiveDelta { index, delta });
                }
                running += delta;
                if score != running {
                    violations.push(AuditViolation::ScoreMismatch {
                        index,
                        expected: running,
                        found: score,
                    });
                    running = score;
                }
                if !fled_frames.contains(&record.frame) {
                    violations.push(AuditViolation::UnpairedScore {
                        index,
                        frame: record.frame,
                    });
                }
            }
            EventPayload::GameOver { .. } => {
                if !game_over_seen && hits < usize::try_from(lives).unwrap_or(0) {
                    violations.push(AuditViolation::PrematureGameOver { index, hits, lives });
                }
                game_over_seen = true;
            }
            _ => {}
        }
    }

    violations
}
