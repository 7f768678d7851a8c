//! Blowaway - aim the leaf blower, scare the critters off the lawn
//!
//! Core modules:
//! - `sim`: Deterministic simulation (seeded RNG, critters, wind cone, frame tick)
//! - `events`: Event log schema (typed events and their JSON wire records)
//! - `replay`: Offline re-execution of recorded sessions for verification
//! - `audit`: Structural checks over recorded session logs
//! - `logfile`: JSONL log reading, writing and per-session grouping
//! - `session`: Live driver that turns pointer input into frames and log batches
//! - `settings`: Environment-driven server configuration
//! - `server`: Log relay + static file server (native only)

pub mod audit;
pub mod events;
pub mod logfile;
pub mod replay;
pub mod session;
pub mod settings;
pub mod sim;

#[cfg(not(target_arch = "wasm32"))]
pub mod server;

pub use audit::{AuditViolation, audit_session};
pub use events::{EventPayload, LogRecord, SimEvent};
pub use logfile::{group_sessions, read_jsonl};
pub use replay::{ReplayError, VerifyReport, replay, verify};
pub use session::{EventQueue, LiveSession, LogTransport};
pub use settings::ServerSettings;

use glam::DVec2;

/// Game configuration constants
pub mod consts {
    /// Canvas dimensions (simulation units are canvas pixels)
    pub const W: f64 = 800.0;
    pub const H: f64 = 600.0;

    /// Player sits fixed at the canvas centre
    pub const PX: f64 = W / 2.0;
    pub const PY: f64 = H / 2.0;
    pub const PLAYER_RADIUS: f64 = 28.0;

    /// Wind cone reach (pixels)
    pub const WIND_RANGE: f64 = 260.0;
    /// Entities closer than this are inside the player body and never blown
    pub const WIND_DEAD_ZONE: f64 = 22.0;
    /// Half-width of the cone (radians)
    pub const WIND_HALF_ANGLE: f64 = 0.30;

    pub const STARTING_LIVES: i32 = 3;
    /// Frames of collision immunity after a hit (2 seconds at 60 Hz)
    pub const INVINCIBLE_FRAMES: u32 = 120;

    /// Live sessions sample (and log) the aim every N frames
    pub const MOUSE_SAMPLE_INTERVAL: u64 = 10;

    /// Wind particles emitted per frame from the nozzle (cosmetic)
    pub const PARTICLES_PER_FRAME: usize = 4;
    /// Nozzle distance from the player origin
    pub const NOZZLE_LENGTH: f64 = 60.0;
}

/// Player origin as a vector
#[inline]
pub fn player_origin() -> DVec2 {
    DVec2::new(consts::PX, consts::PY)
}

/// Normalize an angle to (-π, π]
///
/// Non-finite input gives NaN, which lies in no cone.
#[inline]
pub fn normalize_angle(mut angle: f64) -> f64 {
    use std::f64::consts::{PI, TAU};
    if !angle.is_finite() {
        return f64::NAN;
    }
    if angle.abs() > 2.0 * TAU {
        angle = angle.rem_euclid(TAU);
    }
    while angle > PI {
        angle -= TAU;
    }
    while angle <= -PI {
        angle += TAU;
    }
    angle
}

/// Round to a fixed number of decimal places (log payload precision)
///
/// Halves round toward +∞, matching the browser client's `Math.round`.
#[inline]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale + 0.5).floor() / scale
}

/// Round a coordinate to the integer the log carries (halves toward +∞)
#[inline]
pub fn round_coord(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}
