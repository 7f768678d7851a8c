//! Live session driver
//!
//! Bridges real-time input to the frame loop. The pointer is the single input
//! value; it is written by whatever handles mouse or touch events and read
//! once per sample at the top of a frame. Samples are quantized to log
//! precision before the simulation sees them, so the recorded `mouse_move`
//! events replay bit-exactly.
//!
//! Events are queued as wire records and flushed in batches through a
//! [`LogTransport`]. Delivery is best-effort: a failed batch is logged and
//! dropped, and never reaches back into the game.

use glam::DVec2;
use log::{debug, warn};

use crate::consts::*;
use crate::events::{EventPayload, LogRecord, SimEvent};
use crate::sim::{GameState, SimOptions, TickInput, generate_seed, tick};
use crate::{player_origin, round_coord, round_to};

/// Largest logged aim magnitude (π rounded down to log precision)
pub const AIM_LIMIT: f64 = 3.141;

/// Aim as the log carries it: 1e-3 precision, within ±[`AIM_LIMIT`]
pub fn quantize_aim(angle: f64) -> f64 {
    round_to(angle, 3).clamp(-AIM_LIMIT, AIM_LIMIT)
}

/// Raw aim from a pointer position in canvas coordinates
pub fn aim_from_pointer(pointer: DVec2) -> f64 {
    let d = pointer - player_origin();
    d.y.atan2(d.x)
}

/// Failure to deliver a batch of records
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to encode batch: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("log endpoint unavailable: {0}")]
    Unavailable(String),
}

/// Somewhere to send batches of log records
pub trait LogTransport {
    fn send(&mut self, batch: &[LogRecord]) -> Result<(), TransportError>;
}

/// In-memory sink (tests, offline simulation)
impl LogTransport for Vec<LogRecord> {
    fn send(&mut self, batch: &[LogRecord]) -> Result<(), TransportError> {
        self.extend_from_slice(batch);
        Ok(())
    }
}

/// Pending log records, oldest first
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: Vec<LogRecord>,
}

impl EventQueue {
    pub fn push(&mut self, record: LogRecord) {
        self.pending.push(record);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take everything queued so far
    pub fn drain(&mut self) -> Vec<LogRecord> {
        std::mem::take(&mut self.pending)
    }

    /// Send the whole queue as one batch, returning how many records were delivered
    ///
    /// On failure the batch is dropped and the error only logged.
    pub fn flush<T: LogTransport + ?Sized>(&mut self, transport: &mut T) -> usize {
        let batch = self.drain();
        if batch.is_empty() {
            return 0;
        }
        match transport.send(&batch) {
            Ok(()) => batch.len(),
            Err(e) => {
                warn!("Dropped {} log events: {}", batch.len(), e);
                0
            }
        }
    }
}

/// One live play session
#[derive(Debug)]
pub struct LiveSession {
    id: String,
    state: GameState,
    queue: EventQueue,
    pointer: DVec2,
    sample_interval: u64,
    /// Last stamped wall-clock time; stamps never go backwards
    last_t: f64,
}

impl LiveSession {
    /// Start a session with a fresh random seed
    pub fn start(now_ms: f64) -> Self {
        Self::new(generate_seed(), now_ms)
    }

    pub fn new(seed: u32, now_ms: f64) -> Self {
        Self::with_options(seed, now_ms, SimOptions::default())
    }

    /// Start a session and queue its `session_start`
    pub fn with_options(seed: u32, now_ms: f64, options: SimOptions) -> Self {
        let id = uuid::Builder::from_random_bytes(rand::random())
            .into_uuid()
            .to_string();
        let state = GameState::with_options(seed, STARTING_LIVES, options);
        let mut session = Self {
            id,
            state,
            queue: EventQueue::default(),
            pointer: DVec2::new(PX + 150.0, PY),
            sample_interval: MOUSE_SAMPLE_INTERVAL,
            last_t: now_ms,
        };
        session.record(
            now_ms,
            SimEvent::new(
                0,
                EventPayload::SessionStart {
                    seed,
                    lives: STARTING_LIVES,
                },
            ),
        );
        debug!("Session {} started with seed {}", session.id, seed);
        session
    }

    /// Sample the pointer every `frames` frames instead of the default
    pub fn with_sample_interval(mut self, frames: u64) -> Self {
        self.sample_interval = frames.max(1);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn pointer(&self) -> DVec2 {
        self.pointer
    }

    pub fn is_over(&self) -> bool {
        self.state.is_over()
    }

    /// Input side: latest pointer position in canvas coordinates
    pub fn set_pointer(&mut self, x: f64, y: f64) {
        self.pointer = DVec2::new(x, y);
    }

    /// Advance one frame, returning its derived events
    ///
    /// A sample frame reads the pointer, logs a `mouse_move` and switches the
    /// aim; other frames keep the previous aim.
    pub fn step(&mut self, now_ms: f64) -> Vec<SimEvent> {
        if self.state.is_over() {
            return Vec::new();
        }

        let frame = self.state.frame + 1;
        let mut aim = self.state.player.aim;
        if frame % self.sample_interval == 0 {
            aim = quantize_aim(aim_from_pointer(self.pointer));
            self.record(
                now_ms,
                SimEvent::new(
                    frame,
                    EventPayload::MouseMove {
                        x: round_coord(self.pointer.x),
                        y: round_coord(self.pointer.y),
                        angle: aim,
                    },
                ),
            );
        }

        let events = tick(&mut self.state, &TickInput::aim(aim));
        for event in &events {
            self.record(now_ms, event.clone());
        }
        events
    }

    fn record(&mut self, now_ms: f64, event: SimEvent) {
        self.last_t = self.last_t.max(now_ms);
        self.queue.push(event.to_record(&self.id, self.last_t));
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Take the queued records (page-hide style hand-off)
    pub fn drain_batch(&mut self) -> Vec<LogRecord> {
        self.queue.drain()
    }

    /// Timer-driven flush to a transport
    pub fn flush<T: LogTransport + ?Sized>(&mut self, transport: &mut T) -> usize {
        self.queue.flush(transport)
    }
}

/// Where a hands-off player would point: the nearest calm critter on the lawn
pub fn autopilot_target(state: &GameState) -> Option<DVec2> {
    let origin = player_origin();
    state
        .all_critters()
        .filter(|c| !c.scared)
        .filter(|c| c.pos.x >= 0.0 && c.pos.x <= W && c.pos.y >= 0.0 && c.pos.y <= H)
        .min_by(|a, b| {
            a.pos
                .distance_squared(origin)
                .partial_cmp(&b.pos.distance_squared(origin))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|c| c.pos)
}
