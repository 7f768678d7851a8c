//! Game state and core simulation types
//!
//! Everything the frame loop owns lives here. Cosmetic effects (popups and
//! wind particles) ride along but are skipped on serialization and never touch
//! the seeded stream.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::entity::Critter;
use super::rng::{CosmeticRng, Mulberry32};
use super::species::Species;
use crate::consts::*;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Lives ran out; the session is over
    GameOver,
}

/// The blower operator, fixed at the canvas centre
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Aim angle the sim is using this frame (radians)
    pub aim: f64,
    pub lives: i32,
    /// Frames of collision immunity left
    pub invincible: u32,
}

impl Player {
    pub fn new(lives: i32) -> Self {
        Self {
            aim: 0.0,
            lives,
            invincible: 0,
        }
    }
}

/// Toggles that do not affect simulation truth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimOptions {
    /// Emit wind particles and score popups
    pub effects: bool,
}

impl SimOptions {
    /// No cosmetics at all (replay, batch runs)
    pub const HEADLESS: SimOptions = SimOptions { effects: false };
}

impl Default for SimOptions {
    fn default() -> Self {
        Self { effects: true }
    }
}

/// Floating "+N" text left behind when something flees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Popup {
    pub pos: DVec2,
    pub text: String,
    /// 1 -> 0, removed at 0
    pub life: f64,
}

impl Popup {
    const RISE: f64 = 1.2;
    const FADE: f64 = 0.025;
    /// Keep popups readable near the edges
    const INSET: f64 = 30.0;

    /// Popup near `at`, pulled back onto the canvas
    pub fn new(at: DVec2, text: impl Into<String>) -> Self {
        Self {
            pos: DVec2::new(
                at.x.clamp(Self::INSET, W - Self::INSET),
                at.y.clamp(Self::INSET, H - Self::INSET),
            ),
            text: text.into(),
            life: 1.0,
        }
    }

    pub fn update(&mut self) {
        self.pos.y -= Self::RISE;
        self.life -= Self::FADE;
    }

    pub fn is_dead(&self) -> bool {
        self.life <= 0.0
    }
}

/// A wind streak blown out of the nozzle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    pub pos: DVec2,
    pub vel: DVec2,
    /// 1 -> 0, removed at 0
    pub life: f64,
    pub decay: f64,
    pub radius: f64,
    /// Colour hue (degrees)
    pub hue: f64,
}

/// Maximum particles
pub const MAX_PARTICLES: usize = 512;

impl Particle {
    const DRAG: f64 = 0.96;

    /// Random streak leaving `origin` roughly along `aim`
    pub fn emit(origin: DVec2, aim: f64, rng: &mut CosmeticRng) -> Self {
        let spread = (rng.unit() - 0.5) * WIND_HALF_ANGLE * 2.0;
        let speed = 7.0 + rng.unit() * 6.0;
        let heading = aim + spread;
        Self {
            pos: origin,
            vel: DVec2::new(heading.cos(), heading.sin()) * speed,
            life: 1.0,
            decay: 0.022 + rng.unit() * 0.022,
            radius: 1.5 + rng.unit() * 2.5,
            hue: 185.0 + rng.unit() * 35.0,
        }
    }

    pub fn update(&mut self) {
        self.pos += self.vel;
        self.vel *= Self::DRAG;
        self.life -= self.decay;
    }

    pub fn is_dead(&self) -> bool {
        self.life <= 0.0
    }
}

/// Complete game state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Session seed for reproducibility
    pub seed: u32,
    /// The seeded stream
    pub rng: Mulberry32,
    /// Frames simulated so far (the next tick simulates `frame + 1`)
    pub frame: u64,
    pub score: i64,
    pub phase: GamePhase,
    pub player: Player,
    /// Live critters per species, indexed by [`Species::index`]
    pub critters: [Vec<Critter>; 3],
    /// Spawn countdowns per species
    pub spawn_timers: [u32; 3],
    /// Size of the next yinzi wave
    pub wave_size: usize,
    pub options: SimOptions,
    #[serde(skip)]
    pub popups: Vec<Popup>,
    #[serde(skip)]
    pub particles: Vec<Particle>,
    #[serde(skip)]
    pub cosmetic: CosmeticRng,
    /// Next entity ID
    next_id: u32,
}

impl GameState {
    /// Fresh session with the given seed and starting lives
    pub fn new(seed: u32, lives: i32) -> Self {
        Self::with_options(seed, lives, SimOptions::default())
    }

    pub fn with_options(seed: u32, lives: i32, options: SimOptions) -> Self {
        Self {
            seed,
            rng: Mulberry32::new(seed),
            frame: 0,
            score: 0,
            phase: GamePhase::Playing,
            player: Player::new(lives),
            critters: [Vec::new(), Vec::new(), Vec::new()],
            spawn_timers: [0; 3],
            wave_size: 1,
            options,
            popups: Vec::new(),
            particles: Vec::new(),
            cosmetic: CosmeticRng::default(),
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn critters(&self, species: Species) -> &[Critter] {
        &self.critters[species.index()]
    }

    pub fn critters_mut(&mut self, species: Species) -> &mut Vec<Critter> {
        &mut self.critters[species.index()]
    }

    /// Every live critter in species order
    pub fn all_critters(&self) -> impl Iterator<Item = &Critter> {
        self.critters.iter().flatten()
    }

    pub fn population(&self) -> usize {
        self.critters.iter().map(Vec::len).sum()
    }

    pub fn is_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state() {
        let state = GameState::new(42, 3);
        assert_eq!(state.frame, 0);
        assert_eq!(state.score, 0);
        assert_eq!(state.player.lives, 3);
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.population(), 0);
        assert_eq!(state.wave_size, 1);
        assert_eq!(state.rng, Mulberry32::new(42));
    }

    #[test]
    fn test_entity_ids_increase() {
        let mut state = GameState::new(1, 3);
        let a = state.next_entity_id();
        let b = state.next_entity_id();
        assert!(b > a);
    }

    #[test]
    fn test_popup_clamped_and_fades() {
        let mut p = Popup::new(DVec2::new(-100.0, H + 50.0), "+1");
        assert_eq!(p.pos, DVec2::new(30.0, H - 30.0));
        let y = p.pos.y;
        for _ in 0..40 {
            p.update();
        }
        assert!(p.pos.y < y);
        assert!(p.is_dead());
    }

    #[test]
    fn test_particle_spreads_within_cone() {
        let mut rng = CosmeticRng::seeded(3);
        for _ in 0..100 {
            let p = Particle::emit(DVec2::ZERO, 0.0, &mut rng);
            let heading = p.vel.y.atan2(p.vel.x);
            assert!(heading.abs() <= WIND_HALF_ANGLE + 1e-9);
            assert!(p.vel.length() >= 7.0 && p.vel.length() < 13.0);
        }
    }

    #[test]
    fn test_particle_dies() {
        let mut p = Particle::emit(DVec2::ZERO, 1.0, &mut CosmeticRng::seeded(0));
        let mut frames = 0;
        while !p.is_dead() {
            p.update();
            frames += 1;
        }
        assert!(frames <= 46);
    }

    #[test]
    fn test_state_serializes_without_cosmetics() {
        let mut state = GameState::new(7, 3);
        state.popups.push(Popup::new(DVec2::new(100.0, 100.0), "+1"));
        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("popups").is_none());
        assert!(json.get("particles").is_none());
        assert_eq!(json["seed"], 7);
    }
}
