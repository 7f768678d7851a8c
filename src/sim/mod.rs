//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - One frame per tick, no wall-clock time
//! - Seeded RNG only (cosmetics use their own stream)
//! - Fixed species order, stable list order
//! - No rendering, I/O or platform dependencies

pub mod entity;
pub mod rng;
pub mod species;
pub mod state;
pub mod tick;
pub mod wind;

pub use entity::Critter;
pub use rng::{CosmeticRng, Mulberry32, generate_seed};
pub use species::{SpawnPolicy, Species, SpeciesParams, UnknownSpecies};
pub use state::{GamePhase, GameState, Particle, Player, Popup, SimOptions};
pub use tick::{TickInput, spawn_interval, tick};
pub use wind::{WindCone, apply_wind};
