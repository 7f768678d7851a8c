//! Critters: the blowable entities
//!
//! One record type serves every species. Behaviour is a two-state machine:
//!
//! - **Calm**: wanders on a jittered heading, clamped to the species wander
//!   speed, nudged away from the canvas edges.
//! - **Scared**: entered when a gust lands. No steering; velocity decays
//!   every frame until the scare timer runs out.
//!
//! Every random choice here comes from the seeded stream, except the wobble
//! phase, which is visual only.

use std::f64::consts::TAU;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::rng::{CosmeticRng, Mulberry32};
use super::species::{
    EDGE_MARGIN, EDGE_PUSH, EXCLAM_FRAMES, SCARED_DAMPING, Species, SpeciesParams, WANDER_ACCEL,
    WANDER_JITTER,
};
use crate::consts::{H, W};
use crate::player_origin;

/// A single critter on (or just off) the lawn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Critter {
    pub id: u32,
    pub species: Species,
    pub pos: DVec2,
    pub vel: DVec2,
    /// Body radius
    pub size: f64,
    pub scared: bool,
    /// Frames left in the scared state. Non-zero exactly while `scared`.
    pub scared_timer: u32,
    /// Frames left on the "!" bubble (cosmetic, armed only on a fresh scare)
    pub exclam_timer: i32,
    pub wander_angle: f64,
    /// Index into the species palette
    pub coat: usize,
    /// Index into the species catchphrases, picked on the last fresh scare
    pub phrase: Option<usize>,
    /// Tail/hair animation phase
    #[serde(skip)]
    pub wobble: f64,
}

impl Critter {
    /// Spawn just outside a random canvas edge, heading for the player
    ///
    /// Seeded draws, in order: side, position along the side, coat (only for
    /// multi-colour palettes), size, speed.
    pub fn spawn(
        id: u32,
        species: Species,
        rng: &mut Mulberry32,
        cosmetic: &mut CosmeticRng,
    ) -> Self {
        let p = species.params();
        let pos = match rng.index(4) {
            0 => DVec2::new(rng.next_f64() * W, -p.edge_offset),
            1 => DVec2::new(W + p.edge_offset, rng.next_f64() * H),
            2 => DVec2::new(rng.next_f64() * W, H + p.edge_offset),
            _ => DVec2::new(-p.edge_offset, rng.next_f64() * H),
        };

        let coat = if p.palette.len() > 1 {
            rng.index(p.palette.len())
        } else {
            0
        };
        let size = p.size_min + rng.next_f64() * p.size_jitter;
        let wobble = cosmetic.unit() * TAU;

        let to_player = player_origin() - pos;
        let dist = to_player.length();
        let speed = p.speed_min + rng.next_f64() * p.speed_jitter;

        Self {
            id,
            species,
            pos,
            vel: to_player / dist * speed,
            size,
            scared: false,
            scared_timer: 0,
            exclam_timer: 0,
            wander_angle: to_player.y.atan2(to_player.x),
            coat,
            phrase: None,
            wobble,
        }
    }

    /// A calm, motionless critter at a fixed spot (scenario setup and tests)
    pub fn placed(id: u32, species: Species, pos: DVec2) -> Self {
        let p = species.params();
        Self {
            id,
            species,
            pos,
            vel: DVec2::ZERO,
            size: p.size_min,
            scared: false,
            scared_timer: 0,
            exclam_timer: 0,
            wander_angle: 0.0,
            coat: 0,
            phrase: None,
            wobble: 0.0,
        }
    }

    #[inline]
    pub fn params(&self) -> &'static SpeciesParams {
        self.species.params()
    }

    /// Heading derived from velocity
    #[inline]
    pub fn facing(&self) -> f64 {
        self.vel.y.atan2(self.vel.x)
    }

    pub fn color(&self) -> &'static str {
        let palette = self.params().palette;
        palette.get(self.coat).or(palette.first()).copied().unwrap_or("#ffffff")
    }

    pub fn catchphrase(&self) -> Option<&'static str> {
        self.phrase
            .and_then(|i| self.params().catchphrases.get(i))
            .copied()
    }

    /// Advance one frame
    pub fn update(&mut self, rng: &mut Mulberry32) {
        let p = self.params();
        self.wobble += p.wobble_step;

        if self.scared {
            self.scared_timer = self.scared_timer.saturating_sub(1);
            self.exclam_timer = (self.exclam_timer - 1).max(0);
            if self.scared_timer == 0 {
                self.scared = false;
            }
            self.vel *= SCARED_DAMPING;
        } else {
            self.wander_angle += (rng.next_f64() - 0.5) * WANDER_JITTER;
            self.vel += DVec2::new(self.wander_angle.cos(), self.wander_angle.sin()) * WANDER_ACCEL;
            self.vel = clamp_speed(self.vel, p.max_speed);

            if p.attraction > 0.0 {
                let to_player = player_origin() - self.pos;
                let dist = to_player.length();
                if dist > 1.0 {
                    self.vel += to_player / dist * p.attraction;
                }
            }

            if self.pos.x < EDGE_MARGIN {
                self.vel.x += EDGE_PUSH;
            }
            if self.pos.x > W - EDGE_MARGIN {
                self.vel.x -= EDGE_PUSH;
            }
            if self.pos.y < EDGE_MARGIN {
                self.vel.y += EDGE_PUSH;
            }
            if self.pos.y > H - EDGE_MARGIN {
                self.vel.y -= EDGE_PUSH;
            }
        }

        self.pos += self.vel;
    }

    /// Take a gust of `force` (0..1) along the unit vector `dir`
    ///
    /// Returns true on the calm-to-scared edge. Only that edge arms the "!"
    /// timer and, for species with catchphrases, spends a seeded draw on one.
    pub fn apply_force(&mut self, dir: DVec2, force: f64, rng: &mut Mulberry32) -> bool {
        let p = self.params();
        let was_scared = self.scared;

        self.vel += dir * force * p.wind_gain;
        self.vel = clamp_speed(self.vel, p.wind_cap);
        self.scared = true;
        self.scared_timer = p.scare_frames;

        if !was_scared {
            self.exclam_timer = EXCLAM_FRAMES;
            if !p.catchphrases.is_empty() {
                self.phrase = Some(rng.index(p.catchphrases.len()));
            }
        }
        !was_scared
    }

    /// Past the species margin beyond any canvas edge
    pub fn is_gone(&self) -> bool {
        let m = self.params().gone_margin;
        self.pos.x < -m || self.pos.x > W + m || self.pos.y < -m || self.pos.y > H + m
    }

    /// Overlapping the player body
    pub fn touches_player(&self, player_radius: f64) -> bool {
        self.pos.distance(player_origin()) < player_radius + self.size
    }
}

/// Scale `vel` down to `max` if it is faster
#[inline]
fn clamp_speed(vel: DVec2, max: f64) -> DVec2 {
    let speed = vel.length();
    if speed > max { vel / speed * max } else { vel }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{PLAYER_RADIUS, PX, PY};
    use std::f64::consts::PI;

    fn cat_at(x: f64, y: f64) -> Critter {
        Critter::placed(1, Species::Cat, DVec2::new(x, y))
    }

    #[test]
    fn test_spawn_at_edge_heading_inward() {
        let mut rng = Mulberry32::new(2024);
        let mut cosmetic = CosmeticRng::seeded(1);
        for species in Species::ALL {
            for id in 0..40 {
                let c = Critter::spawn(id, species, &mut rng, &mut cosmetic);
                let at_edge = c.pos.x <= -20.0
                    || c.pos.x >= W + 20.0
                    || c.pos.y <= -20.0
                    || c.pos.y >= H + 20.0;
                assert!(at_edge, "{:?} spawned on the lawn at {:?}", species, c.pos);
                let toward = c.vel.dot(player_origin() - c.pos);
                assert!(toward > 0.0);
                assert!(!c.scared);
                assert_eq!(c.scared_timer, 0);
                assert_eq!(c.exclam_timer, 0);
            }
        }
    }

    #[test]
    fn test_spawn_size_range() {
        let mut rng = Mulberry32::new(8);
        let mut cosmetic = CosmeticRng::seeded(8);
        for id in 0..30 {
            let c = Critter::spawn(id, Species::Cat, &mut rng, &mut cosmetic);
            assert!(c.size >= 16.0 && c.size < 21.0);
        }
    }

    #[test]
    fn test_spawn_draw_counts() {
        let mut cosmetic = CosmeticRng::seeded(0);
        let mut rng = Mulberry32::new(11);
        Critter::spawn(1, Species::Cat, &mut rng, &mut cosmetic);
        assert_eq!(rng.draws(), 5);

        // Single-colour palette: no coat draw
        let mut rng = Mulberry32::new(11);
        Critter::spawn(1, Species::Yinzi, &mut rng, &mut cosmetic);
        assert_eq!(rng.draws(), 4);
    }

    #[test]
    fn test_spawn_ignores_cosmetic_stream() {
        let mut a = Mulberry32::new(5);
        let mut b = Mulberry32::new(5);
        let ca = Critter::spawn(1, Species::Dog, &mut a, &mut CosmeticRng::seeded(1));
        let cb = Critter::spawn(1, Species::Dog, &mut b, &mut CosmeticRng::seeded(999));
        assert_eq!(ca.pos, cb.pos);
        assert_eq!(ca.vel, cb.vel);
        assert_ne!(ca.wobble, cb.wobble);
    }

    #[test]
    fn test_facing_follows_velocity() {
        let mut c = cat_at(PX, PY);
        c.vel = DVec2::new(1.0, 0.0);
        assert!(c.facing().abs() < 1e-12);
        c.vel = DVec2::new(0.0, 1.0);
        assert!((c.facing() - PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_scared_update_moves_by_damped_velocity() {
        let mut rng = Mulberry32::new(1);
        let mut c = cat_at(PX, PY);
        c.vel = DVec2::new(3.0, -2.0);
        c.scared = true;
        c.scared_timer = 10;
        c.update(&mut rng);
        assert!((c.pos.x - (PX + 3.0 * 0.975)).abs() < 1e-9);
        assert!((c.pos.y - (PY - 2.0 * 0.975)).abs() < 1e-9);
        assert_eq!(c.scared_timer, 9);
        // Scared frames never touch the seeded stream
        assert_eq!(rng.draws(), 0);
    }

    #[test]
    fn test_scare_expires() {
        let mut rng = Mulberry32::new(1);
        let mut c = cat_at(PX, PY);
        c.scared = true;
        c.scared_timer = 1;
        c.update(&mut rng);
        assert!(!c.scared);
        assert_eq!(c.scared_timer, 0);
    }

    #[test]
    fn test_calm_update_draws_once_and_clamps() {
        let mut rng = Mulberry32::new(1);
        let mut c = cat_at(PX, PY);
        c.vel = DVec2::new(50.0, 0.0);
        c.update(&mut rng);
        assert_eq!(rng.draws(), 1);
        assert!(c.vel.length() <= 1.6 + 1e-9);
    }

    #[test]
    fn test_edge_push() {
        let mut rng = Mulberry32::new(1);
        let mut c = cat_at(10.0, PY);
        c.wander_angle = PI; // heading left, into the edge
        c.update(&mut rng);
        let mut free = cat_at(PX, PY);
        free.wander_angle = PI;
        free.update(&mut Mulberry32::new(1));
        assert!(c.vel.x > free.vel.x);
    }

    #[test]
    fn test_wobble_advances() {
        let mut c = cat_at(PX, PY);
        let before = c.wobble;
        c.update(&mut Mulberry32::new(1));
        assert!(c.wobble > before);
    }

    #[test]
    fn test_apply_force_scares_and_pushes() {
        let mut rng = Mulberry32::new(1);
        let mut c = cat_at(PX, PY);
        assert!(c.apply_force(DVec2::X, 0.5, &mut rng));
        assert!(c.scared);
        assert!(c.vel.x > 0.0);
        assert_eq!(c.scared_timer, 100);
        assert!(c.exclam_timer > 0);
    }

    #[test]
    fn test_apply_force_does_not_rearm_exclamation() {
        let mut rng = Mulberry32::new(1);
        let mut c = cat_at(PX, PY);
        c.scared = true;
        c.scared_timer = 50;
        c.exclam_timer = 3;
        assert!(!c.apply_force(DVec2::X, 0.5, &mut rng));
        assert_eq!(c.exclam_timer, 3);
        assert_eq!(c.scared_timer, 100);
    }

    #[test]
    fn test_apply_force_caps_speed() {
        let mut rng = Mulberry32::new(1);
        for species in Species::ALL {
            let mut c = Critter::placed(1, species, DVec2::new(PX, PY));
            c.apply_force(DVec2::X, 999.0, &mut rng);
            assert!(c.vel.length() <= species.params().wind_cap + 1e-9);
        }
    }

    #[test]
    fn test_stronger_gust_is_faster() {
        let mut rng = Mulberry32::new(1);
        let mut slow = cat_at(PX, PY);
        let mut fast = cat_at(PX, PY);
        slow.apply_force(DVec2::X, 0.1, &mut rng);
        fast.apply_force(DVec2::X, 0.9, &mut rng);
        assert!(fast.vel.x > slow.vel.x);
    }

    #[test]
    fn test_catchphrase_costs_a_draw_only_when_fresh() {
        let mut rng = Mulberry32::new(3);
        let mut z = Critter::placed(1, Species::Yinzi, DVec2::new(PX, PY));
        z.apply_force(DVec2::X, 0.5, &mut rng);
        assert_eq!(rng.draws(), 1);
        assert!(z.catchphrase().is_some());
        z.apply_force(DVec2::X, 0.5, &mut rng);
        assert_eq!(rng.draws(), 1);

        let mut c = cat_at(PX, PY);
        c.apply_force(DVec2::X, 0.5, &mut rng);
        assert_eq!(rng.draws(), 1);
        assert_eq!(c.catchphrase(), None);
    }

    #[test]
    fn test_is_gone_boundaries() {
        assert!(!cat_at(PX, PY).is_gone());
        assert!(!cat_at(-80.0, PY).is_gone());
        assert!(cat_at(-100.0, PY).is_gone());
        assert!(cat_at(W + 100.0, PY).is_gone());
        assert!(cat_at(PX, -100.0).is_gone());
        assert!(cat_at(PX, H + 100.0).is_gone());

        for species in Species::ALL {
            let m = species.params().gone_margin;
            let inside = Critter::placed(1, species, DVec2::new(-m + 1.0, PY));
            let beyond = Critter::placed(1, species, DVec2::new(PX, H + m + 100.0));
            let centre = Critter::placed(1, species, DVec2::new(PX, PY));
            assert!(!inside.is_gone());
            assert!(beyond.is_gone());
            assert!(!centre.is_gone());
        }
    }

    #[test]
    fn test_touches_player() {
        assert!(cat_at(PX, PY).touches_player(PLAYER_RADIUS));
        assert!(cat_at(PX + PLAYER_RADIUS, PY).touches_player(PLAYER_RADIUS));
        assert!(!cat_at(PX + 69.0, PY).touches_player(PLAYER_RADIUS));
    }

    #[test]
    fn test_close_call_reaches_player_without_wind() {
        // A calm cat 54px out at top wander speed closes in within 40 frames
        let mut rng = Mulberry32::new(77);
        let mut c = cat_at(PX + 54.0, PY);
        c.vel = DVec2::new(-1.6, 0.0);
        c.wander_angle = PI;
        assert!(!c.touches_player(PLAYER_RADIUS));
        let hit = (0..40).any(|_| {
            c.update(&mut rng);
            c.touches_player(PLAYER_RADIUS)
        });
        assert!(hit);
    }
}
