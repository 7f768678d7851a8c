//! Wind cone interaction
//!
//! The blower pushes anything inside a cone in front of the player. The cone is
//! an annular sector: strictly beyond the dead zone, strictly inside the range,
//! and within the half-angle of the aim. Force falls off linearly with distance.

use glam::DVec2;

use super::entity::Critter;
use super::rng::Mulberry32;
use crate::consts::{WIND_DEAD_ZONE, WIND_HALF_ANGLE, WIND_RANGE};
use crate::normalize_angle;

/// Cone geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindCone {
    pub origin: DVec2,
    /// Aim angle (radians)
    pub aim: f64,
    pub dead_zone: f64,
    pub range: f64,
    pub half_angle: f64,
}

impl WindCone {
    /// Standard blower cone at `origin`
    pub fn new(origin: DVec2, aim: f64) -> Self {
        Self {
            origin,
            aim,
            dead_zone: WIND_DEAD_ZONE,
            range: WIND_RANGE,
            half_angle: WIND_HALF_ANGLE,
        }
    }

    /// Unit vector the wind blows along
    #[inline]
    pub fn direction(&self) -> DVec2 {
        DVec2::new(self.aim.cos(), self.aim.sin())
    }

    /// Force (0..1) felt at `pos`, or None outside the cone
    pub fn force_at(&self, pos: DVec2) -> Option<f64> {
        let d = pos - self.origin;
        let dist = d.length();
        if !(dist < self.range && dist > self.dead_zone) {
            return None;
        }
        let diff = normalize_angle(d.y.atan2(d.x) - self.aim);
        if diff.abs() < self.half_angle {
            Some(1.0 - dist / self.range)
        } else {
            None
        }
    }
}

/// Blow every critter inside the cone
///
/// `on_newly_scared(critter, force)` fires for each calm-to-scared transition,
/// after the gust has been applied.
pub fn apply_wind<F>(
    critters: &mut [Critter],
    cone: &WindCone,
    rng: &mut Mulberry32,
    mut on_newly_scared: F,
) where
    F: FnMut(&Critter, f64),
{
    let dir = cone.direction();
    for critter in critters.iter_mut() {
        if let Some(force) = cone.force_at(critter.pos) {
            if critter.apply_force(dir, force, rng) {
                on_newly_scared(critter, force);
            }
        }
    }
}
