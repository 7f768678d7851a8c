//! Fixed timestep simulation tick
//!
//! One call advances one frame. The order of the phases below is part of the
//! replay contract, since every spawn and every calm update draws from the
//! seeded stream:
//!
//! 1. frame counter, aim
//! 2. spawns (cats, dogs, yinzis)
//! 3. critter updates (same order)
//! 4. wind, per species
//! 5. player collision (first overlapping species only), invincibility countdown
//! 6. fled critters and scoring, per species
//! 7. game over

use log::debug;

use super::entity::Critter;
use super::species::{SpawnPolicy, Species};
use super::state::{GamePhase, GameState, MAX_PARTICLES, Particle, Popup};
use super::wind::{WindCone, apply_wind};
use crate::consts::*;
use crate::events::{EventPayload, SimEvent};
use crate::{player_origin, round_coord, round_to};

/// Input for a single tick (deterministic)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickInput {
    /// Blower aim (radians)
    pub aim: f64,
}

impl TickInput {
    pub fn aim(aim: f64) -> Self {
        Self { aim }
    }
}

/// Frames between spawns for a species at the given score
pub fn spawn_interval(species: Species, score: i64) -> f64 {
    species.params().spawn.interval(score)
}

/// Advance the game state by one frame, returning the derived events
pub fn tick(state: &mut GameState, input: &TickInput) -> Vec<SimEvent> {
    if state.phase == GamePhase::GameOver {
        return Vec::new();
    }

    state.frame += 1;
    state.player.aim = input.aim;
    let mut events = Vec::new();

    for species in Species::ALL {
        spawn_species(state, species, &mut events);
    }

    for critter in state.critters.iter_mut().flatten() {
        critter.update(&mut state.rng);
    }

    if state.options.effects {
        update_effects(state);
    }

    blow(state, &mut events);
    resolve_collision(state, &mut events);
    if state.player.invincible > 0 {
        state.player.invincible -= 1;
    }
    resolve_fled(state, &mut events);

    if state.player.lives <= 0 {
        state.phase = GamePhase::GameOver;
        events.push(SimEvent::new(
            state.frame,
            EventPayload::GameOver { score: state.score },
        ));
        debug!(
            "Game over at frame {} with score {}",
            state.frame, state.score
        );
    }

    events
}

/// Run the spawn policy for one species
fn spawn_species(state: &mut GameState, species: Species, events: &mut Vec<SimEvent>) {
    let i = species.index();
    let policy = species.params().spawn;
    let interval = policy.interval(state.score);

    match policy {
        SpawnPolicy::Steady { cap, .. } => {
            state.spawn_timers[i] += 1;
            if f64::from(state.spawn_timers[i]) >= interval && state.critters[i].len() < cap {
                spawn_one(state, species, events);
                state.spawn_timers[i] = 0;
            }
        }
        SpawnPolicy::Waves {
            unlock_score,
            max_batch,
            ..
        } => {
            if state.score <= unlock_score {
                return;
            }
            state.spawn_timers[i] += 1;
            if f64::from(state.spawn_timers[i]) >= interval && state.critters[i].is_empty() {
                let batch = state.wave_size;
                for _ in 0..batch {
                    spawn_one(state, species, events);
                }
                debug!("{} wave of {} at frame {}", species.as_str(), batch, state.frame);
                state.wave_size = (batch * 2).min(max_batch);
                state.spawn_timers[i] = 0;
            }
        }
    }
}

fn spawn_one(state: &mut GameState, species: Species, events: &mut Vec<SimEvent>) {
    let id = state.next_entity_id();
    let critter = Critter::spawn(id, species, &mut state.rng, &mut state.cosmetic);
    events.push(SimEvent::new(state.frame, spawn_payload(&critter)));
    state.critters_mut(species).push(critter);
}

fn spawn_payload(critter: &Critter) -> EventPayload {
    EventPayload::Spawn {
        species: critter.species,
        x: round_coord(critter.pos.x),
        y: round_coord(critter.pos.y),
        sz: round_to(critter.size, 3),
        color: critter.color().to_string(),
        vx: round_to(critter.vel.x, 3),
        vy: round_to(critter.vel.y, 3),
        wander_angle: round_to(critter.wander_angle, 3),
    }
}

/// Particles and popups (never touches the seeded stream)
fn update_effects(state: &mut GameState) {
    let aim = state.player.aim;
    let nozzle = player_origin() + glam::DVec2::new(aim.cos(), aim.sin()) * NOZZLE_LENGTH;
    for _ in 0..PARTICLES_PER_FRAME {
        if state.particles.len() >= MAX_PARTICLES {
            break;
        }
        state
            .particles
            .push(Particle::emit(nozzle, aim, &mut state.cosmetic));
    }
    for p in &mut state.particles {
        p.update();
    }
    state.particles.retain(|p| !p.is_dead());

    for p in &mut state.popups {
        p.update();
    }
    state.popups.retain(|p| !p.is_dead());
}

/// Apply the wind cone to each species list in order
fn blow(state: &mut GameState, events: &mut Vec<SimEvent>) {
    let cone = WindCone::new(player_origin(), state.player.aim);
    let frame = state.frame;
    for species in Species::ALL {
        apply_wind(
            &mut state.critters[species.index()],
            &cone,
            &mut state.rng,
            |critter, force| {
                events.push(SimEvent::new(
                    frame,
                    EventPayload::Scared {
                        species,
                        force: round_to(force, 3),
                        cx: round_coord(critter.pos.x),
                        cy: round_coord(critter.pos.y),
                    },
                ));
            },
        );
    }
}

/// Hits from the first species (in species order) with any overlap
///
/// Every overlapping critter of that species is removed and costs a life, in
/// list order. Later species wait for the next frame, when invincibility
/// covers them.
fn resolve_collision(state: &mut GameState, events: &mut Vec<SimEvent>) {
    if state.player.invincible > 0 {
        return;
    }
    for species in Species::ALL {
        let mut hits = Vec::new();
        state.critters[species.index()].retain(|c| {
            if c.touches_player(PLAYER_RADIUS) {
                hits.push(c.pos);
                false
            } else {
                true
            }
        });
        if hits.is_empty() {
            continue;
        }
        for pos in hits {
            state.player.lives -= 1;
            events.push(SimEvent::new(
                state.frame,
                EventPayload::PlayerHit {
                    entity: species,
                    lives: state.player.lives,
                    cx: round_coord(pos.x),
                    cy: round_coord(pos.y),
                },
            ));
            debug!(
                "Player hit by {} at frame {}, {} lives left",
                species.as_str(),
                state.frame,
                state.player.lives
            );
        }
        state.player.invincible = INVINCIBLE_FRAMES;
        return;
    }
}

/// Remove fled critters; per species, all fled events then one score change
fn resolve_fled(state: &mut GameState, events: &mut Vec<SimEvent>) {
    for species in Species::ALL {
        let mut fled = Vec::new();
        state.critters[species.index()].retain(|c| {
            if c.is_gone() {
                fled.push(c.pos);
                false
            } else {
                true
            }
        });
        if fled.is_empty() {
            continue;
        }

        let points = species.params().points;
        for pos in &fled {
            events.push(SimEvent::new(
                state.frame,
                EventPayload::Fled {
                    species,
                    cx: round_coord(pos.x),
                    cy: round_coord(pos.y),
                },
            ));
            if state.options.effects {
                state.popups.push(Popup::new(*pos, format!("+{points}")));
            }
        }

        let delta = fled.len() as i64 * points;
        state.score += delta;
        events.push(SimEvent::new(
            state.frame,
            EventPayload::ScoreChange {
                score: state.score,
                delta,
            },
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::SimOptions;
    use glam::DVec2;
    use proptest::prelude::*;

    fn run(state: &mut GameState, frames: u64, aim: f64) -> Vec<SimEvent> {
        let input = TickInput::aim(aim);
        (0..frames).flat_map(|_| tick(state, &input)).collect()
    }

    fn kinds(events: &[SimEvent]) -> Vec<String> {
        events.iter().map(SimEvent::type_name).collect()
    }

    fn place(state: &mut GameState, species: Species, x: f64, y: f64) {
        let id = state.next_entity_id();
        state
            .critters_mut(species)
            .push(Critter::placed(id, species, DVec2::new(x, y)));
    }

    #[test]
    fn test_first_cat_on_interval_frame() {
        let mut state = GameState::new(12345, 3);
        let before = run(&mut state, 139, 0.0);
        assert!(before.is_empty());
        assert_eq!(state.frame, 139);

        let events = tick(&mut state, &TickInput::aim(0.0));
        assert_eq!(kinds(&events), ["cat_spawn"]);
        assert_eq!(events[0].frame, 140);
        assert_eq!(state.critters(Species::Cat).len(), 1);
        assert_eq!(state.spawn_timers[Species::Cat.index()], 0);
    }

    #[test]
    fn test_spawn_payload_matches_critter() {
        let mut state = GameState::new(9, 3);
        let events = run(&mut state, 140, 0.0);
        let cat = &state.critters(Species::Cat)[0];
        let Some(EventPayload::Spawn { x, color, sz, .. }) = events.first().map(|e| &e.payload)
        else {
            panic!("expected a spawn, got {events:?}");
        };
        assert!((*x as f64 - cat.pos.x).abs() <= 0.5 + cat.vel.x.abs() + 2.0);
        assert_eq!(color, cat.color());
        assert!((sz - cat.size).abs() < 1e-3);
    }

    #[test]
    fn test_same_seed_same_events() {
        let mut a = GameState::new(777, 3);
        let mut b = GameState::new(777, 3);
        let ea = run(&mut a, 3000, 0.7);
        let eb = run(&mut b, 3000, 0.7);
        assert!(!ea.is_empty());
        assert_eq!(ea, eb);
        assert_eq!(a.rng, b.rng);
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut a = GameState::new(1, 3);
        let mut b = GameState::new(2, 3);
        assert_ne!(run(&mut a, 600, 0.0), run(&mut b, 600, 0.0));
    }

    #[test]
    fn test_effects_do_not_change_events() {
        let mut live = GameState::with_options(4242, 3, SimOptions::default());
        let mut headless = GameState::with_options(4242, 3, SimOptions::HEADLESS);
        let mut ea = Vec::new();
        let mut eb = Vec::new();
        for f in 0..2000u32 {
            let input = TickInput::aim(f64::from(f / 100) * 0.9 - 3.0);
            ea.extend(tick(&mut live, &input));
            eb.extend(tick(&mut headless, &input));
        }
        assert_eq!(ea, eb);
        assert!(headless.particles.is_empty());
        assert!(headless.popups.is_empty());
    }

    #[test]
    fn test_one_hit_per_frame() {
        let mut state = GameState::with_options(1, 3, SimOptions::HEADLESS);
        place(&mut state, Species::Dog, PX, PY);
        place(&mut state, Species::Cat, PX, PY);

        let events = tick(&mut state, &TickInput::default());
        assert_eq!(kinds(&events), ["player_hit"]);
        assert!(matches!(
            events[0].payload,
            EventPayload::PlayerHit {
                entity: Species::Cat,
                lives: 2,
                ..
            }
        ));
        assert_eq!(state.critters(Species::Dog).len(), 1);
        assert_eq!(state.player.invincible, INVINCIBLE_FRAMES - 1);

        // The dog still overlaps but the player is invincible now
        let events = tick(&mut state, &TickInput::default());
        assert!(events.is_empty());
        assert_eq!(state.player.lives, 2);
    }

    #[test]
    fn test_same_species_overlaps_all_hit() {
        let mut state = GameState::with_options(1, 3, SimOptions::HEADLESS);
        place(&mut state, Species::Cat, PX, PY);
        place(&mut state, Species::Cat, PX + 5.0, PY);
        place(&mut state, Species::Cat, PX, PY + 200.0);
        place(&mut state, Species::Dog, PX, PY);

        let events = tick(&mut state, &TickInput::default());
        assert_eq!(kinds(&events), ["player_hit", "player_hit"]);
        let lives: Vec<i32> = events
            .iter()
            .filter_map(|e| match e.payload {
                EventPayload::PlayerHit { lives, .. } => Some(lives),
                _ => None,
            })
            .collect();
        assert_eq!(lives, [2, 1]);
        assert_eq!(state.player.lives, 1);
        assert_eq!(state.critters(Species::Cat).len(), 1);
        assert_eq!(state.critters(Species::Dog).len(), 1);
        assert_eq!(state.player.invincible, INVINCIBLE_FRAMES - 1);
    }

    #[test]
    fn test_overlaps_can_end_the_game_in_one_frame() {
        let mut state = GameState::with_options(1, 2, SimOptions::HEADLESS);
        for i in 0..3 {
            place(&mut state, Species::Dog, PX + f64::from(i), PY);
        }

        let events = tick(&mut state, &TickInput::default());
        assert_eq!(kinds(&events), ["player_hit", "player_hit", "player_hit", "game_over"]);
        assert!(state.is_over());
        assert!(state.critters(Species::Dog).is_empty());
    }

    #[test]
    fn test_fled_scoring_per_species() {
        let mut state = GameState::with_options(1, 3, SimOptions::HEADLESS);
        place(&mut state, Species::Cat, W + 200.0, PY);
        place(&mut state, Species::Dog, PX, -300.0);
        place(&mut state, Species::Cat, -200.0, PY);

        let events = tick(&mut state, &TickInput::aim(1.0));
        assert_eq!(
            kinds(&events),
            ["cat_fled", "cat_fled", "score_change", "dog_fled", "score_change"]
        );
        assert_eq!(
            events[2].payload,
            EventPayload::ScoreChange { score: 2, delta: 2 }
        );
        assert_eq!(
            events[4].payload,
            EventPayload::ScoreChange { score: 5, delta: 3 }
        );
        assert_eq!(state.score, 5);
        assert_eq!(state.population(), 0);
    }

    #[test]
    fn test_popups_follow_flee() {
        let mut state = GameState::new(1, 3);
        place(&mut state, Species::Yinzi, W + 300.0, PY);
        tick(&mut state, &TickInput::default());
        assert_eq!(state.popups.len(), 1);
        assert_eq!(state.popups[0].text, "+5");
        assert_eq!(state.popups[0].pos.x, W - 30.0);
    }

    #[test]
    fn test_game_over_is_last_and_final() {
        let mut state = GameState::with_options(1, 1, SimOptions::HEADLESS);
        place(&mut state, Species::Cat, PX, PY);
        place(&mut state, Species::Cat, -300.0, PY);

        let events = tick(&mut state, &TickInput::default());
        assert_eq!(
            kinds(&events),
            ["player_hit", "cat_fled", "score_change", "game_over"]
        );
        assert_eq!(events[3].payload, EventPayload::GameOver { score: 1 });
        assert!(state.is_over());

        let frame = state.frame;
        assert!(run(&mut state, 100, 0.0).is_empty());
        assert_eq!(state.frame, frame);
    }

    #[test]
    fn test_yinzi_locked_until_score() {
        let mut state = GameState::with_options(3, 3, SimOptions::HEADLESS);
        state.score = 20;
        state.spawn_timers[Species::Yinzi.index()] = 10_000;
        tick(&mut state, &TickInput::default());
        assert!(state.critters(Species::Yinzi).is_empty());
        assert_eq!(state.spawn_timers[Species::Yinzi.index()], 10_000);
    }

    #[test]
    fn test_yinzi_waves_double() {
        let mut state = GameState::with_options(3, 3, SimOptions::HEADLESS);
        state.score = 21;
        let interval = spawn_interval(Species::Yinzi, 21) as u32;
        state.spawn_timers[Species::Yinzi.index()] = interval - 1;

        let events = tick(&mut state, &TickInput::default());
        assert_eq!(kinds(&events), ["yinzi_spawn"]);
        assert_eq!(state.wave_size, 2);

        // No new wave while one is still on the lawn
        state.spawn_timers[Species::Yinzi.index()] = 10_000;
        let events = tick(&mut state, &TickInput::default());
        assert!(!kinds(&events).contains(&"yinzi_spawn".to_string()));

        state.critters_mut(Species::Yinzi).clear();
        let events = tick(&mut state, &TickInput::default());
        let spawned = kinds(&events).iter().filter(|k| *k == "yinzi_spawn").count();
        assert_eq!(spawned, 2);
        assert_eq!(state.wave_size, 4);
    }

    #[test]
    fn test_steady_cap() {
        let mut state = GameState::with_options(3, 3, SimOptions::HEADLESS);
        for i in 0..3 {
            place(&mut state, Species::Dog, 100.0 + f64::from(i) * 10.0, 100.0);
        }
        state.spawn_timers[Species::Dog.index()] = 10_000;
        let events = tick(&mut state, &TickInput::default());
        assert!(!kinds(&events).contains(&"dog_spawn".to_string()));
        assert_eq!(state.critters(Species::Dog).len(), 3);
    }

    #[test]
    fn test_blown_cat_is_scared_once() {
        let mut state = GameState::with_options(1, 3, SimOptions::HEADLESS);
        place(&mut state, Species::Cat, PX + 120.0, PY);
        let events = tick(&mut state, &TickInput::aim(0.0));
        assert_eq!(kinds(&events), ["cat_scared"]);
        let EventPayload::Scared { force, cx, .. } = events[0].payload else {
            panic!("expected scared");
        };
        assert!(force > 0.0 && force < 1.0);
        assert_eq!(round_to(force, 3), force);
        assert!(cx > PX as i64);

        let events = tick(&mut state, &TickInput::aim(0.0));
        assert!(events.is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_replayed_inputs_match(seed in any::<u32>(), aims in prop::collection::vec(-3.14f64..3.14, 1..20)) {
            let mut a = GameState::new(seed, 3);
            let mut b = GameState::with_options(seed, 3, SimOptions::HEADLESS);
            for aim in aims {
                let input = TickInput::aim(aim);
                for _ in 0..60 {
                    prop_assert_eq!(tick(&mut a, &input), tick(&mut b, &input));
                }
            }
        }

        #[test]
        fn prop_score_matches_deltas(seed in any::<u32>()) {
            let mut state = GameState::with_options(seed, 3, SimOptions::HEADLESS);
            let mut total = 0;
            for f in 0..1500u32 {
                for e in tick(&mut state, &TickInput::aim(f64::from(f) * 0.01)) {
                    if let EventPayload::ScoreChange { score, delta } = e.payload {
                        prop_assert!(delta > 0);
                        total += delta;
                        prop_assert_eq!(score, total);
                    }
                }
            }
            prop_assert_eq!(state.score, total);
        }
    }
}
