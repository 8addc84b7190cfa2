use bevy::log::{debug, info, warn};
use bevy::math::{Vec2, Vec4};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::body::{Body, BodyId, BodyView};
use crate::collision::{CollisionResolver, CollisionStats};
use crate::config::{Scenario, SimConfig};
use crate::error::SimError;
use crate::forces::ForceField;
use crate::spatial::SpatialIndex;

/// What happened during one [`World::step`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StepStats {
    /// Time delta after clamping.
    pub dt: f32,
    /// Bodies alive after compaction.
    pub live: usize,
    pub candidates: usize,
    pub bounces: usize,
    pub merges: usize,
    pub suppressed: usize,
    pub separating: usize,
    pub removed: usize,
}

impl StepStats {
    fn from_collisions(dt: f32, collisions: CollisionStats) -> Self {
        Self {
            dt,
            candidates: collisions.candidates,
            bounces: collisions.bounces,
            merges: collisions.merges,
            suppressed: collisions.suppressed,
            separating: collisions.separating,
            ..Self::default()
        }
    }
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Owns the live bodies and advances them one frame at a time.
///
/// Outside of `step` the body list is only handed out behind shared
/// references, so a renderer can never watch a step half-way through.
pub struct World {
    config: SimConfig,
    bodies: Vec<Body>,
    index: SpatialIndex,
    rng: StdRng,
    next_id: u64,
    frame: u64,
}

impl World {
    /// Default config, dust field of `initial_body_count` bodies.
    pub fn new(initial_body_count: usize, seed: Option<u64>) -> Self {
        let config = SimConfig::default();
        let mut world = Self::empty(config, seed);
        world.populate(Scenario::Dust, initial_body_count);
        info!(
            "world created: {} bodies, seed {:?}",
            world.bodies.len(),
            seed
        );
        world
    }

    pub fn with_config(
        config: SimConfig,
        scenario: Scenario,
        initial_body_count: usize,
        seed: Option<u64>,
    ) -> Result<Self, SimError> {
        config.validate()?;
        let mut world = Self::empty(config, seed);
        world.populate(scenario, initial_body_count);
        info!(
            "world created from {:?}: {} bodies, seed {:?}",
            scenario,
            world.bodies.len(),
            seed
        );
        Ok(world)
    }

    fn empty(config: SimConfig, seed: Option<u64>) -> Self {
        Self {
            index: SpatialIndex::with_valid_cell_size(config.cell_size),
            config,
            bodies: Vec::new(),
            rng: make_rng(seed),
            next_id: 0,
            frame: 0,
        }
    }

    /// Throw away every body and start a fresh run. Ids restart at zero.
    pub fn reset(&mut self, scenario: Scenario, initial_body_count: usize, seed: Option<u64>) {
        self.bodies.clear();
        self.index.clear();
        self.rng = make_rng(seed);
        self.next_id = 0;
        self.frame = 0;
        self.populate(scenario, initial_body_count);
        info!(
            "world reset to {:?}: {} bodies, seed {:?}",
            scenario,
            self.bodies.len(),
            seed
        );
    }

    fn next_id(&mut self) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;
        id
    }

    fn random_colour(&mut self) -> Vec4 {
        Vec4::new(
            self.rng.gen_range(0..255) as f32 / 255.0,
            self.rng.gen_range(0..255) as f32 / 255.0,
            self.rng.gen_range(0..255) as f32 / 255.0,
            1.0,
        )
    }

    fn push_generated(&mut self, position: Vec2, velocity: Vec2, colour: Vec4) {
        let id = self.next_id();
        let spin = self.rng.gen::<f32>() - 0.5;
        let body = Body::from_parts(
            id,
            position,
            self.config.spawn_radius,
            self.config.spawn_mass,
            velocity,
            colour,
        )
        .with_spin(spin);
        self.bodies.push(body);
    }

    fn populate(&mut self, scenario: Scenario, count: usize) {
        self.bodies.reserve(count);
        match scenario {
            Scenario::Dust => {
                for _ in 0..count {
                    let position = Vec2::new(
                        (self.rng.gen::<f32>() * 2.0 - 1.0) / 2.0,
                        (self.rng.gen::<f32>() * 2.0 - 1.0) / 2.0,
                    );
                    let mut velocity = Vec2::new(
                        self.rng.gen::<f32>() * 0.02 - 0.01,
                        self.rng.gen::<f32>() * 0.02 - 0.01,
                    );
                    // one in ten starts fast
                    if self.rng.gen_range(0..10) > 8 {
                        velocity *= 10.0;
                    }
                    let colour = self.random_colour();
                    self.push_generated(position, velocity, colour);
                }
            }
            Scenario::Clumps => {
                let clouds = [
                    (Vec2::new(-0.5, 0.05), Vec2::new(0.05, 0.0), Vec4::new(1.0, 0.45, 0.2, 1.0)),
                    (Vec2::new(0.5, -0.05), Vec2::new(-0.05, 0.0), Vec4::new(0.2, 0.55, 1.0, 1.0)),
                ];
                for i in 0..count {
                    let (centre, drift, tint) = clouds[i % 2];
                    let r = self.rng.gen::<f32>().sqrt() * 0.25;
                    let offset = Vec2::from_angle(self.rng.gen::<f32>() * std::f32::consts::TAU) * r;
                    let jitter = Vec2::new(
                        self.rng.gen_range(-0.005..0.005),
                        self.rng.gen_range(-0.005..0.005),
                    );
                    let shade = self.rng.gen_range(0.6..1.0);
                    let colour = Vec4::new(tint.x * shade, tint.y * shade, tint.z * shade, 1.0);
                    self.push_generated(centre + offset, drift + jitter, colour);
                }
            }
            Scenario::Empty => {}
        }
    }

    /// Insert a body with the next unused id.
    pub fn spawn(
        &mut self,
        position: Vec2,
        radius: f32,
        mass: f32,
        velocity: Vec2,
        colour: Vec4,
    ) -> Result<BodyId, SimError> {
        let body = Body::new(BodyId(self.next_id), position, radius, mass, velocity, colour)?;
        self.next_id += 1;
        debug!("spawned {} at {:?}", body.id, body.position);
        let id = body.id;
        self.bodies.push(body);
        Ok(id)
    }

    /// Spawn with the configured default radius and mass, in white.
    pub fn spawn_default(&mut self, position: Vec2, velocity: Vec2) -> Result<BodyId, SimError> {
        self.spawn(
            position,
            self.config.spawn_radius,
            self.config.spawn_mass,
            velocity,
            Vec4::ONE,
        )
    }

    fn clamp_dt(&self, dt: f32) -> f32 {
        if !dt.is_finite() {
            warn!("non-finite dt {dt}, stepping with 0");
            return 0.0;
        }
        dt.clamp(0.0, self.config.max_dt)
    }

    /// Advance one frame: index, gravity, contacts, integration, compaction.
    pub fn step(&mut self, dt: f32) -> StepStats {
        let dt = self.clamp_dt(dt);

        for body in &mut self.bodies {
            body.roll_contacts();
        }

        self.index.rebuild(&self.bodies);
        ForceField::from_config(&self.config).apply(&mut self.bodies, &self.index, dt);
        let collisions =
            CollisionResolver::from_config(&self.config).resolve(&mut self.bodies, &self.index);
        self.integrate(dt);
        let removed = self.compact();
        self.frame += 1;

        let stats = StepStats {
            live: self.bodies.len(),
            removed,
            ..StepStats::from_collisions(dt, collisions)
        };
        debug!("frame {}: {:?}", self.frame, stats);
        stats
    }

    fn integrate(&mut self, dt: f32) {
        let damping = self.config.damping;
        let max_speed = self.config.max_speed;
        let advance = |body: &mut Body| {
            if !body.is_live() {
                return;
            }
            body.position += body.velocity * dt;
            body.rotation += body.spin_speed * dt;
            body.velocity *= damping;
            if let Some(max_speed) = max_speed {
                body.velocity = body.velocity.clamp_length_max(max_speed);
            }
        };
        if self.config.parallel {
            self.bodies.par_iter_mut().for_each(advance);
        } else {
            self.bodies.iter_mut().for_each(advance);
        }
    }

    /// Drop every body absorbed during this step.
    fn compact(&mut self) -> usize {
        let before = self.bodies.len();
        self.bodies.retain(Body::is_live);
        before - self.bodies.len()
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Swap in new tunables. Rejected configs leave the current one active.
    pub fn set_config(&mut self, config: SimConfig) -> Result<(), SimError> {
        config.validate()?;
        if config.cell_size != self.config.cell_size {
            self.index = SpatialIndex::new(config.cell_size)?;
        }
        self.config = config;
        Ok(())
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.iter().find(|b| b.id == id)
    }

    pub fn views(&self) -> impl ExactSizeIterator<Item = BodyView> + '_ {
        self.bodies.iter().map(Body::view)
    }

    pub fn snapshot(&self) -> Vec<BodyView> {
        self.views().collect()
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Steps completed since creation or the last reset.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn total_mass(&self) -> f32 {
        self.bodies.iter().map(|b| b.mass).sum()
    }

    pub fn total_momentum(&self) -> Vec2 {
        self.bodies.iter().map(Body::momentum).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Cells wide enough for the unit-scale bodies used below.
    fn quiet_config() -> SimConfig {
        SimConfig {
            gravity: 0.0,
            cell_size: 2.0,
            damping: 1.0,
            max_dt: 1.0,
            parallel: false,
            ..SimConfig::default()
        }
    }

    #[test]
    fn seeded_worlds_are_reproducible() {
        let a = World::new(200, Some(7));
        let b = World::new(200, Some(7));
        assert_eq!(a.len(), 200);
        assert_eq!(a.snapshot(), b.snapshot());
        assert!(a
            .bodies()
            .iter()
            .all(|body| body.position.abs().max_element() <= 0.5));
    }

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let mut world =
            World::with_config(quiet_config(), Scenario::Empty, 0, Some(1)).unwrap();
        let a = world
            .spawn(Vec2::ZERO, 1.0, 1.0, Vec2::ZERO, Vec4::ONE)
            .unwrap();
        let b = world
            .spawn(Vec2::new(1.0, 0.0), 1.0, 1.0, Vec2::ZERO, Vec4::ONE)
            .unwrap();
        assert!(b > a);

        // resting overlap merges and removes b
        world.step(0.1);
        assert_eq!(world.len(), 1);

        let c = world.spawn_default(Vec2::new(5.0, 5.0), Vec2::ZERO).unwrap();
        assert!(c > b);
    }

    #[test]
    fn spawn_rejects_invalid_bodies() {
        let mut world = World::new(0, Some(1));
        assert!(world
            .spawn(Vec2::ZERO, -1.0, 1.0, Vec2::ZERO, Vec4::ONE)
            .is_err());
        assert!(world
            .spawn(Vec2::ZERO, 1.0, 0.0, Vec2::ZERO, Vec4::ONE)
            .is_err());
        assert!(world.is_empty());
        // the rejected attempts did not burn ids
        assert_eq!(
            world
                .spawn(Vec2::ZERO, 1.0, 1.0, Vec2::ZERO, Vec4::ONE)
                .unwrap(),
            BodyId(0)
        );
    }

    #[test]
    fn dt_is_clamped() {
        let mut world =
            World::with_config(SimConfig::default(), Scenario::Empty, 0, Some(1)).unwrap();
        assert_eq!(world.step(5.0).dt, 0.1);
        assert_eq!(world.step(-1.0).dt, 0.0);
        assert_eq!(world.step(f32::NAN).dt, 0.0);
        assert_eq!(world.frame(), 3);
    }

    #[test]
    fn set_config_keeps_old_config_on_error() {
        let mut world = World::new(10, Some(3));
        let bad = SimConfig {
            cell_size: -1.0,
            ..SimConfig::default()
        };
        assert!(world.set_config(bad).is_err());
        assert_eq!(world.config(), &SimConfig::default());

        let good = SimConfig {
            cell_size: 0.2,
            ..SimConfig::default()
        };
        world.set_config(good.clone()).unwrap();
        assert_eq!(world.config(), &good);
    }

    #[test]
    fn reset_restarts_ids_and_frames() {
        let mut world = World::new(20, Some(9));
        world.step(0.016);
        world.reset(Scenario::Clumps, 30, Some(9));
        assert_eq!(world.len(), 30);
        assert_eq!(world.frame(), 0);
        assert_eq!(world.bodies()[0].id, BodyId(0));
    }

    fn press_together(world: &mut World) {
        world.bodies[0].position = Vec2::ZERO;
        world.bodies[1].position = Vec2::new(1.0, 0.0);
        world.bodies[0].velocity = Vec2::new(1.0, 0.0);
        world.bodies[1].velocity = Vec2::new(-1.0, 0.0);
    }

    #[test]
    fn overlapping_pair_waits_for_separation() {
        let config = SimConfig {
            restitution: 1.0,
            ..quiet_config()
        };
        let mut world = World::with_config(config, Scenario::Empty, 0, None).unwrap();
        world
            .spawn(Vec2::ZERO, 0.6, 1.0, Vec2::ZERO, Vec4::ONE)
            .unwrap();
        world
            .spawn(Vec2::new(1.0, 0.0), 0.6, 1.0, Vec2::ZERO, Vec4::ONE)
            .unwrap();

        press_together(&mut world);
        assert_eq!(world.step(0.0).bounces, 1);

        // still touching on the next two frames
        for _ in 0..2 {
            press_together(&mut world);
            let stats = world.step(0.0);
            assert_eq!(stats.suppressed, 1);
            assert_eq!(stats.bounces, 0);
            assert_eq!(world.bodies[0].velocity, Vec2::new(1.0, 0.0));
        }

        // apart for one frame clears the contact
        world.bodies[1].position = Vec2::new(5.0, 0.0);
        assert_eq!(world.step(0.0).candidates, 0);

        press_together(&mut world);
        assert_eq!(world.step(0.0).bounces, 1);
    }

    #[test]
    fn max_speed_caps_velocity() {
        let config = SimConfig {
            max_speed: Some(0.5),
            ..quiet_config()
        };
        let mut world = World::with_config(config, Scenario::Empty, 0, None).unwrap();
        world
            .spawn(Vec2::ZERO, 0.1, 1.0, Vec2::new(3.0, 4.0), Vec4::ONE)
            .unwrap();
        world.step(0.1);
        assert!((world.bodies()[0].velocity.length() - 0.5).abs() < 1e-5);
    }
}
