use bevy::math::{Vec2, Vec4};
use graveyard_rs::{
    Body, BodyId, CollisionResolver, Scenario, SimConfig, SpatialIndex, World,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-5
}

fn approx_vec(a: Vec2, b: Vec2) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y)
}

/// No gravity, no damping, generous dt clamp, single-threaded. Cells are at
/// least twice the largest radius used here.
fn bare_config() -> SimConfig {
    SimConfig {
        gravity: 0.0,
        cell_size: 2.0,
        damping: 1.0,
        max_dt: 1.0,
        parallel: false,
        ..SimConfig::default()
    }
}

fn empty_world(config: SimConfig) -> World {
    World::with_config(config, Scenario::Empty, 0, Some(42)).unwrap()
}

// ==================================================================================
// Scenarios
// ==================================================================================

#[test]
fn elastic_head_on_swap() {
    let mut world = empty_world(SimConfig {
        restitution: 1.0,
        ..bare_config()
    });
    let a = world
        .spawn(Vec2::ZERO, 0.6, 1.0, Vec2::new(1.0, 0.0), Vec4::ONE)
        .unwrap();
    let b = world
        .spawn(Vec2::new(1.0, 0.0), 0.6, 1.0, Vec2::new(-1.0, 0.0), Vec4::ONE)
        .unwrap();

    let stats = world.step(0.0);
    assert_eq!(stats.bounces, 1);
    assert_eq!(stats.merges, 0);
    assert!(approx_vec(world.body(a).unwrap().velocity, Vec2::new(-1.0, 0.0)));
    assert!(approx_vec(world.body(b).unwrap().velocity, Vec2::new(1.0, 0.0)));
}

#[test]
fn resting_equal_bodies_merge() {
    let mut world = empty_world(SimConfig {
        cell_size: 2.0,
        ..SimConfig::default()
    });
    let a = world
        .spawn(Vec2::ZERO, 1.0, 1.0, Vec2::ZERO, Vec4::ONE)
        .unwrap();
    let b = world
        .spawn(Vec2::new(1.0, 0.0), 1.0, 1.0, Vec2::ZERO, Vec4::ONE)
        .unwrap();

    let stats = world.step(0.016);
    assert_eq!(stats.merges, 1);
    assert_eq!(stats.removed, 1);
    assert_eq!(world.len(), 1);

    let merged = world.body(a).unwrap();
    assert!(approx_eq(merged.mass, 2.0));
    assert!(approx_eq(merged.radius, 2f32.sqrt()));
    assert!(world.body(b).is_none());
}

#[test]
fn lone_body_integrates() {
    let mut world = empty_world(bare_config());
    let id = world
        .spawn(Vec2::ZERO, 0.01, 1.0, Vec2::new(1.0, 0.0), Vec4::ONE)
        .unwrap();
    world.step(0.5);
    assert!(approx_vec(world.body(id).unwrap().position, Vec2::new(0.5, 0.0)));
}

#[test]
fn rotation_follows_spin_and_damping_slows() {
    let config = SimConfig {
        damping: 0.5,
        ..bare_config()
    };
    let mut world = World::with_config(config, Scenario::Dust, 1, Some(5)).unwrap();
    let before = world.bodies()[0].clone();
    world.step(0.25);
    let after = &world.bodies()[0];
    assert!(approx_eq(after.rotation, before.spin_speed * 0.25));
    assert!(approx_vec(after.velocity, before.velocity * 0.5));
}

// ==================================================================================
// Properties
// ==================================================================================

#[test]
fn merges_conserve_mass_over_a_run() {
    let mut world = World::with_config(
        SimConfig::preset(Scenario::Clumps),
        Scenario::Clumps,
        400,
        Some(11),
    )
    .unwrap();
    let mass = world.total_mass();
    let mut merges = 0;
    for _ in 0..120 {
        merges += world.step(1.0 / 60.0).merges;
    }
    assert_eq!(world.len() + merges, 400);
    assert!((world.total_mass() - mass).abs() < 1e-2);
}

#[test]
fn long_runs_stay_finite() {
    let mut world = World::new(500, Some(3));
    for _ in 0..200 {
        world.step(1.0 / 60.0);
    }
    for body in world.bodies() {
        assert!(body.position.is_finite(), "{} drifted to NaN", body.id);
        assert!(body.velocity.is_finite());
        assert!(body.radius > 0.0 && body.mass > 0.0);
    }
}

#[test]
fn parallel_and_sequential_runs_agree() {
    let run = |parallel: bool| {
        let config = SimConfig {
            parallel,
            ..SimConfig::default()
        };
        let mut world = World::with_config(config, Scenario::Dust, 300, Some(21)).unwrap();
        for _ in 0..30 {
            world.step(1.0 / 60.0);
        }
        world.snapshot()
    };
    assert_eq!(run(true), run(false));
}

#[test]
fn broad_phase_matches_brute_force_when_cells_are_large_enough() {
    let mut rng = StdRng::seed_from_u64(99);
    let max_radius = 0.03;
    let bodies: Vec<Body> = (0..400)
        .map(|i| {
            Body::new(
                BodyId(i),
                Vec2::new(rng.gen_range(-0.5..0.5), rng.gen_range(-0.5..0.5)),
                rng.gen_range(0.001..max_radius),
                1.0,
                Vec2::ZERO,
                Vec4::ONE,
            )
            .unwrap()
        })
        .collect();

    let mut index = SpatialIndex::new(2.0 * max_radius).unwrap();
    index.rebuild(&bodies);
    let resolver = CollisionResolver::from_config(&SimConfig::default());
    let mut found: Vec<(usize, usize)> = resolver
        .broad_phase(&bodies, &index)
        .into_iter()
        .map(|p| (p.a, p.b))
        .collect();
    found.sort_unstable();

    let mut expected = Vec::new();
    for i in 0..bodies.len() {
        for j in (i + 1)..bodies.len() {
            if bodies[i].overlaps(&bodies[j]) {
                expected.push((i, j));
            }
        }
    }
    assert!(!expected.is_empty());
    assert_eq!(found, expected);
}

#[test]
fn gravity_pulls_distant_clusters_together() {
    let config = SimConfig {
        gravity: 0.01,
        damping: 1.0,
        ..SimConfig::default()
    };
    let mut world = empty_world(config);
    let left = world
        .spawn(Vec2::new(-1.0, 0.0), 0.01, 1.0, Vec2::ZERO, Vec4::ONE)
        .unwrap();
    let right = world
        .spawn(Vec2::new(1.0, 0.0), 0.01, 1.0, Vec2::ZERO, Vec4::ONE)
        .unwrap();
    world.step(0.1);
    // far apart: only the cell-centroid term can act
    assert!(world.body(left).unwrap().velocity.x > 0.0);
    assert!(world.body(right).unwrap().velocity.x < 0.0);
}

#[test]
fn snapshots_expose_render_state() {
    let mut world = empty_world(bare_config());
    let colour = Vec4::new(0.1, 0.2, 0.3, 1.0);
    let id = world
        .spawn(Vec2::new(0.25, -0.25), 0.05, 2.0, Vec2::ZERO, colour)
        .unwrap();
    let views = world.snapshot();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].id, id);
    assert_eq!(views[0].position, Vec2::new(0.25, -0.25));
    assert_eq!(views[0].radius, 0.05);
    assert_eq!(views[0].colour_rgba(), [0.1, 0.2, 0.3, 1.0]);
}

#[test]
fn overlap_across_a_cell_border_is_resolved() {
    let mut world = empty_world(SimConfig {
        restitution: 1.0,
        ..bare_config()
    });
    // cells (0, 0) and (1, 0)
    world
        .spawn(Vec2::new(1.9, 0.0), 0.2, 1.0, Vec2::new(1.0, 0.0), Vec4::ONE)
        .unwrap();
    world
        .spawn(Vec2::new(2.1, 0.0), 0.2, 1.0, Vec2::new(-1.0, 0.0), Vec4::ONE)
        .unwrap();

    let stats = world.step(0.0);
    assert_eq!(stats.candidates, 1);
    assert_eq!(stats.bounces, 1);
}

#[test]
fn single_cell_neighbourhoods_are_rejected() {
    let config = SimConfig {
        neighbor_radius: 0,
        ..bare_config()
    };
    assert!(World::with_config(config.clone(), Scenario::Empty, 0, Some(1)).is_err());

    let mut world = empty_world(bare_config());
    assert!(world.set_config(config).is_err());
    assert_eq!(world.config().neighbor_radius, 1);
}
