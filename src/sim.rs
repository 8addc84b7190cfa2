use std::collections::{HashMap, HashSet};

use bevy::prelude::*;
use bevy::render::render_asset::RenderAssetUsages;
use bevy::render::render_resource::PrimitiveTopology;
use bevy::sprite::{MaterialMesh2dBundle, Mesh2dHandle};
use graveyard_rs::{geometry, BodyId, Scenario, SimConfig, StepStats, World};

/// Screen pixels per world unit.
pub const WORLD_SCALE: f32 = 800.0;
/// Bodies are never drawn smaller than this many pixels across.
const MIN_DRAW_RADIUS: f32 = 1.5;
const BODY_SEGMENTS: usize = 16;

#[derive(Resource)]
pub struct SimWorld(pub World);

#[derive(Resource, Clone)]
pub struct SimSettings {
    pub running: bool,
    pub time_scale: f32,
    pub scenario: Scenario,
    pub body_count: usize,
    pub seed: Option<u64>,
    pub show_help: bool,
    /// Edited by the UI, pushed into the world by `apply_config`.
    pub config: SimConfig,
    pub config_error: Option<String>,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            running: true,
            time_scale: 1.0,
            scenario: Scenario::Dust,
            body_count: 1000,
            seed: None,
            show_help: true,
            config: SimConfig::default(),
            config_error: None,
        }
    }
}

#[derive(Resource, Default)]
pub struct SimStats {
    pub last: StepStats,
}

/// User-triggered body creation, in world units.
#[derive(Event)]
pub struct SpawnRequest {
    pub position: Vec2,
    pub velocity: Vec2,
}

#[derive(Event, Default)]
pub struct ResetEvent;

#[derive(Component)]
pub struct BodyMarker(pub BodyId);

#[derive(Resource)]
struct BodyMesh(Mesh2dHandle);

#[derive(Resource, Default)]
struct RenderedBodies(HashMap<BodyId, (Entity, Handle<ColorMaterial>)>);

pub struct SimPlugin;
impl Plugin for SimPlugin {
    fn build(&self, app: &mut App) {
        let settings = SimSettings::default();
        let world = World::new(settings.body_count, settings.seed);
        app.insert_resource(SimWorld(world))
            .insert_resource(settings)
            .init_resource::<SimStats>()
            .init_resource::<RenderedBodies>()
            .add_event::<SpawnRequest>()
            .add_event::<ResetEvent>()
            .add_systems(Startup, setup_body_mesh)
            .add_systems(
                Update,
                (
                    apply_config,
                    handle_reset,
                    spawn_requested,
                    step_world,
                    sync_bodies,
                )
                    .chain(),
            );
    }
}

fn setup_body_mesh(mut commands: Commands, mut meshes: ResMut<Assets<Mesh>>) {
    let mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, geometry::circle_fan(BODY_SEGMENTS));
    commands.insert_resource(BodyMesh(Mesh2dHandle(meshes.add(mesh))));
}

fn apply_config(mut settings: ResMut<SimSettings>, mut world: ResMut<SimWorld>) {
    if settings.config == *world.0.config() {
        return;
    }
    match world.0.set_config(settings.config.clone()) {
        Ok(()) => settings.config_error = None,
        Err(err) => {
            warn!("rejected config: {err}");
            settings.config_error = Some(err.to_string());
            settings.config = world.0.config().clone();
        }
    }
}

fn handle_reset(
    mut commands: Commands,
    mut ev_reset: EventReader<ResetEvent>,
    mut settings: ResMut<SimSettings>,
    mut world: ResMut<SimWorld>,
    mut rendered: ResMut<RenderedBodies>,
) {
    if ev_reset.is_empty() {
        return;
    }
    ev_reset.clear();

    for (_, (entity, _)) in rendered.0.drain() {
        commands.entity(entity).despawn();
    }

    settings.config = SimConfig::preset(settings.scenario);
    settings.config_error = None;
    if let Err(err) = world.0.set_config(settings.config.clone()) {
        warn!("preset for {:?} rejected: {err}", settings.scenario);
    }
    world
        .0
        .reset(settings.scenario, settings.body_count, settings.seed);
}

fn spawn_requested(mut ev: EventReader<SpawnRequest>, mut world: ResMut<SimWorld>) {
    for req in ev.read() {
        if let Err(err) = world.0.spawn_default(req.position, req.velocity) {
            warn!("spawn at {:?} rejected: {err}", req.position);
        }
    }
}

fn step_world(
    settings: Res<SimSettings>,
    time: Res<Time>,
    mut world: ResMut<SimWorld>,
    mut stats: ResMut<SimStats>,
) {
    if !settings.running {
        return;
    }
    let dt = time.delta_seconds() * settings.time_scale;
    stats.last = world.0.step(dt);
}

fn sync_bodies(
    mut commands: Commands,
    world: Res<SimWorld>,
    mesh: Res<BodyMesh>,
    mut rendered: ResMut<RenderedBodies>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    mut transforms: Query<&mut Transform, With<BodyMarker>>,
) {
    let mut live = HashSet::with_capacity(world.0.len());

    for view in world.0.views() {
        live.insert(view.id);
        let [r, g, b, a] = view.colour_rgba();
        let colour = Color::srgba(r, g, b, a);
        let transform = Transform {
            translation: (view.position * WORLD_SCALE).extend(0.0),
            rotation: Quat::from_rotation_z(view.rotation),
            scale: Vec3::splat((view.radius * WORLD_SCALE).max(MIN_DRAW_RADIUS)),
        };

        match rendered.0.get(&view.id) {
            Some((entity, material)) => {
                if let Ok(mut t) = transforms.get_mut(*entity) {
                    *t = transform;
                }
                let stale = materials.get(material).is_some_and(|m| m.color != colour);
                if stale {
                    if let Some(m) = materials.get_mut(material) {
                        m.color = colour;
                    }
                }
            }
            None => {
                let material = materials.add(ColorMaterial::from(colour));
                let entity = commands
                    .spawn((
                        MaterialMesh2dBundle {
                            mesh: mesh.0.clone(),
                            material: material.clone(),
                            transform,
                            ..default()
                        },
                        BodyMarker(view.id),
                    ))
                    .id();
                rendered.0.insert(view.id, (entity, material));
            }
        }
    }

    rendered.0.retain(|id, (entity, _)| {
        if live.contains(id) {
            true
        } else {
            commands.entity(*entity).despawn();
            false
        }
    });
}
