use crate::sim::{ResetEvent, SimSettings, SpawnRequest, WORLD_SCALE};
use crate::MainCamera;
use bevy::input::mouse::{MouseButtonInput, MouseWheel};
use bevy::input::ButtonState; // needed in Bevy 0.14
use bevy::prelude::*;

/// World units per second of launch velocity per world unit dragged.
const LAUNCH_FACTOR: f32 = 0.5;

pub struct InputPlugin;
impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(DragState::default()).add_systems(
            Update,
            (
                camera_controls,
                drag_spawn,
                pause_toggle,
                time_scale_toggle,
                reset_trigger,
                help_toggle,
            ),
        );
    }
}

#[derive(Resource, Default)]
struct DragState {
    start: Option<Vec2>,
}

fn cursor_world(windows: &Query<&Window>, cam: (&Camera, &GlobalTransform)) -> Option<Vec2> {
    let cursor = windows.get_single().ok()?.cursor_position()?;
    cam.0.viewport_to_world_2d(cam.1, cursor)
}

fn camera_controls(
    mut scroll_evr: EventReader<MouseWheel>,
    mut q_cam: Query<(&mut Transform, &Camera, &GlobalTransform), With<MainCamera>>,
    windows: Query<&Window>,
    buttons: Res<ButtonInput<MouseButton>>,
    mut motion: EventReader<bevy::input::mouse::MouseMotion>,
) {
    let Ok((mut t, cam, g_transform)) = q_cam.get_single_mut() else {
        return;
    };

    // Zoom to cursor
    if let Some(cursor_world_pos) = cursor_world(&windows, (cam, g_transform)) {
        for ev in scroll_evr.read() {
            let zoom = 1.0 - ev.y * 0.05;
            let new_scale = (t.scale * zoom).clamp(Vec3::splat(0.02), Vec3::splat(10.0));
            let actual_zoom = new_scale.x / t.scale.x;

            if (actual_zoom - 1.0).abs() > 1e-4 {
                t.translation.x =
                    cursor_world_pos.x + (t.translation.x - cursor_world_pos.x) * actual_zoom;
                t.translation.y =
                    cursor_world_pos.y + (t.translation.y - cursor_world_pos.y) * actual_zoom;
                t.scale = new_scale;
            }
        }
    }

    // Panning
    if buttons.pressed(MouseButton::Right) {
        for m in motion.read() {
            t.translation.x -= m.delta.x * t.scale.x;
            t.translation.y += m.delta.y * t.scale.y;
        }
    }

    t.translation.z = 999.0;
}

/// Press to place, release to launch along the drag.
fn drag_spawn(
    windows: Query<&Window>,
    q_cam: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    mut drag: ResMut<DragState>,
    mut mousebtn_evr: EventReader<MouseButtonInput>,
    mut ev_spawn: EventWriter<SpawnRequest>,
) {
    let Ok(cam) = q_cam.get_single() else {
        return;
    };
    let Some(cursor) = cursor_world(&windows, cam) else {
        return;
    };
    let world = cursor / WORLD_SCALE;

    for ev in mousebtn_evr.read() {
        if ev.button != MouseButton::Left {
            continue;
        }
        match ev.state {
            ButtonState::Pressed => drag.start = Some(world),
            ButtonState::Released => {
                if let Some(start) = drag.start.take() {
                    ev_spawn.send(SpawnRequest {
                        position: start,
                        velocity: (world - start) * LAUNCH_FACTOR,
                    });
                }
            }
        }
    }
}

fn pause_toggle(mut settings: ResMut<SimSettings>, keys: Res<ButtonInput<KeyCode>>) {
    if keys.just_pressed(KeyCode::Space) {
        settings.running = !settings.running;
    }
}

fn time_scale_toggle(mut settings: ResMut<SimSettings>, keys: Res<ButtonInput<KeyCode>>) {
    if keys.just_pressed(KeyCode::BracketRight) {
        settings.time_scale *= 2.0;
    }
    if keys.just_pressed(KeyCode::BracketLeft) {
        settings.time_scale /= 2.0;
    }
    settings.time_scale = settings.time_scale.clamp(0.25, 4.0);
}

fn reset_trigger(mut ev_reset: EventWriter<ResetEvent>, keys: Res<ButtonInput<KeyCode>>) {
    if keys.just_pressed(KeyCode::KeyR) {
        ev_reset.send(ResetEvent);
    }
}

fn help_toggle(mut settings: ResMut<SimSettings>, keys: Res<ButtonInput<KeyCode>>) {
    if keys.just_pressed(KeyCode::KeyH) {
        settings.show_help = !settings.show_help;
    }
}
