use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPlugin};
use graveyard_rs::Scenario;

use crate::sim::{ResetEvent, SimSettings, SimStats, SimWorld};

pub struct UiPlugin;
impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(EguiPlugin)
            .add_systems(Update, ui_system);
    }
}

fn ui_system(
    mut contexts: EguiContexts,
    mut settings: ResMut<SimSettings>,
    stats: Res<SimStats>,
    world: Res<SimWorld>,
    diagnostics: Res<DiagnosticsStore>,
    mut ev_reset: EventWriter<ResetEvent>,
) {
    egui::Window::new("Settings").show(contexts.ctx_mut(), |ui| {
        ui.label(format!("Bodies: {}", world.0.len()));
        if let Some(fps) = diagnostics.get(&FrameTimeDiagnosticsPlugin::FPS) {
            if let Some(value) = fps.smoothed() {
                ui.label(format!("FPS: {:.1}", value));
            }
        }
        ui.label(format!("Frame: {}", world.0.frame()));
        ui.label(format!("Sim Rate: {:.2}x", settings.time_scale));
        let last = &stats.last;
        ui.label(format!(
            "Contacts: {}  Bounces: {}  Merges: {}  Suppressed: {}",
            last.candidates, last.bounces, last.merges, last.suppressed
        ));

        ui.separator();

        ui.checkbox(&mut settings.running, "Running");
        ui.add(egui::Slider::new(&mut settings.time_scale, 0.25..=4.0).text("Time scale"));

        ui.separator();

        let config = &mut settings.config;
        ui.add(
            egui::Slider::new(&mut config.gravity, 0.0..=0.01)
                .logarithmic(true)
                .text("Gravity (G)"),
        );
        ui.add(egui::Slider::new(&mut config.restitution, 0.0..=1.0).text("Restitution"));
        ui.add(egui::Slider::new(&mut config.damping, 0.99..=1.0).text("Damping"));
        ui.add(
            egui::Slider::new(&mut config.merge_speed_threshold, 0.0001..=0.05)
                .text("Merge threshold"),
        );
        ui.add(egui::Slider::new(&mut config.spin_transfer, 0.0..=1.0).text("Spin transfer"));
        ui.add(
            egui::Slider::new(&mut config.cell_size, 0.005..=0.5)
                .logarithmic(true)
                .text("Cell size"),
        );
        ui.checkbox(&mut config.far_field, "Far-field gravity");
        if config.far_field {
            ui.add(
                egui::Slider::new(&mut config.far_field_strength, 0.0..=4.0)
                    .text("Far-field strength"),
            );
        }
        ui.checkbox(&mut config.parallel, "Parallel");

        if let Some(err) = &settings.config_error {
            ui.colored_label(egui::Color32::LIGHT_RED, err.as_str());
        }

        ui.separator();

        egui::ComboBox::from_label("Scenario")
            .selected_text(format!("{:?}", settings.scenario))
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut settings.scenario, Scenario::Dust, "Dust");
                ui.selectable_value(&mut settings.scenario, Scenario::Clumps, "Clumps");
                ui.selectable_value(&mut settings.scenario, Scenario::Empty, "Empty");
            });
        ui.add(egui::Slider::new(&mut settings.body_count, 0..=5000).text("Bodies"));
        if ui.button("Reset").clicked() {
            ev_reset.send(ResetEvent);
        }
    });

    if settings.show_help {
        egui::Window::new("Help").show(contexts.ctx_mut(), |ui| {
            ui.label("Space: Pause Simulation");
            ui.label("[/]: Adjust Sim Speed");
            ui.label("R: Reset Simulation");
            ui.label("H: Toggle Help");
            ui.label("Left Mouse: Spawn Body (drag to launch)");
            ui.label("Right Mouse: Pan Camera (drag)");
            ui.label("Mouse Wheel: Zoom");
        });
    }
}
