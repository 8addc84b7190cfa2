use crate::error::SimError;

/// Initial layouts a [`World`](crate::World) can be populated with.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Scenario {
    /// Uniform dust field in the unit square around the origin.
    #[default]
    Dust,
    /// Two dust clouds on a collision course.
    Clumps,
    /// Nothing; bodies only arrive through spawning.
    Empty,
}

/// Widest neighbourhood, in cells either side, a config may ask for.
pub const MAX_NEIGHBOR_RADIUS: u32 = 8;

/// Tunables for a simulation run.
#[derive(Clone, Debug, PartialEq)]
pub struct SimConfig {
    pub gravity: f32,
    pub restitution: f32,
    pub damping: f32,
    pub merge_speed_threshold: f32,
    pub spin_transfer: f32,
    pub cell_size: f32,
    pub neighbor_radius: u32,
    pub far_field: bool,
    pub far_field_strength: f32,
    pub max_dt: f32,
    pub max_speed: Option<f32>,
    pub parallel: bool,
    pub spawn_radius: f32,
    pub spawn_mass: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            gravity: 0.0001,
            restitution: 0.1,
            damping: 0.9999,
            merge_speed_threshold: 0.001,
            spin_transfer: 0.1,
            cell_size: 0.05,
            neighbor_radius: 1,
            far_field: true,
            far_field_strength: 0.5,
            max_dt: 0.1,
            max_speed: None,
            parallel: true,
            spawn_radius: 0.001,
            spawn_mass: 1.0,
        }
    }
}

impl SimConfig {
    pub fn preset(scenario: Scenario) -> Self {
        let mut config = SimConfig::default();
        match scenario {
            Scenario::Dust => {}
            Scenario::Clumps => {
                config.gravity = 0.0002;
                config.restitution = 0.5;
                config.damping = 0.99995;
                config.max_speed = Some(2.0);
            }
            Scenario::Empty => {
                config.far_field = false;
                config.spawn_radius = 0.01;
            }
        }
        config
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if !self.gravity.is_finite() || self.gravity < 0.0 {
            return Err(SimError::config(
                "gravity",
                format!("{} must be finite and non-negative", self.gravity),
            ));
        }
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(SimError::config(
                "restitution",
                format!("{} is outside [0, 1]", self.restitution),
            ));
        }
        if !(self.damping > 0.0 && self.damping <= 1.0) {
            return Err(SimError::config(
                "damping",
                format!("{} is outside (0, 1]", self.damping),
            ));
        }
        if !self.merge_speed_threshold.is_finite() || self.merge_speed_threshold <= 0.0 {
            return Err(SimError::config(
                "merge_speed_threshold",
                format!("{} must be positive", self.merge_speed_threshold),
            ));
        }
        if !self.spin_transfer.is_finite() {
            return Err(SimError::config("spin_transfer", "must be finite"));
        }
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(SimError::config(
                "cell_size",
                format!("{} must be positive", self.cell_size),
            ));
        }
        if !(1..=MAX_NEIGHBOR_RADIUS).contains(&self.neighbor_radius) {
            return Err(SimError::config(
                "neighbor_radius",
                format!(
                    "{} is outside [1, {MAX_NEIGHBOR_RADIUS}]",
                    self.neighbor_radius
                ),
            ));
        }
        if !self.far_field_strength.is_finite() || self.far_field_strength < 0.0 {
            return Err(SimError::config(
                "far_field_strength",
                format!("{} must be non-negative", self.far_field_strength),
            ));
        }
        if !self.max_dt.is_finite() || self.max_dt <= 0.0 {
            return Err(SimError::config(
                "max_dt",
                format!("{} must be positive", self.max_dt),
            ));
        }
        if let Some(max_speed) = self.max_speed {
            if !max_speed.is_finite() || max_speed <= 0.0 {
                return Err(SimError::config(
                    "max_speed",
                    format!("{max_speed} must be positive"),
                ));
            }
        }
        if !self.spawn_radius.is_finite() || self.spawn_radius <= 0.0 {
            return Err(SimError::config(
                "spawn_radius",
                format!("{} must be positive", self.spawn_radius),
            ));
        }
        if !self.spawn_mass.is_finite() || self.spawn_mass <= 0.0 {
            return Err(SimError::config(
                "spawn_mass",
                format!("{} must be positive", self.spawn_mass),
            ));
        }
        Ok(())
    }
}
