use std::collections::HashSet;
use std::fmt;

use bevy::math::{Vec2, Vec4};

use crate::error::SimError;

/// Stable body identity. Assigned in increasing order by the owning
/// [`World`](crate::World) and never handed out twice within a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub u64);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug)]
pub struct Body {
    pub id: BodyId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
    pub mass: f32,
    /// RGBA, left unclamped after merges.
    pub colour: Vec4,
    pub spin_speed: f32,
    pub rotation: f32,
    /// Partners resolved against during the previous step.
    pub collided_with_last_frame: HashSet<BodyId>,
    /// Partners resolved (or still in suppressed contact) during this step.
    pub collided_with_this_frame: HashSet<BodyId>,
    pub marked_for_deletion: bool,
}

fn check_positive(field: &'static str, value: f32) -> Result<(), SimError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidBody { field, value })
    }
}

fn check_finite(field: &'static str, v: Vec2) -> Result<(), SimError> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(SimError::NonFiniteVector {
            field,
            x: v.x,
            y: v.y,
        })
    }
}

impl Body {
    /// Validated constructor. Radius and mass must be finite and positive,
    /// position and velocity finite.
    pub fn new(
        id: BodyId,
        position: Vec2,
        radius: f32,
        mass: f32,
        velocity: Vec2,
        colour: Vec4,
    ) -> Result<Self, SimError> {
        check_positive("radius", radius)?;
        check_positive("mass", mass)?;
        check_finite("position", position)?;
        check_finite("velocity", velocity)?;

        Ok(Self::from_parts(id, position, radius, mass, velocity, colour))
    }

    /// Skips validation; callers generate values from a validated config.
    pub(crate) fn from_parts(
        id: BodyId,
        position: Vec2,
        radius: f32,
        mass: f32,
        velocity: Vec2,
        colour: Vec4,
    ) -> Self {
        Self {
            id,
            position,
            velocity,
            radius,
            mass,
            colour,
            spin_speed: 0.0,
            rotation: 0.0,
            collided_with_last_frame: HashSet::new(),
            collided_with_this_frame: HashSet::new(),
            marked_for_deletion: false,
        }
    }

    pub fn with_spin(mut self, spin_speed: f32) -> Self {
        self.spin_speed = spin_speed;
        self
    }

    pub fn momentum(&self) -> Vec2 {
        self.velocity * self.mass
    }

    pub fn area(&self) -> f32 {
        std::f32::consts::PI * self.radius * self.radius
    }

    pub fn is_live(&self) -> bool {
        !self.marked_for_deletion
    }

    pub fn overlaps(&self, other: &Body) -> bool {
        let rsum = self.radius + other.radius;
        self.position.distance_squared(other.position) < rsum * rsum
    }

    /// Start a new step: this step's contacts become last step's.
    pub(crate) fn roll_contacts(&mut self) {
        std::mem::swap(
            &mut self.collided_with_last_frame,
            &mut self.collided_with_this_frame,
        );
        self.collided_with_this_frame.clear();
    }

    pub fn view(&self) -> BodyView {
        BodyView {
            id: self.id,
            position: self.position,
            radius: self.radius,
            rotation: self.rotation,
            colour: self.colour,
        }
    }
}

/// What a renderer needs to draw a body, copied out of the world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyView {
    pub id: BodyId,
    pub position: Vec2,
    pub radius: f32,
    pub rotation: f32,
    pub colour: Vec4,
}

impl BodyView {
    pub fn colour_rgba(&self) -> [f32; 4] {
        self.colour.to_array()
    }
}
