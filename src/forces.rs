//! Gravity pass.
//!
//! Near bodies (the neighbour block around a body's cell) attract pairwise;
//! every other populated cell attracts as a single point at its centroid,
//! weighted by its member count. All deltas are computed from one snapshot of
//! positions into a per-body buffer and only then added to velocities, so no
//! body sees another body's update from the same step.

use bevy::math::Vec2;
use rayon::prelude::*;

use crate::body::Body;
use crate::config::SimConfig;
use crate::geometry::DEGENERATE_EPSILON;
use crate::spatial::SpatialIndex;

/// `G · d / |d|²` pulling `from` towards `to`, or `None` when the points
/// coincide.
pub fn attraction(gravity: f32, from: Vec2, to: Vec2) -> Option<Vec2> {
    let d = to - from;
    let dist2 = d.length_squared();
    if dist2 <= DEGENERATE_EPSILON || !dist2.is_finite() {
        return None;
    }
    Some(gravity * d / dist2)
}

/// Share of a pair force felt by a body of `radius` against a partner of
/// `other_radius`; visually small bodies respond more.
fn size_weight(radius: f32, other_radius: f32) -> f32 {
    radius / (radius + other_radius)
}

#[derive(Clone, Debug)]
pub struct ForceField {
    pub gravity: f32,
    pub neighbor_radius: u32,
    pub far_field: bool,
    pub far_field_strength: f32,
    pub parallel: bool,
}

impl ForceField {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            gravity: config.gravity,
            neighbor_radius: config.neighbor_radius,
            far_field: config.far_field,
            far_field_strength: config.far_field_strength,
            parallel: config.parallel,
        }
    }

    /// Force on body `i`, before scaling by `dt`.
    pub fn force_on(
        &self,
        i: usize,
        bodies: &[Body],
        index: &SpatialIndex,
        scratch: &mut Vec<usize>,
    ) -> Vec2 {
        let body = &bodies[i];
        if !body.is_live() {
            return Vec2::ZERO;
        }
        let home = index.cell_of(body.position);
        let mut force = Vec2::ZERO;

        index.neighbors_into(home, self.neighbor_radius, scratch);
        for &j in scratch.iter() {
            let other = &bodies[j];
            if j == i || other.id == body.id || !other.is_live() {
                continue;
            }
            if let Some(f) = attraction(self.gravity, body.position, other.position) {
                force += f * size_weight(body.radius, other.radius);
            }
        }

        if self.far_field && self.far_field_strength > 0.0 {
            for cell in index.cells() {
                if SpatialIndex::within(home, cell.coord, self.neighbor_radius) {
                    continue;
                }
                if let Some(f) = attraction(self.gravity, body.position, cell.centroid()) {
                    force += f
                        * cell.len() as f32
                        * self.far_field_strength
                        * size_weight(body.radius, cell.mean_radius());
                }
            }
        }

        force
    }

    /// Velocity change for every body, indexed like `bodies`. Each slot is
    /// produced by exactly one task.
    pub fn velocity_deltas(&self, bodies: &[Body], index: &SpatialIndex, dt: f32) -> Vec<Vec2> {
        if self.parallel {
            (0..bodies.len())
                .into_par_iter()
                .map_init(Vec::new, |scratch, i| {
                    self.force_on(i, bodies, index, scratch) * dt
                })
                .collect()
        } else {
            let mut scratch = Vec::new();
            (0..bodies.len())
                .map(|i| self.force_on(i, bodies, index, &mut scratch) * dt)
                .collect()
        }
    }

    pub fn apply(&self, bodies: &mut [Body], index: &SpatialIndex, dt: f32) {
        if dt <= 0.0 || self.gravity == 0.0 {
            return;
        }
        let deltas = self.velocity_deltas(bodies, index, dt);
        for (body, dv) in bodies.iter_mut().zip(deltas) {
            if body.is_live() {
                body.velocity += dv;
            }
        }
    }
}
