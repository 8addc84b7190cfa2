//! Contact detection and response.
//!
//! Detect, then resolve: the broad phase only reads bodies and can fan out
//! across threads, producing an ordered list of overlapping pairs. The narrow
//! phase then walks that list on one thread, re-reading current state for
//! every pair because earlier pairs in the same step may already have moved,
//! merged or deleted one of the two bodies.

use bevy::log::debug;
use bevy::math::Vec2;
use rayon::prelude::*;

use crate::body::Body;
use crate::config::SimConfig;
use crate::geometry::{normalize_or_none, perpendicular};
use crate::spatial::SpatialIndex;

/// Two overlapping bodies, by slice index. `a` always holds the lower id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CandidatePair {
    pub a: usize,
    pub b: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PairOutcome {
    /// One side was already gone, or the pair stopped overlapping.
    Skipped,
    /// Resolved last step and still touching.
    Suppressed,
    /// Approaching too slowly to bounce; `absorbed` is marked for deletion.
    Merged { survivor: usize, absorbed: usize },
    /// Already moving apart along the normal.
    Separating,
    Bounced,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollisionStats {
    pub candidates: usize,
    pub bounces: usize,
    pub merges: usize,
    pub suppressed: usize,
    pub separating: usize,
}

#[derive(Clone, Debug)]
pub struct CollisionResolver {
    pub restitution: f32,
    pub merge_speed_threshold: f32,
    pub spin_transfer: f32,
    pub neighbor_radius: u32,
    pub parallel: bool,
}

/// Mutable access to two distinct bodies of one slice.
fn pair_mut(bodies: &mut [Body], a: usize, b: usize) -> (&mut Body, &mut Body) {
    debug_assert_ne!(a, b);
    if a < b {
        let (left, right) = bodies.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = bodies.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

fn record_contact(a: &mut Body, b: &mut Body) {
    a.collided_with_this_frame.insert(b.id);
    b.collided_with_this_frame.insert(a.id);
}

/// Inelastic absorption of `absorbed` into `survivor`: mass and disk area add
/// up, momentum is shared, colours blend additively.
pub fn merge_into(survivor: &mut Body, absorbed: &mut Body) {
    let total = survivor.mass + absorbed.mass;
    survivor.velocity = (survivor.momentum() + absorbed.momentum()) / total;
    survivor.radius = (survivor.radius * survivor.radius + absorbed.radius * absorbed.radius).sqrt();
    survivor.mass = total;
    survivor.colour += absorbed.colour / 2.0;
    survivor.spin_speed = (survivor.spin_speed + absorbed.spin_speed) / 2.0;
    absorbed.marked_for_deletion = true;
}

impl CollisionResolver {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            restitution: config.restitution,
            merge_speed_threshold: config.merge_speed_threshold,
            spin_transfer: config.spin_transfer,
            neighbor_radius: config.neighbor_radius,
            parallel: config.parallel,
        }
    }

    fn candidates_for(
        &self,
        i: usize,
        bodies: &[Body],
        index: &SpatialIndex,
        scratch: &mut Vec<usize>,
    ) -> Vec<CandidatePair> {
        let a = &bodies[i];
        if !a.is_live() {
            return Vec::new();
        }
        index.neighbors_into(index.cell_of(a.position), self.neighbor_radius, scratch);
        let mut found: Vec<CandidatePair> = scratch
            .iter()
            .copied()
            .filter(|&j| {
                let b = &bodies[j];
                a.id < b.id && b.is_live() && a.overlaps(b)
            })
            .map(|j| CandidatePair { a: i, b: j })
            .collect();
        found.sort_unstable_by_key(|pair| bodies[pair.b].id);
        found
    }

    /// Every overlapping pair once, ordered by the lower id's slice position
    /// and then by partner id.
    pub fn broad_phase(&self, bodies: &[Body], index: &SpatialIndex) -> Vec<CandidatePair> {
        let per_body: Vec<Vec<CandidatePair>> = if self.parallel {
            (0..bodies.len())
                .into_par_iter()
                .map_init(Vec::new, |scratch, i| {
                    self.candidates_for(i, bodies, index, scratch)
                })
                .collect()
        } else {
            let mut scratch = Vec::new();
            (0..bodies.len())
                .map(|i| self.candidates_for(i, bodies, index, &mut scratch))
                .collect()
        };
        per_body.into_iter().flatten().collect()
    }

    pub fn resolve_pair(&self, bodies: &mut [Body], pair: CandidatePair) -> PairOutcome {
        let (a, b) = pair_mut(bodies, pair.a, pair.b);
        if !a.is_live() || !b.is_live() || a.id == b.id {
            return PairOutcome::Skipped;
        }

        let delta = a.position - b.position;
        let distance = delta.length();
        let rsum = a.radius + b.radius;
        if distance >= rsum {
            return PairOutcome::Skipped;
        }

        if a.collided_with_last_frame.contains(&b.id) || b.collided_with_last_frame.contains(&a.id)
        {
            record_contact(a, b);
            return PairOutcome::Suppressed;
        }

        let normal = normalize_or_none(delta).unwrap_or(Vec2::X);
        let relative = a.velocity - b.velocity;
        let along_normal = relative.dot(normal);

        if along_normal.abs() < self.merge_speed_threshold {
            let a_survives = a.mass >= b.mass;
            let (outcome, survivor, absorbed) = if a_survives {
                (
                    PairOutcome::Merged {
                        survivor: pair.a,
                        absorbed: pair.b,
                    },
                    a,
                    b,
                )
            } else {
                (
                    PairOutcome::Merged {
                        survivor: pair.b,
                        absorbed: pair.a,
                    },
                    b,
                    a,
                )
            };
            merge_into(survivor, absorbed);
            debug!(
                "{} absorbed {} (mass {:.4}, radius {:.4})",
                survivor.id, absorbed.id, survivor.mass, survivor.radius
            );
            return outcome;
        }

        if along_normal > 0.0 {
            return PairOutcome::Separating;
        }

        let inv_mass_sum = 1.0 / a.mass + 1.0 / b.mass;
        let j = -(1.0 + self.restitution) * along_normal / inv_mass_sum;
        let impulse = normal * j;

        // push each body away from the other
        if delta.dot(impulse) >= 0.0 {
            a.velocity += impulse / a.mass;
            b.velocity -= impulse / b.mass;
        } else {
            a.velocity -= impulse / a.mass;
            b.velocity += impulse / b.mass;
        }

        let tangent = perpendicular(normal);
        let spin = (a.spin_speed - b.spin_speed) * self.spin_transfer;
        a.velocity += tangent * spin;
        b.velocity -= tangent * spin;

        let overlap = rsum - distance;
        a.position += normal * overlap / 2.0;
        b.position -= normal * overlap / 2.0;

        record_contact(a, b);
        PairOutcome::Bounced
    }

    pub fn resolve(&self, bodies: &mut [Body], index: &SpatialIndex) -> CollisionStats {
        let pairs = self.broad_phase(bodies, index);
        let mut stats = CollisionStats {
            candidates: pairs.len(),
            ..CollisionStats::default()
        };
        for pair in pairs {
            match self.resolve_pair(bodies, pair) {
                PairOutcome::Skipped => {}
                PairOutcome::Suppressed => stats.suppressed += 1,
                PairOutcome::Merged { .. } => stats.merges += 1,
                PairOutcome::Separating => stats.separating += 1,
                PairOutcome::Bounced => stats.bounces += 1,
            }
        }
        stats
    }
}
