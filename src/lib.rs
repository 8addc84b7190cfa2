//! Real-time 2D particle sandbox core.
//!
//! Circular bodies attract each other, bounce or merge on contact, and are
//! advanced once per frame by [`World::step`]. The crate knows nothing about
//! rendering: a front-end reads [`BodyView`] snapshots between steps.

pub mod body;
pub mod collision;
pub mod config;
pub mod error;
pub mod forces;
pub mod geometry;
pub mod spatial;
pub mod world;

pub use body::{Body, BodyId, BodyView};
pub use collision::{CandidatePair, CollisionResolver, CollisionStats, PairOutcome};
pub use config::{Scenario, SimConfig, MAX_NEIGHBOR_RADIUS};
pub use error::SimError;
pub use forces::ForceField;
pub use spatial::{Cell, CellCoord, SpatialIndex};
pub use world::{StepStats, World};
