//! Uniform grid bucketing for neighbour queries.
//!
//! Rebuilt from scratch every step. Cells are created lazily as bodies land
//! in them and are kept in first-insertion order, so iteration over cells is
//! deterministic for a given body order.

use std::collections::HashMap;

use bevy::math::Vec2;

use crate::body::Body;
use crate::error::SimError;

pub type CellCoord = (i64, i64);

#[derive(Clone, Debug)]
pub struct Cell {
    pub coord: CellCoord,
    /// Indices into the body slice the index was built from.
    pub members: Vec<usize>,
    position_sum: Vec2,
    radius_sum: f32,
}

impl Cell {
    fn new(coord: CellCoord) -> Self {
        Self {
            coord,
            members: Vec::new(),
            position_sum: Vec2::ZERO,
            radius_sum: 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Mean member position. Cells only exist once something is in them.
    pub fn centroid(&self) -> Vec2 {
        self.position_sum / self.members.len().max(1) as f32
    }

    pub fn mean_radius(&self) -> f32 {
        self.radius_sum / self.members.len().max(1) as f32
    }
}

#[derive(Clone, Debug)]
pub struct SpatialIndex {
    cell_size: f32,
    lookup: HashMap<CellCoord, usize>,
    cells: Vec<Cell>,
    indexed: usize,
}

impl SpatialIndex {
    pub fn new(cell_size: f32) -> Result<Self, SimError> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(SimError::config(
                "cell_size",
                format!("{cell_size} must be positive"),
            ));
        }
        Ok(Self::with_valid_cell_size(cell_size))
    }

    /// For cell sizes that already passed [`SimConfig::validate`](crate::SimConfig::validate).
    pub(crate) fn with_valid_cell_size(cell_size: f32) -> Self {
        debug_assert!(cell_size.is_finite() && cell_size > 0.0);
        Self {
            cell_size,
            lookup: HashMap::new(),
            cells: Vec::new(),
            indexed: 0,
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Cell containing `position`. Coordinates beyond the `i64` range
    /// saturate to the outermost cell.
    pub fn cell_of(&self, position: Vec2) -> CellCoord {
        (
            (position.x as f64 / self.cell_size as f64).floor() as i64,
            (position.y as f64 / self.cell_size as f64).floor() as i64,
        )
    }

    pub fn clear(&mut self) {
        self.lookup.clear();
        self.cells.clear();
        self.indexed = 0;
    }

    /// Re-bucket every body that is not marked for deletion.
    pub fn rebuild(&mut self, bodies: &[Body]) {
        self.clear();
        for (i, body) in bodies.iter().enumerate() {
            if !body.is_live() {
                continue;
            }
            let coord = self.cell_of(body.position);
            let slot = match self.lookup.get(&coord) {
                Some(&slot) => slot,
                None => {
                    self.cells.push(Cell::new(coord));
                    self.lookup.insert(coord, self.cells.len() - 1);
                    self.cells.len() - 1
                }
            };
            let cell = &mut self.cells[slot];
            cell.members.push(i);
            cell.position_sum += body.position;
            cell.radius_sum += body.radius;
            self.indexed += 1;
        }
    }

    pub fn cell(&self, coord: CellCoord) -> Option<&Cell> {
        self.lookup.get(&coord).map(|&slot| &self.cells[slot])
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Number of bodies currently bucketed.
    pub fn len(&self) -> usize {
        self.indexed
    }

    pub fn is_empty(&self) -> bool {
        self.indexed == 0
    }

    /// Whether `other` lies inside the `(2r+1)²` block centred on `centre`.
    pub fn within(centre: CellCoord, other: CellCoord, radius: u32) -> bool {
        let r = u64::from(radius);
        other.0.abs_diff(centre.0) <= r && other.1.abs_diff(centre.1) <= r
    }

    /// Members of every populated cell in the `(2r+1)²` block around `centre`.
    pub fn neighbors(&self, centre: CellCoord, radius: u32) -> Vec<usize> {
        let mut out = Vec::new();
        self.neighbors_into(centre, radius, &mut out);
        out
    }

    /// Same as [`neighbors`](Self::neighbors) but reuses `out`. Offsets that
    /// would leave the coordinate range are skipped, so every cell is visited
    /// at most once.
    pub fn neighbors_into(&self, centre: CellCoord, radius: u32, out: &mut Vec<usize>) {
        out.clear();
        let r = i64::from(radius);
        for dy in -r..=r {
            let Some(y) = centre.1.checked_add(dy) else {
                continue;
            };
            for dx in -r..=r {
                let Some(x) = centre.0.checked_add(dx) else {
                    continue;
                };
                if let Some(cell) = self.cell((x, y)) {
                    out.extend_from_slice(&cell.members);
                }
            }
        }
    }
}
