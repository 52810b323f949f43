//! Uniform-grid spatial indexing for agent viewport queries.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Errors emitted when constructing a spatial grid.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Indicates configuration values that cannot be used (e.g., non-positive cell size).
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// World-space axis-aligned bounding box with `(x1, y1)` as the min corner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Aabb {
    /// Construct a new bounding box.
    #[must_use]
    pub const fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Width along the X axis.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    /// Height along the Y axis.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Whether every coordinate is a finite number.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x1.is_finite() && self.y1.is_finite() && self.x2.is_finite() && self.y2.is_finite()
    }

    /// Whether the point lies inside the box (inclusive edges).
    #[must_use]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x1 && x <= self.x2 && y >= self.y1 && y <= self.y2
    }
}

/// Uniform grid mapping agent ids to cells for O(1) amortized moves and
/// viewport range queries.
///
/// Cell keys are `row * cols + col`. The forward map (`entity_cells`) and the
/// reverse map (`cells`) are updated together; an id is a member of exactly
/// the cell its forward entry names.
#[derive(Debug, Default)]
pub struct SpatialGrid {
    cell_size: f32,
    cols: u32,
    rows: u32,
    cells: HashMap<u64, HashSet<String>>,
    entity_cells: HashMap<String, u64>,
}

impl SpatialGrid {
    /// Create a grid covering `world_width * world_height` with square cells.
    pub fn new(cell_size: f32, world_width: f32, world_height: f32) -> Result<Self, IndexError> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(IndexError::InvalidConfig("cell_size must be positive"));
        }
        if !world_width.is_finite() || !world_height.is_finite() {
            return Err(IndexError::InvalidConfig("world dimensions must be finite"));
        }
        if world_width <= 0.0 || world_height <= 0.0 {
            return Err(IndexError::InvalidConfig("world dimensions must be positive"));
        }
        let cols = ((world_width / cell_size).ceil() as u32).max(1);
        let rows = ((world_height / cell_size).ceil() as u32).max(1);
        Ok(Self {
            cell_size,
            cols,
            rows,
            cells: HashMap::new(),
            entity_cells: HashMap::new(),
        })
    }

    /// Edge length of one cell in world units.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of grid columns.
    #[must_use]
    pub const fn cols(&self) -> u32 {
        self.cols
    }

    /// Number of grid rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of indexed agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entity_cells.len()
    }

    /// Returns true when no agents are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entity_cells.is_empty()
    }

    /// Whether the id currently has an index entry.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entity_cells.contains_key(id)
    }

    /// Cell key for a position; out-of-range coordinates clamp to the
    /// nearest edge cell so the grid never addresses beyond its extents.
    fn cell_of(&self, x: f32, y: f32) -> u64 {
        let col = ((x.max(0.0) / self.cell_size) as u64).min(u64::from(self.cols) - 1);
        let row = ((y.max(0.0) / self.cell_size) as u64).min(u64::from(self.rows) - 1);
        row * u64::from(self.cols) + col
    }

    fn detach(&mut self, id: &str, cell_key: u64) {
        if let Some(cell) = self.cells.get_mut(&cell_key) {
            cell.remove(id);
            if cell.is_empty() {
                self.cells.remove(&cell_key);
            }
        }
    }

    /// Index `id` at `(x, y)`, moving it from its previous cell if needed.
    /// No-op when the position maps to the cell the id already occupies.
    pub fn insert(&mut self, id: &str, x: f32, y: f32) {
        let key = self.cell_of(x, y);
        match self.entity_cells.get(id) {
            Some(&old) if old == key => return,
            Some(&old) => self.detach(id, old),
            None => {}
        }
        self.cells.entry(key).or_default().insert(id.to_owned());
        self.entity_cells.insert(id.to_owned(), key);
    }

    /// Drop `id` from both mappings; no-op when the id is unknown.
    pub fn remove(&mut self, id: &str) {
        if let Some(key) = self.entity_cells.remove(id) {
            self.detach(id, key);
        }
    }

    /// Collect the ids of every agent indexed in a cell overlapping `bounds`.
    ///
    /// Column and row ranges are clamped to the grid extents on both ends, so
    /// a corrupted bounding box can never force a scan over unbounded empty
    /// cells. Non-finite bounds yield an empty set.
    #[must_use]
    pub fn query(&self, bounds: &Aabb) -> HashSet<String> {
        let mut result = HashSet::new();
        if !bounds.is_finite() {
            return result;
        }

        let min_col = ((bounds.x1 / self.cell_size).floor() as i64).max(0);
        let max_col = ((bounds.x2 / self.cell_size).floor() as i64).min(i64::from(self.cols) - 1);
        let min_row = ((bounds.y1 / self.cell_size).floor() as i64).max(0);
        let max_row = ((bounds.y2 / self.cell_size).floor() as i64).min(i64::from(self.rows) - 1);
        if min_col > max_col || min_row > max_row {
            return result;
        }

        for row in min_row..=max_row {
            for col in min_col..=max_col {
                let key = row as u64 * u64::from(self.cols) + col as u64;
                if let Some(cell) = self.cells.get(&key) {
                    for id in cell {
                        result.insert(id.clone());
                    }
                }
            }
        }
        result
    }

    /// Empty both mappings.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.entity_cells.clear();
    }
}
