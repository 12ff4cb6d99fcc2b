//! Odd-sized spawn grid surrounding the hub.

use cable_rush_core::CellCoord;
use glam::Vec3;
use rand::{seq::SliceRandom, Rng};

/// Dense occupancy table for the cells devices may spawn on.
///
/// The grid always has an odd number of columns and rows so a unique center
/// cell exists. That cell belongs to the hub and stays occupied for the
/// lifetime of the allocator.
#[derive(Clone, Debug)]
pub struct GridAllocator {
    columns: u32,
    rows: u32,
    cell_size: f32,
    center: Vec3,
    occupied: Vec<bool>,
}

impl GridAllocator {
    /// Creates a grid centred on `center`.
    ///
    /// Even dimensions are bumped to the next odd value and zero becomes one.
    /// Non-positive or non-finite cell sizes fall back to `1.0`.
    #[must_use]
    pub fn new(columns: u32, rows: u32, cell_size: f32, center: Vec3) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            log::warn!("invalid grid cell size {cell_size}, using 1.0");
            1.0
        };
        let mut grid = Self {
            columns: force_odd(columns),
            rows: force_odd(rows),
            cell_size,
            center,
            occupied: Vec::new(),
        };
        grid.reset();
        grid
    }

    /// Number of columns after forcing odd dimensions.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows after forcing odd dimensions.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Side length of a cell in world units.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// World position of the hub cell.
    #[must_use]
    pub const fn center(&self) -> Vec3 {
        self.center
    }

    /// Coordinate of the hub cell.
    #[must_use]
    pub const fn center_cell(&self) -> CellCoord {
        CellCoord::new(self.columns / 2, self.rows / 2)
    }

    /// Total number of cells, hub cell included.
    #[must_use]
    pub fn total_cells(&self) -> usize {
        self.occupied.len()
    }

    /// Converts a cell coordinate into the world position of its center.
    ///
    /// Cells lie on the horizontal plane through the grid center.
    #[must_use]
    pub fn cell_to_world(&self, cell: CellCoord) -> Vec3 {
        let hub = self.center_cell();
        let dx = i64::from(cell.column()) - i64::from(hub.column());
        let dz = i64::from(cell.row()) - i64::from(hub.row());
        self.center + Vec3::new(dx as f32 * self.cell_size, 0.0, dz as f32 * self.cell_size)
    }

    /// Maps a world position to the nearest cell, if it lies on the grid.
    #[must_use]
    pub fn world_to_cell(&self, position: Vec3) -> Option<CellCoord> {
        let hub = self.center_cell();
        let local = (position - self.center) / self.cell_size;
        let column = (local.x + hub.column() as f32).round();
        let row = (local.z + hub.row() as f32).round();
        if !column.is_finite() || !row.is_finite() || column < 0.0 || row < 0.0 {
            return None;
        }
        if column >= self.columns as f32 || row >= self.rows as f32 {
            return None;
        }
        Some(CellCoord::new(column as u32, row as u32))
    }

    /// Reports whether the cell is occupied. Cells off the grid count as occupied.
    #[must_use]
    pub fn is_occupied(&self, cell: CellCoord) -> bool {
        self.index(cell)
            .and_then(|index| self.occupied.get(index).copied())
            .unwrap_or(true)
    }

    /// Picks a uniformly random free cell, excluding the hub cell.
    ///
    /// The cell is not reserved; callers follow up with [`Self::occupy`].
    pub fn allocate_random_free_cell<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<CellCoord> {
        let free = self.free_cells();
        free.choose(rng).copied()
    }

    /// Like [`Self::allocate_random_free_cell`], paired with the cell's world position.
    pub fn allocate_random_free_position<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Option<(CellCoord, Vec3)> {
        self.allocate_random_free_cell(rng)
            .map(|cell| (cell, self.cell_to_world(cell)))
    }

    /// Enumerates every free cell in row-major order.
    #[must_use]
    pub fn free_cells(&self) -> Vec<CellCoord> {
        let hub = self.center_cell();
        (0..self.rows)
            .flat_map(|row| (0..self.columns).map(move |column| CellCoord::new(column, row)))
            .filter(|cell| *cell != hub && !self.is_occupied(*cell))
            .collect()
    }

    /// Marks a cell occupied. Returns `false` when the cell is off the grid or
    /// already taken.
    pub fn occupy(&mut self, cell: CellCoord) -> bool {
        let Some(slot) = self.index(cell).and_then(|index| self.occupied.get_mut(index)) else {
            log::debug!("ignoring occupy request for off-grid cell {cell:?}");
            return false;
        };
        if *slot {
            return false;
        }
        *slot = true;
        true
    }

    /// Releases a cell. The hub cell and off-grid cells are left untouched.
    pub fn free(&mut self, cell: CellCoord) -> bool {
        if cell == self.center_cell() {
            return false;
        }
        let Some(slot) = self.index(cell).and_then(|index| self.occupied.get_mut(index)) else {
            log::debug!("ignoring free request for off-grid cell {cell:?}");
            return false;
        };
        let was_occupied = *slot;
        *slot = false;
        was_occupied
    }

    /// [`Self::occupy`] addressed by world position.
    pub fn occupy_at(&mut self, position: Vec3) -> bool {
        self.world_to_cell(position)
            .map_or(false, |cell| self.occupy(cell))
    }

    /// [`Self::free`] addressed by world position.
    pub fn free_at(&mut self, position: Vec3) -> bool {
        self.world_to_cell(position).map_or(false, |cell| self.free(cell))
    }

    /// Number of unoccupied cells.
    #[must_use]
    pub fn free_cell_count(&self) -> usize {
        self.occupied.iter().filter(|taken| !**taken).count()
    }

    /// Number of occupied cells, hub cell included.
    #[must_use]
    pub fn occupied_cell_count(&self) -> usize {
        self.occupied.iter().filter(|taken| **taken).count()
    }

    /// Frees every cell except the hub cell.
    pub fn reset(&mut self) {
        let capacity_u64 = u64::from(self.columns) * u64::from(self.rows);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        self.occupied = vec![false; capacity];
        let hub = self.center_cell();
        if let Some(slot) = self.index(hub).and_then(|index| self.occupied.get_mut(index)) {
            *slot = true;
        }
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() < self.columns && cell.row() < self.rows {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}

fn force_odd(value: u32) -> u32 {
    if value == 0 {
        1
    } else if value % 2 == 0 {
        value.saturating_add(1)
    } else {
        value
    }
}
