// Field storage: grid geometry, double-buffered fields and the obstacle mask

use std::ops::Range;

use na::DMatrix;

use crate::error::{SimError, SimResult};

/// Smallest allowed extent along either axis. Anything smaller has no interior.
pub const MIN_EXTENT: usize = 3;

/// Shape of the rectangular simulation domain.
///
/// Cells are addressed by `(row, col)` and stored row-major, so the flat
/// index of a cell is `row * width + col`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
}

impl Grid {
    /// Create a grid of `width` columns and `height` rows.
    ///
    /// Both extents must be at least [`MIN_EXTENT`].
    pub fn new(width: usize, height: usize) -> SimResult<Self> {
        if width < MIN_EXTENT || height < MIN_EXTENT {
            return Err(SimError::GridTooSmall { width, height });
        }

        Ok(Grid { width, height })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of cells in the grid
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Flat index of `(row, col)`. Does not check bounds.
    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.width + col
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row < self.height && col < self.width
    }

    /// Whether `(row, col)` has all four direct neighbours inside the grid.
    pub fn is_interior(&self, row: usize, col: usize) -> bool {
        (1..self.height - 1).contains(&row) && (1..self.width - 1).contains(&col)
    }

    /// Flat index of `(row, col)`, or `OutOfBounds` if the cell is not on the grid.
    pub fn checked_index(&self, row: usize, col: usize) -> SimResult<usize> {
        if !self.contains(row, col) {
            return Err(SimError::OutOfBounds {
                row,
                col,
                width: self.width,
                height: self.height,
            });
        }

        Ok(self.index(row, col))
    }

    /// Flat index of `(row, col)`, or `NotInterior` if the cell lies on the outer ring
    /// (or off the grid entirely).
    pub fn interior_index(&self, row: usize, col: usize) -> SimResult<usize> {
        if !self.is_interior(row, col) {
            return Err(SimError::NotInterior {
                row,
                col,
                width: self.width,
                height: self.height,
            });
        }

        Ok(self.index(row, col))
    }

    /// Row indices that are updated by the solver
    pub fn interior_rows(&self) -> Range<usize> {
        1..self.height - 1
    }

    /// Column indices that are updated by the solver
    pub fn interior_cols(&self) -> Range<usize> {
        1..self.width - 1
    }

    /// Fail with `LengthMismatch` unless `actual` equals the cell count.
    pub fn check_len(&self, what: &'static str, actual: usize) -> SimResult<()> {
        if actual != self.len() {
            return Err(SimError::LengthMismatch {
                what,
                expected: self.len(),
                actual,
            });
        }
        Ok(())
    }
}

/// A double-buffered field: two disjoint allocations with named roles.
///
/// [`BufferPair::swap`] exchanges which allocation is *current* and which
/// is *previous* by flipping a flag; no element is copied. A step reads the
/// previous buffer and writes the current one through [`BufferPair::split_mut`].
#[derive(Debug, Clone)]
pub struct BufferPair<T> {
    a: Vec<T>,
    b: Vec<T>,

    /// `false` when `a` holds the current role
    b_is_current: bool,
}

impl<T: Copy> BufferPair<T> {
    /// Allocate both buffers with `len` copies of `value`.
    pub fn filled(len: usize, value: T) -> Self {
        BufferPair {
            a: vec![value; len],
            b: vec![value; len],
            b_is_current: false,
        }
    }

    pub fn len(&self) -> usize {
        self.a.len()
    }

    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }

    /// Exchange the current and previous roles.
    pub fn swap(&mut self) {
        self.b_is_current = !self.b_is_current;
    }

    pub fn current(&self) -> &[T] {
        if self.b_is_current { &self.b } else { &self.a }
    }

    pub fn previous(&self) -> &[T] {
        if self.b_is_current { &self.a } else { &self.b }
    }

    pub fn current_mut(&mut self) -> &mut [T] {
        if self.b_is_current {
            &mut self.b
        } else {
            &mut self.a
        }
    }

    /// Borrow the previous buffer for reading and the current buffer for writing.
    pub fn split_mut(&mut self) -> (&[T], &mut [T]) {
        if self.b_is_current {
            (&self.a, &mut self.b)
        } else {
            (&self.b, &mut self.a)
        }
    }

    /// Overwrite every cell of both buffers with `value`.
    pub fn fill(&mut self, value: T) {
        self.a.fill(value);
        self.b.fill(value);
    }

    /// Assign `value` to cell `index` in both buffers, so the cell reads the
    /// same whichever role is current.
    pub fn set_both(&mut self, index: usize, value: T) {
        self.a[index] = value;
        self.b[index] = value;
    }
}

/// Per-cell obstacle flags. A flagged cell is never written by the solver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObstacleMask {
    grid: Grid,
    fixed: Vec<bool>,
}

impl ObstacleMask {
    /// A mask with no obstacles.
    pub fn new(grid: Grid) -> Self {
        ObstacleMask {
            grid,
            fixed: vec![false; grid.len()],
        }
    }

    /// A mask with the whole outer ring marked as obstacle.
    pub fn with_walls(grid: Grid) -> Self {
        let mut mask = ObstacleMask::new(grid);
        mask.mark_walls();
        mask
    }

    /// Build a mask from row-major flags.
    pub fn from_flags(grid: Grid, fixed: Vec<bool>) -> SimResult<Self> {
        grid.check_len("obstacle mask", fixed.len())?;
        Ok(ObstacleMask { grid, fixed })
    }

    /// Build a mask from a `(height, width)` boolean matrix.
    pub fn from_matrix(matrix: &DMatrix<bool>) -> SimResult<Self> {
        let (rows, cols) = matrix.shape();
        let grid = Grid::new(cols, rows)?;

        let mut mask = ObstacleMask::new(grid);
        for row in 0..rows {
            for col in 0..cols {
                mask.fixed[grid.index(row, col)] = matrix[(row, col)];
            }
        }

        Ok(mask)
    }

    /// The mask as a `(height, width)` boolean matrix.
    pub fn to_matrix(&self) -> DMatrix<bool> {
        DMatrix::from_row_slice(self.grid.height(), self.grid.width(), &self.fixed)
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.fixed
    }

    pub fn get(&self, row: usize, col: usize) -> SimResult<bool> {
        let index = self.grid.checked_index(row, col)?;
        Ok(self.fixed[index])
    }

    pub fn set(&mut self, row: usize, col: usize, fixed: bool) -> SimResult<()> {
        let index = self.grid.checked_index(row, col)?;
        self.fixed[index] = fixed;
        Ok(())
    }

    /// Mark every cell in `rows x cols` as obstacle. Ranges are clipped to the grid.
    pub fn fill_rect(&mut self, rows: Range<usize>, cols: Range<usize>) {
        let rows = rows.start.min(self.grid.height())..rows.end.min(self.grid.height());
        let cols = cols.start.min(self.grid.width())..cols.end.min(self.grid.width());

        for row in rows {
            for col in cols.clone() {
                let index = self.grid.index(row, col);
                self.fixed[index] = true;
            }
        }
    }

    /// Mark the outer ring as obstacle.
    pub fn mark_walls(&mut self) {
        let (width, height) = (self.grid.width(), self.grid.height());

        self.fill_rect(0..1, 0..width);
        self.fill_rect(height - 1..height, 0..width);
        self.fill_rect(0..height, 0..1);
        self.fill_rect(0..height, width - 1..width);
    }

    /// Number of obstacle cells
    pub fn count(&self) -> usize {
        self.fixed.iter().filter(|f| **f).count()
    }

    #[inline]
    pub(crate) fn is_fixed(&self, index: usize) -> bool {
        self.fixed[index]
    }
}
