//! Coordinate value types for the layer pipeline.
//!
//! Two coordinate spaces run through the whole crate:
//!
//! - An **index** identifies a row or column in the underlying data source.
//!   It is stable across reordering, hiding, and scrolling, and only changes
//!   when the data source itself structurally changes.
//! - A **position** identifies a row or column's current visual slot *within
//!   one layer's coordinate space*. The same logical column has a different
//!   position as observed from the data layer, the reorder layer, and the
//!   viewport layer.
//!
//! Both are plain `usize` values; "not found" / "not visible" is expressed
//! as `Option::None` rather than a panic, because misses happen routinely
//! during transient states such as mid-scroll.

use serde::{Deserialize, Serialize};

/// Which axis of the grid a position or index refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// Columns.
    Horizontal,
    /// Rows.
    Vertical,
}

impl Axis {
    /// Both axes, in the order commands and events enumerate them.
    pub const BOTH: [Axis; 2] = [Axis::Horizontal, Axis::Vertical];

    /// Returns the other axis.
    #[inline]
    pub fn transposed(self) -> Self {
        match self {
            Axis::Horizontal => Axis::Vertical,
            Axis::Vertical => Axis::Horizontal,
        }
    }

    /// Lowercase name used in persisted state keys and log fields.
    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            Axis::Horizontal => "column",
            Axis::Vertical => "row",
        }
    }
}

/// A cell in some layer's position space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellPosition {
    /// Column position.
    pub column: usize,
    /// Row position.
    pub row: usize,
}

impl CellPosition {
    /// Creates a cell position.
    #[inline]
    pub const fn new(column: usize, row: usize) -> Self {
        Self { column, row }
    }

    /// Returns the coordinate on the given axis.
    #[inline]
    pub fn get(&self, axis: Axis) -> usize {
        match axis {
            Axis::Horizontal => self.column,
            Axis::Vertical => self.row,
        }
    }

    /// Returns a copy with the coordinate on the given axis replaced.
    #[inline]
    pub fn with(&self, axis: Axis, value: usize) -> Self {
        match axis {
            Axis::Horizontal => Self::new(value, self.row),
            Axis::Vertical => Self::new(self.column, value),
        }
    }
}

/// A rectangular region of cells in some layer's position space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRegion {
    /// Top-left corner of the region.
    pub origin: CellPosition,
    /// Number of columns spanned.
    pub columns: usize,
    /// Number of rows spanned.
    pub rows: usize,
}

impl CellRegion {
    /// Creates a region from its top-left corner and extent.
    pub const fn new(origin: CellPosition, columns: usize, rows: usize) -> Self {
        Self {
            origin,
            columns,
            rows,
        }
    }

    /// A region covering a single cell.
    pub const fn single(cell: CellPosition) -> Self {
        Self::new(cell, 1, 1)
    }

    /// Creates the smallest region containing both cells.
    pub fn spanning(a: CellPosition, b: CellPosition) -> Self {
        let left = a.column.min(b.column);
        let top = a.row.min(b.row);
        let right = a.column.max(b.column);
        let bottom = a.row.max(b.row);
        Self::new(
            CellPosition::new(left, top),
            right - left + 1,
            bottom - top + 1,
        )
    }

    /// Returns `true` if the region contains no cells.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns == 0 || self.rows == 0
    }

    /// Returns `true` if the given cell lies inside the region.
    pub fn contains(&self, cell: CellPosition) -> bool {
        cell.column >= self.origin.column
            && cell.column < self.origin.column + self.columns
            && cell.row >= self.origin.row
            && cell.row < self.origin.row + self.rows
    }

    /// Iterates over every cell in the region, row-major.
    pub fn cells(&self) -> impl Iterator<Item = CellPosition> + '_ {
        let origin = self.origin;
        let columns = self.columns;
        (0..self.rows).flat_map(move |r| {
            (0..columns).map(move |c| CellPosition::new(origin.column + c, origin.row + r))
        })
    }
}

/// A half-open range `[start, end)` of positions on one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRange {
    /// First position in the range.
    pub start: usize,
    /// One past the last position in the range.
    pub end: usize,
}

impl PositionRange {
    /// Creates a range; `end < start` is normalized to the empty range at
    /// `start`.
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// The empty range at position 0.
    pub const EMPTY: Self = Self { start: 0, end: 0 };

    /// A range covering a single position.
    pub const fn single(position: usize) -> Self {
        Self {
            start: position,
            end: position + 1,
        }
    }

    /// Number of positions covered.
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns `true` if the range covers no positions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns `true` if the position lies inside the range.
    #[inline]
    pub fn contains(&self, position: usize) -> bool {
        position >= self.start && position < self.end
    }

    /// Returns the smallest range covering both ranges.
    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Self::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// Iterates over the positions in the range.
    pub fn iter(&self) -> impl Iterator<Item = usize> {
        self.start..self.end
    }
}

/// A client-area size in pixels.
///
/// The pipeline carries its own minimal size type; the rendering surface
/// behind the client-area provider is an external collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
}

impl Size {
    /// The zero size.
    pub const ZERO: Self = Self {
        width: 0.0,
        height: 0.0,
    };

    /// Creates a size.
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Returns the extent along the given axis (width for columns, height
    /// for rows).
    #[inline]
    pub fn along(&self, axis: Axis) -> f32 {
        match axis {
            Axis::Horizontal => self.width,
            Axis::Vertical => self.height,
        }
    }
}
