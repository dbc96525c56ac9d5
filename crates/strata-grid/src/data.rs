//! The tabular data source collaborator.
//!
//! The pipeline's leaf layer is defined 1:1 against a [`GridData`]: the data
//! source's row/column indices *are* the index space every transform layer
//! ultimately resolves to. The data source may also report per-index sizing
//! hints, which the viewport consumes when distributing pixel widths.
//!
//! [`VecGrid`] is a simple in-memory implementation used by tests and small
//! applications; real applications typically adapt their own storage.

use crate::coordinate::Axis;

/// A single cell value.
///
/// A deliberately small tagged value type: the pipeline only moves values
/// around, it never interprets them. Rendering, editing, and conversion are
/// external collaborators.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    /// No value.
    #[default]
    None,
    /// A text value.
    Text(String),
    /// An integer value.
    Int(i64),
    /// A floating-point value.
    Float(f64),
    /// A boolean value.
    Bool(bool),
}

impl CellValue {
    /// Returns the text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer content, if this is an integer value.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            CellValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns `true` if there is no value.
    pub fn is_none(&self) -> bool {
        matches!(self, CellValue::None)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Float(f)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

/// Per-index sizing hint reported by a data source.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Sizing {
    /// Use the owning layer's default size for the axis.
    #[default]
    Default,
    /// A fixed pixel size.
    Pixels(f32),
    /// A share of the viewport client area, in percent. Percentage entries
    /// split the client space remaining after fixed-size entries,
    /// proportionally to their values.
    Percentage(f32),
}

/// The tabular data source the leaf layer wraps.
///
/// Index space is defined against this trait: `cell_value(c, r)` addresses
/// the same logical cell for the lifetime of the grid, regardless of
/// reordering, hiding, or scrolling above it. Implementations that mutate
/// from background threads are responsible for their own synchronization
/// and for bridging a refresh onto the thread that owns the grid stack.
pub trait GridData: Send + Sync {
    /// Number of columns in the source.
    fn column_count(&self) -> usize;

    /// Number of rows in the source.
    fn row_count(&self) -> usize;

    /// The value of the cell at the given column and row index.
    ///
    /// Out-of-bounds indices return [`CellValue::None`].
    fn cell_value(&self, column_index: usize, row_index: usize) -> CellValue;

    /// Sizing hint for the given index on the given axis.
    ///
    /// The default reports [`Sizing::Default`] everywhere.
    fn sizing(&self, _axis: Axis, _index: usize) -> Sizing {
        Sizing::Default
    }

    /// Count along the given axis.
    fn count(&self, axis: Axis) -> usize {
        match axis {
            Axis::Horizontal => self.column_count(),
            Axis::Vertical => self.row_count(),
        }
    }
}

/// A simple in-memory [`GridData`]: a rectangle of cell values with optional
/// per-index sizing hints.
#[derive(Debug, Default)]
pub struct VecGrid {
    columns: usize,
    rows: Vec<Vec<CellValue>>,
    column_sizing: Vec<Sizing>,
    row_sizing: Vec<Sizing>,
}

impl VecGrid {
    /// Creates an empty grid with the given column count.
    pub fn new(columns: usize) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            column_sizing: Vec::new(),
            row_sizing: Vec::new(),
        }
    }

    /// Creates a grid from rows of values. Short rows are padded with
    /// [`CellValue::None`] on access.
    pub fn from_rows(columns: usize, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            columns,
            rows,
            column_sizing: Vec::new(),
            row_sizing: Vec::new(),
        }
    }

    /// Appends a row of values.
    pub fn push_row(&mut self, row: Vec<CellValue>) {
        self.rows.push(row);
    }

    /// Sets the sizing hints for all columns, first to last.
    pub fn set_column_sizing(&mut self, sizing: Vec<Sizing>) {
        self.column_sizing = sizing;
    }

    /// Sets the sizing hints for all rows, first to last.
    pub fn set_row_sizing(&mut self, sizing: Vec<Sizing>) {
        self.row_sizing = sizing;
    }
}

impl GridData for VecGrid {
    fn column_count(&self) -> usize {
        self.columns
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn cell_value(&self, column_index: usize, row_index: usize) -> CellValue {
        if column_index >= self.columns {
            return CellValue::None;
        }
        self.rows
            .get(row_index)
            .and_then(|row| row.get(column_index))
            .cloned()
            .unwrap_or(CellValue::None)
    }

    fn sizing(&self, axis: Axis, index: usize) -> Sizing {
        let table = match axis {
            Axis::Horizontal => &self.column_sizing,
            Axis::Vertical => &self.row_sizing,
        };
        table.get(index).copied().unwrap_or(Sizing::Default)
    }
}
