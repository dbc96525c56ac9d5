//! Cell selection tracking.
//!
//! The selection layer is transparent to coordinates (identity mapping) and
//! adds selection state on top of the stack it wraps. Selected cells are
//! stored by *index pair* (stable data identity), so a selection placed on
//! a cell follows that cell through reorders below and simply has no
//! visible position while its column or row is hidden.

use std::collections::{HashMap, HashSet};
use std::ops::{BitOr, BitOrAssign};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use strata_core::logging::targets;

use crate::command::{CommandRegistry, GridCommand};
use crate::coordinate::{Axis, CellPosition, CellRegion};
use crate::event::{LayerSignals, SelectionEvent, StructuralEvent, StructuralKind};
use crate::layer::Layer;

// ============================================================================
// Selection flags
// ============================================================================

/// How a selection command combines with the existing selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelectionFlags(u8);

impl SelectionFlags {
    /// Clear the existing selection first.
    pub const CLEAR: Self = Self(0b001);
    /// Select the targeted cells.
    pub const SELECT: Self = Self(0b010);
    /// Deselect the targeted cells.
    pub const DESELECT: Self = Self(0b100);
    /// Flip the targeted cells.
    pub const TOGGLE: Self = Self(0b110);

    /// Clear everything, then select the target. The plain-click default.
    pub const REPLACE: Self = Self(Self::CLEAR.0 | Self::SELECT.0);

    /// Returns `true` if all bits of `other` are set.
    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for SelectionFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for SelectionFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

// ============================================================================
// Selection model
// ============================================================================

/// The selection set, in index space.
///
/// Keeps per-row and per-column membership counters so "is anything in this
/// row selected" stays O(1).
#[derive(Debug, Default)]
pub struct SelectionModel {
    cells: HashSet<(usize, usize)>,
    column_counts: HashMap<usize, usize>,
    row_counts: HashMap<usize, usize>,
    anchor: Option<(usize, usize)>,
}

impl SelectionModel {
    /// Creates an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the index pair is selected.
    pub fn contains(&self, column_index: usize, row_index: usize) -> bool {
        self.cells.contains(&(column_index, row_index))
    }

    /// Returns `true` if any cell in the row (by index) is selected.
    pub fn row_has_selection(&self, row_index: usize) -> bool {
        self.row_counts.contains_key(&row_index)
    }

    /// Returns `true` if any cell in the column (by index) is selected.
    pub fn column_has_selection(&self, column_index: usize) -> bool {
        self.column_counts.contains_key(&column_index)
    }

    /// Number of selected cells in the row (by index).
    pub fn row_selected_count(&self, row_index: usize) -> usize {
        self.row_counts.get(&row_index).copied().unwrap_or(0)
    }

    /// Number of selected cells in the column (by index).
    pub fn column_selected_count(&self, column_index: usize) -> usize {
        self.column_counts.get(&column_index).copied().unwrap_or(0)
    }

    /// Number of selected cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The selection anchor (the most recent un-extended selection target).
    pub fn anchor(&self) -> Option<(usize, usize)> {
        self.anchor
    }

    /// Iterates over the selected index pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.cells.iter().copied()
    }

    fn insert(&mut self, column_index: usize, row_index: usize) -> bool {
        if !self.cells.insert((column_index, row_index)) {
            return false;
        }
        *self.column_counts.entry(column_index).or_insert(0) += 1;
        *self.row_counts.entry(row_index).or_insert(0) += 1;
        true
    }

    fn remove(&mut self, column_index: usize, row_index: usize) -> bool {
        if !self.cells.remove(&(column_index, row_index)) {
            return false;
        }
        if let Some(count) = self.column_counts.get_mut(&column_index) {
            *count -= 1;
            if *count == 0 {
                self.column_counts.remove(&column_index);
            }
        }
        if let Some(count) = self.row_counts.get_mut(&row_index) {
            *count -= 1;
            if *count == 0 {
                self.row_counts.remove(&row_index);
            }
        }
        true
    }

    fn clear(&mut self) -> Vec<(usize, usize)> {
        let removed: Vec<_> = self.cells.drain().collect();
        self.column_counts.clear();
        self.row_counts.clear();
        self.anchor = None;
        removed
    }
}

// ============================================================================
// Selection layer
// ============================================================================

/// A transparent layer that tracks the grid's selection.
pub struct SelectionLayer<U: Layer> {
    underlying: Arc<U>,
    model: RwLock<SelectionModel>,
    signals: LayerSignals,
    registry: CommandRegistry,
}

impl<U: Layer + 'static> SelectionLayer<U> {
    /// Creates a selection layer over the given underlying layer with an
    /// empty selection.
    pub fn new(underlying: Arc<U>) -> Arc<Self> {
        let layer = Arc::new(Self {
            underlying,
            model: RwLock::new(SelectionModel::new()),
            signals: LayerSignals::new(),
            registry: CommandRegistry::new(),
        });

        let weak: Weak<Self> = Arc::downgrade(&layer);
        layer
            .underlying
            .signals()
            .structural_changed
            .connect(move |event| {
                if let Some(layer) = weak.upgrade() {
                    layer.on_underlying_structural(event);
                }
            });

        let weak: Weak<Self> = Arc::downgrade(&layer);
        layer
            .underlying
            .signals()
            .visual_changed
            .connect(move |region| {
                if let Some(layer) = weak.upgrade() {
                    // Identity mapping: forward the region unchanged.
                    layer.signals.emit_visual(*region);
                }
            });

        layer
    }

    fn on_underlying_structural(&self, event: &StructuralEvent) {
        if event.kind == StructuralKind::Reset {
            // Indexes are no longer meaningful; drop the selection.
            self.model.write().clear();
        }
        // Identity mapping: re-emit the event range as-is.
        self.signals
            .emit_structural(event.axis, event.kind, event.range);
    }

    /// Translates a position-space cell to its index pair.
    fn cell_indexes(&self, cell: CellPosition) -> Option<(usize, usize)> {
        Some((
            self.position_to_index(Axis::Horizontal, cell.column)?,
            self.position_to_index(Axis::Vertical, cell.row)?,
        ))
    }

    /// Translates an index pair back to a position-space cell, if both the
    /// column and the row are currently visible.
    fn cell_position(&self, column_index: usize, row_index: usize) -> Option<CellPosition> {
        Some(CellPosition::new(
            self.index_to_position(Axis::Horizontal, column_index)?,
            self.index_to_position(Axis::Vertical, row_index)?,
        ))
    }

    /// Read access to the selection model.
    pub fn with_model<R>(&self, f: impl FnOnce(&SelectionModel) -> R) -> R {
        f(&self.model.read())
    }

    /// Returns `true` if the cell at the given positions is selected.
    pub fn is_selected(&self, cell: CellPosition) -> bool {
        match self.cell_indexes(cell) {
            Some((c, r)) => self.model.read().contains(c, r),
            None => false,
        }
    }

    /// The selected cells that are currently visible, as positions in this
    /// layer's space.
    pub fn selected_cells(&self) -> Vec<CellPosition> {
        let pairs: Vec<_> = self.model.read().iter().collect();
        let mut cells: Vec<CellPosition> = pairs
            .into_iter()
            .filter_map(|(c, r)| self.cell_position(c, r))
            .collect();
        cells.sort_unstable_by_key(|cell| (cell.row, cell.column));
        cells
    }

    /// The selection anchor as a position, if it is currently visible.
    pub fn anchor(&self) -> Option<CellPosition> {
        let (c, r) = self.model.read().anchor()?;
        self.cell_position(c, r)
    }

    /// Returns `true` if every visible cell of the row at the given
    /// position is selected.
    ///
    /// The per-row counter makes the common negative answer O(1); only a
    /// row whose counter reaches the visible width is walked to confirm.
    pub fn is_row_fully_selected(&self, row: usize) -> bool {
        let Some(row_index) = self.position_to_index(Axis::Vertical, row) else {
            return false;
        };
        let width = self.column_count();
        if width == 0 || self.model.read().row_selected_count(row_index) < width {
            return false;
        }
        (0..width).all(|column| self.is_selected(CellPosition::new(column, row)))
    }

    /// Returns `true` if every visible cell of the column at the given
    /// position is selected.
    pub fn is_column_fully_selected(&self, column: usize) -> bool {
        let Some(column_index) = self.position_to_index(Axis::Horizontal, column) else {
            return false;
        };
        let height = self.row_count();
        if height == 0 || self.model.read().column_selected_count(column_index) < height {
            return false;
        }
        (0..height).all(|row| self.is_selected(CellPosition::new(column, row)))
    }

    /// Applies a selection operation to one cell.
    pub fn select_cell(&self, cell: CellPosition, flags: SelectionFlags) {
        self.apply(CellRegion::single(cell), flags);
    }

    /// Applies a selection operation to every cell in a region. Cells that
    /// fall outside the grid are ignored.
    pub fn select_region(&self, region: CellRegion, flags: SelectionFlags) {
        self.apply(region, flags);
    }

    /// Selects every visible cell.
    pub fn select_all(&self) {
        let region = CellRegion::new(
            CellPosition::new(0, 0),
            self.column_count(),
            self.row_count(),
        );
        self.apply(region, SelectionFlags::SELECT);
    }

    /// Clears the selection.
    pub fn clear_selection(&self) {
        let removed = self.model.write().clear();
        let deselected: Vec<_> = removed
            .into_iter()
            .filter_map(|(c, r)| self.cell_position(c, r))
            .collect();
        tracing::debug!(target: targets::SELECTION, "selection cleared");
        self.signals.emit_selection(SelectionEvent {
            selected: Vec::new(),
            deselected,
        });
    }

    fn apply(&self, region: CellRegion, flags: SelectionFlags) {
        let mut selected_pairs = Vec::new();
        let mut deselected_pairs = Vec::new();

        {
            let mut model = self.model.write();

            if flags.contains(SelectionFlags::CLEAR) {
                deselected_pairs.extend(model.clear());
            }

            for cell in region.cells() {
                let Some((c, r)) = self.cell_indexes(cell) else {
                    continue;
                };
                let toggle = flags.contains(SelectionFlags::TOGGLE);
                let select = if toggle {
                    !model.contains(c, r)
                } else {
                    flags.contains(SelectionFlags::SELECT)
                };
                if select {
                    if model.insert(c, r) {
                        selected_pairs.push((c, r));
                    }
                } else if flags.contains(SelectionFlags::DESELECT) && model.remove(c, r) {
                    deselected_pairs.push((c, r));
                }
            }

            // The anchor is the region origin of the latest operation that
            // selected something.
            if !selected_pairs.is_empty() {
                model.anchor = self.cell_indexes(region.origin);
            }
        }

        // A cell cleared then re-selected in the same operation is no
        // change at all.
        let reselected: HashSet<_> = selected_pairs
            .iter()
            .filter(|pair| deselected_pairs.contains(pair))
            .copied()
            .collect();
        let to_positions = |pairs: Vec<(usize, usize)>| -> Vec<CellPosition> {
            pairs
                .into_iter()
                .filter(|pair| !reselected.contains(pair))
                .filter_map(|(c, r)| self.cell_position(c, r))
                .collect()
        };

        self.signals.emit_selection(SelectionEvent {
            selected: to_positions(selected_pairs),
            deselected: to_positions(deselected_pairs),
        });
    }
}

impl<U: Layer + 'static> Layer for SelectionLayer<U> {
    fn column_count(&self) -> usize {
        self.underlying.column_count()
    }

    fn row_count(&self) -> usize {
        self.underlying.row_count()
    }

    fn underlying_position(&self, axis: Axis, position: usize) -> Option<usize> {
        (position < self.count(axis)).then_some(position)
    }

    fn position_of_underlying(&self, axis: Axis, underlying: usize) -> Option<usize> {
        (underlying < self.count(axis)).then_some(underlying)
    }

    fn underlying(&self) -> Option<&dyn Layer> {
        Some(self.underlying.as_ref())
    }

    fn signals(&self) -> &LayerSignals {
        &self.signals
    }

    fn registry(&self) -> Option<&CommandRegistry> {
        Some(&self.registry)
    }

    fn handle_command(&self, command: &GridCommand) -> bool {
        match command {
            GridCommand::SelectCell { cell, flags } => {
                self.select_cell(*cell, *flags);
                true
            }
            GridCommand::SelectRegion { region, flags } => {
                self.select_region(*region, *flags);
                true
            }
            GridCommand::SelectAll => {
                self.select_all();
                true
            }
            GridCommand::ClearSelection => {
                self.clear_selection();
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::VecGrid;
    use crate::layer::{DataLayer, HideShowLayer, ReorderLayer};

    fn grid_3x3() -> Arc<VecGrid> {
        Arc::new(VecGrid::from_rows(
            3,
            vec![
                vec!["a".into(), "b".into(), "c".into()],
                vec!["d".into(), "e".into(), "f".into()],
                vec!["g".into(), "h".into(), "i".into()],
            ],
        ))
    }

    #[test]
    fn test_replace_then_toggle() {
        let layer = SelectionLayer::new(DataLayer::new(grid_3x3()));

        layer.select_cell(CellPosition::new(0, 0), SelectionFlags::REPLACE);
        layer.select_cell(CellPosition::new(2, 2), SelectionFlags::SELECT);
        assert!(layer.is_selected(CellPosition::new(0, 0)));
        assert!(layer.is_selected(CellPosition::new(2, 2)));
        assert_eq!(layer.selected_cells().len(), 2);

        layer.select_cell(CellPosition::new(0, 0), SelectionFlags::TOGGLE);
        assert!(!layer.is_selected(CellPosition::new(0, 0)));

        layer.select_cell(CellPosition::new(1, 1), SelectionFlags::REPLACE);
        assert_eq!(layer.selected_cells(), vec![CellPosition::new(1, 1)]);
        assert_eq!(layer.anchor(), Some(CellPosition::new(1, 1)));
    }

    #[test]
    fn test_region_selection_and_counters() {
        let layer = SelectionLayer::new(DataLayer::new(grid_3x3()));
        layer.select_region(
            CellRegion::new(CellPosition::new(0, 1), 2, 2),
            SelectionFlags::REPLACE,
        );

        assert_eq!(layer.selected_cells().len(), 4);
        layer.with_model(|model| {
            assert!(model.row_has_selection(1));
            assert!(model.row_has_selection(2));
            assert!(!model.row_has_selection(0));
            assert!(model.column_has_selection(0));
            assert!(!model.column_has_selection(2));
        });
    }

    #[test]
    fn test_fully_selected_predicates() {
        let hide = HideShowLayer::new(DataLayer::new(grid_3x3()));
        let layer = SelectionLayer::new(hide.clone());

        layer.select_region(
            CellRegion::new(CellPosition::new(0, 1), 3, 1),
            SelectionFlags::REPLACE,
        );
        assert!(layer.is_row_fully_selected(1));
        assert!(!layer.is_row_fully_selected(0));
        assert!(!layer.is_column_fully_selected(0));

        // Hiding a column shrinks the row; the remaining cells still cover
        // the full visible width.
        hide.hide(Axis::Horizontal, &[2]);
        assert!(layer.is_row_fully_selected(1));

        layer.select_cell(CellPosition::new(0, 1), SelectionFlags::DESELECT);
        assert!(!layer.is_row_fully_selected(1));
    }

    #[test]
    fn test_selection_follows_reorder_below() {
        let reorder = ReorderLayer::new(DataLayer::new(grid_3x3()));
        let selection = SelectionLayer::new(reorder.clone());

        // Select cell "b" (column index 1).
        selection.select_cell(CellPosition::new(1, 0), SelectionFlags::REPLACE);
        assert!(reorder.reorder(Axis::Horizontal, 1, 2));

        // "b" is now at position 2 and is still the selected cell.
        assert_eq!(selection.selected_cells(), vec![CellPosition::new(2, 0)]);
        assert_eq!(selection.cell_value(2, 0).as_text(), Some("b"));
        assert!(selection.is_selected(CellPosition::new(2, 0)));
        assert!(!selection.is_selected(CellPosition::new(1, 0)));
    }

    #[test]
    fn test_selection_hidden_while_column_hidden() {
        let hide = HideShowLayer::new(DataLayer::new(grid_3x3()));
        let selection = SelectionLayer::new(hide.clone());

        selection.select_cell(CellPosition::new(1, 0), SelectionFlags::REPLACE);
        hide.hide(Axis::Horizontal, &[1]);

        // No visible position while hidden, membership preserved by index.
        assert!(selection.selected_cells().is_empty());
        selection.with_model(|model| assert!(model.contains(1, 0)));

        hide.show(Axis::Horizontal, &[1]);
        assert_eq!(selection.selected_cells(), vec![CellPosition::new(1, 0)]);
    }

    #[test]
    fn test_selection_events_report_positions() {
        use parking_lot::Mutex;

        let layer = SelectionLayer::new(DataLayer::new(grid_3x3()));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        layer.signals().selection_changed.connect(move |event| {
            sink.lock().push(event.clone());
        });

        assert!(layer.do_command(&GridCommand::SelectCell {
            cell: CellPosition::new(1, 2),
            flags: SelectionFlags::REPLACE,
        }));
        assert!(layer.do_command(&GridCommand::ClearSelection));

        let events = seen.lock();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].selected, vec![CellPosition::new(1, 2)]);
        assert!(events[0].deselected.is_empty());
        assert_eq!(events[1].deselected, vec![CellPosition::new(1, 2)]);
    }

    #[test]
    fn test_select_all_then_reset_clears() {
        let data = DataLayer::new(grid_3x3());
        let layer = SelectionLayer::new(data.clone());
        layer.select_all();
        assert_eq!(layer.selected_cells().len(), 9);

        data.refresh();
        assert!(layer.selected_cells().is_empty());
        layer.with_model(|model| assert!(model.is_empty()));
    }
}
