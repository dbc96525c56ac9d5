//! Freezing leading rows and columns against scrolling.
//!
//! The freeze layer itself is transparent: it owns the freeze boundary (a
//! frozen column count and a frozen row count) and hands out [`PaneLayer`]s
//! that window the space on either side of it. A full frozen grid is four
//! panes sharing one freeze layer: the corner (frozen both ways), a frozen
//! column strip, a frozen row strip, and the scrolling body, which is the
//! pane a [`ViewportLayer`](crate::layer::ViewportLayer) wraps. A zero
//! boundary degenerates cleanly: the frozen panes are empty and the body
//! pane covers everything.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use strata_core::logging::targets;
use strata_core::Signal;

use crate::command::{CommandRegistry, GridCommand};
use crate::coordinate::{Axis, CellPosition, CellRegion, PositionRange};
use crate::event::{LayerSignals, StructuralEvent, StructuralKind};
use crate::layer::Layer;
use crate::{GridError, GridResult};

/// Callback the freeze layer uses to find the boundary cell for a
/// [`GridCommand::Freeze`], usually wired to the selection anchor.
pub type AnchorSource = Box<dyn Fn() -> Option<CellPosition> + Send + Sync>;

/// A transparent layer owning the freeze boundary.
pub struct FreezeLayer<U: Layer> {
    underlying: Arc<U>,
    /// (frozen columns, frozen rows).
    frozen: RwLock<(usize, usize)>,
    anchor_source: RwLock<Option<AnchorSource>>,
    signals: LayerSignals,
    /// Fired with the new (columns, rows) boundary. The panes listen here;
    /// the freeze layer's own coordinate space never changes with the
    /// boundary, so this is deliberately not a structural event.
    boundary_changed: Signal<(usize, usize)>,
    registry: CommandRegistry,
}

impl<U: Layer + 'static> FreezeLayer<U> {
    /// Creates a freeze layer with a zero boundary (nothing frozen).
    pub fn new(underlying: Arc<U>) -> Arc<Self> {
        let layer = Arc::new(Self {
            underlying,
            frozen: RwLock::new((0, 0)),
            anchor_source: RwLock::new(None),
            signals: LayerSignals::new(),
            boundary_changed: Signal::new(),
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
            // The boundary may now be past the end; drop it.
            *self.frozen.write() = (0, 0);
        }
        self.signals
            .emit_structural(event.axis, event.kind, event.range);
    }

    /// Installs the callback consulted by [`GridCommand::Freeze`] for the
    /// boundary cell.
    pub fn set_anchor_source(&self, source: AnchorSource) {
        *self.anchor_source.write() = Some(source);
    }

    /// Number of frozen positions on the axis.
    pub fn frozen_count(&self, axis: Axis) -> usize {
        let (columns, rows) = *self.frozen.read();
        match axis {
            Axis::Horizontal => columns,
            Axis::Vertical => rows,
        }
    }

    /// Returns `true` if any boundary is set.
    pub fn is_frozen(&self) -> bool {
        *self.frozen.read() != (0, 0)
    }

    /// Sets the freeze boundary: the first `columns` columns and `rows`
    /// rows stop scrolling.
    pub fn freeze_at(&self, columns: usize, rows: usize) -> GridResult<()> {
        if columns > self.column_count() {
            return Err(GridError::FrozenCountOutOfBounds {
                axis: Axis::Horizontal.name(),
                count: columns,
                available: self.column_count(),
            });
        }
        if rows > self.row_count() {
            return Err(GridError::FrozenCountOutOfBounds {
                axis: Axis::Vertical.name(),
                count: rows,
                available: self.row_count(),
            });
        }

        if std::mem::replace(&mut *self.frozen.write(), (columns, rows)) == (columns, rows) {
            return Ok(());
        }
        tracing::debug!(target: targets::VIEWPORT, columns, rows, "freeze boundary set");
        // Only the panes' spaces are reshaped; this layer's own space (and
        // everything stacked above it) is untouched.
        self.boundary_changed.emit((columns, rows));
        Ok(())
    }

    /// Clears the freeze boundary.
    pub fn unfreeze(&self) {
        // A zero boundary is always in bounds.
        let _ = self.freeze_at(0, 0);
    }

    /// Creates a pane over one side of the boundary on each axis:
    /// `frozen_columns` selects the frozen column strip, `frozen_rows` the
    /// frozen row strip, both the corner, neither the scrolling body.
    pub fn pane(
        self: &Arc<Self>,
        frozen_columns: bool,
        frozen_rows: bool,
    ) -> Arc<PaneLayer<U>> {
        PaneLayer::new(self.clone(), frozen_columns, frozen_rows)
    }
}

impl<U: Layer + 'static> Layer for FreezeLayer<U> {
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
            GridCommand::Freeze => {
                let anchor = self.anchor_source.read().as_ref().and_then(|f| f());
                match anchor {
                    Some(cell) => self.freeze_at(cell.column, cell.row).is_ok(),
                    None => false,
                }
            }
            GridCommand::Unfreeze => {
                self.unfreeze();
                true
            }
            _ => false,
        }
    }
}

/// One quadrant of a frozen grid, windowing its shared [`FreezeLayer`].
///
/// On each axis the pane covers either the frozen leading run or the
/// scrollable remainder, tracking the boundary dynamically.
pub struct PaneLayer<U: Layer> {
    freeze: Arc<FreezeLayer<U>>,
    frozen_columns: bool,
    frozen_rows: bool,
    signals: LayerSignals,
}

impl<U: Layer + 'static> PaneLayer<U> {
    fn new(freeze: Arc<FreezeLayer<U>>, frozen_columns: bool, frozen_rows: bool) -> Arc<Self> {
        let layer = Arc::new(Self {
            freeze,
            frozen_columns,
            frozen_rows,
            signals: LayerSignals::new(),
        });

        let weak: Weak<Self> = Arc::downgrade(&layer);
        layer
            .freeze
            .signals()
            .structural_changed
            .connect(move |event| {
                if let Some(layer) = weak.upgrade() {
                    layer.on_freeze_structural(event);
                }
            });

        let weak: Weak<Self> = Arc::downgrade(&layer);
        layer
            .freeze
            .signals()
            .visual_changed
            .connect(move |region| {
                if let Some(layer) = weak.upgrade() {
                    layer.on_freeze_visual(region);
                }
            });

        let weak: Weak<Self> = Arc::downgrade(&layer);
        layer.freeze.boundary_changed.connect(move |_| {
            if let Some(layer) = weak.upgrade() {
                // The pane's segment moved wholesale.
                for axis in Axis::BOTH {
                    layer.signals.emit_structural(
                        axis,
                        StructuralKind::Reset,
                        PositionRange::new(0, layer.count(axis)),
                    );
                }
            }
        });

        layer
    }

    fn covers_frozen(&self, axis: Axis) -> bool {
        match axis {
            Axis::Horizontal => self.frozen_columns,
            Axis::Vertical => self.frozen_rows,
        }
    }

    /// The pane's span on the axis, in the freeze layer's space.
    fn segment(&self, axis: Axis) -> PositionRange {
        let boundary = self.freeze.frozen_count(axis);
        if self.covers_frozen(axis) {
            PositionRange::new(0, boundary)
        } else {
            PositionRange::new(boundary, self.freeze.count(axis))
        }
    }

    fn on_freeze_structural(&self, event: &StructuralEvent) {
        if event.kind == StructuralKind::Reset {
            self.signals.emit_structural(
                event.axis,
                StructuralKind::Reset,
                PositionRange::new(0, self.count(event.axis)),
            );
            return;
        }
        let segment = self.segment(event.axis);
        let start = event.range.start.max(segment.start);
        let end = event.range.end.min(segment.end);
        if start < end {
            self.signals.emit_structural(
                event.axis,
                event.kind,
                PositionRange::new(start - segment.start, end - segment.start),
            );
        }
    }

    fn on_freeze_visual(&self, region: &CellRegion) {
        let columns = self.segment(Axis::Horizontal);
        let rows = self.segment(Axis::Vertical);
        let left = region.origin.column.max(columns.start);
        let right = (region.origin.column + region.columns).min(columns.end);
        let top = region.origin.row.max(rows.start);
        let bottom = (region.origin.row + region.rows).min(rows.end);
        if left < right && top < bottom {
            self.signals.emit_visual(CellRegion::new(
                CellPosition::new(left - columns.start, top - rows.start),
                right - left,
                bottom - top,
            ));
        }
    }
}

impl<U: Layer + 'static> Layer for PaneLayer<U> {
    fn column_count(&self) -> usize {
        self.segment(Axis::Horizontal).len()
    }

    fn row_count(&self) -> usize {
        self.segment(Axis::Vertical).len()
    }

    fn underlying_position(&self, axis: Axis, position: usize) -> Option<usize> {
        let segment = self.segment(axis);
        (position < segment.len()).then(|| segment.start + position)
    }

    fn position_of_underlying(&self, axis: Axis, underlying: usize) -> Option<usize> {
        let segment = self.segment(axis);
        segment
            .contains(underlying)
            .then(|| underlying - segment.start)
    }

    fn underlying(&self) -> Option<&dyn Layer> {
        Some(self.freeze.as_ref())
    }

    fn signals(&self) -> &LayerSignals {
        &self.signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::VecGrid;
    use crate::layer::{DataLayer, SelectionLayer};
    use crate::layer::selection::SelectionFlags;

    fn grid_5x4() -> Arc<FreezeLayer<DataLayer>> {
        let mut grid = VecGrid::new(5);
        for r in 0..4 {
            grid.push_row((0..5).map(|c| format!("{c}:{r}").into()).collect());
        }
        FreezeLayer::new(DataLayer::new(Arc::new(grid)))
    }

    #[test]
    fn test_boundary_splits_panes() {
        let freeze = grid_5x4();
        let corner = freeze.pane(true, true);
        let columns = freeze.pane(true, false);
        let rows = freeze.pane(false, true);
        let body = freeze.pane(false, false);

        freeze.freeze_at(2, 1).unwrap();

        assert_eq!((corner.column_count(), corner.row_count()), (2, 1));
        assert_eq!((columns.column_count(), columns.row_count()), (2, 3));
        assert_eq!((rows.column_count(), rows.row_count()), (3, 1));
        assert_eq!((body.column_count(), body.row_count()), (3, 3));

        // The body's first cell is the one just past the boundary.
        assert_eq!(body.position_to_index(Axis::Horizontal, 0), Some(2));
        assert_eq!(body.position_to_index(Axis::Vertical, 0), Some(1));
        assert_eq!(body.cell_value(0, 0).as_text(), Some("2:1"));
        assert_eq!(corner.cell_value(0, 0).as_text(), Some("0:0"));
    }

    #[test]
    fn test_zero_boundary_degenerates() {
        let freeze = grid_5x4();
        let corner = freeze.pane(true, true);
        let body = freeze.pane(false, false);

        assert!(!freeze.is_frozen());
        assert_eq!((corner.column_count(), corner.row_count()), (0, 0));
        assert_eq!((body.column_count(), body.row_count()), (5, 4));
        assert_eq!(corner.underlying_position(Axis::Horizontal, 0), None);
    }

    #[test]
    fn test_out_of_bounds_boundary_rejected() {
        let freeze = grid_5x4();
        assert!(matches!(
            freeze.freeze_at(6, 0),
            Err(GridError::FrozenCountOutOfBounds { count: 6, available: 5, .. })
        ));
        assert!(!freeze.is_frozen());
    }

    #[test]
    fn test_freeze_command_uses_anchor() {
        let freeze = grid_5x4();
        let selection = SelectionLayer::new(freeze.clone());

        let anchor_from = Arc::downgrade(&selection);
        freeze.set_anchor_source(Box::new(move || {
            anchor_from.upgrade().and_then(|s| s.anchor())
        }));

        // No anchor yet: the command is not claimed.
        assert!(!selection.do_command(&GridCommand::Freeze));

        selection.select_cell(CellPosition::new(2, 1), SelectionFlags::REPLACE);
        assert!(selection.do_command(&GridCommand::Freeze));
        assert_eq!(freeze.frozen_count(Axis::Horizontal), 2);
        assert_eq!(freeze.frozen_count(Axis::Vertical), 1);
        // The command must not destroy the selection it was anchored to.
        assert!(selection.is_selected(CellPosition::new(2, 1)));
        assert_eq!(selection.anchor(), Some(CellPosition::new(2, 1)));

        assert!(selection.do_command(&GridCommand::Unfreeze));
        assert!(!freeze.is_frozen());
        assert!(selection.is_selected(CellPosition::new(2, 1)));
    }

    #[test]
    fn test_boundary_change_leaves_layers_above_untouched() {
        use crate::layer::HideShowLayer;

        let freeze = grid_5x4();
        let hide = HideShowLayer::new(freeze.clone());
        let selection = SelectionLayer::new(hide.clone());

        hide.hide(Axis::Horizontal, &[4]);
        selection.select_cell(CellPosition::new(2, 1), SelectionFlags::REPLACE);

        freeze.freeze_at(1, 0).unwrap();

        // Only the panes reshape; the stack above keeps its hidden set and
        // its selection.
        assert_eq!(hide.hidden_indexes(Axis::Horizontal), vec![4]);
        assert!(selection.is_selected(CellPosition::new(2, 1)));

        freeze.unfreeze();
        assert_eq!(hide.hidden_indexes(Axis::Horizontal), vec![4]);
        assert!(selection.is_selected(CellPosition::new(2, 1)));
    }

    #[test]
    fn test_boundary_change_resets_panes_not_the_freeze_layer() {
        use parking_lot::Mutex;

        let freeze = grid_5x4();
        let body = freeze.pane(false, false);

        let above = Arc::new(Mutex::new(Vec::new()));
        let sink = above.clone();
        freeze.signals().structural_changed.connect(move |event| {
            sink.lock().push(*event);
        });
        let pane = Arc::new(Mutex::new(Vec::new()));
        let sink = pane.clone();
        body.signals().structural_changed.connect(move |event| {
            sink.lock().push(*event);
        });

        freeze.freeze_at(2, 1).unwrap();

        // Nothing structural flows upward from the freeze layer.
        assert!(above.lock().is_empty());
        // The pane announces its reshaped space.
        let pane_events = pane.lock();
        assert_eq!(pane_events.len(), 2);
        assert!(pane_events
            .iter()
            .all(|event| event.kind == StructuralKind::Reset));
    }

    #[test]
    fn test_pane_events_remapped_to_segment() {
        use parking_lot::Mutex;

        let mut grid = VecGrid::new(5);
        for r in 0..4 {
            grid.push_row((0..5).map(|c| format!("{c}:{r}").into()).collect());
        }
        let data = DataLayer::new(Arc::new(grid));
        let freeze = FreezeLayer::new(data.clone());
        let body = freeze.pane(false, false);
        freeze.freeze_at(2, 0).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        body.signals().structural_changed.connect(move |event| {
            sink.lock().push(*event);
        });

        // Resize inside the body lands shifted by the boundary; resize in
        // the frozen strip does not reach the body at all.
        data.set_size(Axis::Horizontal, 3, 80.0);
        data.set_size(Axis::Horizontal, 0, 80.0);

        let events = seen.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].range, PositionRange::single(1));
    }
}
