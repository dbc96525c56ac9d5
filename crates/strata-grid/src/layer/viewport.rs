//! The scrolling window over the scrollable area.
//!
//! The viewport exposes only the rows and columns currently in view: its
//! position space starts at the scroll origin and ends with the last entry
//! that still intersects the client area, so a partially scrolled-in entry
//! counts as visible. The scroll state itself is a pixel offset per axis;
//! origin position and render offset are derived from it against the
//! resolved sizes of the layer below.
//!
//! Percentage-sized entries are resolved here, because only the viewport
//! knows the client area: each gets its share of whatever the client area
//! leaves after the fixed-size entries are paid for, re-evaluated on every
//! recalculation against the set of entries the layer below currently
//! exposes.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use strata_core::logging::targets;

use crate::command::{CommandRegistry, GridCommand};
use crate::coordinate::{Axis, CellPosition, CellRegion, PositionRange, Size};
use crate::data::Sizing;
use crate::event::{LayerSignals, StructuralEvent, StructuralKind};
use crate::layer::Layer;

/// Supplies the pixel size of the area the grid is rendered into.
///
/// The viewport polls this on every recalculation; the renderer owns the
/// actual surface and sends [`GridCommand::Recalculate`] when it resizes.
pub trait ClientAreaProvider: Send + Sync {
    /// Current client-area size in pixels.
    fn client_area(&self) -> Size;
}

/// A [`ClientAreaProvider`] holding an explicit size, settable from tests
/// and from embedders without a windowing system.
#[derive(Debug, Default)]
pub struct FixedClientArea {
    size: RwLock<Size>,
}

impl FixedClientArea {
    /// Creates a provider reporting the given size.
    pub fn new(size: Size) -> Arc<Self> {
        Arc::new(Self {
            size: RwLock::new(size),
        })
    }

    /// Changes the reported size. Follow up with
    /// [`GridCommand::Recalculate`] so the viewport picks it up.
    pub fn set(&self, size: Size) {
        *self.size.write() = size;
    }
}

impl ClientAreaProvider for FixedClientArea {
    fn client_area(&self) -> Size {
        *self.size.read()
    }
}

struct AxisView {
    /// Pixel scroll offset from the top/left of the scrollable area.
    scroll: f32,
    /// Resolved pixel size per underlying position. `None` means stale.
    sizes: Option<Vec<f32>>,
}

impl AxisView {
    fn new() -> Self {
        Self {
            scroll: 0.0,
            sizes: None,
        }
    }
}

/// Derived view state for one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ViewState {
    /// Underlying position of the first visible entry.
    origin: usize,
    /// Pixels of the origin entry scrolled out of view.
    clipped: f32,
    /// Number of visible entries, partials included.
    visible: usize,
}

const EMPTY_VIEW: ViewState = ViewState {
    origin: 0,
    clipped: 0.0,
    visible: 0,
};

/// A transform layer windowing the layer below to the scrolled-into-view
/// part.
pub struct ViewportLayer<U: Layer> {
    underlying: Arc<U>,
    provider: Arc<dyn ClientAreaProvider>,
    columns: RwLock<AxisView>,
    rows: RwLock<AxisView>,
    signals: LayerSignals,
    registry: CommandRegistry,
}

impl<U: Layer + 'static> ViewportLayer<U> {
    /// Creates a viewport over the given underlying layer, scrolled to the
    /// top-left corner.
    pub fn new(underlying: Arc<U>, provider: Arc<dyn ClientAreaProvider>) -> Arc<Self> {
        let layer = Arc::new(Self {
            underlying,
            provider,
            columns: RwLock::new(AxisView::new()),
            rows: RwLock::new(AxisView::new()),
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
                    layer.on_underlying_visual(region);
                }
            });

        layer
    }

    fn state(&self, axis: Axis) -> &RwLock<AxisView> {
        match axis {
            Axis::Horizontal => &self.columns,
            Axis::Vertical => &self.rows,
        }
    }

    /// Current client-area size.
    pub fn client_area(&self) -> Size {
        self.provider.client_area()
    }

    fn resolved_sizes(&self, axis: Axis) -> Vec<f32> {
        {
            let state = self.state(axis).read();
            if let Some(sizes) = &state.sizes {
                return sizes.clone();
            }
        }

        let client = self.provider.client_area().along(axis);
        let count = self.underlying.count(axis);

        let mut fixed_total = 0.0;
        for u in 0..count {
            if !matches!(self.underlying.position_sizing(axis, u), Sizing::Percentage(_)) {
                fixed_total += self.underlying.position_size(axis, u);
            }
        }
        let percentage_base = (client - fixed_total).max(0.0);

        let sizes: Vec<f32> = (0..count)
            .map(|u| match self.underlying.position_sizing(axis, u) {
                Sizing::Percentage(pct) => percentage_base * pct.max(0.0) / 100.0,
                _ => self.underlying.position_size(axis, u),
            })
            .collect();

        self.state(axis).write().sizes = Some(sizes.clone());
        sizes
    }

    fn view_state(&self, axis: Axis) -> ViewState {
        let sizes = self.resolved_sizes(axis);
        let client = self.provider.client_area().along(axis);
        if sizes.is_empty() || client <= 0.0 {
            return EMPTY_VIEW;
        }

        let total: f32 = sizes.iter().sum();
        let max_scroll = (total - client).max(0.0);
        let scroll = self.state(axis).read().scroll.clamp(0.0, max_scroll);

        let mut acc = 0.0;
        let mut origin = sizes.len() - 1;
        for (u, &size) in sizes.iter().enumerate() {
            if acc + size > scroll {
                origin = u;
                break;
            }
            acc += size;
        }
        let clipped = scroll - acc;

        let mut visible = 0;
        let mut covered = -clipped;
        for &size in &sizes[origin..] {
            if covered >= client {
                break;
            }
            covered += size;
            visible += 1;
        }

        ViewState {
            origin,
            clipped,
            visible,
        }
    }

    /// Underlying position of the first visible entry on the axis.
    pub fn origin(&self, axis: Axis) -> usize {
        self.view_state(axis).origin
    }

    /// Render offset of the first visible entry: `0.0` when it is fully in
    /// view, negative by the clipped amount when partially scrolled out.
    pub fn origin_offset(&self, axis: Axis) -> f32 {
        -self.view_state(axis).clipped
    }

    /// The visible span, in the underlying layer's position space.
    pub fn visible_range(&self, axis: Axis) -> PositionRange {
        let view = self.view_state(axis);
        PositionRange::new(view.origin, view.origin + view.visible)
    }

    /// Current pixel scroll offset on the axis.
    pub fn scroll_offset(&self, axis: Axis) -> f32 {
        self.state(axis).read().scroll
    }

    /// Pixel offset of the given visible position's leading edge from the
    /// client-area origin.
    ///
    /// The origin entry reports `-clipped` when partially scrolled out;
    /// every other visible entry's offset lies in `[0, client)`. Returns
    /// `None` for positions outside the view.
    pub fn position_offset(&self, axis: Axis, position: usize) -> Option<f32> {
        let view = self.view_state(axis);
        if position >= view.visible {
            return None;
        }
        let sizes = self.resolved_sizes(axis);
        let span: f32 = sizes[view.origin..view.origin + position].iter().sum();
        Some(span - view.clipped)
    }

    /// Scrolls by a pixel delta, clamped to the scrollable extent.
    pub fn scroll(&self, axis: Axis, delta: f32) {
        if !delta.is_finite() {
            return;
        }
        let sizes = self.resolved_sizes(axis);
        let total: f32 = sizes.iter().sum();
        let client = self.provider.client_area().along(axis);
        let max_scroll = (total - client).max(0.0);

        let before = self.view_state(axis);
        {
            let mut state = self.state(axis).write();
            state.scroll = (state.scroll + delta).clamp(0.0, max_scroll);
        }
        let after = self.view_state(axis);
        if before != after {
            tracing::trace!(
                target: targets::VIEWPORT,
                axis = axis.name(),
                origin = after.origin,
                visible = after.visible,
                "scrolled"
            );
            self.emit_full_repaint();
        }
    }

    /// Scrolls the minimum amount that brings the given underlying position
    /// fully into view.
    pub fn move_to(&self, axis: Axis, underlying: usize) {
        let sizes = self.resolved_sizes(axis);
        if underlying >= sizes.len() {
            return;
        }
        let client = self.provider.client_area().along(axis);
        let start: f32 = sizes[..underlying].iter().sum();
        let end = start + sizes[underlying];

        let scroll = self.state(axis).read().scroll;
        let target = if start < scroll {
            start
        } else if end > scroll + client {
            end - client
        } else {
            return;
        };
        self.scroll(axis, target - scroll);
    }

    /// Discards resolved sizes so the next query re-reads the client area
    /// and the layer below.
    pub fn recalculate(&self) {
        tracing::debug!(target: targets::VIEWPORT, "recalculate");
        self.columns.write().sizes = None;
        self.rows.write().sizes = None;
        self.emit_full_repaint();
    }

    fn emit_full_repaint(&self) {
        self.signals.emit_visual(CellRegion::new(
            CellPosition::new(0, 0),
            self.column_count(),
            self.row_count(),
        ));
    }

    fn on_underlying_structural(&self, event: &StructuralEvent) {
        self.state(event.axis).write().sizes = None;
        match event.kind {
            StructuralKind::Reset => {
                self.state(event.axis).write().scroll = 0.0;
                self.signals.emit_structural(
                    event.axis,
                    StructuralKind::Reset,
                    PositionRange::new(0, self.count(event.axis)),
                );
            }
            kind => {
                // Re-express the range as the intersection with the view.
                let view = self.view_state(event.axis);
                let start = event.range.start.max(view.origin);
                let end = event.range.end.min(view.origin + view.visible);
                if start < end {
                    self.signals.emit_structural(
                        event.axis,
                        kind,
                        PositionRange::new(start - view.origin, end - view.origin),
                    );
                }
            }
        }
    }

    fn on_underlying_visual(&self, region: &CellRegion) {
        let mut spans = [PositionRange::EMPTY; 2];
        for (slot, axis) in Axis::BOTH.into_iter().enumerate() {
            let view = self.view_state(axis);
            let (start, len) = match axis {
                Axis::Horizontal => (region.origin.column, region.columns),
                Axis::Vertical => (region.origin.row, region.rows),
            };
            let lo = start.max(view.origin);
            let hi = (start + len).min(view.origin + view.visible);
            if lo >= hi {
                return;
            }
            spans[slot] = PositionRange::new(lo - view.origin, hi - view.origin);
        }
        self.signals.emit_visual(CellRegion::new(
            CellPosition::new(spans[0].start, spans[1].start),
            spans[0].len(),
            spans[1].len(),
        ));
    }
}

impl<U: Layer + 'static> Layer for ViewportLayer<U> {
    fn column_count(&self) -> usize {
        self.view_state(Axis::Horizontal).visible
    }

    fn row_count(&self) -> usize {
        self.view_state(Axis::Vertical).visible
    }

    fn underlying_position(&self, axis: Axis, position: usize) -> Option<usize> {
        let view = self.view_state(axis);
        (position < view.visible).then(|| view.origin + position)
    }

    fn position_of_underlying(&self, axis: Axis, underlying: usize) -> Option<usize> {
        let view = self.view_state(axis);
        (underlying >= view.origin && underlying < view.origin + view.visible)
            .then(|| underlying - view.origin)
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

    fn position_size(&self, axis: Axis, position: usize) -> f32 {
        match self.underlying_position(axis, position) {
            // Report the resolved size, percentages included.
            Some(u) => self.resolved_sizes(axis).get(u).copied().unwrap_or(0.0),
            None => 0.0,
        }
    }

    fn handle_command(&self, command: &GridCommand) -> bool {
        match command {
            GridCommand::Scroll { axis, delta } => {
                self.scroll(*axis, *delta);
                true
            }
            GridCommand::MoveToPosition { axis, position } => {
                self.move_to(*axis, *position);
                true
            }
            GridCommand::Recalculate => {
                self.recalculate();
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
    use crate::layer::{DataLayer, HideShowLayer};

    fn uniform_grid(columns: usize, rows: usize) -> Arc<DataLayer> {
        let mut grid = VecGrid::new(columns);
        for r in 0..rows {
            grid.push_row((0..columns).map(|c| format!("{c}:{r}").into()).collect());
        }
        DataLayer::new(Arc::new(grid))
    }

    fn viewport_200px(
        data: Arc<DataLayer>,
    ) -> (Arc<ViewportLayer<DataLayer>>, Arc<FixedClientArea>) {
        let area = FixedClientArea::new(Size::new(200.0, 48.0));
        let viewport = ViewportLayer::new(data, area.clone());
        (viewport, area)
    }

    #[test]
    fn test_window_counts_partials() {
        // Five 100px columns in a 200px client: two fully visible.
        let (viewport, _area) = viewport_200px(uniform_grid(5, 4));
        assert_eq!(viewport.column_count(), 2);
        assert_eq!(viewport.visible_range(Axis::Horizontal), PositionRange::new(0, 2));
        assert_eq!(viewport.origin_offset(Axis::Horizontal), 0.0);

        // Scrolling 50px clips the origin and pulls a third, partial
        // column into view.
        viewport.scroll(Axis::Horizontal, 50.0);
        assert_eq!(viewport.origin(Axis::Horizontal), 0);
        assert_eq!(viewport.origin_offset(Axis::Horizontal), -50.0);
        assert_eq!(viewport.column_count(), 3);
        assert_eq!(viewport.position_to_index(Axis::Horizontal, 0), Some(0));
        assert_eq!(viewport.position_to_index(Axis::Horizontal, 2), Some(2));
    }

    #[test]
    fn test_visible_offsets_stay_inside_client() {
        let (viewport, _area) = viewport_200px(uniform_grid(5, 4));
        viewport.scroll(Axis::Horizontal, 130.0);

        // Origin column 1 is clipped by 30px; columns 1, 2 and 3 intersect
        // the 200px client.
        assert_eq!(viewport.column_count(), 3);
        assert_eq!(viewport.position_offset(Axis::Horizontal, 0), Some(-30.0));
        assert_eq!(viewport.position_offset(Axis::Horizontal, 1), Some(70.0));
        assert_eq!(viewport.position_offset(Axis::Horizontal, 2), Some(170.0));
        assert_eq!(viewport.position_offset(Axis::Horizontal, 3), None);

        let client = viewport.client_area().along(Axis::Horizontal);
        for position in 0..viewport.column_count() {
            let offset = viewport.position_offset(Axis::Horizontal, position).unwrap();
            let size = viewport.position_size(Axis::Horizontal, position);
            // Every visible entry intersects [0, client).
            assert!(offset < client);
            assert!(offset + size > 0.0);
        }
    }

    #[test]
    fn test_scroll_clamps_to_extent() {
        let (viewport, _area) = viewport_200px(uniform_grid(5, 4));

        viewport.scroll(Axis::Horizontal, -80.0);
        assert_eq!(viewport.scroll_offset(Axis::Horizontal), 0.0);

        // Total 500px, client 200px: scroll tops out at 300px.
        viewport.scroll(Axis::Horizontal, 10_000.0);
        assert_eq!(viewport.scroll_offset(Axis::Horizontal), 300.0);
        assert_eq!(viewport.origin(Axis::Horizontal), 3);
        assert_eq!(viewport.column_count(), 2);
    }

    #[test]
    fn test_zero_client_area_shows_nothing() {
        let (viewport, area) = viewport_200px(uniform_grid(5, 4));
        area.set(Size::ZERO);
        viewport.recalculate();
        assert_eq!(viewport.column_count(), 0);
        assert_eq!(viewport.row_count(), 0);
        assert_eq!(viewport.underlying_position(Axis::Horizontal, 0), None);
    }

    #[test]
    fn test_move_to_scrolls_minimally() {
        let (viewport, _area) = viewport_200px(uniform_grid(5, 4));

        viewport.move_to(Axis::Horizontal, 3);
        // Column 3 ends at 400px; minimal scroll puts it flush right.
        assert_eq!(viewport.scroll_offset(Axis::Horizontal), 200.0);

        // Already fully visible: no movement.
        viewport.move_to(Axis::Horizontal, 2);
        assert_eq!(viewport.scroll_offset(Axis::Horizontal), 200.0);

        viewport.move_to(Axis::Horizontal, 0);
        assert_eq!(viewport.scroll_offset(Axis::Horizontal), 0.0);
    }

    #[test]
    fn test_percentage_sizes_resolve_against_client() {
        let mut grid = VecGrid::new(3);
        grid.push_row(vec!["a".into(), "b".into(), "c".into()]);
        grid.set_column_sizing(vec![
            Sizing::Pixels(50.0),
            Sizing::Percentage(75.0),
            Sizing::Percentage(25.0),
        ]);
        let (viewport, area) = viewport_200px(DataLayer::new(Arc::new(grid)));

        // 200px client minus 50px fixed leaves 150px to split 75/25.
        assert_eq!(viewport.position_size(Axis::Horizontal, 0), 50.0);
        assert_eq!(viewport.position_size(Axis::Horizontal, 1), 112.5);
        assert_eq!(viewport.position_size(Axis::Horizontal, 2), 37.5);
        assert_eq!(viewport.column_count(), 3);

        // Resizing the client re-bases the percentages after recalculate.
        area.set(Size::new(450.0, 48.0));
        viewport.recalculate();
        assert_eq!(viewport.position_size(Axis::Horizontal, 1), 300.0);
        assert_eq!(viewport.position_size(Axis::Horizontal, 2), 100.0);
    }

    #[test]
    fn test_percentage_rebases_when_entries_hidden() {
        let mut grid = VecGrid::new(3);
        grid.push_row(vec!["a".into(), "b".into(), "c".into()]);
        grid.set_column_sizing(vec![
            Sizing::Pixels(50.0),
            Sizing::Percentage(50.0),
            Sizing::Percentage(50.0),
        ]);
        let hide = HideShowLayer::new(DataLayer::new(Arc::new(grid)));
        let area = FixedClientArea::new(Size::new(200.0, 48.0));
        let viewport = ViewportLayer::new(hide.clone(), area);

        assert_eq!(viewport.position_size(Axis::Horizontal, 1), 75.0);

        // Hiding the fixed column frees its 50px for the percentages.
        hide.hide(Axis::Horizontal, &[0]);
        assert_eq!(viewport.column_count(), 2);
        assert_eq!(viewport.position_size(Axis::Horizontal, 0), 100.0);
        assert_eq!(viewport.position_size(Axis::Horizontal, 1), 100.0);
    }

    #[test]
    fn test_structural_events_reexpressed_in_view_space() {
        use parking_lot::Mutex;

        let data = uniform_grid(5, 4);
        let (viewport, _area) = viewport_200px(data.clone());
        viewport.scroll(Axis::Horizontal, 200.0);
        assert_eq!(viewport.origin(Axis::Horizontal), 2);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        viewport.signals().structural_changed.connect(move |event| {
            sink.lock().push(*event);
        });

        // A resize of column 3 lands at view position 1.
        data.set_size(Axis::Horizontal, 3, 80.0);
        // A resize of an off-screen column is not re-emitted.
        data.set_size(Axis::Horizontal, 0, 80.0);

        let events = seen.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, StructuralKind::Resized);
        assert_eq!(events[0].range, PositionRange::single(1));
    }
}
