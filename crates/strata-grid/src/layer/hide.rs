//! Hiding and showing rows and columns.
//!
//! The hide layer excludes entries from its position space while the data
//! source keeps them. Hidden entries are tracked by *index* (stable data
//! identity), not by position, so a reorder below this layer never changes
//! which data is hidden. The position space is a per-axis cache of the
//! still-visible underlying positions, rebuilt lazily whenever the layer
//! below announces a structural change.

use std::collections::BTreeSet;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use strata_core::logging::targets;

use crate::command::{CommandRegistry, GridCommand};
use crate::coordinate::{Axis, CellPosition, CellRegion, PositionRange};
use crate::event::{LayerSignals, StructuralEvent, StructuralKind};
use crate::layer::Layer;
use crate::persistence::{decode_index_list, encode_index_list, Persistable, Properties};
use crate::GridResult;

struct AxisHidden {
    /// Hidden entries, by index.
    hidden: BTreeSet<usize>,
    /// position -> underlying position, ascending. `None` means stale.
    visible: Option<Vec<usize>>,
}

impl AxisHidden {
    fn new() -> Self {
        Self {
            hidden: BTreeSet::new(),
            visible: None,
        }
    }
}

/// A transform layer that removes hidden entries from its position space.
pub struct HideShowLayer<U: Layer> {
    underlying: Arc<U>,
    columns: RwLock<AxisHidden>,
    rows: RwLock<AxisHidden>,
    signals: LayerSignals,
    registry: CommandRegistry,
}

impl<U: Layer + 'static> HideShowLayer<U> {
    /// Creates a hide layer over the given underlying layer with nothing
    /// hidden.
    pub fn new(underlying: Arc<U>) -> Arc<Self> {
        let layer = Arc::new(Self {
            underlying,
            columns: RwLock::new(AxisHidden::new()),
            rows: RwLock::new(AxisHidden::new()),
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
                    if let Some(mapped) = layer.map_region_up(region) {
                        layer.signals.emit_visual(mapped);
                    }
                }
            });

        layer
    }

    /// Re-expresses an underlying-space region in this layer's space,
    /// skipping hidden entries. Returns `None` if the whole region is
    /// hidden.
    fn map_region_up(&self, region: &CellRegion) -> Option<CellRegion> {
        let map_span = |axis: Axis, start: usize, len: usize| {
            let mut span = PositionRange::EMPTY;
            for underlying in start..start + len {
                if let Some(position) = self.position_of_underlying(axis, underlying) {
                    span = span.union(&PositionRange::single(position));
                }
            }
            span
        };
        let columns = map_span(Axis::Horizontal, region.origin.column, region.columns);
        let rows = map_span(Axis::Vertical, region.origin.row, region.rows);
        if columns.is_empty() || rows.is_empty() {
            return None;
        }
        Some(CellRegion::new(
            CellPosition::new(columns.start, rows.start),
            columns.len(),
            rows.len(),
        ))
    }

    fn state(&self, axis: Axis) -> &RwLock<AxisHidden> {
        match axis {
            Axis::Horizontal => &self.columns,
            Axis::Vertical => &self.rows,
        }
    }

    /// Returns the visible table for the axis, rebuilding it if stale.
    fn visible(&self, axis: Axis) -> Vec<usize> {
        {
            let state = self.state(axis).read();
            if let Some(visible) = &state.visible {
                return visible.clone();
            }
        }
        let mut state = self.state(axis).write();
        if state.visible.is_none() {
            let table: Vec<usize> = (0..self.underlying.count(axis))
                .filter(|&u| {
                    self.underlying
                        .position_to_index(axis, u)
                        .map_or(true, |index| !state.hidden.contains(&index))
                })
                .collect();
            state.visible = Some(table);
        }
        state.visible.clone().unwrap_or_default()
    }

    fn on_underlying_structural(&self, event: &StructuralEvent) {
        match event.kind {
            StructuralKind::Reset | StructuralKind::Inserted | StructuralKind::Removed => {
                {
                    let mut state = self.state(event.axis).write();
                    state.hidden.clear();
                    state.visible = None;
                }
                self.signals.emit_structural(
                    event.axis,
                    StructuralKind::Reset,
                    PositionRange::new(0, self.count(event.axis)),
                );
            }
            _ => {
                self.state(event.axis).write().visible = None;
                let mut mapped = PositionRange::EMPTY;
                for underlying in event.range.iter() {
                    if let Some(position) = self.position_of_underlying(event.axis, underlying) {
                        mapped = mapped.union(&PositionRange::single(position));
                    }
                }
                self.signals.emit_structural(event.axis, event.kind, mapped);
            }
        }
    }

    /// Indices currently hidden on the axis, ascending.
    pub fn hidden_indexes(&self, axis: Axis) -> Vec<usize> {
        self.state(axis).read().hidden.iter().copied().collect()
    }

    /// Returns `true` if the given index is hidden on the axis.
    pub fn is_hidden(&self, axis: Axis, index: usize) -> bool {
        self.state(axis).read().hidden.contains(&index)
    }

    /// Hides the entries at the given positions (in this layer's space).
    ///
    /// Out-of-bounds positions are ignored; hiding an already-hidden entry
    /// is a no-op. Fires a `Hidden` event spanning the former positions of
    /// the entries that actually disappeared.
    pub fn hide(&self, axis: Axis, positions: &[usize]) {
        let mut span = PositionRange::EMPTY;
        let mut indexes = Vec::new();
        for &position in positions {
            if let Some(index) = self.position_to_index(axis, position) {
                span = span.union(&PositionRange::single(position));
                indexes.push(index);
            }
        }
        if indexes.is_empty() {
            return;
        }

        let changed = {
            let mut state = self.state(axis).write();
            let mut changed = false;
            for index in indexes {
                changed |= state.hidden.insert(index);
            }
            if changed {
                state.visible = None;
            }
            changed
        };
        if changed {
            self.signals
                .emit_structural(axis, StructuralKind::Hidden, span);
        }
    }

    /// Shows previously hidden entries again, addressed by index.
    ///
    /// Unknown or already-visible indexes are ignored. Fires a `Shown`
    /// event spanning the reappeared positions.
    pub fn show(&self, axis: Axis, indexes: &[usize]) {
        let changed = {
            let mut state = self.state(axis).write();
            let mut changed = false;
            for index in indexes {
                changed |= state.hidden.remove(index);
            }
            if changed {
                state.visible = None;
            }
            changed
        };
        if !changed {
            return;
        }

        let mut span = PositionRange::EMPTY;
        for &index in indexes {
            if let Some(position) = self.index_to_position(axis, index) {
                span = span.union(&PositionRange::single(position));
            }
        }
        self.signals
            .emit_structural(axis, StructuralKind::Shown, span);
    }

    /// Shows every hidden entry on the axis.
    pub fn show_all(&self, axis: Axis) {
        let indexes = self.hidden_indexes(axis);
        if !indexes.is_empty() {
            self.show(axis, &indexes);
        }
    }
}

impl<U: Layer + 'static> Layer for HideShowLayer<U> {
    fn column_count(&self) -> usize {
        self.visible(Axis::Horizontal).len()
    }

    fn row_count(&self) -> usize {
        self.visible(Axis::Vertical).len()
    }

    fn underlying_position(&self, axis: Axis, position: usize) -> Option<usize> {
        self.visible(axis).get(position).copied()
    }

    fn position_of_underlying(&self, axis: Axis, underlying: usize) -> Option<usize> {
        // The visible table is ascending in underlying position.
        self.visible(axis).binary_search(&underlying).ok()
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
            GridCommand::Hide { axis, positions } => {
                self.hide(*axis, positions);
                true
            }
            GridCommand::Show { axis, indexes } => {
                self.show(*axis, indexes);
                true
            }
            GridCommand::ShowAll { axis } => {
                self.show_all(*axis);
                true
            }
            _ => false,
        }
    }
}

impl<U: Layer + 'static> Persistable for HideShowLayer<U> {
    fn save_state(&self, prefix: &str, properties: &mut Properties) {
        for axis in Axis::BOTH {
            properties.set(
                format!("{prefix}.{}.hidden", axis.name()),
                encode_index_list(&self.hidden_indexes(axis)),
            );
        }
    }

    fn restore_state(&self, prefix: &str, properties: &Properties) -> GridResult<()> {
        for axis in Axis::BOTH {
            let key = format!("{prefix}.{}.hidden", axis.name());
            let Some(value) = properties.get(&key) else {
                continue;
            };
            let indexes = decode_index_list(&key, value)?;
            {
                let mut state = self.state(axis).write();
                state.hidden = indexes.into_iter().collect();
                state.visible = None;
            }
            tracing::debug!(
                target: targets::PERSISTENCE,
                axis = axis.name(),
                "hidden set restored"
            );
            self.signals.emit_structural(
                axis,
                StructuralKind::Reset,
                PositionRange::new(0, self.count(axis)),
            );
        }
        Ok(())
    }
}
