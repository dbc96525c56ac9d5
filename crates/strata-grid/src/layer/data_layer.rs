//! The leaf layer wrapping the tabular data source.
//!
//! The data layer defines index space: at this level, position == index,
//! and both are exactly the data source's row/column numbering. It also
//! owns the per-axis size tables (a default size plus explicit overrides),
//! which is where `Resize` commands ultimately land after translating down
//! the chain.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use strata_core::logging::targets;

use crate::command::{CommandRegistry, GridCommand};
use crate::coordinate::{Axis, CellRegion, PositionRange};
use crate::data::{CellValue, GridData, Sizing};
use crate::event::{LayerSignals, StructuralKind};
use crate::layer::Layer;
use crate::persistence::{
    decode_size_list, encode_size_list, Persistable, Properties,
};
use crate::GridResult;

/// Default column width in pixels when neither the data source nor an
/// override specifies one.
pub const DEFAULT_COLUMN_WIDTH: f32 = 100.0;

/// Default row height in pixels.
pub const DEFAULT_ROW_HEIGHT: f32 = 24.0;

/// Per-axis size table: explicit overrides over a default.
struct SizeTable {
    default: f32,
    overrides: HashMap<usize, f32>,
}

impl SizeTable {
    fn new(default: f32) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    fn get(&self, index: usize) -> Option<f32> {
        self.overrides.get(&index).copied()
    }

    fn sorted_overrides(&self) -> Vec<(usize, f32)> {
        let mut entries: Vec<_> = self.overrides.iter().map(|(&i, &s)| (i, s)).collect();
        entries.sort_unstable_by_key(|&(i, _)| i);
        entries
    }
}

/// The leaf layer over an `Arc<dyn GridData>`.
///
/// Counts, values, and sizing hints come from the source; explicit size
/// overrides are stored here. Fires `Resized` events when a size changes
/// and `Reset` events when [`refresh`](Self::refresh) announces a source
/// shape change.
pub struct DataLayer {
    source: Arc<dyn GridData>,
    column_sizes: RwLock<SizeTable>,
    row_sizes: RwLock<SizeTable>,
    signals: LayerSignals,
    registry: CommandRegistry,
}

impl DataLayer {
    /// Creates the leaf layer over the given data source.
    pub fn new(source: Arc<dyn GridData>) -> Arc<Self> {
        Arc::new(Self {
            source,
            column_sizes: RwLock::new(SizeTable::new(DEFAULT_COLUMN_WIDTH)),
            row_sizes: RwLock::new(SizeTable::new(DEFAULT_ROW_HEIGHT)),
            signals: LayerSignals::new(),
            registry: CommandRegistry::new(),
        })
    }

    /// The wrapped data source.
    pub fn source(&self) -> &Arc<dyn GridData> {
        &self.source
    }

    fn sizes(&self, axis: Axis) -> &RwLock<SizeTable> {
        match axis {
            Axis::Horizontal => &self.column_sizes,
            Axis::Vertical => &self.row_sizes,
        }
    }

    /// Sets the default size used for indexes without an override or a
    /// source pixel hint.
    pub fn set_default_size(&self, axis: Axis, size: f32) {
        self.sizes(axis).write().default = size;
        self.signals.emit_structural(
            axis,
            StructuralKind::Resized,
            PositionRange::new(0, self.count(axis)),
        );
    }

    /// Sets an explicit size override for one index.
    ///
    /// Out-of-bounds indexes are ignored (no event).
    pub fn set_size(&self, axis: Axis, index: usize, size: f32) {
        if index >= self.count(axis) {
            return;
        }
        self.sizes(axis).write().overrides.insert(index, size);
        self.signals
            .emit_structural(axis, StructuralKind::Resized, PositionRange::single(index));
    }

    /// The effective pixel size for one index: override, then source pixel
    /// hint, then the axis default.
    pub fn size(&self, axis: Axis, index: usize) -> f32 {
        if let Some(size) = self.sizes(axis).read().get(index) {
            return size;
        }
        match self.source.sizing(axis, index) {
            Sizing::Pixels(size) => size,
            // Percentage entries are resolved by the viewport against its
            // client area; the static fallback is the default size.
            Sizing::Percentage(_) | Sizing::Default => self.sizes(axis).read().default,
        }
    }

    /// Announces that cell content changed in place, without any structural
    /// change. The region flows up the chain as a `visual_changed` event.
    pub fn notify_cell_changed(&self, region: CellRegion) {
        if region.is_empty() {
            return;
        }
        self.signals.emit_visual(region);
    }

    /// Announces that the data source changed shape or content wholesale.
    ///
    /// A data source mutated from a background thread must bridge onto the
    /// grid's owning thread and call this; the layers above react to the
    /// `Reset` events by discarding derived state.
    pub fn refresh(&self) {
        tracing::debug!(target: targets::EVENT, "data source refresh");
        for axis in Axis::BOTH {
            self.signals
                .emit_structural(axis, StructuralKind::Reset, PositionRange::new(0, self.count(axis)));
        }
    }
}

impl Layer for DataLayer {
    fn column_count(&self) -> usize {
        self.source.column_count()
    }

    fn row_count(&self) -> usize {
        self.source.row_count()
    }

    fn underlying_position(&self, axis: Axis, position: usize) -> Option<usize> {
        (position < self.count(axis)).then_some(position)
    }

    fn position_of_underlying(&self, axis: Axis, underlying: usize) -> Option<usize> {
        (underlying < self.count(axis)).then_some(underlying)
    }

    fn underlying(&self) -> Option<&dyn Layer> {
        None
    }

    fn signals(&self) -> &LayerSignals {
        &self.signals
    }

    fn registry(&self) -> Option<&CommandRegistry> {
        Some(&self.registry)
    }

    fn position_size(&self, axis: Axis, position: usize) -> f32 {
        if position >= self.count(axis) {
            return 0.0;
        }
        self.size(axis, position)
    }

    fn position_sizing(&self, axis: Axis, position: usize) -> Sizing {
        if position >= self.count(axis) {
            return Sizing::Default;
        }
        self.source.sizing(axis, position)
    }

    fn cell_value(&self, column: usize, row: usize) -> CellValue {
        self.source.cell_value(column, row)
    }

    fn handle_command(&self, command: &GridCommand) -> bool {
        match command {
            GridCommand::Resize {
                axis,
                position,
                size,
            } => {
                if *position >= self.count(*axis) || !size.is_finite() || *size < 0.0 {
                    return false;
                }
                self.set_size(*axis, *position, *size);
                true
            }
            _ => false,
        }
    }
}

impl Persistable for DataLayer {
    fn save_state(&self, prefix: &str, properties: &mut Properties) {
        for axis in Axis::BOTH {
            let entries = self.sizes(axis).read().sorted_overrides();
            properties.set(
                format!("{prefix}.{}.sizes", axis.name()),
                encode_size_list(&entries),
            );
        }
    }

    fn restore_state(&self, prefix: &str, properties: &Properties) -> GridResult<()> {
        for axis in Axis::BOTH {
            let key = format!("{prefix}.{}.sizes", axis.name());
            let Some(value) = properties.get(&key) else {
                continue;
            };
            let entries = decode_size_list(&key, value)?;
            {
                let mut table = self.sizes(axis).write();
                table.overrides.clear();
                table.overrides.extend(entries);
            }
            self.signals.emit_structural(
                axis,
                StructuralKind::Resized,
                PositionRange::new(0, self.count(axis)),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::VecGrid;

    fn five_columns() -> Arc<DataLayer> {
        let mut grid = VecGrid::new(5);
        grid.push_row(vec![
            "a".into(),
            "b".into(),
            "c".into(),
            "d".into(),
            "e".into(),
        ]);
        DataLayer::new(Arc::new(grid))
    }

    #[test]
    fn test_identity_mapping() {
        let layer = five_columns();
        assert_eq!(layer.column_count(), 5);
        assert_eq!(layer.underlying_position(Axis::Horizontal, 3), Some(3));
        assert_eq!(layer.position_of_underlying(Axis::Horizontal, 3), Some(3));
        assert_eq!(layer.underlying_position(Axis::Horizontal, 5), None);
        assert_eq!(layer.position_to_index(Axis::Horizontal, 2), Some(2));
        assert_eq!(layer.index_to_position(Axis::Vertical, 0), Some(0));
    }

    #[test]
    fn test_size_resolution_order() {
        let mut grid = VecGrid::new(3);
        grid.push_row(vec!["x".into(), "y".into(), "z".into()]);
        grid.set_column_sizing(vec![Sizing::Pixels(150.0), Sizing::Default]);
        let layer = DataLayer::new(Arc::new(grid));

        // Source hint.
        assert_eq!(layer.position_size(Axis::Horizontal, 0), 150.0);
        // Default.
        assert_eq!(layer.position_size(Axis::Horizontal, 1), DEFAULT_COLUMN_WIDTH);
        // Override beats the source hint.
        layer.set_size(Axis::Horizontal, 0, 60.0);
        assert_eq!(layer.position_size(Axis::Horizontal, 0), 60.0);
        // Out of bounds.
        assert_eq!(layer.position_size(Axis::Horizontal, 9), 0.0);
    }

    #[test]
    fn test_resize_command_claims_and_fires() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let layer = five_columns();
        let events = Arc::new(AtomicUsize::new(0));

        let sink = events.clone();
        layer.signals().structural_changed.connect(move |event| {
            assert_eq!(event.kind, StructuralKind::Resized);
            sink.fetch_add(1, Ordering::SeqCst);
        });

        assert!(layer.do_command(&GridCommand::Resize {
            axis: Axis::Horizontal,
            position: 1,
            size: 42.0,
        }));
        assert_eq!(layer.position_size(Axis::Horizontal, 1), 42.0);
        assert_eq!(events.load(Ordering::SeqCst), 1);

        // Out of bounds is rejected without mutation or event.
        assert!(!layer.do_command(&GridCommand::Resize {
            axis: Axis::Horizontal,
            position: 9,
            size: 42.0,
        }));
        assert_eq!(events.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_size_persistence_round_trip() {
        let layer = five_columns();
        layer.set_size(Axis::Horizontal, 0, 150.0);
        layer.set_size(Axis::Horizontal, 2, 35.0);
        layer.set_size(Axis::Vertical, 0, 30.0);

        let mut props = Properties::new();
        layer.save_state("v1", &mut props);
        assert_eq!(props.get("v1.column.sizes"), Some("0:150,2:35"));

        let restored = five_columns();
        restored.restore_state("v1", &props).unwrap();
        assert_eq!(restored.position_size(Axis::Horizontal, 0), 150.0);
        assert_eq!(restored.position_size(Axis::Horizontal, 2), 35.0);
        assert_eq!(restored.position_size(Axis::Vertical, 0), 30.0);
        assert_eq!(
            restored.position_size(Axis::Horizontal, 1),
            DEFAULT_COLUMN_WIDTH
        );
    }
}
