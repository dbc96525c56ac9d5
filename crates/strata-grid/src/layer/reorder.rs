//! Position permutation.
//!
//! The reorder layer rewrites position order on each axis while leaving
//! counts untouched. Internally it keeps, per axis, the permutation from
//! its own positions to the underlying layer's positions, plus the reverse
//! table for the opposite hop. Structural events from below that invalidate
//! the permutation (`Reset`, `Inserted`, `Removed`) reset it to identity.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use strata_core::logging::targets;

use crate::command::{CommandRegistry, GridCommand};
use crate::coordinate::{Axis, CellPosition, CellRegion, PositionRange};
use crate::event::{LayerSignals, StructuralEvent, StructuralKind};
use crate::layer::Layer;
use crate::persistence::{decode_index_list, encode_index_list, Persistable, Properties};
use crate::{GridError, GridResult};

/// A run of underlying positions that must stay contiguous and in relative
/// order under reordering.
///
/// Reorders that would tear the group apart, or splice foreign positions
/// into it, are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupConstraint {
    /// The constrained run, in the underlying layer's position space.
    pub members: PositionRange,
}

impl GroupConstraint {
    /// Creates a constraint over a run of underlying positions.
    pub fn new(members: PositionRange) -> Self {
        Self { members }
    }
}

struct AxisOrder {
    /// position -> underlying position. Empty means identity / stale.
    order: Vec<usize>,
    /// underlying position -> position. Rebuilt with `order`.
    reverse: Vec<usize>,
    constraints: Vec<GroupConstraint>,
}

impl AxisOrder {
    fn new() -> Self {
        Self {
            order: Vec::new(),
            reverse: Vec::new(),
            constraints: Vec::new(),
        }
    }

    fn reset_identity(&mut self, count: usize) {
        self.order = (0..count).collect();
        self.reverse = (0..count).collect();
    }

    fn ensure(&mut self, count: usize) {
        if self.order.len() != count {
            self.reset_identity(count);
        }
    }

    fn rebuild_reverse(&mut self) {
        self.reverse = vec![0; self.order.len()];
        for (position, &underlying) in self.order.iter().enumerate() {
            self.reverse[underlying] = position;
        }
    }

    /// Checks that every constrained run is contiguous and in order in the
    /// candidate permutation.
    fn satisfies_constraints(&self, candidate: &[usize]) -> bool {
        self.constraints.iter().all(|constraint| {
            let run = constraint.members;
            if run.len() < 2 {
                return true;
            }
            let Some(first) = candidate.iter().position(|&u| u == run.start) else {
                return true;
            };
            run.iter().enumerate().all(|(offset, member)| {
                candidate.get(first + offset) == Some(&member)
            })
        })
    }
}

/// A transform layer that permutes positions on each axis.
pub struct ReorderLayer<U: Layer> {
    underlying: Arc<U>,
    columns: RwLock<AxisOrder>,
    rows: RwLock<AxisOrder>,
    signals: LayerSignals,
    registry: CommandRegistry,
}

impl<U: Layer + 'static> ReorderLayer<U> {
    /// Creates a reorder layer over the given underlying layer, initially
    /// the identity permutation on both axes.
    pub fn new(underlying: Arc<U>) -> Arc<Self> {
        let layer = Arc::new(Self {
            underlying,
            columns: RwLock::new(AxisOrder::new()),
            rows: RwLock::new(AxisOrder::new()),
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
                    layer.signals.emit_visual(layer.map_region_up(region));
                }
            });

        layer
    }

    /// Re-expresses an underlying-space cell region as the bounding region
    /// of its cells in this layer's space.
    fn map_region_up(&self, region: &CellRegion) -> CellRegion {
        let columns = self.map_range_up(
            Axis::Horizontal,
            PositionRange::new(region.origin.column, region.origin.column + region.columns),
        );
        let rows = self.map_range_up(
            Axis::Vertical,
            PositionRange::new(region.origin.row, region.origin.row + region.rows),
        );
        CellRegion::new(
            CellPosition::new(columns.start, rows.start),
            columns.len(),
            rows.len(),
        )
    }

    fn axis_order(&self, axis: Axis) -> &RwLock<AxisOrder> {
        match axis {
            Axis::Horizontal => &self.columns,
            Axis::Vertical => &self.rows,
        }
    }

    fn on_underlying_structural(&self, event: &StructuralEvent) {
        match event.kind {
            StructuralKind::Reset | StructuralKind::Inserted | StructuralKind::Removed => {
                let count = self.underlying.count(event.axis);
                self.axis_order(event.axis).write().reset_identity(count);
                self.signals.emit_structural(
                    event.axis,
                    StructuralKind::Reset,
                    PositionRange::new(0, count),
                );
            }
            _ => {
                // Re-express the affected underlying range in this layer's
                // positions.
                let mapped = self.map_range_up(event.axis, event.range);
                self.signals.emit_structural(event.axis, event.kind, mapped);
            }
        }
    }

    fn map_range_up(&self, axis: Axis, range: PositionRange) -> PositionRange {
        let mut mapped = PositionRange::EMPTY;
        for underlying in range.iter() {
            if let Some(position) = self.position_of_underlying(axis, underlying) {
                mapped = mapped.union(&PositionRange::single(position));
            }
        }
        mapped
    }

    /// Adds a contiguity constraint on the axis.
    pub fn add_constraint(&self, axis: Axis, constraint: GroupConstraint) {
        self.axis_order(axis).write().constraints.push(constraint);
    }

    /// Removes all contiguity constraints on the axis.
    pub fn clear_constraints(&self, axis: Axis) {
        self.axis_order(axis).write().constraints.clear();
    }

    /// The current permutation on the axis: element `p` is the underlying
    /// position shown at position `p`.
    pub fn order(&self, axis: Axis) -> Vec<usize> {
        let mut state = self.axis_order(axis).write();
        state.ensure(self.underlying.count(axis));
        state.order.clone()
    }

    /// Moves the entry at position `from` so it ends up at position `to`.
    ///
    /// Returns `false` (leaving the order untouched) if either position is
    /// out of bounds or the move would violate a [`GroupConstraint`].
    pub fn reorder(&self, axis: Axis, from: usize, to: usize) -> bool {
        self.reorder_batch(axis, &[from], to)
    }

    /// Moves a batch of positions so they end up contiguous starting at
    /// `to`, preserving their relative order. Atomic: either the whole
    /// batch moves or nothing does.
    pub fn reorder_batch(&self, axis: Axis, from: &[usize], to: usize) -> bool {
        let count = self.count(axis);
        if from.is_empty()
            || to > count
            || from.iter().any(|&p| p >= count)
        {
            return false;
        }

        let mut state = self.axis_order(axis).write();
        state.ensure(count);

        let mut sorted: Vec<usize> = from.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != from.len() {
            return false;
        }

        // Build the candidate order: pull the moved entries out, then
        // splice them back in so they start at `to` in the result,
        // clamped to the tail when the batch would overhang the end.
        let moved: Vec<usize> = sorted.iter().map(|&p| state.order[p]).collect();
        let mut candidate: Vec<usize> = state
            .order
            .iter()
            .enumerate()
            .filter(|(p, _)| sorted.binary_search(p).is_err())
            .map(|(_, &u)| u)
            .collect();
        let slot = to.min(candidate.len());
        candidate.splice(slot..slot, moved);

        if !state.satisfies_constraints(&candidate) {
            tracing::debug!(
                target: targets::COMMAND,
                axis = axis.name(),
                "reorder rejected by group constraint"
            );
            return false;
        }
        if candidate == state.order {
            return true;
        }

        // The affected span runs from the lowest touched position to the
        // highest.
        let low = sorted[0].min(to.min(count.saturating_sub(1)));
        let high = sorted[sorted.len() - 1].max(to.min(count.saturating_sub(1)));

        state.order = candidate;
        state.rebuild_reverse();
        drop(state);

        self.signals.emit_structural(
            axis,
            StructuralKind::Reordered,
            PositionRange::new(low, high + 1),
        );
        true
    }
}

impl<U: Layer + 'static> Layer for ReorderLayer<U> {
    fn column_count(&self) -> usize {
        self.underlying.column_count()
    }

    fn row_count(&self) -> usize {
        self.underlying.row_count()
    }

    fn underlying_position(&self, axis: Axis, position: usize) -> Option<usize> {
        let mut state = self.axis_order(axis).write();
        state.ensure(self.underlying.count(axis));
        state.order.get(position).copied()
    }

    fn position_of_underlying(&self, axis: Axis, underlying: usize) -> Option<usize> {
        let mut state = self.axis_order(axis).write();
        state.ensure(self.underlying.count(axis));
        state.reverse.get(underlying).copied()
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
            GridCommand::Reorder { axis, from, to } => self.reorder(*axis, *from, *to),
            GridCommand::ReorderBatch { axis, from, to } => {
                self.reorder_batch(*axis, from, *to)
            }
            _ => false,
        }
    }
}

impl<U: Layer + 'static> Persistable for ReorderLayer<U> {
    fn save_state(&self, prefix: &str, properties: &mut Properties) {
        for axis in Axis::BOTH {
            properties.set(
                format!("{prefix}.{}.order", axis.name()),
                encode_index_list(&self.order(axis)),
            );
        }
    }

    fn restore_state(&self, prefix: &str, properties: &Properties) -> GridResult<()> {
        for axis in Axis::BOTH {
            let key = format!("{prefix}.{}.order", axis.name());
            let Some(value) = properties.get(&key) else {
                continue;
            };
            let order = decode_index_list(&key, value)?;

            let count = self.underlying.count(axis);
            let mut seen = vec![false; count];
            let valid = order.len() == count
                && order.iter().all(|&u| {
                    u < count && !std::mem::replace(&mut seen[u], true)
                });
            if !valid {
                return Err(GridError::StateDecode {
                    key,
                    reason: format!("not a permutation of 0..{count}"),
                });
            }

            {
                let mut state = self.axis_order(axis).write();
                state.order = order;
                state.rebuild_reverse();
            }
            tracing::debug!(
                target: targets::PERSISTENCE,
                axis = axis.name(),
                "order restored"
            );
            self.signals.emit_structural(
                axis,
                StructuralKind::Reordered,
                PositionRange::new(0, count),
            );
        }
        Ok(())
    }
}
