//! Change events and per-layer listener registration.
//!
//! A mutation performed by some layer is announced as an event that flows
//! *upward* from the origin layer through every layer that wraps it. Each
//! wrapping layer re-expresses the event in its own coordinate space before
//! re-emitting it on its own [`LayerSignals`], so the topmost observer (the
//! renderer, or a higher-level feature layer) always sees coordinates it
//! can interpret directly.
//!
//! Firing is synchronous: every listener runs on the thread that performed
//! the mutation, inside the same call stack, before the mutating call
//! returns.

use strata_core::logging::targets;
use strata_core::Signal;

use crate::coordinate::{Axis, CellPosition, CellRegion, PositionRange};

/// What kind of structural change occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralKind {
    /// Positions were permuted.
    Reordered,
    /// Positions were removed from view.
    Hidden,
    /// Previously hidden positions became visible again.
    Shown,
    /// A position's pixel size changed.
    Resized,
    /// Positions were structurally inserted into the data source.
    Inserted,
    /// Positions were structurally deleted from the data source.
    Removed,
    /// Everything changed; discard all cached derived state.
    Reset,
}

/// A structural change on one axis, with the affected position range
/// expressed in the emitting layer's own coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructuralEvent {
    /// The axis the change occurred on.
    pub axis: Axis,
    /// The kind of change.
    pub kind: StructuralKind,
    /// Affected positions, in the emitting layer's space. For `Reset` this
    /// covers the whole axis.
    pub range: PositionRange,
}

impl StructuralEvent {
    /// Creates a structural event.
    pub fn new(axis: Axis, kind: StructuralKind, range: PositionRange) -> Self {
        Self { axis, kind, range }
    }

    /// Creates a full-axis reset event.
    pub fn reset(axis: Axis, count: usize) -> Self {
        Self::new(axis, StructuralKind::Reset, PositionRange::new(0, count))
    }
}

/// A selection change: which cells were newly selected and deselected, in
/// the selection layer's position space.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionEvent {
    /// Cells that became selected.
    pub selected: Vec<CellPosition>,
    /// Cells that stopped being selected.
    pub deselected: Vec<CellPosition>,
}

impl SelectionEvent {
    /// Returns `true` if nothing actually changed.
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty() && self.deselected.is_empty()
    }
}

/// Collection of signals emitted by every layer.
///
/// Observers connect to the signals of the *topmost* layer they care about;
/// intermediate layers re-express and forward events from the layer they
/// wrap.
pub struct LayerSignals {
    /// Emitted after a structural change (reorder, hide/show, resize,
    /// insert/remove, reset), with the affected range in the emitting
    /// layer's own space.
    pub structural_changed: Signal<StructuralEvent>,

    /// Emitted when cell content changed without a structural change, with
    /// the affected region in the emitting layer's own space.
    pub visual_changed: Signal<CellRegion>,

    /// Emitted when the selection changed.
    pub selection_changed: Signal<SelectionEvent>,
}

impl Default for LayerSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerSignals {
    /// Creates a new set of layer signals.
    pub fn new() -> Self {
        Self {
            structural_changed: Signal::new(),
            visual_changed: Signal::new(),
            selection_changed: Signal::new(),
        }
    }

    /// Emits a structural change.
    pub fn emit_structural(&self, axis: Axis, kind: StructuralKind, range: PositionRange) {
        let event = StructuralEvent::new(axis, kind, range);
        tracing::trace!(target: targets::EVENT, ?event, "structural change");
        self.structural_changed.emit(event);
    }

    /// Emits a visual change for a region of cells.
    pub fn emit_visual(&self, region: CellRegion) {
        tracing::trace!(target: targets::EVENT, ?region, "visual change");
        self.visual_changed.emit(region);
    }

    /// Emits a selection change if it is non-empty.
    pub fn emit_selection(&self, event: SelectionEvent) {
        if event.is_empty() {
            return;
        }
        tracing::trace!(
            target: targets::EVENT,
            selected = event.selected.len(),
            deselected = event.deselected.len(),
            "selection change"
        );
        self.selection_changed.emit(event);
    }
}
