//! The layer contract and the concrete transform layers.
//!
//! A grid is a stack of layers. The leaf [`DataLayer`] wraps the tabular
//! data source and defines index space (position == index). Each transform
//! layer above it exclusively owns its single underlying layer and rewrites
//! the position↔position mapping relative to it: [`ReorderLayer`] permutes,
//! [`HideShowLayer`] excludes, [`FreezeLayer`]/[`PaneLayer`] split,
//! [`ViewportLayer`] windows, [`SelectionLayer`] tracks selection, and
//! [`CompositeLayer`] arranges several independent stacks into one grid.
//!
//! Layers only ever talk to their immediate neighbor: single-hop
//! translation keeps each layer's logic local, and index resolution is
//! obtained by walking the chain hop-by-hop. That is what allows arbitrary
//! restacking of the transforms.

pub mod composite;
pub mod data_layer;
pub mod freeze;
pub mod hide;
pub mod reorder;
pub mod selection;
pub mod viewport;

pub use composite::{CompositeLayer, Region, RegionName};
pub use data_layer::DataLayer;
pub use freeze::{FreezeLayer, PaneLayer};
pub use hide::HideShowLayer;
pub use reorder::{GroupConstraint, ReorderLayer};
pub use selection::{SelectionLayer, SelectionModel};
pub use viewport::{ClientAreaProvider, FixedClientArea, ViewportLayer};

use strata_core::logging::targets;

use crate::command::{CommandRegistry, GridCommand};
use crate::coordinate::Axis;
use crate::data::{CellValue, Sizing};
use crate::event::LayerSignals;

/// A node in the transformation pipeline.
///
/// Every layer exposes row/column counts in its own position space,
/// single-hop translation to and from the layer it directly wraps, command
/// dispatch, and listener registration. Transitive index resolution and
/// chain-of-responsibility forwarding are provided methods built on the
/// single-hop primitives.
///
/// Layers are constructed bottom-up at grid-setup time and are immutable in
/// identity thereafter; their structural state (reorder map, hidden set,
/// viewport origin, selection set) mutates in place in response to
/// commands. All methods take `&self`: mutable state lives behind
/// `parking_lot` locks so a whole stack can be shared as `Arc<dyn Layer>`.
/// The stack is still single-threaded by contract; commands and queries
/// must come from the one thread that owns the grid.
pub trait Layer: Send + Sync {
    /// Number of column positions in this layer's space.
    fn column_count(&self) -> usize;

    /// Number of row positions in this layer's space.
    fn row_count(&self) -> usize;

    /// Count along the given axis.
    fn count(&self, axis: Axis) -> usize {
        match axis {
            Axis::Horizontal => self.column_count(),
            Axis::Vertical => self.row_count(),
        }
    }

    /// Translates one of this layer's positions into the directly
    /// underlying layer's space.
    ///
    /// Returns `None` if the position is out of bounds. The leaf layer
    /// returns the position unchanged (position == index there).
    fn underlying_position(&self, axis: Axis, position: usize) -> Option<usize>;

    /// Translates an underlying-layer position into this layer's space.
    ///
    /// Returns `None` if the underlying position has no counterpart here
    /// (for example, it is hidden or outside this pane).
    fn position_of_underlying(&self, axis: Axis, underlying: usize) -> Option<usize>;

    /// The layer this layer directly wraps, or `None` for the leaf.
    fn underlying(&self) -> Option<&dyn Layer>;

    /// This layer's signals. Wrapping layers re-express and re-emit events
    /// from the layer below on their own signals.
    fn signals(&self) -> &LayerSignals;

    /// The custom-command registry, if this layer carries one.
    fn registry(&self) -> Option<&CommandRegistry> {
        None
    }

    /// Resolves a position in this layer's space all the way down to index
    /// space.
    fn position_to_index(&self, axis: Axis, position: usize) -> Option<usize> {
        let below = self.underlying_position(axis, position)?;
        match self.underlying() {
            Some(layer) => layer.position_to_index(axis, below),
            None => Some(below),
        }
    }

    /// Resolves an index back up to a position in this layer's space.
    ///
    /// Returns `None` if the index is not visible at this layer.
    fn index_to_position(&self, axis: Axis, index: usize) -> Option<usize> {
        match self.underlying() {
            Some(layer) => {
                let below = layer.index_to_position(axis, index)?;
                self.position_of_underlying(axis, below)
            }
            None => self.position_of_underlying(axis, index),
        }
    }

    /// Pixel size of the given position on the axis.
    ///
    /// Transform layers delegate through the hop; the leaf layer owns the
    /// actual size tables. Unknown positions report `0.0`.
    fn position_size(&self, axis: Axis, position: usize) -> f32 {
        match (self.underlying_position(axis, position), self.underlying()) {
            (Some(below), Some(layer)) => layer.position_size(axis, below),
            _ => 0.0,
        }
    }

    /// Sizing mode of the given position on the axis (fixed pixels vs.
    /// percentage of the client area).
    fn position_sizing(&self, axis: Axis, position: usize) -> Sizing {
        match (self.underlying_position(axis, position), self.underlying()) {
            (Some(below), Some(layer)) => layer.position_sizing(axis, below),
            _ => Sizing::Default,
        }
    }

    /// The value of the cell at the given column/row positions, resolved
    /// through the chain to the data source.
    fn cell_value(&self, column: usize, row: usize) -> CellValue {
        match self.underlying() {
            Some(layer) => {
                let below_column = self.underlying_position(Axis::Horizontal, column);
                let below_row = self.underlying_position(Axis::Vertical, row);
                match (below_column, below_row) {
                    (Some(c), Some(r)) => layer.cell_value(c, r),
                    _ => CellValue::None,
                }
            }
            None => CellValue::None,
        }
    }

    /// This layer's own command handling. Return `true` to claim the
    /// command. The default claims nothing.
    fn handle_command(&self, _command: &GridCommand) -> bool {
        false
    }

    /// Translates a command's coordinates one hop down, producing the
    /// command as the underlying layer should see it.
    ///
    /// Returns `None` if the coordinates do not survive the hop; the
    /// command is then dropped rather than partially applied.
    fn convert_command(&self, command: &GridCommand) -> Option<GridCommand> {
        command.map_positions(|axis, position| self.underlying_position(axis, position))
    }

    /// Attempts to handle a command, forwarding it down the chain if this
    /// layer does not claim it.
    ///
    /// Resolution order: the custom-handler registry, then
    /// [`handle_command`](Self::handle_command), then translate-and-forward
    /// to the underlying layer. Returns `true` if any layer claimed the
    /// command.
    fn do_command(&self, command: &GridCommand) -> bool {
        if let Some(registry) = self.registry() {
            if registry.dispatch(command) {
                tracing::debug!(target: targets::COMMAND, kind = ?command.kind(), "command claimed by registry");
                return true;
            }
        }

        if self.handle_command(command) {
            tracing::debug!(target: targets::COMMAND, kind = ?command.kind(), "command claimed");
            return true;
        }

        match self.underlying() {
            Some(layer) => match self.convert_command(command) {
                Some(converted) => layer.do_command(&converted),
                None => {
                    tracing::debug!(
                        target: targets::COMMAND,
                        kind = ?command.kind(),
                        "command dropped: coordinates did not survive translation"
                    );
                    false
                }
            },
            None => false,
        }
    }
}

static_assertions::assert_obj_safe!(Layer);
