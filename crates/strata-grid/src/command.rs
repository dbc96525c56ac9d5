//! Commands and the per-layer handler registry.
//!
//! User or programmatic intent enters the stack as a [`GridCommand`] at the
//! topmost layer and flows *downward* until some layer claims it (classic
//! chain of responsibility). Position-bearing commands are interpreted in
//! the coordinate space of the layer they are handed to, and are
//! re-translated one hop each time they are forwarded; a command whose
//! coordinates do not survive a hop is dropped unhandled rather than
//! partially applied.
//!
//! Layers can also accept custom commands without subclassing by installing
//! handlers in their [`CommandRegistry`], keyed by [`CommandKind`].

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::coordinate::{Axis, CellPosition, CellRegion};
use crate::layer::composite::RegionName;
use crate::layer::selection::SelectionFlags;

/// An immutable command value identifying one operation and its target
/// coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum GridCommand {
    /// Move one position to another slot on the axis.
    Reorder {
        /// Axis to operate on.
        axis: Axis,
        /// Position to move.
        from: usize,
        /// Destination slot.
        to: usize,
    },

    /// Atomically move a batch of positions so they end up contiguous at
    /// the destination, preserving their relative order.
    ReorderBatch {
        /// Axis to operate on.
        axis: Axis,
        /// Positions to move.
        from: Vec<usize>,
        /// Destination slot.
        to: usize,
    },

    /// Hide the given positions on the axis.
    Hide {
        /// Axis to operate on.
        axis: Axis,
        /// Positions to hide.
        positions: Vec<usize>,
    },

    /// Show previously hidden entries again.
    ///
    /// Hidden entries have no position in the layers above the hide layer,
    /// so this command addresses them by *index* (stable data-source
    /// identity) and passes through coordinate translation unchanged.
    Show {
        /// Axis to operate on.
        axis: Axis,
        /// Indices to show.
        indexes: Vec<usize>,
    },

    /// Show every hidden entry on the axis.
    ShowAll {
        /// Axis to operate on.
        axis: Axis,
    },

    /// Set the pixel size of one position.
    Resize {
        /// Axis to operate on.
        axis: Axis,
        /// Position to resize.
        position: usize,
        /// New size in pixels.
        size: f32,
    },

    /// Scroll the viewport by a pixel delta.
    Scroll {
        /// Axis to scroll on.
        axis: Axis,
        /// Pixel delta; positive scrolls toward higher positions.
        delta: f32,
    },

    /// Scroll so the given position becomes visible.
    MoveToPosition {
        /// Axis to scroll on.
        axis: Axis,
        /// Position to bring into view.
        position: usize,
    },

    /// Recompute viewport caches (client-area resize).
    Recalculate,

    /// Apply a selection operation to one cell.
    SelectCell {
        /// Target cell.
        cell: CellPosition,
        /// How to combine with the existing selection.
        flags: SelectionFlags,
    },

    /// Apply a selection operation to a rectangular region.
    SelectRegion {
        /// Target region.
        region: CellRegion,
        /// How to combine with the existing selection.
        flags: SelectionFlags,
    },

    /// Select every cell.
    SelectAll,

    /// Clear the selection.
    ClearSelection,

    /// Freeze at the current selection anchor.
    Freeze,

    /// Clear the freeze boundary.
    Unfreeze,

    /// Route the inner command to one named composite region only.
    Targeted {
        /// Region to route to.
        region: RegionName,
        /// The command to deliver.
        inner: Box<GridCommand>,
    },

    /// An application-defined command, dispatched purely through registered
    /// handlers.
    Custom {
        /// Application-chosen command name.
        name: &'static str,
    },
}

impl GridCommand {
    /// Returns the tag used for registry lookup.
    pub fn kind(&self) -> CommandKind {
        match self {
            GridCommand::Reorder { .. } => CommandKind::Reorder,
            GridCommand::ReorderBatch { .. } => CommandKind::ReorderBatch,
            GridCommand::Hide { .. } => CommandKind::Hide,
            GridCommand::Show { .. } => CommandKind::Show,
            GridCommand::ShowAll { .. } => CommandKind::ShowAll,
            GridCommand::Resize { .. } => CommandKind::Resize,
            GridCommand::Scroll { .. } => CommandKind::Scroll,
            GridCommand::MoveToPosition { .. } => CommandKind::MoveToPosition,
            GridCommand::Recalculate => CommandKind::Recalculate,
            GridCommand::SelectCell { .. } => CommandKind::SelectCell,
            GridCommand::SelectRegion { .. } => CommandKind::SelectRegion,
            GridCommand::SelectAll => CommandKind::SelectAll,
            GridCommand::ClearSelection => CommandKind::ClearSelection,
            GridCommand::Freeze => CommandKind::Freeze,
            GridCommand::Unfreeze => CommandKind::Unfreeze,
            GridCommand::Targeted { .. } => CommandKind::Targeted,
            GridCommand::Custom { name } => CommandKind::Custom(name),
        }
    }

    /// Rewrites every position payload through `translate`, producing the
    /// command as seen one hop further down the stack.
    ///
    /// Returns `None` if any coordinate has no counterpart below (for
    /// example, a position that is hidden at the next hop); the command is
    /// then dropped by the forwarding layer. Index-based and coordinate-free
    /// commands pass through unchanged.
    pub fn map_positions<F>(&self, translate: F) -> Option<GridCommand>
    where
        F: Fn(Axis, usize) -> Option<usize>,
    {
        let translate_cell = |cell: &CellPosition| -> Option<CellPosition> {
            Some(CellPosition::new(
                translate(Axis::Horizontal, cell.column)?,
                translate(Axis::Vertical, cell.row)?,
            ))
        };

        match self {
            GridCommand::Reorder { axis, from, to } => Some(GridCommand::Reorder {
                axis: *axis,
                from: translate(*axis, *from)?,
                to: translate(*axis, *to)?,
            }),
            GridCommand::ReorderBatch { axis, from, to } => {
                let from = from
                    .iter()
                    .map(|&p| translate(*axis, p))
                    .collect::<Option<Vec<_>>>()?;
                Some(GridCommand::ReorderBatch {
                    axis: *axis,
                    from,
                    to: translate(*axis, *to)?,
                })
            }
            GridCommand::Hide { axis, positions } => {
                let positions = positions
                    .iter()
                    .map(|&p| translate(*axis, p))
                    .collect::<Option<Vec<_>>>()?;
                Some(GridCommand::Hide {
                    axis: *axis,
                    positions,
                })
            }
            GridCommand::Resize {
                axis,
                position,
                size,
            } => Some(GridCommand::Resize {
                axis: *axis,
                position: translate(*axis, *position)?,
                size: *size,
            }),
            GridCommand::MoveToPosition { axis, position } => Some(GridCommand::MoveToPosition {
                axis: *axis,
                position: translate(*axis, *position)?,
            }),
            GridCommand::SelectCell { cell, flags } => Some(GridCommand::SelectCell {
                cell: translate_cell(cell)?,
                flags: *flags,
            }),
            GridCommand::SelectRegion { region, flags } => {
                if region.is_empty() {
                    return None;
                }
                // Translate opposite corners and re-span; interior holes at
                // the next hop collapse into the surviving corner span.
                let top_left = translate_cell(&region.origin)?;
                let bottom_right = translate_cell(&CellPosition::new(
                    region.origin.column + region.columns - 1,
                    region.origin.row + region.rows - 1,
                ))?;
                Some(GridCommand::SelectRegion {
                    region: CellRegion::spanning(top_left, bottom_right),
                    flags: *flags,
                })
            }
            // Index-based and coordinate-free commands pass through.
            GridCommand::Show { .. }
            | GridCommand::ShowAll { .. }
            | GridCommand::Scroll { .. }
            | GridCommand::Recalculate
            | GridCommand::SelectAll
            | GridCommand::ClearSelection
            | GridCommand::Freeze
            | GridCommand::Unfreeze
            | GridCommand::Targeted { .. }
            | GridCommand::Custom { .. } => Some(self.clone()),
        }
    }
}

/// The tag identifying a command variant, used as the registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// [`GridCommand::Reorder`].
    Reorder,
    /// [`GridCommand::ReorderBatch`].
    ReorderBatch,
    /// [`GridCommand::Hide`].
    Hide,
    /// [`GridCommand::Show`].
    Show,
    /// [`GridCommand::ShowAll`].
    ShowAll,
    /// [`GridCommand::Resize`].
    Resize,
    /// [`GridCommand::Scroll`].
    Scroll,
    /// [`GridCommand::MoveToPosition`].
    MoveToPosition,
    /// [`GridCommand::Recalculate`].
    Recalculate,
    /// [`GridCommand::SelectCell`].
    SelectCell,
    /// [`GridCommand::SelectRegion`].
    SelectRegion,
    /// [`GridCommand::SelectAll`].
    SelectAll,
    /// [`GridCommand::ClearSelection`].
    ClearSelection,
    /// [`GridCommand::Freeze`].
    Freeze,
    /// [`GridCommand::Unfreeze`].
    Unfreeze,
    /// [`GridCommand::Targeted`].
    Targeted,
    /// [`GridCommand::Custom`], keyed by name.
    Custom(&'static str),
}

/// Handler function stored in a [`CommandRegistry`].
pub type CommandHandler = Box<dyn Fn(&GridCommand) -> bool + Send + Sync>;

/// Per-layer `(tag → handler)` registry, resolved once at setup.
///
/// Registered handlers are consulted before the layer's own built-in
/// handling, so applications can intercept built-in commands as well as
/// define [`GridCommand::Custom`] ones.
#[derive(Default)]
pub struct CommandRegistry {
    handlers: RwLock<HashMap<CommandKind, CommandHandler>>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for the given command kind, replacing any
    /// previous handler for that kind.
    pub fn register<F>(&self, kind: CommandKind, handler: F)
    where
        F: Fn(&GridCommand) -> bool + Send + Sync + 'static,
    {
        self.handlers.write().insert(kind, Box::new(handler));
    }

    /// Removes the handler for the given kind. Returns `true` if one was
    /// registered.
    pub fn unregister(&self, kind: CommandKind) -> bool {
        self.handlers.write().remove(&kind).is_some()
    }

    /// Dispatches the command to the registered handler, if any.
    ///
    /// Returns `true` if a handler claimed the command.
    pub fn dispatch(&self, command: &GridCommand) -> bool {
        let handlers = self.handlers.read();
        match handlers.get(&command.kind()) {
            Some(handler) => handler(command),
            None => false,
        }
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("handlers", &self.handlers.read().len())
            .finish()
    }
}
