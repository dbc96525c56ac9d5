//! Prelude module for Strata Grid.
//!
//! Re-exports the types needed to assemble and drive a typical grid:
//!
//! ```ignore
//! use strata_grid::prelude::*;
//! ```

// ============================================================================
// Coordinates and data
// ============================================================================

pub use crate::coordinate::{Axis, CellPosition, CellRegion, PositionRange, Size};
pub use crate::data::{CellValue, GridData, Sizing, VecGrid};

// ============================================================================
// The layer stack
// ============================================================================

pub use crate::layer::{
    CompositeLayer, DataLayer, FixedClientArea, FreezeLayer, HideShowLayer, Layer, PaneLayer,
    Region, RegionName, ReorderLayer, SelectionLayer, ViewportLayer,
};
pub use crate::layer::selection::SelectionFlags;
pub use crate::layer::viewport::ClientAreaProvider;

// ============================================================================
// Commands, events, persistence
// ============================================================================

pub use crate::command::{CommandKind, CommandRegistry, GridCommand};
pub use crate::event::{SelectionEvent, StructuralEvent, StructuralKind};
pub use crate::persistence::{Persistable, Properties};

pub use crate::{GridError, GridResult};
