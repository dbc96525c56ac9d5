//! Strata Grid - a composable, virtualized grid pipeline.
//!
//! A grid is assembled as a stack of [`Layer`](layer::Layer)s over a
//! [`GridData`](data::GridData) source. Each layer transforms the position
//! space of the layer it wraps: [`ReorderLayer`](layer::ReorderLayer)
//! permutes, [`HideShowLayer`](layer::HideShowLayer) excludes,
//! [`FreezeLayer`](layer::FreezeLayer) splits into panes,
//! [`ViewportLayer`](layer::ViewportLayer) windows to the scrolled-into-view
//! part, [`SelectionLayer`](layer::SelectionLayer) tracks selection, and
//! [`CompositeLayer`](layer::CompositeLayer) arranges independent stacks
//! (headers, body) into one grid. Commands flow down the stack, change
//! events flow up, and both are re-expressed in each layer's own coordinate
//! space along the way.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use strata_grid::prelude::*;
//!
//! let mut grid = VecGrid::new(3);
//! grid.push_row(vec!["a".into(), "b".into(), "c".into()]);
//!
//! let data = DataLayer::new(Arc::new(grid));
//! let reorder = ReorderLayer::new(data);
//! let hide = HideShowLayer::new(reorder.clone());
//!
//! reorder.reorder(Axis::Horizontal, 0, 2);
//! hide.hide(Axis::Horizontal, &[0]);
//!
//! assert_eq!(hide.column_count(), 2);
//! assert_eq!(hide.cell_value(0, 0).as_text(), Some("c"));
//! ```

pub mod command;
pub mod coordinate;
pub mod data;
mod error;
pub mod event;
pub mod layer;
pub mod persistence;
pub mod prelude;

pub use error::{GridError, GridResult};
