//! Logging facilities for Strata.
//!
//! Strata uses the `tracing` crate for instrumentation. To see logs, install
//! a tracing subscriber in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt::init();
//!
//!     // Your application code...
//! }
//! ```
//!
//! Layers log at `debug` level when a command is claimed or dropped and at
//! `trace` level for event re-emission; filter with the [`targets`]
//! constants, e.g. `RUST_LOG=strata_grid::command=debug`.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "strata_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "strata_core::signal";
    /// Command dispatch target.
    pub const COMMAND: &str = "strata_grid::command";
    /// Event propagation target.
    pub const EVENT: &str = "strata_grid::event";
    /// Viewport scrolling and recalculation target.
    pub const VIEWPORT: &str = "strata_grid::viewport";
    /// Selection tracking target.
    pub const SELECTION: &str = "strata_grid::selection";
    /// Composite region routing target.
    pub const COMPOSITE: &str = "strata_grid::composite";
    /// Persisted-state save/restore target.
    pub const PERSISTENCE: &str = "strata_grid::persistence";
}
