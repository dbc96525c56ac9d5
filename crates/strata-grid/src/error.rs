//! Error types for the grid pipeline.
//!
//! Only setup-time problems surface as errors: an illegal composite
//! arrangement, a freeze boundary outside the underlying space, or
//! undecodable persisted state. Steady-state coordinate misses are `None`
//! sentinels and invalid commands fall through the chain unhandled, so a
//! malfunctioning handler can never corrupt the stack's traversal.

use thiserror::Error;

/// Errors raised at grid setup or state-restore time.
#[derive(Error, Debug)]
pub enum GridError {
    /// A composite layer was built with no regions.
    #[error("composite arrangement has no regions")]
    EmptyArrangement,

    /// A composite arrangement's rows do not all have the same number of
    /// region slots.
    #[error("composite arrangement is ragged: row {row} has {found} regions, expected {expected}")]
    RaggedArrangement {
        /// Row slot with the wrong region count.
        row: usize,
        /// Regions found in that row.
        found: usize,
        /// Regions expected per row.
        expected: usize,
    },

    /// Two composite regions share the same name.
    #[error("duplicate composite region name {name:?}")]
    DuplicateRegion {
        /// The offending region name.
        name: &'static str,
    },

    /// A freeze boundary was requested past the underlying layer's extent.
    #[error("frozen {axis} count {count} exceeds underlying count {available}")]
    FrozenCountOutOfBounds {
        /// Axis name ("column" or "row").
        axis: &'static str,
        /// Requested frozen count.
        count: usize,
        /// Positions available below.
        available: usize,
    },

    /// A persisted state entry could not be decoded.
    #[error("failed to decode persisted state under {key:?}: {reason}")]
    StateDecode {
        /// The property key that failed to decode.
        key: String,
        /// Why decoding failed.
        reason: String,
    },

    /// Persisted state could not be (de)serialized as JSON.
    #[error("persisted state JSON error: {0}")]
    StateJson(#[from] serde_json::Error),
}

/// Result type for grid setup and persistence operations.
pub type GridResult<T> = Result<T, GridError>;
