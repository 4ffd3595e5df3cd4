//! Topology layer errors.

use thiserror::Error;

use weir_ledger::CapacityError;

/// Errors surfaced by the topology and path layer.
#[derive(Error, Debug)]
pub enum NetworkError {
    /// A switch name or id that the topology does not know.
    #[error("unknown switch: {0}")]
    UnknownSwitch(String),

    /// A host that is not attached to any switch in the topology.
    #[error("unknown host: {0}")]
    UnknownHost(String),

    /// No capacity-feasible path exists for the requested window/amount.
    #[error("no path with capacity from {origin} to {target}")]
    NoPath {
        /// Switch the search started from.
        origin: String,
        /// Host or switch id searched for.
        target: String,
    },

    /// An operation that needs at least one link was handed an empty path.
    #[error("path has no links")]
    EmptyPath,

    /// A link rejected a capacity request.
    #[error(transparent)]
    Capacity(#[from] CapacityError),

    /// The controller link list could not be parsed.
    #[error("bad topology data: {0}")]
    Topology(#[from] serde_json::Error),

    /// The topology file could not be read.
    #[error("cannot read topology: {0}")]
    Io(#[from] std::io::Error),
}
