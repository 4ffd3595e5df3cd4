//! Reservation layer errors.

use thiserror::Error;

use weir_ledger::WindowError;
use weir_network::NetworkError;

/// Errors surfaced by the reservation manager.
#[derive(Error, Debug)]
pub enum ReservationError {
    /// A pledge with this id already exists.
    #[error("reservation id already in use: {0}")]
    Duplicate(String),

    /// No pledge with this id is known.
    #[error("unknown reservation: {0}")]
    Unknown(String),

    /// The requested window is invalid.
    #[error(transparent)]
    Window(#[from] WindowError),

    /// The topology could not satisfy the request.
    #[error(transparent)]
    Network(#[from] NetworkError),
}
