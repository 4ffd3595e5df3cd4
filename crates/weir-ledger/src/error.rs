//! Ledger error types.
//!
//! Admission rejection is ordinary control flow for a reservation
//! controller, so the variants carry the numbers operators grep for in
//! logs: an over-capacity rejection reads differently from a per-user cap
//! rejection.

use thiserror::Error;

use crate::{Capacity, Timestamp};

/// Reasons a capacity request is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapacityError {
    /// The link's obligation cannot absorb the request in some overlapping
    /// time slice.
    #[error("link lacks capacity: need {need} have {have}")]
    OverCapacity {
        /// Amount that would be committed if the request were accepted.
        need: Capacity,
        /// Maximum capacity of the obligation.
        have: Capacity,
    },

    /// The request would push a user past their per-link allowance.
    #[error("user {user} over link cap: need {need} have {have}")]
    OverUserLimit {
        /// User whose fence rejected the request.
        user: String,
        /// Allocation the user would hold if the request were accepted.
        need: Capacity,
        /// Maximum the user's fence allows.
        have: Capacity,
    },

    /// Every assignable queue number in the window is taken.
    #[error("no queue number available for queue {qid}")]
    QueueNumbersExhausted {
        /// Queue id the caller tried to install.
        qid: String,
    },
}

/// Reasons a reservation window is invalid.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    /// The expiry time is not after the (possibly clamped) commence time.
    #[error("bad expiry submitted, already expired: now={now} expiry={expiry}")]
    Expired {
        /// Current time when the window was vetted.
        now: Timestamp,
        /// Submitted expiry time.
        expiry: Timestamp,
    },

    /// The expiry time lies past the obligation horizon.
    #[error("bad expiry submitted, too far in the future: expiry={expiry}")]
    BeyondHorizon {
        /// Submitted expiry time.
        expiry: Timestamp,
    },
}
