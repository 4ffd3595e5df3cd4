//! Wall clock access.
//!
//! Every ledger method that depends on "now" takes it as an explicit
//! parameter at the lowest level so tests stay deterministic; the public
//! wrappers read the wall clock through [`unix_now`].

use std::time::{SystemTime, UNIX_EPOCH};

use crate::Timestamp;

/// Returns the current UNIX timestamp in seconds.
pub fn unix_now() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as Timestamp)
        .unwrap_or(0)
}
