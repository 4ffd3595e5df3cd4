#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

pub mod clock;
pub mod error;
pub mod fence;
pub mod obligation;
pub mod queue;
pub mod time_slice;
pub mod window;

#[cfg(test)]
mod tests;

pub use error::{CapacityError, WindowError};
pub use fence::Fence;
pub use obligation::{valid_obligation_time, Obligation, MAX_QUEUE_NUMBER, OBLIGATION_HORIZON, PRIORITY_QUEUE};
pub use queue::Queue;
pub use time_slice::TimeSlice;
pub use window::{Window, WindowState};

/// UNIX timestamp in seconds.
pub type Timestamp = i64;

/// Bandwidth amount in bits per second.
pub type Capacity = i64;
