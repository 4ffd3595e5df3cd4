#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod manager;
pub mod pledge;

pub use config::{ControllerConfig, UserConfig};
pub use error::ReservationError;
pub use manager::ReservationManager;
pub use pledge::{Pledge, PledgeKind};
