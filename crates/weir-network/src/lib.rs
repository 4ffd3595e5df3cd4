#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

pub mod error;
pub mod gate;
pub mod host;
pub mod link;
pub mod mlag;
pub mod network;
pub mod path;
pub mod search;
pub mod spq;
pub mod switch;
pub mod topology;

pub use error::NetworkError;
pub use gate::{Gate, GATE_PORT};
pub use host::Host;
pub use link::{Link, UNBOUND_PORT};
pub use mlag::Mlag;
pub use network::{LinkId, Network, SwitchId};
pub use path::Path;
pub use search::SearchResult;
pub use spq::Spq;
pub use switch::Switch;
pub use topology::{LinkEntry, TopologyDefaults};
