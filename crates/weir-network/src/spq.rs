//! Switch/port/queue tuple.

use serde::Serialize;

/// The (switch, port, queue number) triple an external enforcer needs to
/// translate a reservation into switch configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Spq {
    /// Switch the queue lives on.
    pub switch: String,
    /// Port on the switch.
    pub port: i32,
    /// Queue number on the port.
    pub queue_num: i32,
}

impl Spq {
    /// Creates the tuple.
    pub fn new(switch: &str, port: i32, queue_num: i32) -> Self {
        Self {
            switch: switch.to_string(),
            port,
            queue_num,
        }
    }
}

impl std::fmt::Display for Spq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "spq: {} {} {}", self.switch, self.port, self.queue_num)
    }
}
