//! Named bandwidth sub-allocation within a time slice.

use serde::Serialize;

use crate::Capacity;

/// Default switch priority given to newly created queues.
pub const DEFAULT_QUEUE_PRIORITY: i32 = 200;

/// A named sub-allocation of a time slice's bandwidth, mapped to a switch
/// queue number for enforcement.
///
/// The id is caller supplied (usually a reservation id); the external
/// reference is an opaque switch/port descriptor the enforcement layer
/// needs to physically set the queue.
#[derive(Debug, Clone, Serialize)]
pub struct Queue {
    #[serde(rename = "num")]
    qnum: i32,
    #[serde(rename = "pri")]
    priority: i32,
    #[serde(rename = "bandw")]
    bandwidth: Capacity,
    id: String,
    #[serde(rename = "eref")]
    exref: String,
}

impl Queue {
    /// Creates a queue with the given bandwidth, number and external
    /// reference, at the default priority.
    pub fn new(bandwidth: Capacity, id: &str, qnum: i32, exref: &str) -> Self {
        Self {
            bandwidth,
            id: id.to_string(),
            qnum,
            priority: DEFAULT_QUEUE_PRIORITY,
            exref: exref.to_string(),
        }
    }

    /// Queue id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Queue number placed on flow-mods sent to the switch.
    pub fn qnum(&self) -> i32 {
        self.qnum
    }

    /// Bandwidth currently assigned to the queue.
    pub fn bandwidth(&self) -> Capacity {
        self.bandwidth
    }

    /// Switch/port descriptor the enforcement layer needs.
    pub fn exref(&self) -> &str {
        &self.exref
    }

    /// Adjusts the switch priority. Values should be between 1 and 1024,
    /// larger values being lower in priority.
    pub fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    /// Increases the amount assigned to the queue (negative decreases).
    pub fn inc(&mut self, amt: Capacity) {
        self.bandwidth += amt;
    }

    /// Decreases the amount assigned to the queue.
    pub fn dec(&mut self, amt: Capacity) {
        self.bandwidth -= amt;
    }

    /// Renders the queue as a line for a queue-setting command:
    /// `<exref>,<id>,<qnum>,<bw-min>,<bw-max>,<priority>`.
    ///
    /// Min and max bandwidth are currently the same value.
    pub fn to_cmd_str(&self) -> String {
        format!(
            "{},{},{},{},{},{}",
            self.exref, self.id, self.qnum, self.bandwidth, self.bandwidth, self.priority
        )
    }
}
