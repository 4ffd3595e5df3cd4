//! Min/max capacity fence.

use log::warn;
use serde::Serialize;

use crate::Capacity;

/// Keeps a running value within min/max limits.
///
/// Used both as a standalone per-link/per-user cap and, scoped inside a
/// [`TimeSlice`](crate::TimeSlice), to track a user's cumulative
/// allocation within that interval. Limits of 100 or less are treated as
/// percentages when the fence is cloned against a concrete capacity (see
/// [`Fence::clone_with_capacity`]).
#[derive(Debug, Clone, Serialize)]
pub struct Fence {
    name: String,
    #[serde(rename = "max")]
    max_cap: Capacity,
    #[serde(rename = "min")]
    min_cap: Capacity,
    value: Capacity,
}

impl Fence {
    /// Creates a fence with the given limits and initial value.
    pub fn new(name: &str, max_cap: Capacity, min_cap: Capacity, value: Capacity) -> Self {
        Self {
            name: name.to_string(),
            max_cap,
            min_cap,
            value,
        }
    }

    /// Name (usually a user) this fence belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value held by the fence.
    pub fn value(&self) -> Capacity {
        self.value
    }

    /// Maximum limit.
    pub fn limit_max(&self) -> Capacity {
        self.max_cap
    }

    /// Minimum limit.
    pub fn limit_min(&self) -> Capacity {
        self.min_cap
    }

    /// Returns true if `amt` (possibly negative) can be added to the
    /// current value without crossing either limit.
    pub fn has_capacity(&self, amt: Capacity) -> bool {
        self.value + amt <= self.max_cap && self.value + amt >= self.min_cap
    }

    /// Blindly adds `amt` to the current value, clipping at the limits.
    /// Clipping at the max is logged since a checked caller should never
    /// reach it.
    pub fn inc_used(&mut self, amt: Capacity) {
        self.value += amt;
        if self.value > self.max_cap {
            warn!(
                "clipping fence {}: max={} value={} inc={}",
                self.name, self.max_cap, self.value, amt
            );
            self.value = self.max_cap;
        } else if self.value < self.min_cap {
            self.value = self.min_cap;
        }
    }

    /// Adds `amt` only if it fits inside the limits; returns whether the
    /// value was changed.
    pub fn inc_if_room(&mut self, amt: Capacity) -> bool {
        if self.has_capacity(amt) {
            self.value += amt;
            return true;
        }
        false
    }

    /// For a requested additional amount, returns the limit that applies
    /// (max for increases, min for decreases) and the value that would be
    /// needed (current value plus the amount).
    pub fn have_need(&self, amt: Capacity) -> (Capacity, Capacity) {
        if amt < 0 {
            (self.min_cap, self.value + amt)
        } else {
            (self.max_cap, self.value + amt)
        }
    }

    /// Clones the fence, rescaling limits of 100 or less as percentages of
    /// `capacity`. A capacity of 0 skips the rescale.
    pub fn clone_with_capacity(&self, capacity: Capacity) -> Self {
        let mut nf = self.clone();
        if capacity > 0 {
            if nf.max_cap <= 100 {
                nf.max_cap = capacity / 100 * nf.max_cap;
            }
            if nf.min_cap <= 100 {
                nf.min_cap = capacity / 100 * nf.min_cap;
            }
        }
        nf
    }

    /// Clones the fence under a different name.
    pub fn clone_as(&self, name: &str) -> Self {
        Self::new(name, self.max_cap, self.min_cap, self.value)
    }
}
