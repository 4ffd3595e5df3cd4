//! One contiguous interval of an obligation's ledger.

use indexmap::IndexMap;
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

use crate::fence::Fence;
use crate::queue::Queue;
use crate::{Capacity, Timestamp};

/// A window of time `[commence, conclude]` (inclusive on both ends) for
/// which a single committed amount is known.
///
/// The amount is further subdivided into named [`Queue`]s, each pledged to
/// a particular consumer's traffic, and per-user [`Fence`]s tracking
/// cumulative user allocation inside the interval. Queues and fences are
/// never shared between slices; they are deep-copied when a slice splits
/// so that a reservation's queue number survives across every slice its
/// window touches.
///
/// Slices are owned and ordered by an [`Obligation`](crate::Obligation),
/// which keeps them contiguous, non-overlapping and sorted.
#[derive(Debug, Clone, Serialize)]
pub struct TimeSlice {
    commence: Timestamp,
    conclude: Timestamp,
    #[serde(rename = "amt")]
    amount: Capacity,
    #[serde(serialize_with = "map_values")]
    queues: IndexMap<String, Queue>,
    #[serde(serialize_with = "map_values")]
    fences: IndexMap<String, Fence>,
}

fn map_values<S: Serializer, T: Serialize>(map: &IndexMap<String, T>, ser: S) -> Result<S::Ok, S::Error> {
    let mut seq = ser.serialize_seq(Some(map.len()))?;
    for v in map.values() {
        seq.serialize_element(v)?;
    }
    seq.end()
}

impl TimeSlice {
    /// Creates a slice spanning `[commence, conclude]` with the given
    /// committed amount and no queues or fences.
    pub fn new(commence: Timestamp, conclude: Timestamp, amount: Capacity) -> Self {
        Self {
            commence,
            conclude,
            amount,
            queues: IndexMap::new(),
            fences: IndexMap::new(),
        }
    }

    /// Start of the interval.
    pub fn commence(&self) -> Timestamp {
        self.commence
    }

    /// Inclusive end of the interval.
    pub fn conclude(&self) -> Timestamp {
        self.conclude
    }

    /// Amount committed for this interval.
    pub fn amount(&self) -> Capacity {
        self.amount
    }

    /// Returns true if `t` falls inside the interval (both ends included).
    pub fn includes(&self, t: Timestamp) -> bool {
        self.commence <= t && self.conclude >= t
    }

    /// Returns true if the slice lies completely before `t`.
    pub fn is_before(&self, t: Timestamp) -> bool {
        self.conclude < t
    }

    /// Returns true if the slice lies completely after `t`.
    pub fn is_after(&self, t: Timestamp) -> bool {
        self.commence > t
    }

    /// Returns true if the window `[start, end]` overlaps this slice.
    pub fn overlaps(&self, start: Timestamp, end: Timestamp) -> bool {
        // containment must be tested too: a window that strictly spans the
        // slice includes neither endpoint
        self.includes(start) || self.includes(end) || (start <= self.commence && end >= self.conclude)
    }

    /// Splits the slice at `at`, shrinking it to `[commence, at-1]` and
    /// returning the new successor slice `[at, conclude]` for the owner to
    /// insert after this one. Queues and fences are deep-copied into the
    /// successor.
    ///
    /// Splitting exactly at `commence` or `conclude` is a no-op and
    /// returns `None`; so does a split point outside the slice.
    pub fn split(&mut self, at: Timestamp) -> Option<TimeSlice> {
        if at < self.commence || at > self.conclude {
            return None;
        }
        if at == self.commence || at == self.conclude {
            return None;
        }

        let tail = TimeSlice {
            commence: at,
            conclude: self.conclude,
            amount: self.amount,
            queues: self.queues.clone(),
            fences: self.fences.clone(),
        };
        self.conclude = at - 1;
        Some(tail)
    }

    /// Pushes the concluding time forward to `t`. The owning obligation
    /// only calls this on the tail slice; a timestamp at or before the
    /// commence time is ignored.
    pub(crate) fn extend(&mut self, t: Timestamp) {
        if t > self.commence {
            self.conclude = t;
        }
    }

    /// Adds `delta` to the committed amount, never letting it go negative.
    pub(crate) fn bump(&mut self, delta: Capacity) {
        self.amount += delta;
        if self.amount < 0 {
            self.amount = 0;
        }
    }

    /// Adds `amt` to the named queue, creating it with number `qnum` if it
    /// does not exist. A `qnum` of 0 is the sentinel for "increment an
    /// existing queue only, never create"; creation also requires a
    /// positive amount.
    pub fn add_queue(&mut self, qnum: i32, id: &str, exref: &str, amt: Capacity) {
        if let Some(q) = self.queues.get_mut(id) {
            q.inc(amt);
        } else if qnum > 0 && amt > 0 {
            self.queues.insert(id.to_string(), Queue::new(amt, id, qnum, exref));
        }
    }

    /// Returns the positive queue numbers currently assigned in the slice.
    pub fn queue_nums(&self) -> Vec<i32> {
        self.queues.values().map(Queue::qnum).filter(|n| *n > 0).collect()
    }

    /// Returns the queue number and switch descriptor for the queue with
    /// the given id, if one exists in the slice.
    pub fn queue_info(&self, id: &str) -> Option<(i32, &str)> {
        self.queues.get(id).map(|q| (q.qnum(), q.exref()))
    }

    /// Adjusts the user's fence by `amt`, creating the fence from the
    /// supplied template if this is the first time the user touched this
    /// slice. Template limits of 100 or less are scaled as percentages of
    /// `max_capacity`.
    pub fn inc_user(&mut self, template: &Fence, amt: Capacity, max_capacity: Capacity) {
        let fence = self
            .fences
            .entry(template.name().to_string())
            .or_insert_with(|| template.clone_with_capacity(max_capacity));
        fence.inc_used(amt);
    }

    /// Checks whether the user can take `amt` more inside this slice.
    /// Users without a fence here have no usage yet and always pass.
    pub fn has_user_capacity(&self, user: &str, amt: Capacity) -> Result<(), crate::CapacityError> {
        if let Some(fence) = self.fences.get(user) {
            if !fence.has_capacity(amt) {
                let (have, need) = fence.have_need(amt);
                return Err(crate::CapacityError::OverUserLimit {
                    user: user.to_string(),
                    need,
                    have,
                });
            }
        }
        Ok(())
    }

    /// User fence for `user`, if the user has touched this slice.
    pub fn user_fence(&self, user: &str) -> Option<&Fence> {
        self.fences.get(user)
    }

    /// Renders every queue in the slice as queue-setting command lines,
    /// space separated.
    pub fn queues_str(&self) -> String {
        self.queues
            .values()
            .map(Queue::to_cmd_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}
