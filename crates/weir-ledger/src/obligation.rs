//! Time-sliced capacity obligation.

use log::debug;
use serde::Serialize;

use crate::clock;
use crate::fence::Fence;
use crate::time_slice::TimeSlice;
use crate::{Capacity, CapacityError, Timestamp};

/// Last timestamp an obligation covers: 2040-01-01 00:00:00 UTC.
pub const OBLIGATION_HORIZON: Timestamp = 2_208_988_800;

/// Highest queue number that may be assigned to a named queue.
pub const MAX_QUEUE_NUMBER: i32 = 4094;

/// Queue number reserved for priority traffic.
pub const PRIORITY_QUEUE: i32 = 1;

/// What [`Obligation::apply`] should do to queues while walking slices.
enum QueueAction<'a> {
    /// Adjust the committed amount only.
    None,
    /// Bump an existing queue's amount; slices without the queue are left
    /// alone.
    Existing { qid: &'a str },
    /// Create the queue where missing, bump it where present.
    Create { qnum: i32, qid: &'a str, exref: &'a str },
}

/// Tracks the committed capacity of a resource over time.
///
/// The obligation spans from the epoch to [`OBLIGATION_HORIZON`], carved
/// into contiguous [`TimeSlice`]s. Slices are split lazily as reservation
/// windows land on them and are never merged back; expired slices are
/// pruned from the head of the list.
///
/// Checking capacity ([`Obligation::has_capacity`]) and committing it
/// ([`Obligation::inc_utilisation`], [`Obligation::add_queue`]) are
/// separate steps. The commit functions trust that the caller vetted the
/// request and never fail; callers that need the pair to be atomic must
/// hold the obligation mutably across both.
#[derive(Debug, Clone, Serialize)]
pub struct Obligation {
    max_capacity: Capacity,
    #[serde(rename = "alarm")]
    alarm_threshold: Capacity,
    #[serde(rename = "timeslices")]
    slices: Vec<TimeSlice>,
}

impl Obligation {
    /// Creates an obligation with the given maximum per-slice capacity and
    /// no alarm threshold.
    pub fn new(max_capacity: Capacity) -> Self {
        Self::with_alarm(max_capacity, 0)
    }

    /// Creates an obligation that raises an alarm message when a slice's
    /// committed amount reaches `alarm_percent` of the maximum capacity.
    /// Percentages outside (0, 100) disable the alarm.
    pub fn with_alarm(max_capacity: Capacity, alarm_percent: i32) -> Self {
        let alarm_threshold = if alarm_percent > 0 && alarm_percent < 100 {
            (max_capacity * alarm_percent as Capacity) / 100
        } else {
            max_capacity
        };
        Self {
            max_capacity,
            alarm_threshold,
            slices: vec![TimeSlice::new(0, OBLIGATION_HORIZON, 0)],
        }
    }

    /// Total capacity any one slice may have committed.
    pub fn max_capacity(&self) -> Capacity {
        self.max_capacity
    }

    /// Replaces the maximum capacity. Existing commitments are not
    /// revisited; slices over the new maximum simply leave no headroom.
    pub fn set_max_capacity(&mut self, new_cap: Capacity) {
        self.max_capacity = new_cap;
    }

    /// Moves the maximum capacity by `delta`, never below zero.
    pub fn adjust_max_capacity(&mut self, delta: Capacity) {
        self.max_capacity += delta;
        if self.max_capacity < 0 {
            self.max_capacity = 0;
        }
    }

    /// The ordered time slices, for inspection.
    pub fn slices(&self) -> &[TimeSlice] {
        &self.slices
    }

    /// Checks whether `amt` more can be committed across every slice
    /// overlapping `[commence, conclude]`. When a user name is given their
    /// per-slice fence is checked as well.
    ///
    /// Expired head slices are pruned as a side effect.
    pub fn has_capacity(
        &mut self,
        commence: Timestamp,
        conclude: Timestamp,
        amt: Capacity,
        user: Option<&str>,
    ) -> Result<(), CapacityError> {
        if self.slices.first().map_or(false, |s| s.is_before(clock::unix_now())) {
            self.prune(clock::unix_now());
        }

        for ts in &self.slices {
            if ts.is_after(conclude) {
                break;
            }
            if ts.overlaps(commence, conclude) {
                if ts.amount() + amt > self.max_capacity {
                    return Err(CapacityError::OverCapacity {
                        need: ts.amount() + amt,
                        have: self.max_capacity,
                    });
                }
                if let Some(user) = user {
                    ts.has_user_capacity(user, amt)?;
                }
            }
        }

        Ok(())
    }

    /// Commits `amt` more across `[commence, conclude]`, splitting slices
    /// at the window edges as needed. Capacity is assumed to have been
    /// vetted already. The user fence, when given, supplies the name and
    /// default limits applied the first time that user touches a slice.
    ///
    /// Returns an alarm message when any touched slice crosses the alarm
    /// threshold; the caller is expected to attach resource identity and
    /// log it.
    pub fn inc_utilisation(
        &mut self,
        commence: Timestamp,
        conclude: Timestamp,
        amt: Capacity,
        usr: Option<&Fence>,
    ) -> Option<String> {
        self.apply(commence, conclude, amt, QueueAction::None, usr)
    }

    /// Releases `amt` across `[commence, conclude]`. Slice amounts never
    /// go below zero.
    pub fn dec_utilisation(
        &mut self,
        commence: Timestamp,
        conclude: Timestamp,
        amt: Capacity,
        usr: Option<&Fence>,
    ) -> Option<String> {
        self.apply(commence, conclude, -amt, QueueAction::None, usr)
    }

    /// Adds a queue carrying `amt` across `[commence, conclude]` and
    /// commits the amount, returning the queue number assigned.
    ///
    /// Ids beginning with `priority` map to the reserved queue 1; any
    /// other id is assigned the lowest number not in use by a slice the
    /// window overlaps. Capacity is not checked here.
    pub fn add_queue(
        &mut self,
        qid: &str,
        exref: &str,
        amt: Capacity,
        commence: Timestamp,
        conclude: Timestamp,
        usr: Option<&Fence>,
    ) -> Result<(i32, Option<String>), CapacityError> {
        let qnum = if qid.starts_with("priority") {
            PRIORITY_QUEUE
        } else {
            self.open_queue_number(commence, conclude)
                .ok_or_else(|| CapacityError::QueueNumbersExhausted { qid: qid.to_string() })?
        };

        let msg = self.apply(commence, conclude, amt, QueueAction::Create { qnum, qid, exref }, usr);
        Ok((qnum, msg))
    }

    /// Increases the amount assigned to an existing queue (and the slice
    /// amounts under it). Slices that do not know the queue id only have
    /// their committed amount adjusted.
    pub fn inc_queue(
        &mut self,
        qid: &str,
        amt: Capacity,
        commence: Timestamp,
        conclude: Timestamp,
        usr: Option<&Fence>,
    ) -> Option<String> {
        self.apply(commence, conclude, amt, QueueAction::Existing { qid }, usr)
    }

    /// Decreases the amount assigned to an existing queue.
    pub fn dec_queue(
        &mut self,
        qid: &str,
        amt: Capacity,
        commence: Timestamp,
        conclude: Timestamp,
        usr: Option<&Fence>,
    ) -> Option<String> {
        self.apply(commence, conclude, -amt, QueueAction::Existing { qid }, usr)
    }

    /// Drops leading slices that concluded before `now`.
    pub fn prune(&mut self, now: Timestamp) {
        while self.slices.first().map_or(false, |s| s.is_before(now)) {
            self.slices.remove(0);
        }
    }

    /// Amount committed at the given time, 0 if the time is outside every
    /// slice.
    pub fn get_allocation(&self, at: Timestamp) -> Capacity {
        self.slices
            .iter()
            .find(|ts| ts.includes(at))
            .map_or(0, TimeSlice::amount)
    }

    /// Largest amount committed by any slice that has not yet expired.
    pub fn get_max_allocation(&self) -> Capacity {
        let now = clock::unix_now();
        self.slices
            .iter()
            .filter(|ts| !ts.is_before(now))
            .map(TimeSlice::amount)
            .max()
            .unwrap_or(0)
    }

    /// Queue number assigned to `qid` at the given time; 0 (best effort)
    /// if no such queue exists then.
    pub fn get_queue(&self, qid: &str, at: Timestamp) -> i32 {
        for ts in &self.slices {
            if ts.includes(at) {
                if let Some((qnum, _)) = ts.queue_info(qid) {
                    if qnum > 0 {
                        return qnum;
                    }
                }
            }
        }
        0
    }

    /// Queue-setting command lines for the slice containing the given
    /// time, or an empty string if no slice does.
    pub fn queues_str(&self, at: Timestamp) -> String {
        self.slices
            .iter()
            .find(|ts| ts.includes(at))
            .map(TimeSlice::queues_str)
            .unwrap_or_default()
    }

    /// Lowest queue number >= 2 not used by any slice overlapping the
    /// window.
    fn open_queue_number(&self, commence: Timestamp, conclude: Timestamp) -> Option<i32> {
        let mut used: Vec<i32> = Vec::new();
        for ts in &self.slices {
            if ts.is_after(conclude) {
                break;
            }
            if ts.overlaps(commence, conclude) {
                used.extend(ts.queue_nums());
            }
        }
        used.sort_unstable();
        used.dedup();

        let mut candidate = 2;
        for n in used {
            if n < candidate {
                continue;
            }
            if n > candidate {
                break;
            }
            candidate += 1;
        }
        (candidate <= MAX_QUEUE_NUMBER).then(|| candidate)
    }

    /// The worker behind every commit operation: walks the slices
    /// overlapping `[commence, conclude]`, splitting at the window edges,
    /// then bumps the amount, applies the queue action and adjusts the
    /// user fence in each touched slice. When the window runs past the
    /// last slice its concluding time is extended to cover it.
    fn apply(
        &mut self,
        commence: Timestamp,
        conclude: Timestamp,
        amt: Capacity,
        action: QueueAction,
        usr: Option<&Fence>,
    ) -> Option<String> {
        debug!("obligation: adjusting utilisation by {} over [{}, {}]", amt, commence, conclude);

        let mut msg = None;
        let mut last_touched = None;
        let mut i = 0;
        while i < self.slices.len() {
            // pruning may have dropped the window entirely; a slice past the
            // conclude time must never absorb the delta
            if self.slices[i].is_after(conclude) {
                break;
            }
            if self.slices[i].is_before(commence) {
                i += 1;
                continue;
            }

            if self.slices[i].includes(commence) {
                if let Some(tail) = self.slices[i].split(commence) {
                    // the head part lies before the window, work on the tail
                    self.slices.insert(i + 1, tail);
                    i += 1;
                }
            }

            if self.slices[i].includes(conclude) {
                if let Some(tail) = self.slices[i].split(conclude + 1) {
                    self.slices.insert(i + 1, tail);
                }
                self.touch(i, amt, &action, usr, commence, conclude, &mut msg);
                self.check_invariants();
                return msg;
            }

            self.touch(i, amt, &action, usr, commence, conclude, &mut msg);
            last_touched = Some(i);
            i += 1;
        }

        // the window concludes past the final slice
        if let Some(i) = last_touched {
            self.slices[i].extend(conclude);
        }
        self.check_invariants();
        msg
    }

    /// Slices must stay sorted, non-overlapping and contiguous.
    fn check_invariants(&self) {
        if cfg!(debug_assertions) {
            for pair in self.slices.windows(2) {
                debug_assert_eq!(
                    pair[0].conclude() + 1,
                    pair[1].commence(),
                    "slice chain broken between [{}, {}] and [{}, {}]",
                    pair[0].commence(),
                    pair[0].conclude(),
                    pair[1].commence(),
                    pair[1].conclude()
                );
            }
        }
    }

    fn touch(
        &mut self,
        i: usize,
        amt: Capacity,
        action: &QueueAction,
        usr: Option<&Fence>,
        commence: Timestamp,
        conclude: Timestamp,
        msg: &mut Option<String>,
    ) {
        let max_capacity = self.max_capacity;
        let alarm_threshold = self.alarm_threshold;
        let ts = &mut self.slices[i];

        match *action {
            QueueAction::None => {}
            QueueAction::Existing { qid } => ts.add_queue(0, qid, "", amt),
            QueueAction::Create { qnum, qid, exref } => ts.add_queue(qnum, qid, exref, amt),
        }
        if let Some(usr) = usr {
            ts.inc_user(usr, amt, max_capacity);
        }
        ts.bump(amt);

        if ts.amount() >= alarm_threshold {
            *msg = Some(format!(
                "utilisation is {} which encroaches on limit ({}) from time {} until {}",
                ts.amount(),
                max_capacity,
                commence,
                conclude
            ));
        }
    }
}

/// Returns true if the timestamp lies between now and the obligation
/// horizon.
pub fn valid_obligation_time(t: Timestamp) -> bool {
    t <= OBLIGATION_HORIZON && t >= clock::unix_now()
}
