//! Directed link between two switches.

use std::cell::RefCell;
use std::rc::Rc;

use log::warn;
use serde::{Serialize, Serializer};

use weir_ledger::{Capacity, CapacityError, Fence, Obligation, Timestamp};

use crate::network::SwitchId;
use crate::spq::Spq;

/// Port value used until the real port number is learned from the
/// controller.
pub const UNBOUND_PORT: i32 = -2;

/// A unidirectional edge carrying data from switch 1 to switch 2.
///
/// A bidirectional medium is modelled as two links in opposite directions
/// that share ("bond") one [`Obligation`], so capacity pledged in either
/// direction draws from the same ledger and full-duplex media are not
/// double counted.
///
/// Naming caution: the forward queue lives on switch 1, because that is
/// where data is queued to move toward switch 2. The backward queue
/// likewise lives on switch 2.
#[derive(Debug, Clone, Serialize)]
pub struct Link {
    id: String,
    sw1: String,
    #[serde(rename = "sw1port")]
    port1: i32,
    sw2: String,
    #[serde(rename = "sw2port")]
    port2: i32,
    #[serde(serialize_with = "serialize_allotment")]
    allotment: Rc<RefCell<Obligation>>,
    mlag: Option<String>,
    #[serde(skip)]
    forward: SwitchId,
    #[serde(skip)]
    backward: SwitchId,
    #[serde(skip)]
    cost: i64,
    #[serde(skip)]
    usr_max: Capacity,
}

fn serialize_allotment<S: Serializer>(ob: &Rc<RefCell<Obligation>>, ser: S) -> Result<S::Ok, S::Error> {
    ob.borrow().serialize(ser)
}

impl Link {
    /// Creates a link from `sw1` toward `sw2` with a fresh obligation of
    /// the given capacity. `usr_max` caps any single request: 100 or less
    /// is a percentage of capacity, larger values are absolute.
    pub fn new(
        sw1: &str,
        sw2: &str,
        backward: SwitchId,
        forward: SwitchId,
        capacity: Capacity,
        alarm_percent: i32,
        usr_max: Capacity,
    ) -> Self {
        Self {
            id: format!("{}-{}", sw1, sw2),
            sw1: sw1.to_string(),
            port1: UNBOUND_PORT,
            sw2: sw2.to_string(),
            port2: UNBOUND_PORT,
            allotment: Rc::new(RefCell::new(Obligation::with_alarm(capacity, alarm_percent))),
            mlag: None,
            forward,
            backward,
            cost: 1,
            usr_max,
        }
    }

    /// Creates the reverse direction of `other`, bonded to the same
    /// obligation.
    pub fn bonded_reverse(other: &Link) -> Self {
        Self {
            id: format!("{}-{}", other.sw2, other.sw1),
            sw1: other.sw2.clone(),
            port1: other.port2,
            sw2: other.sw1.clone(),
            port2: other.port1,
            allotment: Rc::clone(&other.allotment),
            mlag: other.mlag.clone(),
            forward: other.backward,
            backward: other.forward,
            cost: other.cost,
            usr_max: other.usr_max,
        }
    }

    /// Creates a virtual link between two ports on one switch, used to
    /// model the switch-to-host endpoint hop.
    pub fn vlink(sw: &str, sw_id: SwitchId, p1: i32, p2: i32, capacity: Capacity, usr_max: Capacity) -> Self {
        Self {
            id: format!("{}.{}.{}", sw, p1, p2),
            sw1: sw.to_string(),
            port1: p1,
            sw2: sw.to_string(),
            port2: p2,
            allotment: Rc::new(RefCell::new(Obligation::new(capacity))),
            mlag: None,
            forward: sw_id,
            backward: sw_id,
            cost: 1,
            usr_max,
        }
    }

    /// Link id (`sw1-sw2`, or `sw.p1.p2` for virtual links).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Switch the link carries data toward.
    pub fn forward_sw(&self) -> SwitchId {
        self.forward
    }

    /// Switch the link carries data away from.
    pub fn backward_sw(&self) -> SwitchId {
        self.backward
    }

    /// Switch names in (backward, forward) order.
    pub fn sw_names(&self) -> (&str, &str) {
        (&self.sw1, &self.sw2)
    }

    /// Ports in (backward, forward) order.
    pub fn sw_ports(&self) -> (i32, i32) {
        (self.port1, self.port2)
    }

    /// Binds the real port numbers; non-positive values leave the
    /// current setting alone.
    pub fn set_ports(&mut self, p1: i32, p2: i32) {
        if p1 > 0 {
            self.port1 = p1;
        }
        if p2 > 0 {
            self.port2 = p2;
        }
    }

    /// Traversal cost for path finding, always at least 1.
    pub fn cost(&self) -> i64 {
        self.cost
    }

    /// Sets the traversal cost; values below 1 are lifted to 1.
    pub fn set_cost(&mut self, cost: i64) {
        self.cost = cost.max(1);
    }

    /// Mlag group the link belongs to, if any.
    pub fn mlag(&self) -> Option<&str> {
        self.mlag.as_deref()
    }

    /// Places the link in an mlag group.
    pub fn set_mlag(&mut self, name: &str) {
        self.mlag = Some(name.to_string());
    }

    /// The obligation backing this link, shared with a bonded peer when
    /// one exists.
    pub fn allotment(&self) -> &Rc<RefCell<Obligation>> {
        &self.allotment
    }

    /// True if either end of the link is the given switch.
    pub fn connects(&self, sw: SwitchId) -> bool {
        self.forward == sw || self.backward == sw
    }

    /// Checks that the link can absorb `amt` more over the window. The
    /// per-request user cap is applied first, then the obligation's
    /// window-aware check.
    pub fn has_capacity(
        &self,
        commence: Timestamp,
        conclude: Timestamp,
        amt: Capacity,
        user: Option<&str>,
    ) -> Result<(), CapacityError> {
        if self.usr_max > 0 {
            let allowance = self.user_allowance();
            if amt > allowance {
                return Err(CapacityError::OverUserLimit {
                    user: user.unwrap_or("request").to_string(),
                    need: amt,
                    have: allowance,
                });
            }
        }

        self.allotment.borrow_mut().has_capacity(commence, conclude, amt, user)
    }

    /// Checks capacity and, if available, commits `amt` over the window.
    pub fn inc_utilisation(
        &self,
        commence: Timestamp,
        conclude: Timestamp,
        amt: Capacity,
        usr: Option<&Fence>,
    ) -> Result<(), CapacityError> {
        self.has_capacity(commence, conclude, amt, usr.map(Fence::name))?;
        let msg = self.allotment.borrow_mut().inc_utilisation(commence, conclude, amt, usr);
        self.log_alarm(msg);
        Ok(())
    }

    /// Releases `amt` over the window.
    pub fn dec_utilisation(&self, commence: Timestamp, conclude: Timestamp, amt: Capacity, usr: Option<&Fence>) {
        self.allotment.borrow_mut().dec_utilisation(commence, conclude, amt, usr);
    }

    /// Replaces the link's maximum capacity.
    pub fn mod_capacity(&self, new_cap: Capacity) {
        self.allotment.borrow_mut().set_max_capacity(new_cap);
    }

    /// Adjusts the link's maximum capacity by `delta` (never below 0).
    /// For a bonded link the new value applies to both directions.
    pub fn adjust_capacity(&self, delta: Capacity) {
        self.allotment.borrow_mut().adjust_max_capacity(delta);
    }

    /// Amount committed on the link at the given time.
    pub fn get_allocation(&self, at: Timestamp) -> Capacity {
        self.allotment.borrow().get_allocation(at)
    }

    /// Creates a queue for traffic leaving switch 1 toward switch 2.
    pub fn set_forward_queue(
        &self,
        qid: &str,
        commence: Timestamp,
        conclude: Timestamp,
        amt: Capacity,
        usr: Option<&Fence>,
    ) -> Result<(), CapacityError> {
        let swdata = format!("{}/{}", self.sw1, self.port1);
        let (_, msg) = self
            .allotment
            .borrow_mut()
            .add_queue(qid, &swdata, amt, commence, conclude, usr)?;
        self.log_alarm(msg);
        Ok(())
    }

    /// Creates a queue for traffic leaving switch 2 back toward switch 1.
    pub fn set_backward_queue(
        &self,
        qid: &str,
        commence: Timestamp,
        conclude: Timestamp,
        amt: Capacity,
        usr: Option<&Fence>,
    ) -> Result<(), CapacityError> {
        let swdata = format!("{}/{}", self.sw2, self.port2);
        let (_, msg) = self
            .allotment
            .borrow_mut()
            .add_queue(qid, &swdata, amt, commence, conclude, usr)?;
        self.log_alarm(msg);
        Ok(())
    }

    /// Adds `amt` to an existing queue over the window.
    pub fn inc_queue(&self, qid: &str, commence: Timestamp, conclude: Timestamp, amt: Capacity, usr: Option<&Fence>) {
        let msg = self.allotment.borrow_mut().inc_queue(qid, amt, commence, conclude, usr);
        self.log_alarm(msg);
    }

    /// Removes `amt` from an existing queue over the window.
    pub fn dec_queue(&self, qid: &str, commence: Timestamp, conclude: Timestamp, amt: Capacity, usr: Option<&Fence>) {
        self.allotment.borrow_mut().dec_queue(qid, amt, commence, conclude, usr);
    }

    /// Switch, port and queue number for sending data forward over the
    /// link at the given time.
    pub fn forward_info(&self, qid: &str, at: Timestamp) -> Spq {
        Spq::new(&self.sw1, self.port1, self.allotment.borrow().get_queue(qid, at))
    }

    /// Switch, port and queue number for sending data backward over the
    /// link at the given time.
    pub fn backward_info(&self, qid: &str, at: Timestamp) -> Spq {
        Spq::new(&self.sw2, self.port2, self.allotment.borrow().get_queue(qid, at))
    }

    /// Queue-setting command lines for this link at the given time.
    pub fn queues_str(&self, at: Timestamp) -> String {
        self.allotment.borrow().queues_str(at)
    }

    fn user_allowance(&self) -> Capacity {
        if self.usr_max <= 100 {
            self.allotment.borrow().max_capacity() / 100 * self.usr_max
        } else {
            self.usr_max
        }
    }

    fn log_alarm(&self, msg: Option<String>) {
        if let Some(msg) = msg {
            warn!("link {}: {}", self.id, msg);
        }
    }
}

impl std::fmt::Display for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "link: {} {}/{} {}/{} {}",
            self.id,
            self.sw1,
            self.port1,
            self.sw2,
            self.port2,
            self.allotment.borrow().max_capacity()
        )
    }
}
