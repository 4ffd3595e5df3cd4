//! Egress rate-limit gate.

use serde::Serialize;

use weir_ledger::{Capacity, CapacityError, Fence, Timestamp};

use crate::network::{Network, SwitchId};
use crate::spq::Spq;

/// Port sentinel placed in gate switch/port/queue tuples; the enforcement
/// layer resolves the real port when it builds flow-mods.
pub const GATE_PORT: i32 = -128;

/// Rate limits all traffic leaving one switch from a source host toward a
/// destination (a host in the topology, or an external IP).
///
/// The gate treats every link attached to its switch as one unit: a
/// utilisation change is applied to all of them or to none.
#[derive(Debug, Clone, Serialize)]
pub struct Gate {
    #[serde(rename = "gsw")]
    switch: SwitchId,
    src: String,
    dest: Option<String>,
    ext_ip: Option<String>,
    #[serde(rename = "bandw")]
    bandwidth: Capacity,
    queue: i32,
}

impl Gate {
    /// Creates a gate on the switch `src` attaches to, toward `dest`.
    pub fn new(src: &str, dest: Option<&str>, switch: SwitchId, bandwidth: Capacity) -> Self {
        Self {
            switch,
            src: src.to_string(),
            dest: dest.map(str::to_string),
            ext_ip: None,
            bandwidth,
            queue: 0,
        }
    }

    /// Source host.
    pub fn src(&self) -> &str {
        &self.src
    }

    /// Destination host, when it is inside the topology.
    pub fn dest(&self) -> Option<&str> {
        self.dest.as_deref()
    }

    /// Switch the gate is applied on.
    pub fn switch(&self) -> SwitchId {
        self.switch
    }

    /// Updates the gated bandwidth; non-positive values are ignored.
    pub fn set_bandwidth(&mut self, bw: Capacity) {
        if bw > 0 {
            self.bandwidth = bw;
        }
    }

    /// Gated bandwidth.
    pub fn bandwidth(&self) -> Capacity {
        self.bandwidth
    }

    /// Records the queue number assigned for the gate.
    pub fn set_queue(&mut self, q: i32) {
        self.queue = q;
    }

    /// Assigned queue number.
    pub fn queue(&self) -> i32 {
        self.queue
    }

    /// Associates an external destination IP. Routing prefixes of the
    /// `!/IP` form are stripped down to the address itself.
    pub fn set_extip(&mut self, ip: &str) {
        let addr = match ip.rsplit_once('/') {
            Some((_, tail)) => tail,
            None => ip,
        };
        self.ext_ip = Some(addr.to_string());
    }

    /// The external IP, when one was set.
    pub fn extip(&self) -> Option<&str> {
        self.ext_ip.as_deref()
    }

    /// True when the destination is an external address that cannot be
    /// resolved to a host in the topology.
    pub fn dest_is_ext(&self) -> bool {
        self.ext_ip.is_some()
    }

    /// Commits `delta` more on every link attached to the gate's switch,
    /// or rolls back the links already adjusted and reports the rejecting
    /// link's error, leaving every allocation at its pre-call value.
    pub fn inc_utilisation(
        &self,
        net: &Network,
        commence: Timestamp,
        conclude: Timestamp,
        delta: Capacity,
        usr: Option<&Fence>,
    ) -> Result<(), CapacityError> {
        let links = net.switch(self.switch).links();
        for (i, &lid) in links.iter().enumerate() {
            if let Err(e) = net.link(lid).inc_utilisation(commence, conclude, delta, usr) {
                for &undo in &links[..i] {
                    net.link(undo).dec_utilisation(commence, conclude, delta, usr);
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Releases `delta` on every link attached to the gate's switch.
    pub fn dec_utilisation(
        &self,
        net: &Network,
        commence: Timestamp,
        conclude: Timestamp,
        delta: Capacity,
        usr: Option<&Fence>,
    ) {
        for &lid in net.switch(self.switch).links() {
            net.link(lid).dec_utilisation(commence, conclude, delta, usr);
        }
    }

    /// The switch/port/queue tuple for the gate, using the late-binding
    /// gate port.
    pub fn spq(&self, net: &Network) -> Spq {
        Spq::new(net.switch(self.switch).id(), GATE_PORT, self.queue)
    }
}

impl std::fmt::Display for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "gate: {} -> {} bw={} q={}",
            self.src,
            self.dest.as_deref().or(self.ext_ip.as_deref()).unwrap_or("?"),
            self.bandwidth,
            self.queue
        )
    }
}
