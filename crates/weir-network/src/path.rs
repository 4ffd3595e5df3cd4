//! Ordered link/switch sequence between two hosts.

use log::error;
use serde_json::json;

use weir_ledger::{Capacity, Fence, Timestamp};

use crate::error::NetworkError;
use crate::link::Link;
use crate::network::{LinkId, Network, SwitchId};
use crate::spq::Spq;

/// Which direction of a link a queue was applied to; kept so a failed
/// multi-link assignment can be compensated exactly.
#[derive(Clone, Copy)]
enum QueueSide {
    Forward,
    Backward,
}

/// A path between two hosts across the topology.
///
/// Links and switches are stored in discovery order. When the search that
/// produced them walked back-pointers from target to origin the sequence
/// is reversed, recorded by `is_reverse`, and every queue or lookup
/// operation runs the sequence from the other end.
///
/// Endpoint links (the virtual switch-to-host hop on either end) are
/// owned by the path and always kept in (h1, h2) order regardless of the
/// path order.
#[derive(Debug, Clone)]
pub struct Path {
    usr: Option<String>,
    links: Vec<LinkId>,
    switches: Vec<SwitchId>,
    h1: String,
    h2: String,
    bandwidth: Capacity,
    endpts: [Option<Link>; 2],
    extip: Option<String>,
    extflag: Option<String>,
    is_reverse: bool,
}

impl Path {
    /// Creates an empty path between two hosts.
    pub fn new(h1: &str, h2: &str) -> Self {
        Self {
            usr: None,
            links: Vec::new(),
            switches: Vec::new(),
            h1: h1.to_string(),
            h2: h2.to_string(),
            bandwidth: 0,
            endpts: [None, None],
            extip: None,
            extflag: None,
            is_reverse: false,
        }
    }

    /// The path's hosts in (h1, h2) order.
    pub fn hosts(&self) -> (&str, &str) {
        (&self.h1, &self.h2)
    }

    /// Marks the link/switch sequence as stored target-to-origin.
    pub fn set_reverse(&mut self, state: bool) {
        self.is_reverse = state;
    }

    /// True when the sequence is stored target-to-origin.
    pub fn is_reverse(&self) -> bool {
        self.is_reverse
    }

    /// Records the bandwidth reserved along the path.
    pub fn set_bandwidth(&mut self, bw: Capacity) {
        if bw > 0 {
            self.bandwidth = bw;
        }
    }

    /// Bandwidth reserved along the path.
    pub fn bandwidth(&self) -> Capacity {
        self.bandwidth
    }

    /// Associates the owning user, needed later to unwind their per-link
    /// usage.
    pub fn set_usr(&mut self, usr: &str) {
        self.usr = Some(usr.to_string());
    }

    /// The owning user.
    pub fn usr(&self) -> Option<&str> {
        self.usr.as_deref()
    }

    /// Records an external IP and the source/dest flag the flow-mod
    /// generator needs with it.
    pub fn set_extip(&mut self, extip: &str, flag: &str) {
        self.extip = Some(extip.to_string());
        self.extflag = Some(flag.to_string());
    }

    /// External IP, when set.
    pub fn extip(&self) -> Option<&str> {
        self.extip.as_deref()
    }

    /// External IP direction flag, when set.
    pub fn extflag(&self) -> Option<&str> {
        self.extflag.as_deref()
    }

    /// Appends a link. Links must be added in path order (or consistently
    /// reversed, with `set_reverse` called).
    pub fn add_link(&mut self, link: LinkId) {
        self.links.push(link);
    }

    /// Appends a switch, same ordering contract as [`Path::add_link`].
    pub fn add_switch(&mut self, sw: SwitchId) {
        self.switches.push(sw);
    }

    /// Number of links in the path.
    pub fn num_links(&self) -> usize {
        self.links.len()
    }

    /// Links in stored order.
    pub fn links(&self) -> &[LinkId] {
        &self.links
    }

    /// Switches in stored order.
    pub fn switches(&self) -> &[SwitchId] {
        &self.switches
    }

    /// Adds an endpoint link (the switch-to-host hop). Endpoints are
    /// pushed in (h1, h2) order; a third push shifts the pair.
    pub fn add_endpoint(&mut self, link: Link) {
        if self.endpts[0].is_none() {
            self.endpts[0] = Some(link);
        } else if self.endpts[1].is_none() {
            self.endpts[1] = Some(link);
        } else {
            self.endpts[0] = self.endpts[1].take();
            self.endpts[1] = Some(link);
        }
    }

    /// Swaps the endpoints when they were pushed in (h2, h1) order.
    pub fn flip_endpoints(&mut self) {
        self.endpts.swap(0, 1);
    }

    /// Commits `delta` more on every link of the path, or rolls the
    /// partial work back and reports the rejecting link's error. When a
    /// queue id is given, existing queues are adjusted instead (an
    /// unchecked operation that cannot fail).
    pub fn inc_utilisation(
        &self,
        net: &Network,
        commence: Timestamp,
        conclude: Timestamp,
        delta: Capacity,
        qid: Option<&str>,
        usr: Option<&Fence>,
    ) -> Result<(), NetworkError> {
        if let Some(qid) = qid {
            for &lid in &self.links {
                net.link(lid).inc_queue(qid, commence, conclude, delta, usr);
            }
            return Ok(());
        }

        for (i, &lid) in self.links.iter().enumerate() {
            if let Err(e) = net.link(lid).inc_utilisation(commence, conclude, delta, usr) {
                for &undo in &self.links[..i] {
                    net.link(undo).dec_utilisation(commence, conclude, delta, usr);
                }
                return Err(e.into());
            }
        }
        Ok(())
    }

    /// Releases `delta` on every link of the path.
    pub fn dec_utilisation(
        &self,
        net: &Network,
        commence: Timestamp,
        conclude: Timestamp,
        delta: Capacity,
        qid: Option<&str>,
        usr: Option<&Fence>,
    ) {
        for &lid in &self.links {
            match qid {
                Some(qid) => net.link(lid).dec_queue(qid, commence, conclude, delta, usr),
                None => net.link(lid).dec_utilisation(commence, conclude, delta, usr),
            }
        }
    }

    /// Bumps the mlag peers of every link in the path, assuming the links
    /// themselves were already adjusted.
    pub fn inc_mlag(
        &self,
        net: &Network,
        commence: Timestamp,
        conclude: Timestamp,
        delta: Capacity,
        usr: Option<&Fence>,
    ) {
        for &lid in &self.links {
            let link = net.link(lid);
            if let Some(name) = link.mlag() {
                if let Some(group) = net.mlag(name) {
                    group.inc_utilisation(commence, conclude, delta, usr, link.allotment());
                }
            }
        }
    }

    /// Installs the queues that realise a reservation along the path:
    ///
    /// - the named queue on the path's first link, carrying data out from
    ///   h1,
    /// - an `R`-prefixed queue on the terminal link for the data coming
    ///   back from h2,
    /// - shared `priority-out`/`priority-in` queues on the remaining
    ///   links in the respective directions (none for a 1-link path),
    /// - an `E1`-prefixed queue on the h2 endpoint link when one exists.
    ///
    /// Each queue install also raises the link's committed amount. If a
    /// link rejects the install, queues already placed are decremented
    /// back before the error is returned.
    pub fn set_queue(
        &self,
        net: &Network,
        qid: &str,
        commence: Timestamp,
        conclude: Timestamp,
        bw_amt: Capacity,
        usr: Option<&Fence>,
    ) -> Result<(), NetworkError> {
        if self.links.is_empty() {
            error!("set_queue: path between {} and {} has no links", self.h1, self.h2);
            return Err(NetworkError::EmptyPath);
        }

        let n = self.links.len();
        let rqid = format!("R{}", qid);
        let mut plan: Vec<(LinkId, &str, QueueSide)> = Vec::with_capacity(2 * n);

        if self.is_reverse {
            plan.push((self.links[n - 1], qid, QueueSide::Forward));
            for i in (0..n - 1).rev() {
                plan.push((self.links[i], "priority-out", QueueSide::Forward));
            }
            plan.push((self.links[0], &rqid, QueueSide::Backward));
            for i in (1..n).rev() {
                plan.push((self.links[i], "priority-in", QueueSide::Backward));
            }
        } else {
            plan.push((self.links[0], qid, QueueSide::Forward));
            for i in 1..n {
                plan.push((self.links[i], "priority-out", QueueSide::Forward));
            }
            plan.push((self.links[n - 1], &rqid, QueueSide::Backward));
            for i in 0..n - 1 {
                plan.push((self.links[i], "priority-in", QueueSide::Backward));
            }
        }

        for (done, &(lid, q, side)) in plan.iter().enumerate() {
            let result = match side {
                QueueSide::Forward => net.link(lid).set_forward_queue(q, commence, conclude, bw_amt, usr),
                QueueSide::Backward => net.link(lid).set_backward_queue(q, commence, conclude, bw_amt, usr),
            };
            if let Err(e) = result {
                for &(ulid, uq, _) in &plan[..done] {
                    net.link(ulid).dec_queue(uq, commence, conclude, bw_amt, usr);
                }
                return Err(e.into());
            }
        }

        if let Some(ep) = &self.endpts[1] {
            let eqid = format!("E1{}", qid);
            if let Err(e) = ep.set_forward_queue(&eqid, commence, conclude, bw_amt, usr) {
                for &(ulid, uq, _) in &plan {
                    net.link(ulid).dec_queue(uq, commence, conclude, bw_amt, usr);
                }
                return Err(e.into());
            }
        }

        Ok(())
    }

    /// Undoes [`Path::set_queue`]: decrements the same queues, in the
    /// same layout, releasing the bandwidth the install committed. Queue
    /// records themselves stay behind at zero, which is harmless; queue
    /// numbers become reusable once their slices expire.
    pub fn clear_queue(
        &self,
        net: &Network,
        qid: &str,
        commence: Timestamp,
        conclude: Timestamp,
        bw_amt: Capacity,
        usr: Option<&Fence>,
    ) {
        if self.links.is_empty() {
            return;
        }

        let n = self.links.len();
        let rqid = format!("R{}", qid);
        let (first, last) = if self.is_reverse {
            (self.links[n - 1], self.links[0])
        } else {
            (self.links[0], self.links[n - 1])
        };

        net.link(first).dec_queue(qid, commence, conclude, bw_amt, usr);
        net.link(last).dec_queue(&rqid, commence, conclude, bw_amt, usr);
        for lid in self.path_order_tail() {
            net.link(lid).dec_queue("priority-out", commence, conclude, bw_amt, usr);
        }
        for lid in self.path_order_head() {
            net.link(lid).dec_queue("priority-in", commence, conclude, bw_amt, usr);
        }

        if let Some(ep) = &self.endpts[1] {
            let eqid = format!("E1{}", qid);
            ep.dec_queue(&eqid, commence, conclude, bw_amt, usr);
        }
    }

    /// Switch/port/queue for the ingress side: where the first switch in
    /// the path sends data out from h1.
    pub fn ilink_spq(&self, net: &Network, qid: &str, at: Timestamp) -> Option<Spq> {
        let idx = if self.is_reverse { self.links.len().checked_sub(1)? } else { 0 };
        self.links.get(idx).map(|&lid| net.link(lid).forward_info(qid, at))
    }

    /// Switch/port/queue for the egress side: where the last switch in
    /// the path sends data back toward h1.
    pub fn elink_spq(&self, net: &Network, qid: &str, at: Timestamp) -> Option<Spq> {
        let idx = if self.is_reverse { 0 } else { self.links.len().checked_sub(1)? };
        self.links.get(idx).map(|&lid| net.link(lid).backward_info(qid, at))
    }

    /// Intermediate switch/port/queue tuples in the h1 to h2 direction,
    /// based on the shared priority-out queues.
    pub fn forward_im_spq(&self, net: &Network, at: Timestamp) -> Vec<Spq> {
        self.path_order_tail()
            .map(|lid| net.link(lid).forward_info("priority-out", at))
            .collect()
    }

    /// Intermediate switch/port/queue tuples in the h2 to h1 direction,
    /// based on the shared priority-in queues.
    pub fn backward_im_spq(&self, net: &Network, at: Timestamp) -> Vec<Spq> {
        self.path_order_head()
            .map(|lid| net.link(lid).backward_info("priority-in", at))
            .collect()
    }

    /// Both directions' intermediate tuples: the full set of queue
    /// settings the enforcer must translate for the middle of the path.
    pub fn intermed_spq(&self, net: &Network, at: Timestamp) -> Vec<Spq> {
        let mut list = self.backward_im_spq(net, at);
        list.extend(self.forward_im_spq(net, at));
        list
    }

    /// Endpoint switch/port/queue tuples in path order (the first element
    /// belongs to the start of the path). Both are `None` when the hosts
    /// share a switch, since that case is modelled as a virtual link.
    pub fn endpoint_spq(&self, qid: &str, at: Timestamp) -> (Option<Spq>, Option<Spq>) {
        let (idx0, idx1, pfx0, pfx1) = if self.is_reverse {
            (1, 0, "E1", "E0")
        } else {
            (0, 1, "E0", "E1")
        };

        let lookup = |idx: usize, pfx: &str| {
            self.endpts[idx]
                .as_ref()
                .map(|ep| ep.forward_info(&format!("{}{}", pfx, qid), at))
        };

        (lookup(idx0, pfx0), lookup(idx1, pfx1))
    }

    /// A new path with the link/switch order reversed and the reverse
    /// marker flipped; the original is untouched.
    pub fn invert(&self) -> Path {
        let mut ip = Path::new(&self.h1, &self.h2);
        ip.links = self.links.iter().rev().copied().collect();
        ip.switches = self.switches.iter().rev().copied().collect();
        ip.usr = self.usr.clone();
        ip.bandwidth = self.bandwidth;
        ip.endpts = self.endpts.clone();
        ip.extip = self.extip.clone();
        ip.extflag = self.extflag.clone();
        ip.is_reverse = !self.is_reverse;
        ip
    }

    /// Diagnostic JSON for the path.
    pub fn to_json(&self, net: &Network) -> serde_json::Value {
        json!({
            "h1": self.h1,
            "h2": self.h2,
            "links": self.links.iter().map(|&lid| net.link(lid)).collect::<Vec<_>>(),
            "switches": self.switches.iter().map(|&sid| net.switch(sid).id()).collect::<Vec<_>>(),
        })
    }

    /// Human-readable switch chain.
    pub fn to_str(&self, net: &Network) -> String {
        self.switches
            .iter()
            .map(|&sid| net.switch(sid).id())
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// All links except the path-order first, in path order.
    fn path_order_tail(&self) -> Box<dyn Iterator<Item = LinkId> + '_> {
        if self.is_reverse {
            Box::new(self.links.iter().rev().skip(1).copied())
        } else {
            Box::new(self.links.iter().skip(1).copied())
        }
    }

    /// All links except the path-order last, in path order.
    fn path_order_head(&self) -> Box<dyn Iterator<Item = LinkId> + '_> {
        let n = self.links.len();
        if self.is_reverse {
            Box::new(self.links.iter().rev().take(n.saturating_sub(1)).copied())
        } else {
            Box::new(self.links.iter().take(n.saturating_sub(1)).copied())
        }
    }
}
