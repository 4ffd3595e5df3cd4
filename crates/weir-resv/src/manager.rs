//! Single-writer reservation manager.

use indexmap::IndexMap;
use log::{info, warn};
use serde_json::json;

use weir_ledger::{clock, Capacity, Fence, Timestamp, Window};
use weir_network::{Link, Network, NetworkError, Path};

use crate::config::ControllerConfig;
use crate::error::ReservationError;
use crate::pledge::{Pledge, PledgeKind};

struct Reservation {
    pledge: Pledge,
    path: Path,
    fence: Fence,
}

/// Owns the topology and admits, tracks and releases pledges.
///
/// Every admission runs under one `&mut self`: path search, capacity
/// vetting and queue installation cannot interleave with another
/// admission, so a passed check is still valid when the commit lands.
/// This is the piece that makes the ledger's checked-read/unchecked-write
/// split safe to use.
pub struct ReservationManager {
    net: Network,
    config: ControllerConfig,
    reservations: IndexMap<String, Reservation>,
}

impl ReservationManager {
    /// Creates a manager over an already built topology.
    pub fn new(net: Network, config: ControllerConfig) -> Self {
        Self {
            net,
            config,
            reservations: IndexMap::new(),
        }
    }

    /// The topology.
    pub fn network(&self) -> &Network {
        &self.net
    }

    /// Mutable topology access, for host and link updates.
    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.net
    }

    /// Active configuration.
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Number of tracked pledges.
    pub fn len(&self) -> usize {
        self.reservations.len()
    }

    /// True when no pledges are tracked.
    pub fn is_empty(&self) -> bool {
        self.reservations.is_empty()
    }

    /// Pledge by id.
    pub fn get(&self, id: &str) -> Option<&Pledge> {
        self.reservations.get(id).map(|r| &r.pledge)
    }

    /// All tracked pledges, admission order.
    pub fn pledges(&self) -> impl Iterator<Item = &Pledge> {
        self.reservations.values().map(|r| &r.pledge)
    }

    /// Admits a symmetric bandwidth reservation between two hosts.
    ///
    /// Finds a capacity-feasible path, vets every link for twice the
    /// amount (the path will carry it in both directions on each link's
    /// shared ledger) and the user's cap, then installs the queues. A
    /// failure at any point leaves the topology exactly as it was.
    pub fn reserve(
        &mut self,
        id: &str,
        user: &str,
        h1: &str,
        h2: &str,
        commence: Timestamp,
        expiry: Timestamp,
        amount: Capacity,
    ) -> Result<&Pledge, ReservationError> {
        if self.reservations.contains_key(id) {
            return Err(ReservationError::Duplicate(id.to_string()));
        }

        let window = Window::new(commence, expiry)?;
        let (commence, conclude) = window.values();
        let fence = Fence::new(user, self.config.user_cap_for(user), 0, 0);

        let mut path = self.build_path(h1, h2, commence, conclude, amount)?;
        path.set_usr(user);
        path.set_bandwidth(amount);

        // both directions of the reservation land on each link's ledger
        for &lid in path.links() {
            if let Err(e) = self.net.link(lid).has_capacity(commence, conclude, 2 * amount, Some(user)) {
                warn!("reservation {} rejected: {}", id, e);
                return Err(NetworkError::from(e).into());
            }
        }

        let pledge = Pledge::new(
            id,
            user,
            window,
            PledgeKind::Bandwidth {
                h1: h1.to_string(),
                h2: h2.to_string(),
                amount,
            },
        );

        path.set_queue(&self.net, &pledge.queue_id(), commence, conclude, amount, Some(&fence))?;
        path.inc_mlag(&self.net, commence, conclude, 2 * amount, Some(&fence));

        info!(
            "reservation {} admitted: {} <-> {} amount={} window=[{}, {})",
            id, h1, h2, amount, commence, conclude
        );
        let entry = self.reservations.entry(id.to_string()).or_insert(Reservation {
            pledge,
            path,
            fence,
        });
        Ok(&entry.pledge)
    }

    /// Releases a pledge, returning the bandwidth its admission
    /// committed and unwinding its mlag fan-out.
    pub fn release(&mut self, id: &str) -> Result<Pledge, ReservationError> {
        let res = self
            .reservations
            .remove(id)
            .ok_or_else(|| ReservationError::Unknown(id.to_string()))?;

        let (commence, conclude) = res.pledge.times();
        let amount = match res.pledge.kind() {
            PledgeKind::Bandwidth { amount, .. } | PledgeKind::OneWayBandwidth { amount, .. } => *amount,
            _ => 0,
        };

        if amount > 0 {
            res.path
                .clear_queue(&self.net, &res.pledge.queue_id(), commence, conclude, amount, Some(&res.fence));
            res.path
                .inc_mlag(&self.net, commence, conclude, -2 * amount, Some(&res.fence));
        }

        info!("reservation {} released", id);
        Ok(res.pledge)
    }

    /// Drops pledges whose windows have fully passed. Their capacity is
    /// already dead weight only in expired slices, which the ledgers
    /// prune on their own, so no unwinding is needed.
    pub fn sweep_expired(&mut self) -> usize {
        let now = clock::unix_now();
        let before = self.reservations.len();
        self.reservations.retain(|id, r| {
            let keep = !r.pledge.window().is_expired(now);
            if !keep {
                info!("reservation {} expired", id);
            }
            keep
        });
        before - self.reservations.len()
    }

    /// Diagnostic JSON of all tracked pledges.
    pub fn checkpoint(&self) -> serde_json::Value {
        json!({ "pledges": self.pledges().collect::<Vec<_>>() })
    }

    /// Builds the path a reservation between the two hosts will ride:
    /// the capacity-constrained shortest path, plus endpoint hops. Hosts
    /// sharing a switch get a single virtual link instead.
    fn build_path(
        &mut self,
        h1: &str,
        h2: &str,
        commence: Timestamp,
        conclude: Timestamp,
        amount: Capacity,
    ) -> Result<Path, ReservationError> {
        let (sw1, p1) = self.net.host_switch(h1)?;
        let (sw2, p2) = self.net.host_switch(h2)?;
        let usr_max = self.config.user_cap;
        let capacity = self.config.default_link_capacity;

        let mut path = Path::new(h1, h2);

        if sw1 == sw2 {
            let sw_name = self.net.switch(sw1).id().to_string();
            let vlink = Link::vlink(&sw_name, sw1, p1, p2, capacity, usr_max);
            // reuse the vlink if an earlier reservation already created it
            let vid = match self.net.link_id(vlink.id()) {
                Some(id) => id,
                None => self.net.add_virtual_link(vlink),
            };
            path.add_link(vid);
            path.add_switch(sw1);
            return Ok(path);
        }

        let result = self
            .net
            .path_to(sw1, h2, commence, conclude, amount)
            .ok_or_else(|| NetworkError::NoPath {
                origin: self.net.switch(sw1).id().to_string(),
                target: h2.to_string(),
            })?;

        path.add_switch(sw1);
        for lid in result.links {
            path.add_link(lid);
            path.add_switch(self.net.link(lid).forward_sw());
        }

        let sw1_name = self.net.switch(sw1).id().to_string();
        let sw2_name = self.net.switch(sw2).id().to_string();
        path.add_endpoint(Link::vlink(&sw1_name, sw1, p1, p1, capacity, usr_max));
        path.add_endpoint(Link::vlink(&sw2_name, sw2, p2, p2, capacity, usr_max));

        Ok(path)
    }
}
