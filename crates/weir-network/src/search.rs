//! Capacity-constrained shortest-path search.

use std::collections::VecDeque;

use log::debug;

use weir_ledger::{Capacity, Timestamp};

use crate::network::{LinkId, Network, SwitchId};

/// Outcome of a successful path search: the switch the target was found
/// on and the links crossed to reach it, in origin-to-target order.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Switch hosting the target (or matching the target switch id).
    pub target: SwitchId,
    /// Links crossed, ordered from the origin.
    pub links: Vec<LinkId>,
}

/// Per-search scratch state, allocated fresh for every call so that
/// searches never leak state into each other and the graph itself stays
/// immutable during a search.
struct SearchContext {
    cost: Vec<i64>,
    visited: Vec<bool>,
    prev: Vec<Option<(SwitchId, LinkId)>>,
}

impl SearchContext {
    fn new(n: usize, origin: SwitchId) -> Self {
        let mut ctx = Self {
            cost: vec![i64::MAX; n],
            visited: vec![false; n],
            prev: vec![None; n],
        };
        ctx.cost[origin] = 0;
        ctx
    }
}

impl Network {
    /// Finds the lowest-cost path from `origin` to `target` such that
    /// every link crossed can absorb `amount` more over the window.
    ///
    /// The target may be a host name or a switch id, which lets callers
    /// route to a gateway switch as well as to an attached host. Links
    /// without the needed residual capacity are treated as absent, so a
    /// path may exist physically yet not be found.
    ///
    /// All link costs are currently 1, making the breadth-first order
    /// optimal on its own; the cost relaxation is kept so weighted links
    /// keep working when costs diverge.
    pub fn path_to(
        &self,
        origin: SwitchId,
        target: &str,
        commence: Timestamp,
        conclude: Timestamp,
        amount: Capacity,
    ) -> Option<SearchResult> {
        debug!("search: looking for path to {} from {}", target, self.switch(origin).id());

        let mut ctx = SearchContext::new(self.num_switches(), origin);
        let mut fifo = VecDeque::new();
        fifo.push_back(origin);

        while let Some(sw) = fifo.pop_front() {
            if let Some(found) = self.probe_neighbours(&mut ctx, sw, target, commence, conclude, amount) {
                return Some(SearchResult {
                    target: found,
                    links: self.assemble(&ctx, origin, found),
                });
            }

            // may have been queued more than once; probe is idempotent but
            // requeueing neighbours is not worth repeating
            if !ctx.visited[sw] {
                for &lid in self.switch(sw).links() {
                    let link = self.link(lid);
                    if link.has_capacity(commence, conclude, amount, None).is_ok()
                        && !ctx.visited[link.forward_sw()]
                    {
                        fifo.push_back(link.forward_sw());
                    }
                }
            }
            ctx.visited[sw] = true;
        }

        None
    }

    /// Examines the neighbours of `sw` reachable over links with enough
    /// capacity, relaxing their cost when the route through `sw` is
    /// cheaper, and returns the neighbour that has the target as soon as
    /// one is seen.
    fn probe_neighbours(
        &self,
        ctx: &mut SearchContext,
        sw: SwitchId,
        target: &str,
        commence: Timestamp,
        conclude: Timestamp,
        amount: Capacity,
    ) -> Option<SwitchId> {
        for &lid in self.switch(sw).links() {
            let link = self.link(lid);
            if link.has_capacity(commence, conclude, amount, None).is_err() {
                continue;
            }

            let fsw = link.forward_sw();
            if ctx.visited[fsw] {
                continue;
            }

            if ctx.cost[sw].saturating_add(link.cost()) < ctx.cost[fsw] {
                ctx.cost[fsw] = ctx.cost[sw] + link.cost();
                ctx.prev[fsw] = Some((sw, lid));
            }

            if self.switch(fsw).has_host(target) || self.switch(fsw).id() == target {
                ctx.prev[fsw] = Some((sw, lid));
                return Some(fsw);
            }
        }

        None
    }

    /// Walks the back-pointers from the found switch to the origin and
    /// returns the links in forward order.
    fn assemble(&self, ctx: &SearchContext, origin: SwitchId, found: SwitchId) -> Vec<LinkId> {
        let mut links = Vec::new();
        let mut at = found;
        while at != origin {
            let (prev, lid) = ctx.prev[at].expect("back-pointer chain must reach the origin");
            links.push(lid);
            at = prev;
        }
        links.reverse();
        links
    }
}
