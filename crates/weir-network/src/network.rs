//! Topology arena.

use rustc_hash::FxHashMap;

use crate::error::NetworkError;
use crate::host::Host;
use crate::link::Link;
use crate::mlag::Mlag;
use crate::switch::Switch;

/// Index of a switch in the topology arena.
pub type SwitchId = usize;
/// Index of a link in the topology arena.
pub type LinkId = usize;

/// The topology graph: switches and links in index-addressed arenas, with
/// name lookup maps, plus host attachments and mlag groups.
///
/// The network is owned and mutated by a single writer (the reservation
/// manager); it deliberately shares nothing across threads, which is what
/// lets links hand out obligation access through `RefCell` without locks.
#[derive(Debug, Default)]
pub struct Network {
    switches: Vec<Switch>,
    links: Vec<Link>,
    switch_ids: FxHashMap<String, SwitchId>,
    link_ids: FxHashMap<String, LinkId>,
    hosts: FxHashMap<String, Host>,
    mlags: FxHashMap<String, Mlag>,
}

impl Network {
    /// Creates an empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of switches.
    pub fn num_switches(&self) -> usize {
        self.switches.len()
    }

    /// Number of links.
    pub fn num_links(&self) -> usize {
        self.links.len()
    }

    /// Id for the named switch, if it exists.
    pub fn switch_id(&self, name: &str) -> Option<SwitchId> {
        self.switch_ids.get(name).copied()
    }

    /// Returns the named switch's id, creating the switch if the name is
    /// new.
    pub fn get_or_add_switch(&mut self, name: &str) -> SwitchId {
        if let Some(&id) = self.switch_ids.get(name) {
            return id;
        }
        let id = self.switches.len();
        self.switches.push(Switch::new(name));
        self.switch_ids.insert(name.to_string(), id);
        id
    }

    /// Switch by id.
    pub fn switch(&self, id: SwitchId) -> &Switch {
        &self.switches[id]
    }

    /// Mutable switch by id.
    pub fn switch_mut(&mut self, id: SwitchId) -> &mut Switch {
        &mut self.switches[id]
    }

    /// All switches, id order.
    pub fn switches(&self) -> &[Switch] {
        &self.switches
    }

    /// Registers a link, wiring it into its backward switch's adjacency
    /// and its mlag group when it names one.
    pub fn add_link(&mut self, link: Link) -> LinkId {
        let id = self.links.len();
        self.switches[link.backward_sw()].add_link(id);
        self.link_ids.insert(link.id().to_string(), id);

        if let Some(mlag) = link.mlag() {
            let mlag = mlag.to_string();
            match self.mlags.get_mut(&mlag) {
                Some(group) => group.add_member(link.allotment()),
                None => {
                    let group = Mlag::new(&mlag, std::rc::Rc::clone(link.allotment()));
                    self.mlags.insert(mlag, group);
                }
            }
        }

        self.links.push(link);
        id
    }

    /// Registers a virtual link (a switch-to-host or same-switch hop)
    /// without wiring it into any adjacency, so path searches never
    /// traverse it.
    pub fn add_virtual_link(&mut self, link: Link) -> LinkId {
        let id = self.links.len();
        self.link_ids.insert(link.id().to_string(), id);
        self.links.push(link);
        id
    }

    /// Link by id.
    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id]
    }

    /// Mutable link by id.
    pub fn link_mut(&mut self, id: LinkId) -> &mut Link {
        &mut self.links[id]
    }

    /// Link id by name, if it exists.
    pub fn link_id(&self, name: &str) -> Option<LinkId> {
        self.link_ids.get(name).copied()
    }

    /// All links, id order.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Mlag group by name.
    pub fn mlag(&self, name: &str) -> Option<&Mlag> {
        self.mlags.get(name)
    }

    /// Registers a host, attaching it to every switch it reports a
    /// connection on.
    pub fn add_host(&mut self, host: Host) -> Result<(), NetworkError> {
        for (sw, port) in host.conns() {
            let id = self
                .switch_id(sw)
                .ok_or_else(|| NetworkError::UnknownSwitch(sw.clone()))?;
            self.switches[id].add_host(host.name(), *port);
        }
        self.hosts.insert(host.name().to_string(), host);
        Ok(())
    }

    /// Host record by name.
    pub fn host(&self, name: &str) -> Option<&Host> {
        self.hosts.get(name)
    }

    /// The switch a host attaches to (its first connection) and the port
    /// used there.
    pub fn host_switch(&self, name: &str) -> Result<(SwitchId, i32), NetworkError> {
        let host = self
            .hosts
            .get(name)
            .ok_or_else(|| NetworkError::UnknownHost(name.to_string()))?;
        let (sw, port) = host
            .conns()
            .first()
            .ok_or_else(|| NetworkError::UnknownHost(name.to_string()))?;
        let id = self
            .switch_id(sw)
            .ok_or_else(|| NetworkError::UnknownSwitch(sw.clone()))?;
        Ok((id, *port))
    }
}
