//! Graph node with adjacency and host attachments.

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::network::LinkId;

/// A switch in the topology.
///
/// Holds the outgoing links (the adjacency used by path finding) and the
/// hosts attached to it with their ports. Search scratch state lives with
/// the search itself, not here, so the switch is never mutated by a path
/// search.
#[derive(Debug, Clone, Serialize)]
pub struct Switch {
    id: String,
    #[serde(skip)]
    links: Vec<LinkId>,
    #[serde(skip)]
    hosts: FxHashMap<String, i32>,
}

impl Switch {
    /// Creates a switch with the given id (usually the DPID).
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            links: Vec::new(),
            hosts: FxHashMap::default(),
        }
    }

    /// Switch id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Adds an outgoing link.
    pub fn add_link(&mut self, link: LinkId) {
        self.links.push(link);
    }

    /// Outgoing links in insertion order.
    pub fn links(&self) -> &[LinkId] {
        &self.links
    }

    /// Attaches a host on the given port.
    pub fn add_host(&mut self, host: &str, port: i32) {
        self.hosts.insert(host.to_string(), port);
    }

    /// True if the named host is attached here.
    pub fn has_host(&self, host: &str) -> bool {
        self.hosts.contains_key(host)
    }

    /// Port the named host attaches to, if attached here.
    pub fn host_port(&self, host: &str) -> Option<i32> {
        self.hosts.get(host).copied()
    }

    /// Names of the attached hosts.
    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.hosts.keys().map(String::as_str)
    }
}

impl std::fmt::Display for Switch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "switch: {} links={} hosts={}", self.id, self.links.len(), self.hosts.len())
    }
}
