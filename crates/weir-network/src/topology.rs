//! Topology bootstrap from a controller link list.

use std::path::Path as FsPath;

use log::info;
use serde::Deserialize;

use weir_ledger::Capacity;

use crate::error::NetworkError;
use crate::link::Link;
use crate::network::Network;

/// One entry of the controller's link list. The dashed field names are
/// the controller's own; existing link dumps must parse unchanged.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkEntry {
    /// Switch the link leaves from.
    #[serde(rename = "Src-switch")]
    pub src_switch: String,
    /// Port on the source switch.
    #[serde(rename = "Src-port")]
    pub src_port: i32,
    /// Switch the link arrives at.
    #[serde(rename = "Dst-switch")]
    pub dst_switch: String,
    /// Port on the destination switch.
    #[serde(rename = "Dst-port")]
    pub dst_port: i32,
    /// Link type as reported by the controller (informational).
    #[serde(rename = "Type", default)]
    pub link_type: Option<String>,
    /// `bidirectional` (the default) or `unidirectional`.
    #[serde(rename = "Direction", default)]
    pub direction: Option<String>,
    /// Link capacity; falls back to the topology default when absent.
    #[serde(rename = "Capacity", default)]
    pub capacity: Option<Capacity>,
    /// Mlag group name, for controllers that report aggregation.
    #[serde(rename = "Mlag", default)]
    pub mlag: Option<String>,
}

/// Settings applied to links the controller does not fully describe.
#[derive(Debug, Clone)]
pub struct TopologyDefaults {
    /// Capacity for entries without one (bits/sec).
    pub capacity: Capacity,
    /// Alarm threshold handed to every obligation (percent, 0 disables).
    pub alarm_percent: i32,
    /// Per-request user cap (percent when 100 or less, else absolute).
    pub usr_max: Capacity,
}

impl Default for TopologyDefaults {
    fn default() -> Self {
        Self {
            capacity: 10_000_000_000,
            alarm_percent: 0,
            usr_max: 100,
        }
    }
}

impl Network {
    /// Builds a topology from controller link entries. Switches are
    /// created on first mention; a bidirectional entry (or a pair of
    /// opposite entries) produces two links bonded to one obligation.
    pub fn from_link_entries(entries: &[LinkEntry], defaults: &TopologyDefaults) -> Network {
        let mut net = Network::new();
        for entry in entries {
            net.absorb_entry(entry, defaults);
        }
        info!(
            "topology: built {} switches and {} links from {} entries",
            net.num_switches(),
            net.num_links(),
            entries.len()
        );
        net
    }

    /// Builds a topology from the controller's JSON link list.
    pub fn from_json(data: &str, defaults: &TopologyDefaults) -> Result<Network, NetworkError> {
        let entries: Vec<LinkEntry> = serde_json::from_str(data)?;
        Ok(Self::from_link_entries(&entries, defaults))
    }

    /// Builds a topology from a link-list file.
    pub fn from_file<P: AsRef<FsPath>>(path: P, defaults: &TopologyDefaults) -> Result<Network, NetworkError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data, defaults)
    }

    fn absorb_entry(&mut self, entry: &LinkEntry, defaults: &TopologyDefaults) {
        let backward = self.get_or_add_switch(&entry.src_switch);
        let forward = self.get_or_add_switch(&entry.dst_switch);

        let fwd_name = format!("{}-{}", entry.src_switch, entry.dst_switch);
        let rev_name = format!("{}-{}", entry.dst_switch, entry.src_switch);

        let fwd_id = match self.link_id(&fwd_name) {
            Some(id) => id,
            None => {
                // a previously seen opposite entry means this is the other
                // direction of the same medium: bond to its obligation
                let mut link = match self.link_id(&rev_name) {
                    Some(rid) => Link::bonded_reverse(self.link(rid)),
                    None => Link::new(
                        &entry.src_switch,
                        &entry.dst_switch,
                        backward,
                        forward,
                        entry.capacity.unwrap_or(defaults.capacity),
                        defaults.alarm_percent,
                        defaults.usr_max,
                    ),
                };
                if let Some(mlag) = &entry.mlag {
                    link.set_mlag(mlag);
                }
                self.add_link(link)
            }
        };
        self.link_mut(fwd_id).set_ports(entry.src_port, entry.dst_port);

        let unidirectional = matches!(&entry.direction, Some(d) if d.eq_ignore_ascii_case("unidirectional"));
        if !unidirectional && self.link_id(&rev_name).is_none() {
            let rev = Link::bonded_reverse(self.link(fwd_id));
            self.add_link(rev);
        }
    }
}
