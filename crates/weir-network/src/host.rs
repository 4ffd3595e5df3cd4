//! Host attachment records.

use serde::Serialize;

/// A host (VM or physical endpoint) and the switch ports it attaches to.
///
/// Hosts are identified by name (usually the MAC address). A host can be
/// attached to more than one switch when it is multi-homed.
#[derive(Debug, Clone, Serialize)]
pub struct Host {
    name: String,
    ip4: Option<String>,
    ip6: Option<String>,
    vmid: Option<String>,
    conns: Vec<(String, i32)>,
}

impl Host {
    /// Creates a host record with no attachments.
    pub fn new(name: &str, ip4: Option<&str>, ip6: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            ip4: ip4.map(str::to_string),
            ip6: ip6.map(str::to_string),
            vmid: None,
            conns: Vec::new(),
        }
    }

    /// Host name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Records the VM id assigned by the virtualisation layer.
    pub fn set_vmid(&mut self, vmid: &str) {
        self.vmid = Some(vmid.to_string());
    }

    /// VM id, when one has been recorded.
    pub fn vmid(&self) -> Option<&str> {
        self.vmid.as_deref()
    }

    /// IPv4 and IPv6 addresses.
    pub fn addresses(&self) -> (Option<&str>, Option<&str>) {
        (self.ip4.as_deref(), self.ip6.as_deref())
    }

    /// Attaches the host to a switch port.
    pub fn add_conn(&mut self, switch: &str, port: i32) {
        self.conns.push((switch.to_string(), port));
    }

    /// The switch/port attachments.
    pub fn conns(&self) -> &[(String, i32)] {
        &self.conns
    }

    /// Port the host uses on the named switch, if attached there.
    pub fn port_on(&self, switch: &str) -> Option<i32> {
        self.conns.iter().find(|(s, _)| s == switch).map(|(_, p)| *p)
    }
}
