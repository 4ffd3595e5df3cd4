//! Controller configuration.

use serde::{Deserialize, Serialize};

use weir_ledger::Capacity;
use weir_network::TopologyDefaults;

/// Holds raw controller config parsed from YAML file.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
struct RawControllerConfig {
    pub default_link_capacity: Option<Capacity>,
    pub user_cap: Option<Capacity>,
    pub alarm_percent: Option<i32>,
    pub topology_file: Option<String>,
    pub users: Option<Vec<UserConfig>>,
}

/// Per-user reservation limits.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct UserConfig {
    /// User (project/tenant) name.
    pub name: String,
    /// Cap on the user's allocation per link: a percentage of link
    /// capacity when 100 or less, an absolute value otherwise.
    pub cap: Capacity,
}

/// Represents controller configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct ControllerConfig {
    /// Capacity assumed for links the controller does not report one for
    /// (bits/sec).
    pub default_link_capacity: Capacity,
    /// Default per-user cap applied where no [`UserConfig`] entry exists.
    pub user_cap: Capacity,
    /// Utilisation percentage at which links raise an alarm (0 disables).
    pub alarm_percent: i32,
    /// Path of the controller link-list file to bootstrap the topology
    /// from.
    pub topology_file: Option<String>,
    /// Per-user limit overrides.
    pub users: Vec<UserConfig>,
}

impl ControllerConfig {
    /// Creates controller config by reading parameter values from YAML
    /// file (uses default values if some parameters are absent).
    pub fn from_file(file_name: &str) -> Self {
        let raw = std::fs::read_to_string(file_name).unwrap_or_else(|_| panic!("Can't read file {}", file_name));
        Self::from_str(&raw).unwrap_or_else(|_| panic!("Can't parse YAML from file {}", file_name))
    }

    /// Creates controller config from a YAML string.
    pub fn from_str(data: &str) -> Result<Self, serde_yaml::Error> {
        let raw: RawControllerConfig = serde_yaml::from_str(data)?;
        Ok(Self {
            default_link_capacity: raw.default_link_capacity.unwrap_or(10_000_000_000),
            user_cap: raw.user_cap.unwrap_or(100),
            alarm_percent: raw.alarm_percent.unwrap_or(0),
            topology_file: raw.topology_file,
            users: raw.users.unwrap_or_default(),
        })
    }

    /// The cap configured for a user, or the default.
    pub fn user_cap_for(&self, user: &str) -> Capacity {
        self.users
            .iter()
            .find(|u| u.name == user)
            .map(|u| u.cap)
            .unwrap_or(self.user_cap)
    }

    /// The topology defaults this configuration implies.
    pub fn topology_defaults(&self) -> TopologyDefaults {
        TopologyDefaults {
            capacity: self.default_link_capacity,
            alarm_percent: self.alarm_percent,
            usr_max: self.user_cap,
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::from_str("{}").unwrap()
    }
}
