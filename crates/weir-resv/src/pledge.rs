//! Pledge records.

use serde::Serialize;

use weir_ledger::{clock, Capacity, Timestamp, Window, WindowState};

/// What a pledge reserves; the variant payloads are the parameters the
/// enforcement layer needs to build flow-mods for that reservation type.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "ptype", rename_all = "snake_case")]
pub enum PledgeKind {
    /// Symmetric bandwidth between two hosts.
    Bandwidth {
        /// First endpoint.
        h1: String,
        /// Second endpoint.
        h2: String,
        /// Bandwidth per direction (bits/sec).
        amount: Capacity,
    },
    /// Bandwidth in one direction only, typically toward an external
    /// address.
    OneWayBandwidth {
        /// Sending host.
        src: String,
        /// Receiving host or external address.
        dest: String,
        /// Bandwidth (bits/sec).
        amount: Capacity,
    },
    /// Port mirroring to a collector.
    Mirror {
        /// Ports whose traffic is mirrored.
        ports: Vec<String>,
        /// Mirror target.
        output: String,
    },
    /// Traffic steering through middleboxes.
    Steer {
        /// Sending host.
        src: String,
        /// Receiving host.
        dest: String,
        /// Middleboxes the traffic must traverse, in order.
        middleboxes: Vec<String>,
    },
    /// Permission for a host to send tagged traffic untouched.
    Passthrough {
        /// The host granted passthrough.
        host: String,
    },
}

/// A reservation record: who asked for what, over which window.
///
/// The lifecycle (pending, active, expired) is derived from the window
/// rather than stored, so a pledge can never be in a state inconsistent
/// with the clock.
#[derive(Debug, Clone, Serialize)]
pub struct Pledge {
    id: String,
    user: String,
    window: Window,
    #[serde(flatten)]
    kind: PledgeKind,
}

impl Pledge {
    /// Creates a pledge.
    pub fn new(id: &str, user: &str, window: Window, kind: PledgeKind) -> Self {
        Self {
            id: id.to_string(),
            user: user.to_string(),
            window,
            kind,
        }
    }

    /// Reservation id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Owning user (project/tenant).
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Reservation window.
    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Mutable window access, for extensions and early cancellation.
    pub fn window_mut(&mut self) -> &mut Window {
        &mut self.window
    }

    /// The reservation payload.
    pub fn kind(&self) -> &PledgeKind {
        &self.kind
    }

    /// The queue id this pledge's queues are filed under.
    pub fn queue_id(&self) -> String {
        format!("Res{}", self.id)
    }

    /// Commence and expiry times.
    pub fn times(&self) -> (Timestamp, Timestamp) {
        self.window.values()
    }

    /// Lifecycle state against the wall clock.
    pub fn state(&self) -> WindowState {
        self.window.state(clock::unix_now())
    }

    /// True while the pledge window is current.
    pub fn is_active(&self) -> bool {
        self.state() == WindowState::Active
    }

    /// True once the pledge window has passed.
    pub fn is_expired(&self) -> bool {
        self.state() == WindowState::Expired
    }

    /// True if this pledge's window overlaps another's.
    pub fn overlaps(&self, other: &Pledge) -> bool {
        self.window.overlaps(&other.window)
    }
}
