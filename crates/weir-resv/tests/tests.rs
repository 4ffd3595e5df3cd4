use rstest::rstest;

use weir_ledger::Window;
use weir_network::{Host, LinkEntry, Network, NetworkError, TopologyDefaults};
use weir_resv::{ControllerConfig, Pledge, PledgeKind, ReservationError, ReservationManager};

// far enough ahead that the wall clock never catches up during a test run
const BASE: i64 = 2_000_000_000;

fn entry(src: &str, sport: i32, dst: &str, dport: i32, capacity: i64) -> LinkEntry {
    serde_json::from_str(&format!(
        r#"{{ "Src-switch": "{}", "Src-port": {}, "Dst-switch": "{}", "Dst-port": {},
             "Type": "internal", "Direction": "bidirectional", "Capacity": {} }}"#,
        src, sport, dst, dport, capacity
    ))
    .unwrap()
}

/// A -- B -- C with h1 on A, h2 on C and h3 also on A.
fn linear_net(capacity: i64, defaults: &TopologyDefaults) -> Network {
    let entries = vec![entry("A", 1, "B", 2, capacity), entry("B", 3, "C", 4, capacity)];
    let mut net = Network::from_link_entries(&entries, defaults);

    let mut h1 = Host::new("h1", Some("10.0.0.1"), None);
    h1.add_conn("A", 10);
    net.add_host(h1).unwrap();

    let mut h2 = Host::new("h2", Some("10.0.0.2"), None);
    h2.add_conn("C", 11);
    net.add_host(h2).unwrap();

    let mut h3 = Host::new("h3", Some("10.0.0.3"), None);
    h3.add_conn("A", 12);
    net.add_host(h3).unwrap();

    net
}

fn manager_with(config: &str, capacity: i64) -> ReservationManager {
    let _ = env_logger::builder().is_test(true).try_init();
    let cfg = ControllerConfig::from_str(config).unwrap();
    let net = linear_net(capacity, &cfg.topology_defaults());
    ReservationManager::new(net, cfg)
}

fn manager(capacity: i64) -> ReservationManager {
    manager_with(&format!("default_link_capacity: {}", capacity), capacity)
}

fn physical_allocations(mgr: &ReservationManager, at: i64) -> Vec<i64> {
    ["A-B", "B-C"]
        .iter()
        .map(|name| {
            let net = mgr.network();
            net.link(net.link_id(name).unwrap()).get_allocation(at)
        })
        .collect()
}

#[test]
fn reserve_release_round_trip() {
    let mut mgr = manager(1000);

    let pledge = mgr.reserve("r1", "alice", "h1", "h2", BASE, BASE + 100, 400).unwrap();
    assert_eq!(pledge.id(), "r1");
    assert_eq!(pledge.queue_id(), "Resr1");
    assert_eq!(mgr.len(), 1);

    // each link carries the amount in both directions on one shared ledger
    assert_eq!(physical_allocations(&mgr, BASE + 50), vec![800, 800]);

    let released = mgr.release("r1").unwrap();
    assert_eq!(released.id(), "r1");
    assert_eq!(mgr.len(), 0);
    assert_eq!(physical_allocations(&mgr, BASE + 50), vec![0, 0]);

    // the capacity is usable again by someone else
    assert!(mgr.reserve("r2", "bob", "h1", "h2", BASE, BASE + 100, 400).is_ok());
}

#[test]
fn duplicate_id_is_rejected() {
    let mut mgr = manager(1000);
    mgr.reserve("r1", "alice", "h1", "h2", BASE, BASE + 100, 100).unwrap();

    let err = mgr.reserve("r1", "alice", "h1", "h2", BASE + 200, BASE + 300, 100).unwrap_err();
    assert!(matches!(err, ReservationError::Duplicate(_)));
    assert_eq!(mgr.len(), 1);
}

#[test]
fn backwards_window_is_rejected() {
    let mut mgr = manager(1000);
    let err = mgr.reserve("r1", "alice", "h1", "h2", BASE + 100, BASE, 100).unwrap_err();
    assert!(matches!(err, ReservationError::Window(_)));
}

#[test]
fn unknown_host_is_rejected() {
    let mut mgr = manager(1000);
    let err = mgr.reserve("r1", "alice", "h1", "nosuch", BASE, BASE + 100, 100).unwrap_err();
    assert!(matches!(err, ReservationError::Network(NetworkError::UnknownHost(_))));
}

#[test]
fn saturated_topology_yields_no_path() {
    let mut mgr = manager(1000);
    let net = mgr.network();
    net.link(net.link_id("A-B").unwrap())
        .inc_utilisation(BASE, BASE + 100, 1000, None)
        .unwrap();

    let err = mgr.reserve("r1", "alice", "h1", "h2", BASE, BASE + 100, 1).unwrap_err();
    assert!(matches!(err, ReservationError::Network(NetworkError::NoPath { .. })));
}

#[test]
fn rejection_leaves_topology_untouched() {
    let mut mgr = manager(1000);

    // the search finds a path for 600 but the two-direction vetting cannot
    assert!(mgr.reserve("r1", "alice", "h1", "h2", BASE, BASE + 100, 600).is_err());
    assert_eq!(mgr.len(), 0);
    assert_eq!(physical_allocations(&mgr, BASE + 50), vec![0, 0]);

    // a request the links can carry still goes through afterwards
    assert!(mgr.reserve("r2", "alice", "h1", "h2", BASE, BASE + 100, 400).is_ok());
}

#[test]
fn same_switch_hosts_ride_a_virtual_link() {
    let mut mgr = manager(1000);
    let links_before = mgr.network().num_links();

    mgr.reserve("r1", "alice", "h1", "h3", BASE, BASE + 100, 300).unwrap();

    // one virtual link appeared; the physical links were never touched
    assert_eq!(mgr.network().num_links(), links_before + 1);
    assert_eq!(physical_allocations(&mgr, BASE + 50), vec![0, 0]);

    let net = mgr.network();
    let vlink = net.link(net.link_id("A.10.12").unwrap());
    assert_eq!(vlink.get_allocation(BASE + 50), 600);
}

#[rstest]
#[case(200, false)] // 400 on top of 400 breaks alice's 500 fence
#[case(50, true)] // 100 more still fits
fn user_fence_caps_cumulative_usage(#[case] amount: i64, #[case] ok: bool) {
    let config = "default_link_capacity: 1000\nusers:\n  - name: alice\n    cap: 50\n";
    let mut mgr = manager_with(config, 1000);

    // alice's first reservation books 2 x 200 per link, half her 50% cap
    mgr.reserve("r1", "alice", "h1", "h2", BASE, BASE + 100, 200).unwrap();

    let second = mgr.reserve("r2", "alice", "h1", "h2", BASE, BASE + 100, amount);
    assert_eq!(second.is_ok(), ok);
}

#[test]
fn release_of_unknown_id_fails() {
    let mut mgr = manager(1000);
    assert!(matches!(mgr.release("nope"), Err(ReservationError::Unknown(_))));
}

#[test]
fn sweep_keeps_active_pledges() {
    let mut mgr = manager(1000);
    mgr.reserve("r1", "alice", "h1", "h2", BASE, BASE + 100, 100).unwrap();

    assert_eq!(mgr.sweep_expired(), 0);
    assert_eq!(mgr.len(), 1);
}

#[test]
fn checkpoint_lists_pledges() {
    let mut mgr = manager(1000);
    mgr.reserve("r1", "alice", "h1", "h2", BASE, BASE + 100, 100).unwrap();
    mgr.reserve("r2", "bob", "h1", "h2", BASE + 200, BASE + 300, 100).unwrap();

    let v = mgr.checkpoint();
    let pledges = v["pledges"].as_array().unwrap();
    assert_eq!(pledges.len(), 2);
    assert_eq!(pledges[0]["id"], "r1");
    assert_eq!(pledges[0]["ptype"], "bandwidth");
    assert_eq!(pledges[1]["user"], "bob");
}

#[test]
fn pledge_state_follows_the_window() {
    let window = Window::new(BASE, BASE + 100).unwrap();
    let pledge = Pledge::new(
        "p1",
        "alice",
        window,
        PledgeKind::OneWayBandwidth {
            src: "h1".to_string(),
            dest: "135.0.0.7".to_string(),
            amount: 250,
        },
    );

    assert!(!pledge.is_active());
    assert!(!pledge.is_expired());
    assert_eq!(pledge.queue_id(), "Resp1");

    let v = serde_json::to_value(&pledge).unwrap();
    assert_eq!(v["ptype"], "one_way_bandwidth");
    assert_eq!(v["amount"], 250);
}

#[test]
fn config_defaults_and_overrides() {
    let cfg = ControllerConfig::from_str("{}").unwrap();
    assert_eq!(cfg.default_link_capacity, 10_000_000_000);
    assert_eq!(cfg.user_cap, 100);
    assert_eq!(cfg.alarm_percent, 0);
    assert!(cfg.users.is_empty());

    let cfg = ControllerConfig::from_str(
        "default_link_capacity: 5000\nalarm_percent: 90\nusers:\n  - name: alice\n    cap: 40\n",
    )
    .unwrap();
    assert_eq!(cfg.default_link_capacity, 5000);
    assert_eq!(cfg.alarm_percent, 90);
    assert_eq!(cfg.user_cap_for("alice"), 40);
    assert_eq!(cfg.user_cap_for("bob"), 100);
}
