use serde_json::json;

use crate::fence::Fence;
use crate::obligation::{valid_obligation_time, Obligation, OBLIGATION_HORIZON, PRIORITY_QUEUE};
use crate::time_slice::TimeSlice;
use crate::window::{Window, WindowState};
use crate::{CapacityError, WindowError};

// far enough ahead that the wall clock never catches up during a test run
const BASE: i64 = 2_000_000_000;

#[test]
fn slice_split_mid() {
    let mut ts = TimeSlice::new(100, 200, 10);
    ts.add_queue(2, "r1", "sw1/1", 10);

    let tail = ts.split(150).unwrap();
    assert_eq!(ts.commence(), 100);
    assert_eq!(ts.conclude(), 149);
    assert_eq!(tail.commence(), 150);
    assert_eq!(tail.conclude(), 200);
    assert_eq!(tail.amount(), 10);
    // queues are deep copied into the successor
    assert_eq!(tail.queue_info("r1"), Some((2, "sw1/1")));
    assert_eq!(ts.queue_info("r1"), Some((2, "sw1/1")));
}

#[test]
fn slice_split_at_boundary_is_noop() {
    let mut ts = TimeSlice::new(100, 200, 10);
    assert!(ts.split(100).is_none());
    assert!(ts.split(200).is_none());
    assert!(ts.split(99).is_none());
    assert!(ts.split(201).is_none());
    assert_eq!(ts.commence(), 100);
    assert_eq!(ts.conclude(), 200);
}

#[test]
fn slice_overlap_includes_containment() {
    let ts = TimeSlice::new(100, 200, 0);
    assert!(ts.overlaps(150, 160));
    assert!(ts.overlaps(50, 150));
    assert!(ts.overlaps(150, 250));
    assert!(ts.overlaps(50, 250)); // window strictly spans the slice
    assert!(!ts.overlaps(10, 99));
    assert!(!ts.overlaps(201, 300));
}

#[test]
fn utilisation_splits_and_accumulates() {
    let mut ob = Obligation::new(1000);

    ob.inc_utilisation(BASE, BASE + 100, 400, None);
    assert_eq!(ob.slices().len(), 3);
    assert_eq!(ob.get_allocation(BASE - 1), 0);
    assert_eq!(ob.get_allocation(BASE), 400);
    assert_eq!(ob.get_allocation(BASE + 100), 400);
    assert_eq!(ob.get_allocation(BASE + 101), 0);

    // overlapping second request lands on the already split slices
    ob.inc_utilisation(BASE + 50, BASE + 150, 300, None);
    assert_eq!(ob.get_allocation(BASE + 25), 400);
    assert_eq!(ob.get_allocation(BASE + 75), 700);
    assert_eq!(ob.get_allocation(BASE + 125), 300);
    assert_eq!(ob.get_allocation(BASE + 175), 0);
}

#[test]
fn capacity_vetting_fails_on_worst_slice() {
    let mut ob = Obligation::new(1000);
    ob.inc_utilisation(BASE, BASE + 100, 800, None);

    assert!(ob.has_capacity(BASE + 200, BASE + 300, 900, None).is_ok());
    match ob.has_capacity(BASE + 50, BASE + 300, 300, None) {
        Err(CapacityError::OverCapacity { need, have }) => {
            assert_eq!(need, 1100); // 800 committed plus the 300 requested
            assert_eq!(have, 1000);
        }
        other => panic!("expected over capacity, got {:?}", other),
    }
}

#[test]
fn capacity_error_message_format() {
    let err = CapacityError::OverCapacity { need: 1200, have: 1000 };
    assert_eq!(err.to_string(), "link lacks capacity: need 1200 have 1000");
}

#[test]
fn dec_clamps_at_zero() {
    let mut ob = Obligation::new(1000);
    ob.inc_utilisation(BASE, BASE + 100, 300, None);
    ob.dec_utilisation(BASE, BASE + 100, 500, None);
    assert_eq!(ob.get_allocation(BASE + 50), 0);
}

#[test]
fn release_restores_capacity_exactly() {
    let mut ob = Obligation::new(1000);
    ob.inc_utilisation(BASE, BASE + 100, 600, None);
    ob.inc_utilisation(BASE + 20, BASE + 80, 300, None);
    ob.dec_utilisation(BASE + 20, BASE + 80, 300, None);
    ob.dec_utilisation(BASE, BASE + 100, 600, None);

    assert_eq!(ob.get_allocation(BASE + 50), 0);
    assert!(ob.has_capacity(BASE, BASE + 100, 1000, None).is_ok());
}

#[test]
fn queue_numbers_assigned_lowest_free() {
    let mut ob = Obligation::new(1000);

    let (q1, _) = ob.add_queue("res1", "sw1/1", 100, BASE, BASE + 100, None).unwrap();
    let (q2, _) = ob.add_queue("res2", "sw1/2", 100, BASE + 50, BASE + 150, None).unwrap();
    assert_eq!(q1, 2);
    assert_eq!(q2, 3);

    // a window that touches neither reservation reuses the lowest number
    let (q3, _) = ob.add_queue("res3", "sw1/3", 100, BASE + 200, BASE + 300, None).unwrap();
    assert_eq!(q3, 2);
}

#[test]
fn priority_ids_map_to_reserved_queue() {
    let mut ob = Obligation::new(1000);
    let (qin, _) = ob.add_queue("priority-in", "sw1/1", 100, BASE, BASE + 100, None).unwrap();
    let (qout, _) = ob.add_queue("priority-out", "sw1/2", 100, BASE, BASE + 100, None).unwrap();
    assert_eq!(qin, PRIORITY_QUEUE);
    assert_eq!(qout, PRIORITY_QUEUE);
}

#[test]
fn queue_lookup_by_time() {
    let mut ob = Obligation::new(1000);
    ob.add_queue("res1", "sw1/1", 100, BASE, BASE + 100, None).unwrap();

    assert_eq!(ob.get_queue("res1", BASE + 50), 2);
    assert_eq!(ob.get_queue("res1", BASE + 500), 0);
    assert_eq!(ob.get_queue("unknown", BASE + 50), 0);
}

#[test]
fn queue_amount_follows_inc_dec() {
    let mut ob = Obligation::new(1000);
    ob.add_queue("res1", "sw1/1", 100, BASE, BASE + 100, None).unwrap();
    ob.inc_queue("res1", 50, BASE, BASE + 100, None);
    assert_eq!(ob.get_allocation(BASE + 10), 150);

    ob.dec_queue("res1", 150, BASE, BASE + 100, None);
    assert_eq!(ob.get_allocation(BASE + 10), 0);
    // the queue survives with its number even at zero bandwidth
    assert_eq!(ob.get_queue("res1", BASE + 10), 2);
}

#[test]
fn queues_str_lists_switch_commands() {
    let mut ob = Obligation::new(1000);
    ob.add_queue("res1", "sw1/1", 100, BASE, BASE + 100, None).unwrap();
    let s = ob.queues_str(BASE + 10);
    assert_eq!(s, "sw1/1,res1,2,100,100,200");
}

#[test]
fn alarm_raised_when_threshold_crossed() {
    let mut ob = Obligation::with_alarm(1000, 50);
    let msg = ob.inc_utilisation(BASE, BASE + 100, 400, None);
    assert!(msg.is_none());
    let msg = ob.inc_utilisation(BASE, BASE + 100, 200, None);
    assert!(msg.unwrap().contains("encroaches"));
}

#[test]
fn user_fence_enforced_per_slice() {
    let mut ob = Obligation::new(1000);
    // limits of 100 or less scale as percentages: 50% of 1000 is 500
    let bob = Fence::new("bob", 50, 0, 0);

    ob.inc_utilisation(BASE, BASE + 100, 400, Some(&bob));
    assert!(ob.has_capacity(BASE, BASE + 100, 100, Some("bob")).is_ok());

    match ob.has_capacity(BASE, BASE + 100, 200, Some("bob")) {
        Err(CapacityError::OverUserLimit { user, need, have }) => {
            assert_eq!(user, "bob");
            assert_eq!(need, 600);
            assert_eq!(have, 500);
        }
        other => panic!("expected user limit rejection, got {:?}", other),
    }

    // a different user is unconstrained until they reserve
    assert!(ob.has_capacity(BASE, BASE + 100, 600, Some("alice")).is_ok());
}

#[test]
fn user_fence_copied_on_split() {
    let mut ob = Obligation::new(1000);
    let bob = Fence::new("bob", 500, 0, 0);
    ob.inc_utilisation(BASE, BASE + 100, 400, Some(&bob));

    // splitting inside bob's window must not lose his usage in either part
    ob.inc_utilisation(BASE + 50, BASE + 60, 100, None);
    for at in [BASE + 10, BASE + 55, BASE + 90] {
        let ts = ob.slices().iter().find(|ts| ts.includes(at)).unwrap();
        assert_eq!(ts.user_fence("bob").unwrap().value(), 400, "at {}", at);
    }
}

#[test]
fn adjustment_outside_live_slices_is_a_noop() {
    let mut ob = Obligation::new(1000);
    ob.inc_utilisation(BASE, BASE + 100, 400, None);
    ob.prune(BASE + 200);
    ob.inc_utilisation(BASE + 300, BASE + 400, 500, None);

    // releasing the pruned reservation must not drain the live slice
    ob.dec_utilisation(BASE, BASE + 100, 400, None);
    assert_eq!(ob.get_allocation(BASE + 350), 500);
    assert!(ob.has_capacity(BASE + 300, BASE + 400, 500, None).is_ok());
}

#[test]
fn prune_discards_leading_history() {
    let mut ob = Obligation::new(1000);
    ob.inc_utilisation(BASE, BASE + 100, 400, None);
    assert_eq!(ob.slices().len(), 3);

    ob.prune(BASE + 200);
    assert_eq!(ob.slices().len(), 1);
    assert_eq!(ob.slices()[0].conclude(), OBLIGATION_HORIZON);
}

#[test]
fn obligation_time_bounds() {
    assert!(valid_obligation_time(BASE));
    assert!(valid_obligation_time(OBLIGATION_HORIZON));
    assert!(!valid_obligation_time(OBLIGATION_HORIZON + 1));
    assert!(!valid_obligation_time(100)); // long past
}

#[test]
fn obligation_json_shape() {
    let mut ob = Obligation::new(1000);
    ob.add_queue("res1", "sw1/1", 100, BASE, BASE + 100, None).unwrap();
    ob.prune(BASE); // drop history so the shape is predictable

    let v = serde_json::to_value(&ob).unwrap();
    assert_eq!(v["max_capacity"], json!(1000));
    assert_eq!(v["alarm"], json!(1000));

    let slices = v["timeslices"].as_array().unwrap();
    assert_eq!(slices.len(), 2);
    assert_eq!(slices[0]["commence"], json!(BASE));
    assert_eq!(slices[0]["conclude"], json!(BASE + 100));
    assert_eq!(slices[0]["amt"], json!(100));

    let q = &slices[0]["queues"][0];
    assert_eq!(q["num"], json!(2));
    assert_eq!(q["pri"], json!(200));
    assert_eq!(q["bandw"], json!(100));
    assert_eq!(q["id"], json!("res1"));
    assert_eq!(q["eref"], json!("sw1/1"));
}

#[test]
fn fence_json_shape() {
    let f = Fence::new("bob", 500, 10, 120);
    let v = serde_json::to_value(&f).unwrap();
    assert_eq!(v, json!({ "name": "bob", "max": 500, "min": 10, "value": 120 }));
}

#[test]
fn fence_percentage_scaling() {
    let f = Fence::new("bob", 50, 10, 0);
    let scaled = f.clone_with_capacity(10_000);
    assert_eq!(scaled.limit_max(), 5000);
    assert_eq!(scaled.limit_min(), 1000);

    // absolute limits pass through untouched
    let f = Fence::new("bob", 5000, 101, 0);
    let scaled = f.clone_with_capacity(10_000);
    assert_eq!(scaled.limit_max(), 5000);
    assert_eq!(scaled.limit_min(), 101);
}

#[test]
fn fence_inc_clips_at_limits() {
    let mut f = Fence::new("bob", 100, 0, 0);
    assert!(f.inc_if_room(60));
    assert!(!f.inc_if_room(60));
    assert_eq!(f.value(), 60);

    f.inc_used(100);
    assert_eq!(f.value(), 100);
    f.inc_used(-500);
    assert_eq!(f.value(), 0);
}

#[test]
fn window_vetting() {
    let now = BASE;

    // commence in the past is clamped to now
    let w = Window::vet(now, now - 100, now + 100).unwrap();
    assert_eq!(w.values(), (now, now + 100));

    assert_eq!(
        Window::vet(now, now, now - 5),
        Err(WindowError::Expired { now, expiry: now - 5 })
    );
    assert_eq!(
        Window::vet(now, now, OBLIGATION_HORIZON + 1),
        Err(WindowError::BeyondHorizon { expiry: OBLIGATION_HORIZON + 1 })
    );
}

#[test]
fn window_states() {
    let now = BASE;
    let w = Window::vet(now, now + 100, now + 200).unwrap();

    assert_eq!(w.state(now), WindowState::Pending);
    assert_eq!(w.state(now + 150), WindowState::Active);
    assert_eq!(w.state(now + 200), WindowState::Expired);

    assert!(w.is_pending(now));
    assert!(w.is_active(now + 150));
    assert!(w.is_expired(now + 200));
    assert!(w.is_active_soon(now, 100));
    assert!(!w.is_active_soon(now, 50));
    assert!(w.commenced_recently(now + 110, 30));
    assert!(w.concluded_recently(now + 220, 30));
    assert!(w.is_extinct(now + 500, 300));
    assert!(!w.is_extinct(now + 210, 300));
}

#[test]
fn window_overlap_excludes_touching_endpoints() {
    let now = BASE;
    let w = Window::vet(now, now + 100, now + 200).unwrap();

    assert!(w.overlaps(&Window::vet(now, now + 150, now + 160).unwrap()));
    assert!(w.overlaps(&Window::vet(now, now + 50, now + 150).unwrap()));
    assert!(w.overlaps(&Window::vet(now, now + 150, now + 250).unwrap()));
    assert!(w.overlaps(&Window::vet(now, now + 50, now + 250).unwrap()));
    // touching only at an endpoint is not overlap
    assert!(!w.overlaps(&Window::vet(now, now + 200, now + 250).unwrap()));
    assert!(!w.overlaps(&Window::vet(now, now + 20, now + 100).unwrap()));
}
