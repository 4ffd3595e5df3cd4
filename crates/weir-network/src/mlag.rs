//! Multi-chassis link aggregation groups.

use std::cell::RefCell;
use std::rc::Rc;

use log::info;

use weir_ledger::{Capacity, Fence, Obligation, Timestamp};

/// A named group of links whose utilisation must move together.
///
/// Members are tracked by obligation rather than by link so that a bonded
/// pair, which shares one obligation, is only adjusted once.
#[derive(Debug, Clone)]
pub struct Mlag {
    name: String,
    members: Vec<Rc<RefCell<Obligation>>>,
}

impl Mlag {
    /// Creates a group with one initial member.
    pub fn new(name: &str, member: Rc<RefCell<Obligation>>) -> Self {
        Self {
            name: name.to_string(),
            members: vec![member],
        }
    }

    /// Group name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of distinct obligations in the group.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True when the group has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Adds a member; an obligation already in the group is not added
    /// twice.
    pub fn add_member(&mut self, member: &Rc<RefCell<Obligation>>) {
        if !self.members.iter().any(|m| Rc::ptr_eq(m, member)) {
            self.members.push(Rc::clone(member));
        }
    }

    /// Removes a member from the group.
    pub fn rm_member(&mut self, member: &Rc<RefCell<Obligation>>) {
        self.members.retain(|m| !Rc::ptr_eq(m, member));
    }

    /// Adjusts every member except `skip`, which the caller already
    /// adjusted when it committed the triggering reservation.
    pub fn inc_utilisation(
        &self,
        commence: Timestamp,
        conclude: Timestamp,
        delta: Capacity,
        usr: Option<&Fence>,
        skip: &Rc<RefCell<Obligation>>,
    ) {
        for member in &self.members {
            if !Rc::ptr_eq(member, skip) {
                if let Some(msg) = member.borrow_mut().inc_utilisation(commence, conclude, delta, usr) {
                    info!("utilisation increased for mlag {}: {}", self.name, msg);
                }
            }
        }
    }
}
