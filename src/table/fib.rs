//! Forwarding-table entries.
//!
//! Only the parts the measurements need are modelled: the matched prefix and
//! its next hops.

use crate::core::FaceId;

use super::name::Name;

/// A next hop of a FIB entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextHop {
    /// Face to forward on.
    pub face_id: FaceId,
    /// Routing cost, lower is preferred.
    pub cost: u64,
}

/// Result of matching a name against the forwarding table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    prefix: Name,
    next_hops: Vec<NextHop>,
}

impl Entry {
    /// Create an entry with no next hops.
    pub fn new(prefix: Name) -> Self {
        Self {
            prefix,
            next_hops: Vec::new(),
        }
    }

    /// The namespace prefix this entry covers.
    pub fn prefix(&self) -> &Name {
        &self.prefix
    }

    /// Next hops ordered by ascending cost.
    pub fn next_hops(&self) -> &[NextHop] {
        &self.next_hops
    }

    /// Whether `face_id` is a next hop.
    pub fn has_next_hop(&self, face_id: FaceId) -> bool {
        self.next_hops.iter().any(|hop| hop.face_id == face_id)
    }

    /// Add a next hop, or update its cost if it already exists.
    pub fn add_or_update_next_hop(&mut self, face_id: FaceId, cost: u64) {
        match self.next_hops.iter_mut().find(|hop| hop.face_id == face_id) {
            Some(hop) => hop.cost = cost,
            None => self.next_hops.push(NextHop { face_id, cost }),
        }
        self.next_hops.sort_by_key(|hop| hop.cost);
    }

    /// Remove a next hop. Returns whether it was present.
    pub fn remove_next_hop(&mut self, face_id: FaceId) -> bool {
        let before = self.next_hops.len();
        self.next_hops.retain(|hop| hop.face_id != face_id);
        self.next_hops.len() != before
    }
}
