//! Typed payloads attached to table entries.
//!
//! Several strategies may keep state on the same measurement entry. Each
//! payload type carries a fixed numeric type id and is stored under it;
//! a strategy never looks at payloads stored under other ids.

use std::any::Any;
use std::collections::HashMap;
use std::collections::hash_map;

/// A payload that can be attached to a table entry.
pub trait StrategyInfo: Any {
    /// Tag distinguishing this payload from other strategies' payloads.
    const TYPE_ID: i32;
}

/// Payloads of one table entry, at most one per type id.
#[derive(Default)]
pub struct StrategyInfoStore {
    items: HashMap<i32, Box<dyn Any>>,
}

impl StrategyInfoStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Payload of type `T`, if attached.
    pub fn get<T: StrategyInfo>(&self) -> Option<&T> {
        self.items.get(&T::TYPE_ID)?.downcast_ref()
    }

    /// Mutable payload of type `T`, if attached.
    pub fn get_mut<T: StrategyInfo>(&mut self) -> Option<&mut T> {
        self.items.get_mut(&T::TYPE_ID)?.downcast_mut()
    }

    /// Return the payload of type `T`, attaching `make()` first if absent.
    ///
    /// The flag is `true` when a new payload was attached. A payload of a
    /// different type stored under the same id is replaced.
    pub fn insert<T: StrategyInfo>(&mut self, make: impl FnOnce() -> T) -> (&mut T, bool) {
        let (slot, inserted) = match self.items.entry(T::TYPE_ID) {
            hash_map::Entry::Occupied(slot) if slot.get().is::<T>() => (slot.into_mut(), false),
            hash_map::Entry::Occupied(mut slot) => {
                tracing::warn!(type_id = T::TYPE_ID, "replacing foreign payload with same type id");
                slot.insert(Box::new(make()));
                (slot.into_mut(), true)
            }
            hash_map::Entry::Vacant(slot) => (slot.insert(Box::new(make()) as Box<dyn Any>), true),
        };

        let Some(info) = slot.downcast_mut::<T>() else {
            unreachable!("payload under type id {} was just checked", T::TYPE_ID);
        };
        (info, inserted)
    }

    /// Detach the payload of type `T`. Returns whether one was attached.
    pub fn erase<T: StrategyInfo>(&mut self) -> bool {
        match self.items.get(&T::TYPE_ID) {
            Some(item) if item.is::<T>() => self.items.remove(&T::TYPE_ID).is_some(),
            _ => false,
        }
    }

    /// Detach every payload.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Number of attached payloads.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no payload is attached.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl std::fmt::Debug for StrategyInfoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.items.keys()).finish()
    }
}
