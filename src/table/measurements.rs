//! Eviction-based measurement table.
//!
//! Entries are keyed by name prefix and carry strategy payloads. Each entry
//! has an expiry that only moves forward; [`MeasurementsTable::evict_expired`]
//! removes entries whose expiry has passed, dropping their payloads.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::core::INITIAL_ENTRY_LIFETIME;
use crate::scheduler::{SchedulerHandle, deadline_after};

use super::fib;
use super::name::Name;
use super::strategy_info::{StrategyInfo, StrategyInfoStore};

/// A measurement entry.
#[derive(Debug)]
pub struct Entry {
    name: Name,
    expiry: Instant,
    strategy_info: StrategyInfoStore,
}

impl Entry {
    fn new(name: Name, expiry: Instant) -> Self {
        Self {
            name,
            expiry,
            strategy_info: StrategyInfoStore::new(),
        }
    }

    /// Prefix this entry is keyed by.
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Instant after which the entry may be evicted.
    pub fn expiry(&self) -> Instant {
        self.expiry
    }

    /// Keep the entry alive until at least `now + lifetime`.
    ///
    /// Never shortens the current expiry. Lifetimes beyond
    /// [`FAR_FUTURE`](crate::core::FAR_FUTURE) are capped to it. Returns
    /// whether the expiry moved.
    pub fn extend_lifetime(&mut self, now: Instant, lifetime: Duration) -> bool {
        let expiry = deadline_after(now, lifetime);
        if expiry <= self.expiry {
            return false;
        }
        self.expiry = expiry;
        true
    }

    /// Payload of type `T`, if attached.
    pub fn strategy_info<T: StrategyInfo>(&self) -> Option<&T> {
        self.strategy_info.get()
    }

    /// Mutable payload of type `T`, if attached.
    pub fn strategy_info_mut<T: StrategyInfo>(&mut self) -> Option<&mut T> {
        self.strategy_info.get_mut()
    }

    /// Return the payload of type `T`, attaching `make()` first if absent.
    pub fn insert_strategy_info<T: StrategyInfo>(
        &mut self,
        make: impl FnOnce() -> T,
    ) -> (&mut T, bool) {
        self.strategy_info.insert(make)
    }

    /// Detach the payload of type `T`.
    pub fn erase_strategy_info<T: StrategyInfo>(&mut self) -> bool {
        self.strategy_info.erase::<T>()
    }
}

/// Access to measurement entries, as seen by a strategy.
pub trait MeasurementsAccessor {
    /// Whether an entry exists for exactly `name`.
    fn contains(&self, name: &Name) -> bool;

    /// Entry for exactly `name`.
    fn find_exact_match(&mut self, name: &Name) -> Option<&mut Entry>;

    /// Entry for the longest prefix of `name` that has one.
    fn find_longest_prefix_match(&mut self, name: &Name) -> Option<&mut Entry>;

    /// Entry for `name`, created if absent.
    fn get_or_create(&mut self, name: &Name) -> &mut Entry;

    /// Entry for the prefix of a FIB entry, created if absent.
    fn get(&mut self, fib_entry: &fib::Entry) -> &mut Entry {
        self.get_or_create(fib_entry.prefix())
    }
}

/// Measurement table keyed by name prefix.
pub struct MeasurementsTable {
    scheduler: SchedulerHandle,
    entries: HashMap<Name, Entry>,
}

impl MeasurementsTable {
    /// Create an empty table using `scheduler` as its clock.
    pub fn new(scheduler: SchedulerHandle) -> Self {
        Self {
            scheduler,
            entries: HashMap::new(),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove the entry for exactly `name`. Returns whether one existed.
    pub fn erase(&mut self, name: &Name) -> bool {
        self.entries.remove(name).is_some()
    }

    /// Remove every entry whose expiry has passed.
    ///
    /// Payloads of evicted entries are dropped, which cancels any timer they
    /// hold. Returns the number of entries removed.
    pub fn evict_expired(&mut self) -> usize {
        let now = self.scheduler.now();
        let before = self.entries.len();
        self.entries.retain(|name, entry| {
            let keep = entry.expiry > now;
            if !keep {
                tracing::debug!(%name, "evicting measurement entry");
            }
            keep
        });
        before - self.entries.len()
    }
}

impl MeasurementsAccessor for MeasurementsTable {
    fn contains(&self, name: &Name) -> bool {
        self.entries.contains_key(name)
    }

    fn find_exact_match(&mut self, name: &Name) -> Option<&mut Entry> {
        self.entries.get_mut(name)
    }

    fn find_longest_prefix_match(&mut self, name: &Name) -> Option<&mut Entry> {
        let prefix = (0..=name.len())
            .rev()
            .map(|n| name.prefix(n))
            .find(|prefix| self.entries.contains_key(prefix))?;
        self.entries.get_mut(&prefix)
    }

    fn get_or_create(&mut self, name: &Name) -> &mut Entry {
        let now = self.scheduler.now();
        self.entries.entry(name.clone()).or_insert_with(|| {
            tracing::trace!(%name, "creating measurement entry");
            Entry::new(name.clone(), deadline_after(now, INITIAL_ENTRY_LIFETIME))
        })
    }
}

impl std::fmt::Debug for MeasurementsTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeasurementsTable")
            .field("entries", &self.entries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FAR_FUTURE;
    use crate::scheduler::{ManualScheduler, Scheduler};
    use std::rc::Rc;

    fn setup() -> (Rc<ManualScheduler>, MeasurementsTable) {
        let manual = Rc::new(ManualScheduler::new());
        let table = MeasurementsTable::new(manual.clone());
        (manual, table)
    }

    #[test_log::test]
    fn test_longest_prefix_match() {
        let (_, mut table) = setup();
        table.get_or_create(&Name::from("/a"));
        table.get_or_create(&Name::from("/a/b"));

        let name = Name::from("/a/b/c/d");
        let entry = table.find_longest_prefix_match(&name);
        assert_eq!(entry.map(|e| e.name().clone()), Some(Name::from("/a/b")));

        let entry = table.find_longest_prefix_match(&Name::from("/a/x"));
        assert_eq!(entry.map(|e| e.name().clone()), Some(Name::from("/a")));

        assert!(table.find_longest_prefix_match(&Name::from("/z")).is_none());
    }

    #[test_log::test]
    fn test_root_entry_matches_everything() {
        let (_, mut table) = setup();
        table.get_or_create(&Name::root());

        let entry = table.find_longest_prefix_match(&Name::from("/any/name"));
        assert_eq!(entry.map(|e| e.name().clone()), Some(Name::root()));
    }

    #[test_log::test]
    fn test_get_uses_fib_prefix() {
        let (_, mut table) = setup();
        let fib_entry = fib::Entry::new(Name::from("/video"));

        let entry = table.get(&fib_entry);
        assert_eq!(entry.name(), &Name::from("/video"));
        assert!(table.contains(&Name::from("/video")));
        assert!(table.find_exact_match(&Name::from("/video/hd")).is_none());
    }

    #[test_log::test]
    fn test_extend_lifetime_never_shortens() {
        let (manual, mut table) = setup();
        let now = manual.now();
        let entry = table.get_or_create(&Name::from("/a"));

        assert!(entry.extend_lifetime(now, Duration::from_secs(60)));
        assert!(!entry.extend_lifetime(now, Duration::from_secs(10)));
        assert_eq!(entry.expiry(), now + Duration::from_secs(60));
    }

    #[test_log::test]
    fn test_extend_lifetime_caps_huge_lifetime() {
        let (manual, mut table) = setup();
        let now = manual.now();
        let entry = table.get_or_create(&Name::from("/a"));

        assert!(entry.extend_lifetime(now, Duration::MAX));
        assert_eq!(entry.expiry(), now + FAR_FUTURE);
        assert!(!entry.extend_lifetime(now, Duration::MAX));

        manual.advance(Duration::from_secs(86_400));
        assert_eq!(table.evict_expired(), 0);
    }

    #[test_log::test]
    fn test_evict_expired() {
        let (manual, mut table) = setup();
        let now = manual.now();
        table.get_or_create(&Name::from("/short"));
        table
            .get_or_create(&Name::from("/long"))
            .extend_lifetime(now, Duration::from_secs(60));

        manual.advance(INITIAL_ENTRY_LIFETIME);
        assert_eq!(table.evict_expired(), 1);
        assert!(!table.contains(&Name::from("/short")));
        assert!(table.contains(&Name::from("/long")));

        manual.advance(Duration::from_secs(60));
        assert_eq!(table.evict_expired(), 1);
        assert!(table.is_empty());
    }

    #[test_log::test]
    fn test_erase() {
        let (_, mut table) = setup();
        table.get_or_create(&Name::from("/a"));
        assert!(table.erase(&Name::from("/a")));
        assert!(!table.erase(&Name::from("/a")));
    }
}
