//! Deterministic scheduler driven by an explicit virtual clock.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use super::{EventCallback, EventId, Scheduler, deadline_after};

/// Scheduler whose clock only moves when [`ManualScheduler::advance`] is
/// called.
///
/// Events expiring at the same instant fire in scheduling order. Callbacks
/// may schedule or cancel further events; events that become due while
/// advancing fire within the same call.
pub struct ManualScheduler {
    state: RefCell<State>,
}

struct State {
    now: Instant,
    next_id: u64,
    queue: BTreeMap<(Instant, EventId), EventCallback>,
    deadlines: HashMap<EventId, Instant>,
    schedule_calls: usize,
    cancel_calls: usize,
    fired: usize,
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualScheduler {
    /// Create a scheduler whose virtual clock starts at the current instant.
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Create a scheduler whose virtual clock starts at `start`.
    pub fn starting_at(start: Instant) -> Self {
        Self {
            state: RefCell::new(State {
                now: start,
                next_id: 1,
                queue: BTreeMap::new(),
                deadlines: HashMap::new(),
                schedule_calls: 0,
                cancel_calls: 0,
                fired: 0,
            }),
        }
    }

    /// Move the clock forward by `by`, firing every event that becomes due.
    ///
    /// Returns the number of callbacks run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = deadline_after(self.state.borrow().now, by);
        let mut fired = 0;

        loop {
            let next = {
                let mut state = self.state.borrow_mut();
                let due = match state.queue.first_key_value() {
                    Some((&(deadline, id), _)) if deadline <= target => Some((deadline, id)),
                    _ => None,
                };
                due.and_then(|key| {
                    state.deadlines.remove(&key.1);
                    state.now = key.0;
                    state.fired += 1;
                    state.queue.remove(&key)
                })
            };

            // The borrow is released so the callback can reschedule
            match next {
                Some(callback) => {
                    callback();
                    fired += 1;
                }
                None => break,
            }
        }

        self.state.borrow_mut().now = target;
        fired
    }

    /// Number of events waiting to fire.
    pub fn pending_count(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// Number of calls to [`Scheduler::schedule`].
    pub fn schedule_calls(&self) -> usize {
        self.state.borrow().schedule_calls
    }

    /// Number of calls to [`Scheduler::cancel`], including no-op calls.
    pub fn cancel_calls(&self) -> usize {
        self.state.borrow().cancel_calls
    }

    /// Number of callbacks run so far.
    pub fn fired_count(&self) -> usize {
        self.state.borrow().fired
    }
}

impl Scheduler for ManualScheduler {
    fn now(&self) -> Instant {
        self.state.borrow().now
    }

    fn schedule(&self, delay: Duration, callback: EventCallback) -> EventId {
        let mut state = self.state.borrow_mut();
        let id = EventId::from_raw(state.next_id);
        state.next_id += 1;
        state.schedule_calls += 1;

        let deadline = deadline_after(state.now, delay);
        state.deadlines.insert(id, deadline);
        state.queue.insert((deadline, id), callback);
        id
    }

    fn cancel(&self, id: EventId) {
        let mut state = self.state.borrow_mut();
        state.cancel_calls += 1;
        if let Some(deadline) = state.deadlines.remove(&id) {
            state.queue.remove(&(deadline, id));
        }
    }

    fn is_pending(&self, id: EventId) -> bool {
        self.state.borrow().deadlines.contains_key(&id)
    }
}
