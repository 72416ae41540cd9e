//! Scheduler backed by the tokio timer wheel.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tokio::task::AbortHandle;

use super::{EventCallback, EventId, Scheduler};

/// Scheduler running each event as a local tokio task.
///
/// Events are spawned with [`tokio::task::spawn_local`], so the scheduler
/// must be used from within a [`tokio::task::LocalSet`]. Cancelling an event
/// aborts its task.
#[derive(Debug, Default)]
pub struct TokioScheduler {
    next_id: Cell<u64>,
    pending: Rc<RefCell<HashMap<EventId, AbortHandle>>>,
}

impl TokioScheduler {
    /// Create a scheduler with no pending events.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events waiting to fire.
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }
}

impl Scheduler for TokioScheduler {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn schedule(&self, delay: Duration, callback: EventCallback) -> EventId {
        let id = EventId::from_raw(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);

        let pending = Rc::clone(&self.pending);
        let task = tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            let armed = pending.borrow_mut().remove(&id).is_some();
            if armed {
                callback();
            }
        });

        // The task cannot run before this insert: spawn_local only queues it
        self.pending.borrow_mut().insert(id, task.abort_handle());
        id
    }

    fn cancel(&self, id: EventId) {
        let handle = self.pending.borrow_mut().remove(&id);
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    fn is_pending(&self, id: EventId) -> bool {
        self.pending.borrow().contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::task::LocalSet;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test_log::test(tokio::test(flavor = "current_thread", start_paused = true))]
    async fn test_tokio_scheduler_fires() {
        LocalSet::new()
            .run_until(async {
                let scheduler = TokioScheduler::new();
                let fired = Rc::new(Cell::new(false));

                let flag = Rc::clone(&fired);
                let id = scheduler.schedule(ms(100), Box::new(move || flag.set(true)));
                assert!(scheduler.is_pending(id));

                tokio::time::sleep(ms(150)).await;
                assert!(fired.get());
                assert!(!scheduler.is_pending(id));
                assert_eq!(scheduler.pending_count(), 0);
            })
            .await;
    }

    #[test_log::test(tokio::test(flavor = "current_thread", start_paused = true))]
    async fn test_tokio_scheduler_cancel() {
        LocalSet::new()
            .run_until(async {
                let scheduler = TokioScheduler::new();
                let fired = Rc::new(Cell::new(false));

                let flag = Rc::clone(&fired);
                let id = scheduler.schedule(ms(100), Box::new(move || flag.set(true)));
                scheduler.cancel(id);
                scheduler.cancel(id);

                tokio::time::sleep(ms(150)).await;
                assert!(!fired.get());
                assert!(!scheduler.is_pending(id));
            })
            .await;
    }

    #[test_log::test(tokio::test(flavor = "current_thread", start_paused = true))]
    async fn test_tokio_scheduler_clock() {
        LocalSet::new()
            .run_until(async {
                let scheduler = TokioScheduler::new();
                let before = scheduler.now();
                tokio::time::sleep(ms(500)).await;
                assert!(scheduler.now() >= before + ms(500));
            })
            .await;
    }
}
