//! Timer scheduling for the forwarding event loop.
//!
//! The measurements core never sleeps. It asks a [`Scheduler`] to run a
//! callback after a delay and keeps the returned handle in a
//! [`ScopedEventId`], which cancels the event when dropped. Dropping a face
//! record therefore cancels every timer it still holds.
//!
//! Two backends are provided:
//!
//! - [`ManualScheduler`]: virtual clock advanced explicitly, deterministic
//! - [`TokioScheduler`]: `tokio::task::spawn_local` on a `LocalSet`
//!   (requires the `runtime` feature)

mod manual;
#[cfg(feature = "runtime")]
mod runtime;

use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::core::FAR_FUTURE;

pub use manual::ManualScheduler;
#[cfg(feature = "runtime")]
#[cfg_attr(docsrs, doc(cfg(feature = "runtime")))]
pub use runtime::TokioScheduler;

/// Callback run when a scheduled event expires.
///
/// Callbacks run on the event loop thread, so they need not be `Send`.
pub type EventCallback = Box<dyn FnOnce() + 'static>;

/// Shared handle to the event loop's scheduler.
pub type SchedulerHandle = Rc<dyn Scheduler>;

/// Identifier of a scheduled event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(u64);

impl EventId {
    /// Create an event id from its raw value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw value of the id.
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event#{}", self.0)
    }
}

/// Instant `delay` after `now`, with `delay` capped at [`FAR_FUTURE`].
pub fn deadline_after(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay.min(FAR_FUTURE)).unwrap_or(now)
}

/// Schedules callbacks on a single-threaded event loop.
pub trait Scheduler {
    /// Current time as seen by the event loop.
    fn now(&self) -> Instant;

    /// Run `callback` once `delay` has elapsed.
    fn schedule(&self, delay: Duration, callback: EventCallback) -> EventId;

    /// Cancel a scheduled event.
    ///
    /// Cancelling an event that already fired, was already cancelled, or
    /// never existed is a no-op.
    fn cancel(&self, id: EventId);

    /// Whether the event is still waiting to fire.
    fn is_pending(&self, id: EventId) -> bool;
}

/// Event handle that cancels its event when dropped.
pub struct ScopedEventId {
    scheduler: SchedulerHandle,
    id: Option<EventId>,
}

impl ScopedEventId {
    /// Schedule `callback` and wrap the resulting event.
    pub fn schedule(scheduler: &SchedulerHandle, delay: Duration, callback: EventCallback) -> Self {
        let id = scheduler.schedule(delay, callback);
        Self {
            scheduler: Rc::clone(scheduler),
            id: Some(id),
        }
    }

    /// Id of the wrapped event.
    pub fn id(&self) -> Option<EventId> {
        self.id
    }

    /// Whether the wrapped event is still waiting to fire.
    pub fn is_pending(&self) -> bool {
        self.id.is_some_and(|id| self.scheduler.is_pending(id))
    }

    /// Cancel the wrapped event now.
    pub fn cancel(mut self) {
        self.cancel_inner();
    }

    fn cancel_inner(&mut self) {
        if let Some(id) = self.id.take() {
            self.scheduler.cancel(id);
        }
    }
}

impl Drop for ScopedEventId {
    fn drop(&mut self) {
        self.cancel_inner();
    }
}

impl fmt::Debug for ScopedEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedEventId")
            .field("id", &self.id)
            .field("pending", &self.is_pending())
            .finish()
    }
}
