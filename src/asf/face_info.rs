//! Per-face measurement state within a namespace.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::core::FaceId;
use crate::rtt::{RttEstimator, RttEstimatorOptions};
use crate::scheduler::{SchedulerHandle, ScopedEventId, deadline_after};
use crate::table::Name;

/// Outcome of the most recent request forwarded on a face.
///
/// Both sentinels order below every measured duration, and `Timeout` below
/// `NoMeasurement`, so a plain comparison ranks faces worst-first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LastRtt {
    /// The last request timed out.
    Timeout,
    /// No request has completed on this face yet.
    #[default]
    NoMeasurement,
    /// RTT of the last satisfied request.
    Measured(Duration),
}

impl LastRtt {
    /// The measured RTT, if the last request was satisfied.
    pub fn measured(self) -> Option<Duration> {
        match self {
            LastRtt::Measured(rtt) => Some(rtt),
            _ => None,
        }
    }

    /// Whether the last request timed out.
    pub fn is_timeout(self) -> bool {
        self == LastRtt::Timeout
    }
}

impl fmt::Display for LastRtt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LastRtt::Timeout => f.write_str("timeout"),
            LastRtt::NoMeasurement => f.write_str("no-measurement"),
            LastRtt::Measured(rtt) => write!(f, "{rtt:?}"),
        }
    }
}

/// Measurement state of one face within one namespace.
///
/// Holds at most one retransmission timer and at most one expiration timer.
/// Both are scoped: dropping the record cancels them.
pub struct FaceInfo {
    scheduler: SchedulerHandle,
    rtt_estimator: RttEstimator,
    last_rtt: LastRtt,
    last_request_name: Option<Name>,
    timeout_count: usize,

    /// Expiration of the measurement, re-armed by the owning namespace.
    measurement_expiration: Option<ScopedEventId>,
    measurement_expired: Rc<Cell<bool>>,

    /// RTO associated with the outstanding request.
    timeout_event: Option<ScopedEventId>,
}

impl FaceInfo {
    /// Create a record with no measurement and no armed timer.
    ///
    /// `options` must already be validated.
    pub(crate) fn new(scheduler: SchedulerHandle, options: Arc<RttEstimatorOptions>) -> Self {
        Self {
            scheduler,
            rtt_estimator: RttEstimator::from_validated(options),
            last_rtt: LastRtt::NoMeasurement,
            last_request_name: None,
            timeout_count: 0,
            measurement_expiration: None,
            measurement_expired: Rc::new(Cell::new(false)),
            timeout_event: None,
        }
    }

    /// Whether a retransmission timer is armed and has not fired yet.
    pub fn is_timer_armed(&self) -> bool {
        self.timeout_event
            .as_ref()
            .is_some_and(ScopedEventId::is_pending)
    }

    /// Arm the retransmission timer for `request_name`.
    ///
    /// A timer that is already armed is cancelled first. Returns the instant
    /// at which `callback` will run; delays beyond
    /// [`FAR_FUTURE`](crate::core::FAR_FUTURE) are capped to it.
    pub fn arm_retransmission_timer(
        &mut self,
        request_name: &Name,
        callback: impl FnOnce() + 'static,
        delay: Duration,
    ) -> Instant {
        if let Some(previous) = self.timeout_event.take() {
            previous.cancel();
        }

        self.last_request_name = Some(request_name.clone());
        self.timeout_event = Some(ScopedEventId::schedule(
            &self.scheduler,
            delay,
            Box::new(callback),
        ));

        tracing::trace!(
            name = %request_name,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "retransmission timer armed"
        );
        deadline_after(self.scheduler.now(), delay)
    }

    /// Arm the retransmission timer with the estimator's current RTO.
    pub fn arm_retransmission_timer_with_rto(
        &mut self,
        request_name: &Name,
        callback: impl FnOnce() + 'static,
    ) -> Instant {
        let rto = self.rtt_estimator.estimated_rto();
        self.arm_retransmission_timer(request_name, callback, rto)
    }

    /// Cancel the retransmission timer.
    ///
    /// A face tracks one outstanding request, so the armed timer is
    /// cancelled whether or not `request_name` falls under the name it was
    /// armed for. Does nothing if no timer is armed.
    pub fn cancel_retransmission_timer(&mut self, request_name: &Name) {
        let Some(event) = self.timeout_event.take() else {
            return;
        };

        if let Some(armed) = &self.last_request_name
            && !armed.is_prefix_of(request_name)
        {
            tracing::trace!(
                armed = %armed,
                name = %request_name,
                "cancelling timer armed for another request"
            );
        }
        event.cancel();
    }

    /// Record the RTT of a satisfied request.
    ///
    /// Does not cancel the retransmission timer.
    pub fn record_rtt(&mut self, rtt: Duration) {
        self.last_rtt = LastRtt::Measured(rtt);
        self.rtt_estimator.add_measurement(rtt, 1);
        tracing::trace!(rtt_ms = rtt.as_secs_f64() * 1000.0, "rtt recorded");
    }

    /// Record that `request_name` timed out and cancel its timer.
    ///
    /// The timeout count is left to the caller.
    pub fn record_timeout(&mut self, request_name: &Name) {
        self.last_rtt = LastRtt::Timeout;
        self.cancel_retransmission_timer(request_name);
        tracing::trace!(name = %request_name, "timeout recorded");
    }

    /// Outcome of the most recent request.
    pub fn last_rtt(&self) -> LastRtt {
        self.last_rtt
    }

    /// Smoothed RTT, zero before the first sample.
    pub fn smoothed_rtt(&self) -> Duration {
        self.rtt_estimator.smoothed_rtt()
    }

    /// Current retransmission timeout.
    pub fn estimated_rto(&self) -> Duration {
        self.rtt_estimator.estimated_rto()
    }

    /// Name the retransmission timer was last armed for.
    pub fn last_request_name(&self) -> Option<&Name> {
        self.last_request_name.as_ref()
    }

    /// Number of consecutive timeouts, as maintained by the strategy.
    pub fn timeout_count(&self) -> usize {
        self.timeout_count
    }

    /// Set the number of consecutive timeouts.
    pub fn set_timeout_count(&mut self, timeout_count: usize) {
        self.timeout_count = timeout_count;
    }

    /// Whether the measurement lifetime ran out since the last touch.
    pub fn is_measurement_expired(&self) -> bool {
        self.measurement_expired.get()
    }

    /// Whether an expiration timer is armed and has not fired yet.
    pub fn is_expiration_armed(&self) -> bool {
        self.measurement_expiration
            .as_ref()
            .is_some_and(ScopedEventId::is_pending)
    }

    /// Replace the expiration timer with one firing after `lifetime`.
    pub(crate) fn rearm_expiration(&mut self, face_id: FaceId, lifetime: Duration) {
        if let Some(previous) = self.measurement_expiration.take() {
            previous.cancel();
        }

        self.measurement_expired.set(false);
        let expired = Rc::clone(&self.measurement_expired);
        self.measurement_expiration = Some(ScopedEventId::schedule(
            &self.scheduler,
            lifetime,
            Box::new(move || {
                tracing::trace!(face_id, "face measurement expired");
                expired.set(true);
            }),
        ));
    }
}

impl fmt::Debug for FaceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaceInfo")
            .field("last_rtt", &self.last_rtt)
            .field("srtt", &self.smoothed_rtt())
            .field("timeout_count", &self.timeout_count)
            .field("last_request_name", &self.last_request_name)
            .field("timer_armed", &self.is_timer_armed())
            .field("measurement_expired", &self.is_measurement_expired())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FAR_FUTURE;
    use crate::scheduler::{ManualScheduler, Scheduler};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn setup() -> (Rc<ManualScheduler>, FaceInfo) {
        let manual = Rc::new(ManualScheduler::new());
        let info = FaceInfo::new(manual.clone(), Arc::new(RttEstimatorOptions::default()));
        (manual, info)
    }

    #[test]
    fn test_sentinel_ordering() {
        assert!(LastRtt::Timeout < LastRtt::NoMeasurement);
        assert!(LastRtt::NoMeasurement < LastRtt::Measured(Duration::ZERO));
        assert!(LastRtt::Measured(ms(1)) < LastRtt::Measured(ms(2)));
        assert_eq!(LastRtt::default(), LastRtt::NoMeasurement);
    }

    #[test]
    fn test_last_rtt_transitions() {
        let (_, mut info) = setup();
        assert_eq!(info.last_rtt(), LastRtt::NoMeasurement);

        info.record_timeout(&Name::from("/a"));
        assert_eq!(info.last_rtt(), LastRtt::Timeout);

        info.record_rtt(Duration::ZERO);
        assert_eq!(info.last_rtt(), LastRtt::Measured(Duration::ZERO));
        assert_eq!(info.last_rtt().measured(), Some(Duration::ZERO));

        info.record_rtt(ms(30));
        assert_eq!(info.last_rtt(), LastRtt::Measured(ms(30)));
    }

    #[test]
    fn test_arm_returns_deadline() {
        let (manual, mut info) = setup();
        let deadline = info.arm_retransmission_timer(&Name::from("/a/b"), || {}, ms(100));

        assert_eq!(deadline, manual.now() + ms(100));
        assert!(info.is_timer_armed());
        assert_eq!(info.last_request_name(), Some(&Name::from("/a/b")));
    }

    #[test]
    fn test_rearm_cancels_previous() {
        let (manual, mut info) = setup();
        let fired = Rc::new(Cell::new(0u32));

        let armings = 5;
        for i in 0..armings {
            let fired = Rc::clone(&fired);
            let name = Name::from("/a").append(i.to_string());
            info.arm_retransmission_timer(&name, move || fired.set(fired.get() + 1), ms(100));
        }

        assert_eq!(manual.cancel_calls(), armings - 1);
        assert_eq!(manual.pending_count(), 1);

        manual.advance(ms(100));
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_cancel_without_timer_is_noop() {
        let (manual, mut info) = setup();
        info.record_rtt(ms(40));
        info.set_timeout_count(3);
        let srtt = info.smoothed_rtt();

        info.cancel_retransmission_timer(&Name::from("/a"));
        info.cancel_retransmission_timer(&Name::from("/a"));

        assert_eq!(manual.cancel_calls(), 0);
        assert_eq!(info.last_rtt(), LastRtt::Measured(ms(40)));
        assert_eq!(info.timeout_count(), 3);
        assert_eq!(info.smoothed_rtt(), srtt);
        assert!(!info.is_timer_armed());
    }

    #[test]
    fn test_cancel_ignores_name_mismatch() {
        let (manual, mut info) = setup();
        info.arm_retransmission_timer(&Name::from("/a/b"), || panic!("fired"), ms(100));

        info.cancel_retransmission_timer(&Name::from("/x"));
        assert!(!info.is_timer_armed());
        assert_eq!(manual.advance(ms(200)), 0);
    }

    #[test]
    fn test_record_rtt_keeps_timer() {
        let (_, mut info) = setup();
        info.arm_retransmission_timer(&Name::from("/a"), || {}, ms(100));
        info.record_rtt(ms(20));

        assert!(info.is_timer_armed());
    }

    #[test]
    fn test_record_timeout_leaves_count() {
        let (_, mut info) = setup();
        info.set_timeout_count(2);
        info.record_timeout(&Name::from("/a"));

        assert_eq!(info.timeout_count(), 2);
    }

    #[test]
    fn test_timer_not_armed_after_fire() {
        let (manual, mut info) = setup();
        info.arm_retransmission_timer(&Name::from("/a"), || {}, ms(10));
        manual.advance(ms(10));

        assert!(!info.is_timer_armed());
    }

    #[test]
    fn test_arm_with_rto() {
        let (manual, mut info) = setup();
        info.record_rtt(ms(100));

        let deadline = info.arm_retransmission_timer_with_rto(&Name::from("/a"), || {});
        assert_eq!(deadline, manual.now() + info.estimated_rto());
        assert_eq!(info.estimated_rto(), ms(300));
    }

    #[test]
    fn test_arm_caps_huge_delay() {
        let (manual, mut info) = setup();
        let deadline =
            info.arm_retransmission_timer(&Name::from("/a"), || panic!("fired"), Duration::MAX);

        assert_eq!(deadline, manual.now() + FAR_FUTURE);
        assert_eq!(manual.advance(Duration::from_secs(86_400 * 365)), 0);
        assert!(info.is_timer_armed());
    }

    #[test]
    fn test_extreme_rtt_samples() {
        let (_, mut info) = setup();
        info.record_rtt(Duration::MAX);
        info.record_rtt(Duration::MAX);
        info.record_rtt(Duration::ZERO);

        assert_eq!(info.last_rtt(), LastRtt::Measured(Duration::ZERO));
        assert!(info.smoothed_rtt() > Duration::ZERO);
        assert_eq!(info.estimated_rto(), RttEstimatorOptions::default().max_rto);
    }

    #[test]
    fn test_drop_cancels_timers() {
        let (manual, mut info) = setup();
        info.arm_retransmission_timer(&Name::from("/a"), || panic!("fired after drop"), ms(10));
        info.rearm_expiration(7, ms(50));
        drop(info);

        assert_eq!(manual.pending_count(), 0);
        assert_eq!(manual.advance(ms(100)), 0);
    }

    #[test]
    fn test_expiration_marks_and_rearm_clears() {
        let (manual, mut info) = setup();
        info.rearm_expiration(7, ms(50));
        assert!(info.is_expiration_armed());

        manual.advance(ms(50));
        assert!(info.is_measurement_expired());
        assert!(!info.is_expiration_armed());

        info.rearm_expiration(7, ms(50));
        assert!(!info.is_measurement_expired());
        assert_eq!(manual.pending_count(), 1);
    }
}
