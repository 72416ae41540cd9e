//! Per-namespace measurement state.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::core::{FaceId, NAMESPACE_INFO_TYPE_ID};
use crate::rtt::RttEstimatorOptions;
use crate::scheduler::SchedulerHandle;
use crate::table::StrategyInfo;

use super::face_info::FaceInfo;

/// Strategy information about each face in a namespace.
///
/// Attached to a measurement entry under [`NamespaceInfo::TYPE_ID`]. Owns
/// every [`FaceInfo`] of the namespace: when the entry is evicted, the face
/// records go with it and their timers are cancelled.
pub struct NamespaceInfo {
    scheduler: SchedulerHandle,
    faces: HashMap<FaceId, FaceInfo>,
    rtt_options: Arc<RttEstimatorOptions>,
    measurement_lifetime: Duration,
    is_probing_due: bool,
    is_first_probe_scheduled: bool,
}

impl StrategyInfo for NamespaceInfo {
    const TYPE_ID: i32 = NAMESPACE_INFO_TYPE_ID;
}

impl NamespaceInfo {
    /// Create a namespace with no faces.
    ///
    /// `rtt_options` must already be validated; [`AsfMeasurements`] is the
    /// public way to obtain a namespace.
    ///
    /// [`AsfMeasurements`]: super::AsfMeasurements
    pub(crate) fn new(
        scheduler: SchedulerHandle,
        rtt_options: Arc<RttEstimatorOptions>,
        measurement_lifetime: Duration,
    ) -> Self {
        Self {
            scheduler,
            faces: HashMap::new(),
            rtt_options,
            measurement_lifetime,
            is_probing_due: false,
            is_first_probe_scheduled: false,
        }
    }

    /// Record of `face_id`, if one was ever created.
    pub fn get_face_info(&self, face_id: FaceId) -> Option<&FaceInfo> {
        self.faces.get(&face_id)
    }

    /// Mutable record of `face_id`, if one was ever created.
    pub fn get_face_info_mut(&mut self, face_id: FaceId) -> Option<&mut FaceInfo> {
        self.faces.get_mut(&face_id)
    }

    /// Record of `face_id`, created with this namespace's estimator options
    /// if absent. A new record has its expiration timer armed.
    pub fn get_or_create_face_info(&mut self, face_id: FaceId) -> &mut FaceInfo {
        let lifetime = self.measurement_lifetime;
        self.faces.entry(face_id).or_insert_with(|| {
            tracing::trace!(face_id, "creating face info");
            let mut info = FaceInfo::new(self.scheduler.clone(), Arc::clone(&self.rtt_options));
            info.rearm_expiration(face_id, lifetime);
            info
        })
    }

    /// Mark activity on `face_id`: its expiration timer restarts with the
    /// full measurement lifetime.
    ///
    /// Returns `false` if the face has no record.
    pub fn extend_face_info_lifetime(&mut self, face_id: FaceId) -> bool {
        let lifetime = self.measurement_lifetime;
        match self.faces.get_mut(&face_id) {
            Some(info) => {
                info.rearm_expiration(face_id, lifetime);
                true
            }
            None => false,
        }
    }

    /// Whether a probe of an under-used face is due.
    pub fn is_probing_due(&self) -> bool {
        self.is_probing_due
    }

    /// Set whether a probe is due.
    pub fn set_is_probing_due(&mut self, is_probing_due: bool) {
        self.is_probing_due = is_probing_due;
    }

    /// Whether the first probe of this namespace has been scheduled.
    pub fn is_first_probe_scheduled(&self) -> bool {
        self.is_first_probe_scheduled
    }

    /// Set whether the first probe has been scheduled.
    pub fn set_is_first_probe_scheduled(&mut self, is_scheduled: bool) {
        self.is_first_probe_scheduled = is_scheduled;
    }

    /// Lifetime used for face expiration timers.
    pub fn measurement_lifetime(&self) -> Duration {
        self.measurement_lifetime
    }

    /// Estimator options handed to new face records.
    pub fn rtt_options(&self) -> &Arc<RttEstimatorOptions> {
        &self.rtt_options
    }

    /// Faces that have a record.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId> + '_ {
        self.faces.keys().copied()
    }

    /// Number of face records.
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    /// Whether no face has a record.
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

impl Drop for NamespaceInfo {
    fn drop(&mut self) {
        let armed = self.faces.values().filter(|info| info.is_timer_armed()).count();
        if armed > 0 {
            tracing::debug!(
                faces = self.faces.len(),
                armed,
                "dropping namespace info with armed retransmission timers"
            );
        }
    }
}

impl fmt::Debug for NamespaceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamespaceInfo")
            .field("faces", &self.faces)
            .field("measurement_lifetime", &self.measurement_lifetime)
            .field("is_probing_due", &self.is_probing_due)
            .field("is_first_probe_scheduled", &self.is_first_probe_scheduled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asf::LastRtt;
    use crate::scheduler::ManualScheduler;
    use crate::table::Name;
    use std::rc::Rc;

    fn setup(lifetime: Duration) -> (Rc<ManualScheduler>, NamespaceInfo) {
        let manual = Rc::new(ManualScheduler::new());
        let info = NamespaceInfo::new(
            manual.clone(),
            Arc::new(RttEstimatorOptions::default()),
            lifetime,
        );
        (manual, info)
    }

    #[test]
    fn test_get_does_not_create() {
        let (manual, mut ns) = setup(Duration::from_secs(300));

        assert!(ns.get_face_info(7).is_none());
        assert!(ns.get_face_info_mut(7).is_none());
        assert!(!ns.extend_face_info_lifetime(7));
        assert!(ns.is_empty());
        assert_eq!(manual.schedule_calls(), 0);
    }

    #[test]
    fn test_get_or_create_returns_same_record() {
        let (_, mut ns) = setup(Duration::from_secs(300));

        ns.get_or_create_face_info(7).set_timeout_count(4);
        let info = ns.get_or_create_face_info(7);
        assert_eq!(info.timeout_count(), 4);
        assert_eq!(ns.len(), 1);
        assert_eq!(ns.face_ids().collect::<Vec<_>>(), vec![7]);
    }

    #[test]
    fn test_new_face_uses_namespace_options() {
        let (_, mut ns) = setup(Duration::from_secs(300));
        let info = ns.get_or_create_face_info(7);

        assert_eq!(info.last_rtt(), LastRtt::NoMeasurement);
        assert_eq!(info.timeout_count(), 0);
        assert_eq!(info.estimated_rto(), ns.rtt_options().initial_rto);
    }

    #[test]
    fn test_creation_arms_expiration_once() {
        let (manual, mut ns) = setup(Duration::from_secs(300));
        ns.get_or_create_face_info(7);
        ns.get_or_create_face_info(7);

        assert_eq!(manual.schedule_calls(), 1);
        assert!(ns.get_face_info(7).is_some_and(FaceInfo::is_expiration_armed));
    }

    #[test]
    fn test_extend_face_lifetime_delays_expiration() {
        let lifetime = Duration::from_secs(300);
        let (manual, mut ns) = setup(lifetime);
        ns.get_or_create_face_info(7);

        manual.advance(Duration::from_secs(200));
        assert!(ns.extend_face_info_lifetime(7));

        manual.advance(Duration::from_secs(200));
        assert!(ns.get_face_info(7).is_some_and(|info| !info.is_measurement_expired()));

        manual.advance(Duration::from_secs(100));
        assert!(ns.get_face_info(7).is_some_and(FaceInfo::is_measurement_expired));
        // Expired records stay in place
        assert_eq!(ns.len(), 1);
    }

    #[test]
    fn test_probing_flags() {
        let (_, mut ns) = setup(Duration::from_secs(300));
        assert!(!ns.is_probing_due());
        assert!(!ns.is_first_probe_scheduled());

        ns.set_is_first_probe_scheduled(true);
        ns.set_is_probing_due(true);
        assert!(ns.is_probing_due());
        assert!(ns.is_first_probe_scheduled());

        ns.set_is_probing_due(false);
        assert!(!ns.is_probing_due());
        assert!(ns.is_first_probe_scheduled());
    }

    #[test]
    fn test_drop_cancels_every_face_timer() {
        let (manual, mut ns) = setup(Duration::from_secs(300));
        for face_id in [1, 2, 3] {
            let name = Name::from("/a").append(face_id.to_string());
            ns.get_or_create_face_info(face_id).arm_retransmission_timer(
                &name,
                || panic!("fired against a dropped namespace"),
                Duration::from_millis(100),
            );
        }
        // One expiration plus one retransmission timer per face
        assert_eq!(manual.pending_count(), 6);

        drop(ns);
        assert_eq!(manual.pending_count(), 0);
        assert_eq!(manual.advance(Duration::from_secs(600)), 0);
    }
}
