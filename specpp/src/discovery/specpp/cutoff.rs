use crate::core::{
    encoding::ActivityTransitionMapping, process_models::place_candidate::PlaceCandidate,
};

use super::{composer::ActivityStatistics, error::Result};

#[derive(Debug, Clone)]
/// Filters candidates whose postset activities are already sufficiently precise
///
/// Works on the committed statistics only, so filtered candidates never need marking histories.
/// Activities which are never allowed have no precision and are ignored.
pub struct ETCPrecisionCutOff {
    cutoff_rho: f64,
    mapping: ActivityTransitionMapping,
}

impl ETCPrecisionCutOff {
    /// Gate with threshold `cutoff_rho`
    pub fn new(cutoff_rho: f64, mapping: ActivityTransitionMapping) -> Self {
        Self {
            cutoff_rho,
            mapping,
        }
    }

    /// Largest per-activity precision over the postset of `candidate`
    pub fn max_postset_precision(
        &self,
        candidate: &PlaceCandidate,
        statistics: &ActivityStatistics,
    ) -> Result<Option<f64>> {
        let mut max: Option<f64> = None;
        for a in self.mapping.activities_of(candidate.postset()) {
            if let Some(p) = statistics.activity_precision(a?)? {
                max = Some(max.map_or(p, |m| m.max(p)));
            }
        }
        Ok(max)
    }

    /// Returns `true` if `candidate` (and its subtree) should be skipped
    pub fn is_cut_off(
        &self,
        candidate: &PlaceCandidate,
        statistics: &ActivityStatistics,
    ) -> Result<bool> {
        Ok(self
            .max_postset_precision(candidate, statistics)?
            .is_some_and(|p| p >= self.cutoff_rho))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        encoded_log::EncodedLog,
        encoding::{TransitionID, TransitionOrdering},
        event_data::activity_projection::EventLogActivityProjection,
    };
    use crate::discovery::specpp::composer::{ActivityCounts, StatisticsDelta};

    #[test]
    fn test_gate_uses_best_postset_activity() {
        // Transitions (log order): start=0, a=1, b=2, end=3
        let projection = EventLogActivityProjection::from_variants(vec![(vec!["a", "b"], 1)]);
        let log = EncodedLog::new(projection, TransitionOrdering::LogOrder).unwrap();
        let a = log.mapping().activity_of(TransitionID(1)).unwrap();
        let b = log.mapping().activity_of(TransitionID(2)).unwrap();
        let end = log.mapping().end_activity();

        let mut stats = ActivityStatistics::new(1);
        stats.commit(StatisticsDelta::from_changes(vec![
            (a, ActivityCounts { escaping: 1, allowed: 4 }),
            (b, ActivityCounts { escaping: 1, allowed: 2 }),
            (end, ActivityCounts { escaping: 0, allowed: 0 }),
        ]));
        let gate = ETCPrecisionCutOff::new(0.7, log.mapping().clone());
        let place = |post: &[usize]| {
            PlaceCandidate::from_transitions(
                [TransitionID(0)],
                post.iter().copied().map(TransitionID),
            )
        };
        assert_eq!(
            gate.max_postset_precision(&place(&[1, 2]), &stats).unwrap(),
            Some(0.75)
        );
        assert!(gate.is_cut_off(&place(&[1, 2]), &stats).unwrap());
        assert!(!gate.is_cut_off(&place(&[2]), &stats).unwrap());
        // Never allowed: no precision, never cut off
        assert_eq!(gate.max_postset_precision(&place(&[3]), &stats).unwrap(), None);
        assert!(!gate.is_cut_off(&place(&[3]), &stats).unwrap());
    }
}
