//! Incremental ETC-precision based composition of places
//!
//! The [`ETCPrecisionComposer`] keeps, for every activity except the artificial start, the number
//! of log positions at which the activity is enabled by the accepted places (allowed) and how many
//! of those were never observed in the log (escaping). A candidate is accepted if it restricts
//! escaping behaviour; accepting it may make earlier places implicit, which are then revoked.
use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, trace};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::{
    encoded_log::EncodedLog, encoding::ActivityID,
    process_models::place_candidate::PlaceCandidate,
};

use super::{
    config::SPECppConfig,
    error::{Result, SPECppError},
    marking_history::VariantMarkingHistories,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Escaping and allowed count of a single activity
pub struct ActivityCounts {
    /// Allowed positions at which the log never continues with the activity
    pub escaping: u64,
    /// Positions at which all prerequisite places of the activity are marked
    pub allowed: u64,
}

impl ActivityCounts {
    /// `1 - escaping / allowed`, or `None` if the activity is never allowed
    pub fn precision(&self) -> Option<f64> {
        if self.allowed == 0 {
            return None;
        }
        Some(1.0 - self.escaping as f64 / self.allowed as f64)
    }
}

impl std::ops::Add for ActivityCounts {
    type Output = ActivityCounts;

    fn add(self, rhs: Self) -> Self::Output {
        ActivityCounts {
            escaping: self.escaping + rhs.escaping,
            allowed: self.allowed + rhs.allowed,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Tentative new [`ActivityCounts`] for a set of activities
///
/// Created without touching the [`ActivityStatistics`] and applied atomically by
/// [`ActivityStatistics::commit`].
pub struct StatisticsDelta {
    changes: Vec<(ActivityID, ActivityCounts)>,
}

impl StatisticsDelta {
    /// Delta setting the counts of the given activities
    pub fn from_changes(changes: Vec<(ActivityID, ActivityCounts)>) -> Self {
        Self { changes }
    }

    /// Activities and their new counts
    pub fn changes(&self) -> &[(ActivityID, ActivityCounts)] {
        &self.changes
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Committed escaping/allowed counts of all activities
pub struct ActivityStatistics {
    counts: HashMap<ActivityID, ActivityCounts>,
    total: ActivityCounts,
    trace_count: u64,
}

impl ActivityStatistics {
    /// Empty statistics for a log with `trace_count` traces
    pub fn new(trace_count: u64) -> Self {
        Self {
            counts: HashMap::new(),
            total: ActivityCounts::default(),
            trace_count,
        }
    }

    /// Counts of `activity`
    pub fn get(&self, activity: ActivityID) -> Result<ActivityCounts> {
        self.counts
            .get(&activity)
            .copied()
            .ok_or(SPECppError::MissingStatistics(activity))
    }

    /// Per-activity precision (`None` if the activity is never allowed)
    pub fn activity_precision(&self, activity: ActivityID) -> Result<Option<f64>> {
        Ok(self.get(activity)?.precision())
    }

    /// Sum of all counts
    pub fn total(&self) -> ActivityCounts {
        self.total
    }

    /// Number of traces the statistics were computed on
    pub fn trace_count(&self) -> u64 {
        self.trace_count
    }

    /// Iterate over all activities with recorded counts
    pub fn iter(&self) -> impl Iterator<Item = (ActivityID, ActivityCounts)> + '_ {
        self.counts.iter().map(|(a, c)| (*a, *c))
    }

    /// Approximate ETC-precision `1 - Σescaping / (Σallowed + trace count)`
    ///
    /// The trace count accounts for the artificial start activity, which is allowed exactly once
    /// per trace and never escaping. Without any traces the precision is `1.0`.
    pub fn precision(&self) -> f64 {
        Self::precision_of(self.total, self.trace_count)
    }

    /// Precision the statistics would have after committing `delta`
    pub fn precision_with(&self, delta: &StatisticsDelta) -> f64 {
        Self::precision_of(self.total_with(delta), self.trace_count)
    }

    fn precision_of(total: ActivityCounts, trace_count: u64) -> f64 {
        let denominator = total.allowed + trace_count;
        if denominator == 0 {
            return 1.0;
        }
        1.0 - total.escaping as f64 / denominator as f64
    }

    fn total_with(&self, delta: &StatisticsDelta) -> ActivityCounts {
        let mut total = self.total;
        for (a, new) in &delta.changes {
            let old = self.counts.get(a).copied().unwrap_or_default();
            total.escaping = total.escaping - old.escaping + new.escaping;
            total.allowed = total.allowed - old.allowed + new.allowed;
        }
        total
    }

    /// Apply all changes of `delta`
    pub fn commit(&mut self, delta: StatisticsDelta) {
        self.total = self.total_with(&delta);
        for (a, new) in delta.changes {
            self.counts.insert(a, new);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
/// Outcome of a composition step for a single place
pub enum CandidateCompositionEvent {
    /// Place was accepted
    Accept(PlaceCandidate),
    /// Place was rejected
    Reject(PlaceCandidate),
    /// Previously accepted place was found implicit and removed
    RevokeAcceptance(PlaceCandidate),
}

impl CandidateCompositionEvent {
    /// The place this event refers to
    pub fn candidate(&self) -> &PlaceCandidate {
        match self {
            CandidateCompositionEvent::Accept(c)
            | CandidateCompositionEvent::Reject(c)
            | CandidateCompositionEvent::RevokeAcceptance(c) => c,
        }
    }
}

type Prerequisite = (PlaceCandidate, Arc<VariantMarkingHistories>);

#[derive(Debug)]
/// Maintains the accepted places and their effect on the approximate ETC-precision
pub struct ETCPrecisionComposer<'a> {
    log: &'a EncodedLog,
    gamma: f64,
    rho: f64,
    premature_abort: bool,
    statistics: ActivityStatistics,
    prerequisites: HashMap<ActivityID, Vec<Prerequisite>>,
    accepted: Vec<PlaceCandidate>,
    current_precision: f64,
    new_addition: bool,
    events: Vec<CandidateCompositionEvent>,
}

impl<'a> ETCPrecisionComposer<'a> {
    /// Composer without accepted places
    ///
    /// Seeds the statistics of every activity except the artificial start.
    pub fn new(log: &'a EncodedLog, config: &SPECppConfig) -> Result<Self> {
        config.validate()?;
        let mut composer = Self {
            log,
            gamma: config.gamma,
            rho: config.rho,
            premature_abort: config.premature_abort,
            statistics: ActivityStatistics::new(log.total_trace_count()),
            prerequisites: HashMap::new(),
            accepted: Vec::new(),
            current_precision: 1.0,
            new_addition: false,
            events: Vec::new(),
        };
        let start = log.mapping().start_activity();
        let changes = (0..log.mapping().activity_count())
            .map(ActivityID)
            .filter(|a| *a != start)
            .map(|a| (a, composer.count_activity(a, &[])))
            .collect();
        composer.statistics.commit(StatisticsDelta { changes });
        composer.current_precision = composer.statistics.precision();
        debug!(
            "Initial precision {:.4} ({:?})",
            composer.current_precision,
            composer.statistics.total()
        );
        Ok(composer)
    }

    fn count_activity(
        &self,
        activity: ActivityID,
        prerequisites: &[&VariantMarkingHistories],
    ) -> ActivityCounts {
        let automaton = self.log.automaton();
        self.log
            .variants()
            .par_iter()
            .enumerate()
            .map(|(v, variant)| {
                let mut counts = ActivityCounts::default();
                for (i, state) in variant.states.iter().enumerate() {
                    if prerequisites
                        .iter()
                        .all(|h| h.is_marked_after_production(v, i))
                    {
                        counts.allowed += variant.frequency;
                        if !automaton.has_outgoing(*state, activity) {
                            counts.escaping += variant.frequency;
                        }
                    }
                }
                counts
            })
            .reduce(ActivityCounts::default, |a, b| a + b)
    }

    fn committed_histories(
        &self,
        activity: ActivityID,
        excluded: Option<&PlaceCandidate>,
    ) -> Vec<&VariantMarkingHistories> {
        self.prerequisites
            .get(&activity)
            .map(|places| {
                places
                    .iter()
                    .filter(|(p, _)| Some(p) != excluded)
                    .map(|(_, h)| h.as_ref())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn postset_activities(&self, place: &PlaceCandidate) -> Result<Vec<ActivityID>> {
        let start = self.log.mapping().start_activity();
        let activities = self
            .log
            .mapping()
            .activities_of(place.postset())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(activities.into_iter().filter(|a| *a != start).collect())
    }

    /// Escaping and allowed count of `activity` under the currently accepted places
    pub fn evaluate_precision(&self, activity: ActivityID) -> Result<ActivityCounts> {
        self.statistics.get(activity)?;
        Ok(self.count_activity(activity, &self.committed_histories(activity, None)))
    }

    /// Decide whether to accept `place`, given its marking histories
    ///
    /// Accepting a place commits its effect on the statistics and revokes all previously accepted
    /// places which became implicit. A rejected place leaves the composer unchanged apart from the
    /// emitted [`CandidateCompositionEvent::Reject`].
    pub fn deliberate_acceptance(
        &mut self,
        place: PlaceCandidate,
        histories: VariantMarkingHistories,
    ) -> Result<bool> {
        let affected = self.postset_activities(&place)?;
        let mut changes = Vec::with_capacity(affected.len());
        let mut escaping_decreased = false;
        for a in &affected {
            let current = self.statistics.get(*a)?;
            let mut prerequisites = self.committed_histories(*a, None);
            prerequisites.push(&histories);
            let tentative = self.count_activity(*a, &prerequisites);
            escaping_decreased |= tentative.escaping < current.escaping;
            changes.push((*a, tentative));
        }
        let delta = StatisticsDelta { changes };

        let accept = if self.gamma == 0.0 {
            escaping_decreased
        } else {
            self.statistics.precision_with(&delta) - self.current_precision > self.gamma
        };
        if !accept {
            trace!("Rejected {}", place);
            self.events.push(CandidateCompositionEvent::Reject(place));
            return Ok(false);
        }

        self.statistics.commit(delta);
        self.current_precision = self.statistics.precision();
        self.new_addition = true;
        let histories = Arc::new(histories);
        for a in &affected {
            self.prerequisites
                .entry(*a)
                .or_default()
                .push((place.clone(), histories.clone()));
        }
        self.accepted.push(place.clone());
        debug!(
            "Accepted {} (precision {:.4})",
            place, self.current_precision
        );
        self.events
            .push(CandidateCompositionEvent::Accept(place.clone()));

        // Nothing below may fail: the place is already committed
        let potentially_implicit: Vec<(PlaceCandidate, Vec<ActivityID>)> = self
            .accepted
            .iter()
            .filter(|p| *p != &place)
            .map(|p| (p.clone(), self.constrained_activities(p)))
            .filter(|(_, activities)| activities.iter().any(|a| affected.contains(a)))
            .collect();
        for (p, activities) in potentially_implicit {
            if let Some(delta) = self.implicitness_delta(&p, &activities) {
                self.revoke_acceptance(&p, delta);
            }
        }
        Ok(true)
    }

    /// Check whether the accepted `place` is implicit
    ///
    /// Returns the statistics without `place` if it is implicit: for `gamma == 0` every affected
    /// activity must keep its exact counts, otherwise the precision may drop by at most `gamma`.
    pub fn check_implicitness(&self, place: &PlaceCandidate) -> Result<Option<StatisticsDelta>> {
        let affected = self.postset_activities(place)?;
        for a in &affected {
            self.statistics.get(*a)?;
        }
        Ok(self.implicitness_delta(place, &affected))
    }

    /// Activities whose prerequisites contain `place`, in index order
    fn constrained_activities(&self, place: &PlaceCandidate) -> Vec<ActivityID> {
        let mut activities: Vec<ActivityID> = self
            .prerequisites
            .iter()
            .filter(|(_, places)| places.iter().any(|(q, _)| q == place))
            .map(|(a, _)| *a)
            .collect();
        activities.sort();
        activities
    }

    /// Statistics without `place` if it is implicit w.r.t. the `affected` activities
    ///
    /// Activities without committed statistics count as changed.
    fn implicitness_delta(
        &self,
        place: &PlaceCandidate,
        affected: &[ActivityID],
    ) -> Option<StatisticsDelta> {
        let mut changes = Vec::with_capacity(affected.len());
        let mut unchanged = true;
        for a in affected {
            let current = self.statistics.counts.get(a).copied()?;
            let tentative = self.count_activity(*a, &self.committed_histories(*a, Some(place)));
            unchanged &= tentative == current;
            changes.push((*a, tentative));
        }
        let delta = StatisticsDelta { changes };
        let implicit = if self.gamma == 0.0 {
            unchanged
        } else {
            self.current_precision - self.statistics.precision_with(&delta) <= self.gamma
        };
        implicit.then_some(delta)
    }

    fn revoke_acceptance(&mut self, place: &PlaceCandidate, delta: StatisticsDelta) {
        for prereqs in self.prerequisites.values_mut() {
            prereqs.retain(|(p, _)| p != place);
        }
        self.accepted.retain(|p| p != place);
        self.statistics.commit(delta);
        self.current_precision = self.statistics.precision();
        debug!(
            "Revoked implicit {} (precision {:.4})",
            place, self.current_precision
        );
        self.events
            .push(CandidateCompositionEvent::RevokeAcceptance(place.clone()));
    }

    /// Mark the beginning of a new composition cycle
    pub fn start_cycle(&mut self) {
        self.new_addition = false;
    }

    /// Returns `true` if premature abort is enabled, the current cycle accepted a place and the
    /// precision reached `rho`
    pub fn is_finished(&self) -> bool {
        self.premature_abort && self.new_addition && self.current_precision >= self.rho
    }

    /// Take all events emitted since the last call
    pub fn drain_events(&mut self) -> Vec<CandidateCompositionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Committed statistics
    pub fn statistics(&self) -> &ActivityStatistics {
        &self.statistics
    }

    /// Accepted places in order of acceptance
    pub fn accepted_places(&self) -> &[PlaceCandidate] {
        &self.accepted
    }

    /// Accepted places constraining `activity`, in order of acceptance
    pub fn prerequisites_of(&self, activity: ActivityID) -> Vec<&PlaceCandidate> {
        self.prerequisites
            .get(&activity)
            .map(|places| places.iter().map(|(p, _)| p).collect())
            .unwrap_or_default()
    }

    /// Cached marking histories of an accepted place
    pub fn marking_histories(&self, place: &PlaceCandidate) -> Option<&VariantMarkingHistories> {
        self.prerequisites
            .values()
            .flat_map(|places| places.iter())
            .find(|(p, _)| p == place)
            .map(|(_, h)| h.as_ref())
    }

    /// Current approximate ETC-precision
    pub fn current_precision(&self) -> f64 {
        self.current_precision
    }

    /// Log the composer works on
    pub fn log(&self) -> &'a EncodedLog {
        self.log
    }
}
