//! Activity/transition encoding
//!
//! Activities are the labels of an [`EventLogActivityProjection`], transitions are the nodes of the
//! discovered model. Both get dense indices; transition indices are the bit positions used by
//! [`PlaceCandidate`](crate::core::process_models::place_candidate::PlaceCandidate)s and also fix
//! the order in which the candidate tree is enumerated.
use std::cmp::Ordering;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use super::bitset::BitSet;
use super::event_data::activity_projection::{
    EventLogActivityProjection, END_ACTIVITY, START_ACTIVITY,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
/// Activity index (into [`EventLogActivityProjection::activities`])
pub struct ActivityID(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
/// Dense transition index
pub struct TransitionID(pub usize);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Order in which transitions are indexed
///
/// The artificial start transition is always first and the artificial end transition always last.
pub enum TransitionOrdering {
    /// Sort by activity label
    Lexicographic,
    /// Sort by the frequency-weighted mean position of the first occurrence in a trace (ties by label)
    #[default]
    AverageFirstOccurrence,
    /// Keep the order of activities in the projection
    LogOrder,
}

/// Error type for inconsistent activity/transition encodings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// The projection does not contain the artificial start or end activity
    MissingArtificialActivity(&'static str),
    /// Activity has no transition
    UnmappedActivity(ActivityID),
    /// Transition index out of range
    UnmappedTransition(TransitionID),
}

impl std::fmt::Display for EncodingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EncodingError::MissingArtificialActivity(label) => {
                write!(f, "Artificial activity {} is missing from the log", label)
            }
            EncodingError::UnmappedActivity(a) => write!(f, "Activity {} has no transition", a.0),
            EncodingError::UnmappedTransition(t) => {
                write!(f, "Transition {} has no activity", t.0)
            }
        }
    }
}

impl std::error::Error for EncodingError {}

#[derive(Debug, Clone)]
/// Injective mapping between activities and transitions
pub struct ActivityTransitionMapping {
    labels: Vec<String>,
    act_to_trans: Vec<Option<TransitionID>>,
    trans_to_act: Vec<ActivityID>,
    start: TransitionID,
    end: TransitionID,
}

impl ActivityTransitionMapping {
    /// Map every activity of `log` to one transition
    ///
    /// The projection must already contain the artificial start and end activities
    /// (see [`EventLogActivityProjection::add_start_end_activities`]).
    pub fn from_projection(
        log: &EventLogActivityProjection,
        ordering: TransitionOrdering,
    ) -> Result<Self, EncodingError> {
        let start_act = *log
            .act_to_index
            .get(START_ACTIVITY)
            .ok_or(EncodingError::MissingArtificialActivity(START_ACTIVITY))?;
        let end_act = *log
            .act_to_index
            .get(END_ACTIVITY)
            .ok_or(EncodingError::MissingArtificialActivity(END_ACTIVITY))?;

        let mut inner: Vec<usize> = (0..log.activities.len())
            .filter(|a| *a != start_act && *a != end_act)
            .collect();
        match ordering {
            TransitionOrdering::Lexicographic => {
                inner.sort_by(|a, b| log.activities[*a].cmp(&log.activities[*b]))
            }
            TransitionOrdering::AverageFirstOccurrence => {
                let afoi = log.average_first_occurrence_indices();
                inner.sort_by(|a, b| {
                    match OrderedFloat(afoi[*a]).cmp(&OrderedFloat(afoi[*b])) {
                        Ordering::Equal => log.activities[*a].cmp(&log.activities[*b]),
                        o => o,
                    }
                })
            }
            TransitionOrdering::LogOrder => {}
        }

        let trans_to_act: Vec<ActivityID> = std::iter::once(start_act)
            .chain(inner)
            .chain(std::iter::once(end_act))
            .map(ActivityID)
            .collect();
        let mut act_to_trans = vec![None; log.activities.len()];
        for (t, a) in trans_to_act.iter().enumerate() {
            act_to_trans[a.0] = Some(TransitionID(t));
        }
        Ok(Self {
            labels: log.activities.clone(),
            start: TransitionID(0),
            end: TransitionID(trans_to_act.len() - 1),
            act_to_trans,
            trans_to_act,
        })
    }

    /// Number of transitions
    pub fn transition_count(&self) -> usize {
        self.trans_to_act.len()
    }

    /// Number of activities
    pub fn activity_count(&self) -> usize {
        self.act_to_trans.len()
    }

    /// Transition of an activity
    pub fn transition_of(&self, activity: ActivityID) -> Result<TransitionID, EncodingError> {
        self.act_to_trans
            .get(activity.0)
            .copied()
            .flatten()
            .ok_or(EncodingError::UnmappedActivity(activity))
    }

    /// Activity of a transition
    pub fn activity_of(&self, transition: TransitionID) -> Result<ActivityID, EncodingError> {
        self.trans_to_act
            .get(transition.0)
            .copied()
            .ok_or(EncodingError::UnmappedTransition(transition))
    }

    /// Transition of the artificial start activity
    pub fn start_transition(&self) -> TransitionID {
        self.start
    }

    /// Transition of the artificial end activity
    pub fn end_transition(&self) -> TransitionID {
        self.end
    }

    /// Artificial start activity
    pub fn start_activity(&self) -> ActivityID {
        self.trans_to_act[self.start.0]
    }

    /// Artificial end activity
    pub fn end_activity(&self) -> ActivityID {
        self.trans_to_act[self.end.0]
    }

    /// Transitions allowed in a preset (all but the artificial end)
    pub fn preset_domain(&self) -> impl Iterator<Item = TransitionID> + '_ {
        (0..self.transition_count())
            .map(TransitionID)
            .filter(|t| *t != self.end)
    }

    /// Transitions allowed in a postset (all but the artificial start)
    pub fn postset_domain(&self) -> impl Iterator<Item = TransitionID> + '_ {
        (0..self.transition_count())
            .map(TransitionID)
            .filter(|t| *t != self.start)
    }

    /// Activities of all transitions in `transitions`
    pub fn activities_of<'a>(
        &'a self,
        transitions: &'a BitSet,
    ) -> impl Iterator<Item = Result<ActivityID, EncodingError>> + 'a {
        transitions
            .iter()
            .map(|t| self.activity_of(TransitionID(t)))
    }

    /// Activity label of a transition
    pub fn label_of(&self, transition: TransitionID) -> Result<&str, EncodingError> {
        let act = self.activity_of(transition)?;
        Ok(self.labels[act.0].as_str())
    }

    /// Activity label of an activity
    pub fn activity_label(&self, activity: ActivityID) -> Option<&str> {
        self.labels.get(activity.0).map(|s| s.as_str())
    }

    /// Sorted labels of all transitions in `transitions`
    pub fn transitions_to_names(&self, transitions: &BitSet) -> Result<Vec<String>, EncodingError> {
        let mut ret = transitions
            .iter()
            .map(|t| self.label_of(TransitionID(t)).map(|s| s.to_string()))
            .collect::<Result<Vec<_>, _>>()?;
        ret.sort();
        Ok(ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EventLogActivityProjection {
        let mut log = EventLogActivityProjection::from_variants(vec![
            (vec!["x", "c", "b"], 4),
            (vec!["b", "c"], 1),
        ]);
        log.add_start_end_activities();
        log
    }

    fn ordered_labels(mapping: &ActivityTransitionMapping) -> Vec<&str> {
        (0..mapping.transition_count())
            .map(|t| mapping.label_of(TransitionID(t)).unwrap())
            .collect()
    }

    #[test]
    fn test_orderings() {
        let log = sample();
        let lex =
            ActivityTransitionMapping::from_projection(&log, TransitionOrdering::Lexicographic)
                .unwrap();
        assert_eq!(ordered_labels(&lex), vec![START_ACTIVITY, "b", "c", "x", END_ACTIVITY]);

        let afoi = ActivityTransitionMapping::from_projection(
            &log,
            TransitionOrdering::AverageFirstOccurrence,
        )
        .unwrap();
        // x: 1.0, c: (2*4 + 2*1)/5 = 2.0, b: (3*4 + 1*1)/5 = 2.6
        assert_eq!(ordered_labels(&afoi), vec![START_ACTIVITY, "x", "c", "b", END_ACTIVITY]);

        let log_order =
            ActivityTransitionMapping::from_projection(&log, TransitionOrdering::LogOrder).unwrap();
        assert_eq!(ordered_labels(&log_order), vec![START_ACTIVITY, "x", "c", "b", END_ACTIVITY]);
    }

    #[test]
    fn test_domains_and_bijection() {
        let log = sample();
        let mapping =
            ActivityTransitionMapping::from_projection(&log, TransitionOrdering::Lexicographic)
                .unwrap();
        assert!(!mapping
            .preset_domain()
            .any(|t| t == mapping.end_transition()));
        assert!(!mapping
            .postset_domain()
            .any(|t| t == mapping.start_transition()));
        for a in 0..mapping.activity_count() {
            let t = mapping.transition_of(ActivityID(a)).unwrap();
            assert_eq!(mapping.activity_of(t).unwrap(), ActivityID(a));
        }
        assert_eq!(
            mapping.activity_of(TransitionID(99)),
            Err(EncodingError::UnmappedTransition(TransitionID(99)))
        );
    }

    #[test]
    fn test_missing_artificial_activities() {
        let log = EventLogActivityProjection::from_variants(vec![(vec!["a"], 1)]);
        assert_eq!(
            ActivityTransitionMapping::from_projection(&log, TransitionOrdering::LogOrder)
                .unwrap_err(),
            EncodingError::MissingArtificialActivity(START_ACTIVITY)
        );
    }
}
