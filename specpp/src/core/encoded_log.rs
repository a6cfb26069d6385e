//! Event log prepared for place discovery
//!
//! Wraps an [`EventLogActivityProjection`] (including the artificial start/end activities) together
//! with its [`ActivityTransitionMapping`] and the [`PrefixAutomaton`] of all variants.
use super::encoding::{
    ActivityID, ActivityTransitionMapping, EncodingError, TransitionID, TransitionOrdering,
};
use super::event_data::activity_projection::EventLogActivityProjection;
use super::process_models::prefix_automaton::{AutomatonState, PrefixAutomaton};

#[derive(Debug, Clone)]
/// A single variant of an [`EncodedLog`]
pub struct EncodedVariant {
    /// Activities of the variant (starting with the artificial start activity)
    pub activities: Vec<ActivityID>,
    /// Transition of each activity
    pub transitions: Vec<TransitionID>,
    /// Automaton state reached after each event
    pub states: Vec<AutomatonState>,
    /// Number of traces following this variant
    pub frequency: u64,
}

impl EncodedVariant {
    /// Number of events
    pub fn len(&self) -> usize {
        self.activities.len()
    }

    /// Returns `true` if the variant has no events
    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }
}

#[derive(Debug, Clone)]
/// Read-only log representation used throughout the search
pub struct EncodedLog {
    projection: EventLogActivityProjection,
    mapping: ActivityTransitionMapping,
    automaton: PrefixAutomaton,
    variants: Vec<EncodedVariant>,
    total_trace_count: u64,
}

impl EncodedLog {
    /// Encode a projection
    ///
    /// Artificial start/end activities are added if not yet present.
    pub fn new(
        mut projection: EventLogActivityProjection,
        ordering: TransitionOrdering,
    ) -> Result<Self, EncodingError> {
        projection.add_start_end_activities();
        let mapping = ActivityTransitionMapping::from_projection(&projection, ordering)?;
        let mut automaton = PrefixAutomaton::new();
        let variants = projection
            .variants()
            .map(|(_, frequency, trace)| {
                let activities: Vec<ActivityID> = trace.iter().copied().map(ActivityID).collect();
                let transitions = activities
                    .iter()
                    .map(|a| mapping.transition_of(*a))
                    .collect::<Result<Vec<_>, _>>()?;
                let states = automaton.add_sequence(&activities);
                Ok(EncodedVariant {
                    activities,
                    transitions,
                    states,
                    frequency,
                })
            })
            .collect::<Result<Vec<_>, EncodingError>>()?;
        let total_trace_count = projection.total_trace_count();
        Ok(Self {
            projection,
            mapping,
            automaton,
            variants,
            total_trace_count,
        })
    }

    /// Underlying activity projection
    pub fn projection(&self) -> &EventLogActivityProjection {
        &self.projection
    }

    /// Activity/transition mapping
    pub fn mapping(&self) -> &ActivityTransitionMapping {
        &self.mapping
    }

    /// Prefix automaton of all variants
    pub fn automaton(&self) -> &PrefixAutomaton {
        &self.automaton
    }

    /// All variants
    pub fn variants(&self) -> &[EncodedVariant] {
        &self.variants
    }

    /// Frequency of the variant at `index`
    pub fn variant_frequency(&self, index: usize) -> Option<u64> {
        self.variants.get(index).map(|v| v.frequency)
    }

    /// Sum of all variant frequencies
    pub fn total_trace_count(&self) -> u64 {
        self.total_trace_count
    }
}
