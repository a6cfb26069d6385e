//! Replay of single places on the variants of an [`EncodedLog`]
//!
//! The token count of a place is tracked through every variant: when event `i` consumes from the
//! place the count is decremented and bit `2i` records whether tokens are left, afterwards the
//! count is incremented if event `i` produces into the place and bit `2i + 1` records whether the
//! place is marked. The same replay yields the [`PlaceFitness`] of the place.
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::{
    bitset::BitSet, encoded_log::EncodedLog, encoded_log::EncodedVariant,
    process_models::place_candidate::PlaceCandidate,
};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Marking history of a place for every variant of a log
pub struct VariantMarkingHistories {
    histories: Vec<BitSet>,
}

impl VariantMarkingHistories {
    /// Is the place marked after event `position` of variant `variant` consumed from it?
    pub fn is_marked_after_consumption(&self, variant: usize, position: usize) -> bool {
        self.histories[variant].contains(2 * position)
    }

    /// Is the place marked after event `position` of variant `variant` was fully replayed?
    pub fn is_marked_after_production(&self, variant: usize, position: usize) -> bool {
        self.histories[variant].contains(2 * position + 1)
    }

    /// Raw history bits of a variant
    pub fn variant_history(&self, variant: usize) -> &BitSet {
        &self.histories[variant]
    }

    /// Number of variants
    pub fn variant_count(&self) -> usize {
        self.histories.len()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Frequency-weighted replay outcome of a place
///
/// A trace is underfed if the place's token count ever drops below zero and overfed if tokens are
/// left after the last event. A trace can be both.
pub struct PlaceFitness {
    /// Traces which are neither underfed nor overfed
    pub fitting: u64,
    /// Underfed traces
    pub underfed: u64,
    /// Overfed traces
    pub overfed: u64,
    /// All traces
    pub total: u64,
}

impl PlaceFitness {
    /// Fraction of fitting traces (`1.0` for an empty log)
    pub fn fitting_fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.fitting as f64 / self.total as f64
    }

    /// Fraction of underfed traces (`0.0` for an empty log)
    pub fn underfed_fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.underfed as f64 / self.total as f64
    }

    fn merge(self, other: Self) -> Self {
        Self {
            fitting: self.fitting + other.fitting,
            underfed: self.underfed + other.underfed,
            overfed: self.overfed + other.overfed,
            total: self.total + other.total,
        }
    }
}

#[derive(Debug, Clone, Copy)]
/// Computes [`VariantMarkingHistories`] and [`PlaceFitness`] of places on a fixed log
pub struct MarkingHistoryEvaluator<'a> {
    log: &'a EncodedLog,
}

impl<'a> MarkingHistoryEvaluator<'a> {
    /// Evaluator for `log`
    pub fn new(log: &'a EncodedLog) -> Self {
        Self { log }
    }

    /// Replay `place` on all variants
    pub fn evaluate(&self, place: &PlaceCandidate) -> (VariantMarkingHistories, PlaceFitness) {
        let (histories, fitness): (Vec<BitSet>, Vec<PlaceFitness>) = self
            .log
            .variants()
            .par_iter()
            .map(|variant| replay_variant(place, variant))
            .unzip();
        let fitness = fitness
            .into_iter()
            .fold(PlaceFitness::default(), PlaceFitness::merge);
        (VariantMarkingHistories { histories }, fitness)
    }
}

fn replay_variant(place: &PlaceCandidate, variant: &EncodedVariant) -> (BitSet, PlaceFitness) {
    let mut history = BitSet::with_capacity(2 * variant.len());
    let mut marking: i64 = 0;
    let mut underfed = false;
    for (i, t) in variant.transitions.iter().enumerate() {
        if place.postset().contains(t.0) {
            marking -= 1;
            underfed |= marking < 0;
        }
        if marking > 0 {
            history.insert(2 * i);
        }
        if place.preset().contains(t.0) {
            marking += 1;
        }
        if marking > 0 {
            history.insert(2 * i + 1);
        }
    }
    let overfed = marking > 0;
    let w = variant.frequency;
    let fitness = PlaceFitness {
        fitting: if underfed || overfed { 0 } else { w },
        underfed: if underfed { w } else { 0 },
        overfed: if overfed { w } else { 0 },
        total: w,
    };
    (history, fitness)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        encoding::{ActivityID, TransitionOrdering},
        event_data::activity_projection::EventLogActivityProjection,
    };

    fn log() -> EncodedLog {
        let projection = EventLogActivityProjection::from_variants(vec![
            (vec!["a", "b"], 3),
            (vec!["b", "a"], 1),
        ]);
        EncodedLog::new(projection, TransitionOrdering::LogOrder).unwrap()
    }

    fn place(log: &EncodedLog, pre: &[&str], post: &[&str]) -> PlaceCandidate {
        let mapping = log.mapping();
        let to_t = |label: &&str| {
            mapping
                .transition_of(ActivityID(log.projection().act_to_index[*label]))
                .unwrap()
        };
        PlaceCandidate::from_transitions(pre.iter().map(to_t), post.iter().map(to_t))
    }

    #[test]
    fn test_history_bits() {
        let log = log();
        let evaluator = MarkingHistoryEvaluator::new(&log);
        let (histories, fitness) = evaluator.evaluate(&place(&log, &["a"], &["b"]));
        assert_eq!(histories.variant_count(), 2);
        // start a b end: marked after producing at a (position 1), consumed at b (position 2)
        assert!(!histories.is_marked_after_production(0, 0));
        assert!(histories.is_marked_after_production(0, 1));
        assert!(!histories.is_marked_after_consumption(0, 2));
        assert!(!histories.is_marked_after_production(0, 2));
        assert_eq!(
            fitness,
            PlaceFitness {
                fitting: 3,
                underfed: 1,
                overfed: 0,
                total: 4
            }
        );
        assert_eq!(fitness.fitting_fraction(), 0.75);
        assert_eq!(fitness.underfed_fraction(), 0.25);

        let (_, fitness) = evaluator.evaluate(&place(&log, &["a"], &[]));
        assert_eq!(fitness.overfed, 4);
    }

    #[test]
    fn test_second_consumer_underfeeds() {
        let log = log();
        let (histories, fitness) =
            MarkingHistoryEvaluator::new(&log).evaluate(&place(&log, &["__START"], &["a", "b"]));
        // The single token is consumed by whichever of a/b occurs first
        assert!(histories.is_marked_after_production(0, 0));
        assert!(!histories.is_marked_after_consumption(0, 1));
        assert_eq!(fitness.underfed, 4);
    }
}
