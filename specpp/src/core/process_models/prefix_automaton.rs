use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::core::encoding::ActivityID;

/// State of a [`PrefixAutomaton`]
pub type AutomatonState = NodeIndex;

/// Deterministic automaton accepting exactly the prefixes of a set of activity sequences
///
/// States correspond to distinct prefixes, edges are labelled with the activity extending the
/// prefix. The automaton is built once and only read afterwards.
#[derive(Debug, Clone)]
pub struct PrefixAutomaton {
    graph: DiGraph<(), ActivityID>,
    initial: AutomatonState,
}

impl Default for PrefixAutomaton {
    fn default() -> Self {
        Self::new()
    }
}

impl PrefixAutomaton {
    /// Automaton accepting only the empty prefix
    pub fn new() -> Self {
        let mut graph = DiGraph::new();
        let initial = graph.add_node(());
        Self { graph, initial }
    }

    /// Build an automaton from the given sequences
    pub fn from_sequences<'a, I>(sequences: I) -> Self
    where
        I: IntoIterator<Item = &'a [ActivityID]>,
    {
        let mut ret = Self::new();
        for seq in sequences {
            ret.add_sequence(seq);
        }
        ret
    }

    /// Add all prefixes of `sequence`, returning the states visited after each activity
    pub fn add_sequence(&mut self, sequence: &[ActivityID]) -> Vec<AutomatonState> {
        let mut state = self.initial;
        let mut path = Vec::with_capacity(sequence.len());
        for act in sequence {
            state = match self.successor(state, *act) {
                Some(next) => next,
                None => {
                    let next = self.graph.add_node(());
                    self.graph.add_edge(state, next, *act);
                    next
                }
            };
            path.push(state);
        }
        path
    }

    /// State of the empty prefix
    pub fn initial(&self) -> AutomatonState {
        self.initial
    }

    /// State reached from `state` by `activity`, if the extended prefix was observed
    pub fn successor(&self, state: AutomatonState, activity: ActivityID) -> Option<AutomatonState> {
        self.graph
            .edges(state)
            .find(|e| *e.weight() == activity)
            .map(|e| e.target())
    }

    /// Returns `true` if some observed prefix continues from `state` with `activity`
    pub fn has_outgoing(&self, state: AutomatonState, activity: ActivityID) -> bool {
        self.successor(state, activity).is_some()
    }

    /// States visited while replaying `sequence`, or `None` if it leaves the automaton
    pub fn replay(&self, sequence: &[ActivityID]) -> Option<Vec<AutomatonState>> {
        let mut state = self.initial;
        sequence
            .iter()
            .map(|act| {
                state = self.successor(state, *act)?;
                Some(state)
            })
            .collect()
    }

    /// Number of states (distinct prefixes, including the empty one)
    pub fn state_count(&self) -> usize {
        self.graph.node_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acts(ids: &[usize]) -> Vec<ActivityID> {
        ids.iter().copied().map(ActivityID).collect()
    }

    #[test]
    fn test_shared_prefixes() {
        let a = acts(&[0, 1, 2, 3]);
        let b = acts(&[0, 1, 4, 3]);
        let automaton = PrefixAutomaton::from_sequences([a.as_slice(), b.as_slice()]);
        // empty + 0 + 01 + 012 + 0123 + 014 + 0143
        assert_eq!(automaton.state_count(), 7);

        let path = automaton.replay(&a).unwrap();
        assert_eq!(path.len(), 4);
        assert!(automaton.has_outgoing(path[1], ActivityID(2)));
        assert!(automaton.has_outgoing(path[1], ActivityID(4)));
        assert!(!automaton.has_outgoing(path[0], ActivityID(2)));
        assert!(!automaton.has_outgoing(path[3], ActivityID(0)));
        assert!(automaton.replay(&acts(&[0, 2])).is_none());
    }

    #[test]
    fn test_add_sequence_matches_replay() {
        let mut automaton = PrefixAutomaton::new();
        let seq = acts(&[5, 6, 5]);
        let path = automaton.add_sequence(&seq);
        assert_eq!(automaton.add_sequence(&seq), path);
        assert_eq!(automaton.replay(&seq), Some(path));
    }
}
