use std::collections::{HashMap, HashSet};

use log::trace;

use crate::core::{
    encoding::{ActivityID, ActivityTransitionMapping},
    process_models::place_candidate::PlaceCandidate,
};
use crate::discovery::specpp::{
    composer::{ActivityCounts, ActivityStatistics, CandidateCompositionEvent},
    error::Result,
    heuristics::HeuristicStrategy,
};

use super::{
    frontier::ExpansionFrontier,
    place_generator::{PlaceGenerator, TreeNode},
};

/// Heuristically ordered enumeration of the candidate tree
///
/// Leaves which can still generate children are kept in an [`ExpansionFrontier`]. Each call to
/// [`EnumeratingTree::expand`] generates exactly one new candidate from the best ranked leaf.
#[derive(Debug)]
pub struct EnumeratingTree {
    generator: PlaceGenerator,
    heuristic: Box<dyn HeuristicStrategy>,
    mapping: ActivityTransitionMapping,
    frontier: ExpansionFrontier<PlaceCandidate>,
    leaves: HashMap<PlaceCandidate, TreeNode>,
    /// Leaves by postset activity, only maintained for statistics dependent heuristics
    leaves_by_activity: HashMap<ActivityID, HashSet<PlaceCandidate>>,
    snapshot: Option<HashMap<ActivityID, ActivityCounts>>,
    expansions: usize,
}

impl EnumeratingTree {
    /// Tree consisting of the root `(∅, ∅)` only
    pub fn new(
        generator: PlaceGenerator,
        heuristic: Box<dyn HeuristicStrategy>,
        mapping: ActivityTransitionMapping,
        statistics: &ActivityStatistics,
    ) -> Result<Self> {
        let frontier = ExpansionFrontier::new(heuristic.ordering());
        let mut tree = Self {
            generator,
            heuristic,
            mapping,
            frontier,
            leaves: HashMap::new(),
            leaves_by_activity: HashMap::new(),
            snapshot: None,
            expansions: 0,
        };
        let root = PlaceCandidate::empty();
        if tree.generator.potential_children_count(&root) > 0 {
            tree.register_leaf(TreeNode::new(root, 0), statistics)?;
        }
        Ok(tree)
    }

    fn tracked_activities(&self, candidate: &PlaceCandidate) -> Result<Vec<ActivityID>> {
        if !self.heuristic.depends_on_statistics() || candidate.is_half_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .mapping
            .activities_of(candidate.postset())
            .collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn register_leaf(&mut self, node: TreeNode, statistics: &ActivityStatistics) -> Result<()> {
        let candidate = node.candidate().clone();
        let score = self.heuristic.compute_heuristic(&candidate, statistics)?;
        for a in self.tracked_activities(&candidate)? {
            self.leaves_by_activity
                .entry(a)
                .or_default()
                .insert(candidate.clone());
        }
        self.frontier.insert(candidate.clone(), score);
        self.leaves.insert(candidate, node);
        Ok(())
    }

    fn remove_leaf(&mut self, candidate: &PlaceCandidate) -> Result<bool> {
        self.frontier.remove(candidate);
        let was_leaf = self.leaves.remove(candidate).is_some();
        for a in self.tracked_activities(candidate)? {
            if let Some(leaves) = self.leaves_by_activity.get_mut(&a) {
                leaves.remove(candidate);
            }
        }
        Ok(was_leaf)
    }

    /// Generate the next candidate, or `None` once the tree is exhausted
    ///
    /// Exhausted leaves at the top of the frontier are evicted until one can generate a child. The
    /// child becomes a leaf itself if it can have children.
    pub fn expand(&mut self, statistics: &ActivityStatistics) -> Result<Option<PlaceCandidate>> {
        loop {
            let Some((top, _)) = self.frontier.peek() else {
                return Ok(None);
            };
            let top = top.clone();
            let Some(node) = self.leaves.get_mut(&top) else {
                self.frontier.remove(&top);
                continue;
            };
            let Some(child) = self.generator.generate_child(node) else {
                self.remove_leaf(&top)?;
                continue;
            };
            let depth = node.depth() + 1;
            let exhausted = !self.generator.has_children_left(node);
            if exhausted {
                self.remove_leaf(&top)?;
            }
            if self.generator.potential_children_count(&child) > 0 {
                self.register_leaf(TreeNode::new(child.clone(), depth), statistics)?;
            }
            self.expansions += 1;
            trace!("Expanded {} into {} (depth {})", top, child, depth);
            return Ok(Some(child));
        }
    }

    /// Remove `candidate` from the leaves, so that none of its descendants are generated
    pub fn prune(&mut self, candidate: &PlaceCandidate) -> Result<bool> {
        let pruned = self.remove_leaf(candidate)?;
        if pruned {
            trace!("Pruned subtree of {}", candidate);
        }
        Ok(pruned)
    }

    /// Re-score leaves after a composition step
    ///
    /// Only applies to heuristics depending on statistics. Acceptances always trigger re-scoring,
    /// revocations only if `gamma > 0` (with `gamma == 0` a revocation leaves all counts unchanged).
    /// Only leaves constraining an activity whose counts changed since the last re-scoring are
    /// updated. Returns the number of re-scored leaves.
    pub fn update_heuristics(
        &mut self,
        events: &[CandidateCompositionEvent],
        gamma: f64,
        statistics: &ActivityStatistics,
    ) -> Result<usize> {
        if !self.heuristic.depends_on_statistics() {
            return Ok(0);
        }
        let triggered = events.iter().any(|e| match e {
            CandidateCompositionEvent::Accept(_) => true,
            CandidateCompositionEvent::RevokeAcceptance(_) => gamma > 0.0,
            CandidateCompositionEvent::Reject(_) => false,
        });
        if !triggered {
            return Ok(0);
        }
        let changed: Vec<ActivityID> = match &self.snapshot {
            None => statistics.iter().map(|(a, _)| a).collect(),
            Some(snapshot) => statistics
                .iter()
                .filter(|(a, counts)| snapshot.get(a) != Some(counts))
                .map(|(a, _)| a)
                .collect(),
        };
        let affected: HashSet<PlaceCandidate> = changed
            .iter()
            .filter_map(|a| self.leaves_by_activity.get(a))
            .flatten()
            .cloned()
            .collect();
        for candidate in &affected {
            let score = self.heuristic.compute_heuristic(candidate, statistics)?;
            self.frontier.update(candidate, score);
        }
        self.snapshot = Some(statistics.iter().collect());
        trace!(
            "Re-scored {} leaves for {} changed activities",
            affected.len(),
            changed.len()
        );
        Ok(affected.len())
    }

    /// Returns `true` if no leaf can generate further children
    pub fn is_exhausted(&self) -> bool {
        self.frontier.is_empty()
    }

    /// Number of expandable leaves
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Returns `true` if `candidate` is an expandable leaf
    pub fn is_leaf(&self, candidate: &PlaceCandidate) -> bool {
        self.leaves.contains_key(candidate)
    }

    /// Frontier of expandable leaves
    pub fn frontier(&self) -> &ExpansionFrontier<PlaceCandidate> {
        &self.frontier
    }

    /// Number of candidates generated so far
    pub fn expansions(&self) -> usize {
        self.expansions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        encoded_log::EncodedLog, encoding::TransitionOrdering,
        event_data::activity_projection::EventLogActivityProjection,
    };
    use crate::discovery::specpp::{
        composer::ETCPrecisionComposer,
        config::{SPECppConfig, TreeTraversalHeuristic},
        heuristics::heuristic_from_config,
    };

    fn log() -> EncodedLog {
        let projection = EventLogActivityProjection::from_variants(vec![
            (vec!["a", "b"], 3),
            (vec!["a", "c"], 1),
        ]);
        EncodedLog::new(projection, TransitionOrdering::LogOrder).unwrap()
    }

    fn build_tree(
        log: &EncodedLog,
        config: &SPECppConfig,
        stats: &ActivityStatistics,
    ) -> EnumeratingTree {
        EnumeratingTree::new(
            PlaceGenerator::new(log.mapping(), config.max_place_size),
            heuristic_from_config(config, log).unwrap(),
            log.mapping().clone(),
            stats,
        )
        .unwrap()
    }

    #[test]
    fn test_full_enumeration() {
        let log = log();
        let config = SPECppConfig::default();
        let composer = ETCPrecisionComposer::new(&log, &config).unwrap();
        let mut tree = build_tree(&log, &config, composer.statistics());
        let mut generated = HashSet::new();
        while let Some(c) = tree.expand(composer.statistics()).unwrap() {
            assert!(generated.insert(c));
        }
        // 4 preset transitions and 4 postset transitions
        assert_eq!(generated.len(), 15 * 16);
        assert_eq!(tree.expansions(), 15 * 16);
        assert!(tree.is_exhausted());
        assert_eq!(tree.leaf_count(), 0);
    }

    #[test]
    fn test_prune_skips_subtree() {
        let log = log();
        let config = SPECppConfig {
            max_place_size: Some(3),
            ..Default::default()
        };
        let composer = ETCPrecisionComposer::new(&log, &config).unwrap();
        let mut tree = build_tree(&log, &config, composer.statistics());
        let mut generated = Vec::new();
        while let Some(c) = tree.expand(composer.statistics()).unwrap() {
            if c.preset().len() == 1 && c.postset().len() == 1 {
                tree.prune(&c).unwrap();
                assert!(!tree.is_leaf(&c));
            }
            generated.push(c);
        }
        assert!(!generated
            .iter()
            .any(|c| c.preset().len() == 1 && c.postset().len() == 2));
        assert!(generated
            .iter()
            .any(|c| c.preset().len() == 2 && c.postset().len() == 1));
    }

    #[test]
    fn test_half_empty_expanded_first() {
        let log = log();
        let config = SPECppConfig::default();
        let composer = ETCPrecisionComposer::new(&log, &config).unwrap();
        let mut tree = build_tree(&log, &config, composer.statistics());
        // The root only has half-empty children, which keep the best score
        for _ in 0..4 {
            let c = tree.expand(composer.statistics()).unwrap().unwrap();
            assert!(c.is_half_empty());
        }
    }

    #[test]
    fn test_rescoring_only_for_statistics_heuristics() {
        let log = log();
        let config = SPECppConfig {
            heuristic: TreeTraversalHeuristic::GreedyETCPrecision,
            ..Default::default()
        };
        let composer = ETCPrecisionComposer::new(&log, &config).unwrap();
        let stats = composer.statistics();
        let mut tree = build_tree(&log, &config, stats);
        while tree.leaves.keys().all(|c| c.is_half_empty()) {
            tree.expand(stats).unwrap();
        }
        let accept = [CandidateCompositionEvent::Accept(PlaceCandidate::empty())];
        let reject = [CandidateCompositionEvent::Reject(PlaceCandidate::empty())];
        let revoke = [CandidateCompositionEvent::RevokeAcceptance(PlaceCandidate::empty())];
        assert_eq!(tree.update_heuristics(&reject, 0.0, stats).unwrap(), 0);
        assert_eq!(tree.update_heuristics(&revoke, 0.0, stats).unwrap(), 0);
        // First update re-scores every tracked leaf
        assert!(tree.update_heuristics(&accept, 0.0, stats).unwrap() > 0);
        // Nothing changed since the snapshot
        assert_eq!(tree.update_heuristics(&accept, 0.0, stats).unwrap(), 0);

        let df_config = SPECppConfig::default();
        let mut df_tree = build_tree(&log, &df_config, stats);
        df_tree.expand(stats).unwrap();
        assert_eq!(df_tree.update_heuristics(&accept, 0.0, stats).unwrap(), 0);
    }
}
