//! Tree traversal heuristics
//!
//! Every heuristic blends a domain term (weighted by `alpha`) with a term on the place size
//! (weighted by `1 - alpha`). Half-empty candidates always receive the best possible score so that
//! the scaffolding of the candidate tree is explored first.
use std::cmp::Ordering;
use std::collections::HashMap;

use itertools::Itertools;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::core::{
    encoded_log::EncodedLog,
    encoding::{ActivityID, ActivityTransitionMapping, TransitionID},
    event_data::activity_projection::ActivityProjectionDFG,
    process_models::place_candidate::PlaceCandidate,
};

use super::{
    composer::ActivityStatistics,
    config::{SPECppConfig, TreeTraversalHeuristic},
    error::Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
/// Heuristic score of a tree node
pub struct TreeNodeScore(pub OrderedFloat<f64>);

impl TreeNodeScore {
    /// Wrap a raw score
    pub fn new(score: f64) -> Self {
        Self(OrderedFloat(score))
    }

    /// Raw score
    pub fn value(&self) -> f64 {
        self.0.into_inner()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Direction in which scores are ranked
pub enum ScoreOrdering {
    /// Smaller scores are better
    Ascending,
    /// Larger scores are better
    Descending,
}

impl ScoreOrdering {
    /// [`Ordering::Greater`] if `a` ranks before `b`
    pub fn compare(&self, a: TreeNodeScore, b: TreeNodeScore) -> Ordering {
        match self {
            ScoreOrdering::Ascending => b.cmp(&a),
            ScoreOrdering::Descending => a.cmp(&b),
        }
    }

    /// The best achievable score
    pub fn best(&self) -> TreeNodeScore {
        match self {
            ScoreOrdering::Ascending => TreeNodeScore::new(0.0),
            ScoreOrdering::Descending => TreeNodeScore::new(f64::MAX),
        }
    }
}

/// Scoring function for candidate tree nodes
pub trait HeuristicStrategy: std::fmt::Debug {
    /// Score of `candidate` given the committed `statistics`
    fn compute_heuristic(
        &self,
        candidate: &PlaceCandidate,
        statistics: &ActivityStatistics,
    ) -> Result<TreeNodeScore>;

    /// Ranking direction of the scores
    fn ordering(&self) -> ScoreOrdering;

    /// Whether scores change when the statistics change
    fn depends_on_statistics(&self) -> bool {
        false
    }
}

fn max_size(mapping: &ActivityTransitionMapping) -> usize {
    mapping.preset_domain().count() + mapping.postset_domain().count()
}

fn size_ratio(candidate: &PlaceCandidate, max_size: usize) -> f64 {
    if max_size == 0 {
        return 0.0;
    }
    candidate.size() as f64 / max_size as f64
}

fn blend(alpha: f64, domain_term: f64, size_term: f64) -> TreeNodeScore {
    TreeNodeScore::new(alpha * domain_term + (1.0 - alpha) * size_term)
}

#[derive(Debug, Clone)]
/// Dense transition × transition count matrix
struct TransitionMatrix {
    n: usize,
    counts: Vec<u64>,
    max: u64,
}

impl TransitionMatrix {
    fn from_activity_counts(
        mapping: &ActivityTransitionMapping,
        activity_counts: &HashMap<(usize, usize), u64>,
    ) -> Result<Self> {
        let n = mapping.transition_count();
        let mut counts = vec![0; n * n];
        for ((a, b), count) in activity_counts {
            let ta = mapping.transition_of(ActivityID(*a))?;
            let tb = mapping.transition_of(ActivityID(*b))?;
            counts[ta.0 * n + tb.0] = *count;
        }
        let max = counts.iter().copied().max().unwrap_or(0);
        Ok(Self { n, counts, max })
    }

    /// Mean count over preset × postset, normalized by the largest count
    fn normalized_mean(&self, candidate: &PlaceCandidate) -> f64 {
        let pairs = candidate.preset().len() * candidate.postset().len();
        if self.max == 0 || pairs == 0 {
            return 0.0;
        }
        let sum: u64 = candidate
            .preset()
            .iter()
            .cartesian_product(candidate.postset().iter())
            .map(|(p, q)| self.counts[p * self.n + q])
            .sum();
        sum as f64 / pairs as f64 / self.max as f64
    }
}

#[derive(Debug, Clone)]
/// Prefers places between activities which often directly follow each other
pub struct DirectlyFollowsHeuristic {
    alpha: f64,
    max_size: usize,
    df: TransitionMatrix,
}

impl DirectlyFollowsHeuristic {
    /// Compute directly-follows relations of `log`
    pub fn new(log: &EncodedLog, alpha: f64) -> Result<Self> {
        let dfg = ActivityProjectionDFG::from_event_log_projection(log.projection());
        Ok(Self {
            alpha,
            max_size: max_size(log.mapping()),
            df: TransitionMatrix::from_activity_counts(log.mapping(), &dfg.edges)?,
        })
    }
}

impl HeuristicStrategy for DirectlyFollowsHeuristic {
    fn compute_heuristic(
        &self,
        candidate: &PlaceCandidate,
        _statistics: &ActivityStatistics,
    ) -> Result<TreeNodeScore> {
        if candidate.is_half_empty() {
            return Ok(self.ordering().best());
        }
        Ok(blend(
            self.alpha,
            self.df.normalized_mean(candidate),
            1.0 - size_ratio(candidate, self.max_size),
        ))
    }

    fn ordering(&self) -> ScoreOrdering {
        ScoreOrdering::Descending
    }
}

#[derive(Debug, Clone)]
/// Prefers places between activities which often eventually follow each other
pub struct EventuallyFollowsHeuristic {
    alpha: f64,
    max_size: usize,
    ef: TransitionMatrix,
}

impl EventuallyFollowsHeuristic {
    /// Compute eventually-follows relations of `log`
    pub fn new(log: &EncodedLog, alpha: f64) -> Result<Self> {
        Ok(Self {
            alpha,
            max_size: max_size(log.mapping()),
            ef: TransitionMatrix::from_activity_counts(
                log.mapping(),
                &log.projection().eventually_follows_counts(),
            )?,
        })
    }
}

impl HeuristicStrategy for EventuallyFollowsHeuristic {
    fn compute_heuristic(
        &self,
        candidate: &PlaceCandidate,
        _statistics: &ActivityStatistics,
    ) -> Result<TreeNodeScore> {
        if candidate.is_half_empty() {
            return Ok(self.ordering().best());
        }
        Ok(blend(
            self.alpha,
            self.ef.normalized_mean(candidate),
            1.0 - size_ratio(candidate, self.max_size),
        ))
    }

    fn ordering(&self) -> ScoreOrdering {
        ScoreOrdering::Descending
    }
}

#[derive(Debug, Clone)]
/// Prefers places whose preset and postset activities occur close to each other
pub struct AverageFirstOccurrenceDeltaHeuristic {
    alpha: f64,
    max_size: usize,
    /// Average first occurrence index per transition
    afoi: Vec<f64>,
    normalizer: f64,
}

impl AverageFirstOccurrenceDeltaHeuristic {
    /// Compute the average first occurrence indices of `log`
    pub fn new(log: &EncodedLog, alpha: f64) -> Result<Self> {
        let mapping = log.mapping();
        let by_activity = log.projection().average_first_occurrence_indices();
        let afoi = (0..mapping.transition_count())
            .map(|t| {
                mapping
                    .activity_of(TransitionID(t))
                    .map(|a| by_activity[a.0])
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let normalizer = afoi[mapping.end_transition().0];
        Ok(Self {
            alpha,
            max_size: max_size(mapping),
            afoi,
            normalizer,
        })
    }
}

impl HeuristicStrategy for AverageFirstOccurrenceDeltaHeuristic {
    fn compute_heuristic(
        &self,
        candidate: &PlaceCandidate,
        _statistics: &ActivityStatistics,
    ) -> Result<TreeNodeScore> {
        if candidate.is_half_empty() {
            return Ok(self.ordering().best());
        }
        let domain_term = if self.normalizer == 0.0 {
            0.0
        } else {
            let pairs = candidate.preset().len() * candidate.postset().len();
            let sum: f64 = candidate
                .preset()
                .iter()
                .cartesian_product(candidate.postset().iter())
                .map(|(p, q)| (self.afoi[q] - self.afoi[p]).abs())
                .sum();
            sum / pairs as f64 / self.normalizer
        };
        Ok(blend(
            self.alpha,
            domain_term,
            size_ratio(candidate, self.max_size),
        ))
    }

    fn ordering(&self) -> ScoreOrdering {
        ScoreOrdering::Ascending
    }
}

#[derive(Debug, Clone)]
/// Prefers places constraining activities with much escaping behaviour
pub struct GreedyETCPrecisionHeuristic {
    alpha: f64,
    max_size: usize,
    mapping: ActivityTransitionMapping,
}

impl GreedyETCPrecisionHeuristic {
    /// Heuristic on the activities of `log`
    pub fn new(log: &EncodedLog, alpha: f64) -> Self {
        Self {
            alpha,
            max_size: max_size(log.mapping()),
            mapping: log.mapping().clone(),
        }
    }
}

impl HeuristicStrategy for GreedyETCPrecisionHeuristic {
    fn compute_heuristic(
        &self,
        candidate: &PlaceCandidate,
        statistics: &ActivityStatistics,
    ) -> Result<TreeNodeScore> {
        if candidate.is_half_empty() {
            return Ok(self.ordering().best());
        }
        let mut escaping = 0;
        let mut allowed = 0;
        for a in self.mapping.activities_of(candidate.postset()) {
            let counts = statistics.get(a?)?;
            escaping += counts.escaping;
            allowed += counts.allowed;
        }
        let domain_term = if allowed == 0 {
            0.0
        } else {
            escaping as f64 / allowed as f64
        };
        Ok(blend(
            self.alpha,
            domain_term,
            1.0 - size_ratio(candidate, self.max_size),
        ))
    }

    fn ordering(&self) -> ScoreOrdering {
        ScoreOrdering::Descending
    }

    fn depends_on_statistics(&self) -> bool {
        true
    }
}

/// Construct the heuristic selected in `config`
pub fn heuristic_from_config(
    config: &SPECppConfig,
    log: &EncodedLog,
) -> Result<Box<dyn HeuristicStrategy>> {
    Ok(match config.heuristic {
        TreeTraversalHeuristic::DirectlyFollows => {
            Box::new(DirectlyFollowsHeuristic::new(log, config.alpha)?)
        }
        TreeTraversalHeuristic::EventuallyFollows => {
            Box::new(EventuallyFollowsHeuristic::new(log, config.alpha)?)
        }
        TreeTraversalHeuristic::AverageFirstOccurrenceDelta => {
            Box::new(AverageFirstOccurrenceDeltaHeuristic::new(log, config.alpha)?)
        }
        TreeTraversalHeuristic::GreedyETCPrecision => {
            Box::new(GreedyETCPrecisionHeuristic::new(log, config.alpha))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        encoding::TransitionOrdering, event_data::activity_projection::EventLogActivityProjection,
    };

    // Transitions (log order): start=0, a=1, b=2, c=3, end=4
    fn log() -> EncodedLog {
        let projection = EventLogActivityProjection::from_variants(vec![
            (vec!["a", "b", "c"], 3),
            (vec!["a", "c"], 1),
        ]);
        EncodedLog::new(projection, TransitionOrdering::LogOrder).unwrap()
    }

    fn place(pre: &[usize], post: &[usize]) -> PlaceCandidate {
        PlaceCandidate::from_transitions(
            pre.iter().copied().map(TransitionID),
            post.iter().copied().map(TransitionID),
        )
    }

    fn assert_close(score: TreeNodeScore, expected: f64) {
        assert!(
            (score.value() - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            score.value()
        );
    }

    #[test]
    fn test_score_ordering() {
        let low = TreeNodeScore::new(0.1);
        let high = TreeNodeScore::new(0.9);
        assert_eq!(ScoreOrdering::Descending.compare(high, low), Ordering::Greater);
        assert_eq!(ScoreOrdering::Ascending.compare(high, low), Ordering::Less);
        assert_eq!(
            ScoreOrdering::Ascending.compare(ScoreOrdering::Ascending.best(), low),
            Ordering::Greater
        );
    }

    #[test]
    fn test_follows_heuristics() {
        let log = log();
        let stats = ActivityStatistics::new(log.total_trace_count());
        // max DF: start->a with 4
        let df = DirectlyFollowsHeuristic::new(&log, 1.0).unwrap();
        assert_close(df.compute_heuristic(&place(&[1], &[2]), &stats).unwrap(), 0.75);
        assert_close(df.compute_heuristic(&place(&[1], &[2, 3]), &stats).unwrap(), 0.5);

        // max size: 4 + 4, size 2
        let df_size = DirectlyFollowsHeuristic::new(&log, 0.0).unwrap();
        assert_close(df_size.compute_heuristic(&place(&[1], &[2]), &stats).unwrap(), 0.75);

        // EF(a, c) = 4 is maximal
        let ef = EventuallyFollowsHeuristic::new(&log, 1.0).unwrap();
        assert_close(ef.compute_heuristic(&place(&[1], &[3]), &stats).unwrap(), 1.0);
        assert_close(ef.compute_heuristic(&place(&[3], &[1]), &stats).unwrap(), 0.0);
    }

    #[test]
    fn test_afoi_heuristic() {
        let log = log();
        let stats = ActivityStatistics::new(log.total_trace_count());
        // afoi: start 0, a 1, b 2, c (3*3 + 2*1) / 4 = 2.75, end (4*3 + 3*1) / 4 = 3.75
        let afoi = AverageFirstOccurrenceDeltaHeuristic::new(&log, 1.0).unwrap();
        assert_eq!(afoi.ordering(), ScoreOrdering::Ascending);
        assert_close(
            afoi.compute_heuristic(&place(&[1], &[2]), &stats).unwrap(),
            1.0 / 3.75,
        );
        assert_close(
            afoi.compute_heuristic(&place(&[0], &[4]), &stats).unwrap(),
            1.0,
        );
    }

    #[test]
    fn test_half_empty_gets_best_score() {
        let log = log();
        let stats = ActivityStatistics::new(log.total_trace_count());
        let config = SPECppConfig::default();
        for heuristic in [
            TreeTraversalHeuristic::DirectlyFollows,
            TreeTraversalHeuristic::EventuallyFollows,
            TreeTraversalHeuristic::AverageFirstOccurrenceDelta,
            TreeTraversalHeuristic::GreedyETCPrecision,
        ] {
            let strategy = heuristic_from_config(
                &SPECppConfig {
                    heuristic,
                    alpha: 0.3,
                    ..config
                },
                &log,
            )
            .unwrap();
            for half_empty in [place(&[], &[]), place(&[1, 2], &[]), place(&[], &[3])] {
                assert_eq!(
                    strategy.compute_heuristic(&half_empty, &stats).unwrap(),
                    strategy.ordering().best()
                );
            }
        }
    }

    #[test]
    fn test_greedy_requires_statistics() {
        let log = log();
        let greedy = GreedyETCPrecisionHeuristic::new(&log, 1.0);
        assert!(greedy.depends_on_statistics());
        assert!(greedy
            .compute_heuristic(&place(&[1], &[2]), &ActivityStatistics::new(4))
            .is_err());
    }
}
