use std::collections::HashMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Label of the artificial activity prepended to every trace
pub const START_ACTIVITY: &str = "__START";
/// Label of the artificial activity appended to every trace
pub const END_ACTIVITY: &str = "__END";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Projection of an event log on just activity labels
///
/// Traces are stored as variants: a sequence of activity indices (into `activities`) together with
/// the number of traces following exactly this sequence.
pub struct EventLogActivityProjection {
    /// Activity labels, indexed by activity index
    pub activities: Vec<String>,
    /// Reverse lookup of `activities`
    pub act_to_index: HashMap<String, usize>,
    /// Variants and their frequency
    pub traces: Vec<(Vec<usize>, u64)>,
}

impl EventLogActivityProjection {
    /// Build a projection from labelled variants
    ///
    /// Activity indices are assigned in order of first appearance. Duplicate variants are merged
    /// (keeping the position of their first appearance) and variants with frequency 0 are dropped.
    pub fn from_variants<S, I>(variants: I) -> Self
    where
        S: AsRef<str>,
        I: IntoIterator<Item = (Vec<S>, u64)>,
    {
        let mut ret = Self::default();
        let mut variant_index: HashMap<Vec<usize>, usize> = HashMap::new();
        for (variant, freq) in variants {
            if freq == 0 {
                continue;
            }
            let trace: Vec<usize> = variant
                .iter()
                .map(|act| ret.index_or_insert(act.as_ref()))
                .collect();
            match variant_index.get(&trace) {
                Some(i) => ret.traces[*i].1 += freq,
                None => {
                    variant_index.insert(trace.clone(), ret.traces.len());
                    ret.traces.push((trace, freq));
                }
            }
        }
        ret
    }

    fn index_or_insert(&mut self, act: &str) -> usize {
        if let Some(index) = self.act_to_index.get(act) {
            return *index;
        }
        let new_act_index = self.activities.len();
        self.activities.push(act.to_string());
        self.act_to_index.insert(act.to_string(), new_act_index);
        new_act_index
    }

    /// Wrap every variant in the artificial [`START_ACTIVITY`] and [`END_ACTIVITY`]
    ///
    /// Does nothing if the projection already contains both artificial activities.
    pub fn add_start_end_activities(&mut self) {
        if self.act_to_index.contains_key(START_ACTIVITY)
            && self.act_to_index.contains_key(END_ACTIVITY)
        {
            return;
        }
        let start_act = self.index_or_insert(START_ACTIVITY);
        let end_act = self.index_or_insert(END_ACTIVITY);
        self.traces.iter_mut().for_each(|(trace, _)| {
            trace.insert(0, start_act);
            trace.push(end_act);
        });
    }

    /// Number of distinct variants
    pub fn variant_count(&self) -> usize {
        self.traces.len()
    }

    /// Total number of traces (sum of all variant frequencies)
    pub fn total_trace_count(&self) -> u64 {
        self.traces.iter().map(|(_, w)| w).sum()
    }

    /// Frequency of the variant at `index`
    pub fn variant_frequency(&self, index: usize) -> Option<u64> {
        self.traces.get(index).map(|(_, w)| *w)
    }

    /// Iterate over `(index, frequency, activities)` of all variants
    pub fn variants(&self) -> impl Iterator<Item = (usize, u64, &[usize])> + '_ {
        self.traces
            .iter()
            .enumerate()
            .map(|(i, (trace, w))| (i, *w, trace.as_slice()))
    }

    /// Sorted activity labels of the given activity indices
    pub fn acts_to_names(&self, acts: &[usize]) -> Vec<String> {
        let mut ret: Vec<String> = acts
            .iter()
            .map(|act| self.activities[*act].clone())
            .collect();
        ret.sort();
        ret
    }

    /// Frequency-weighted mean index of the first occurrence of each activity in a trace
    ///
    /// Activities which never occur get a mean of `0.0`.
    pub fn average_first_occurrence_indices(&self) -> Vec<f64> {
        let mut sums = vec![0.0_f64; self.activities.len()];
        let mut freq_sums = vec![0_u64; self.activities.len()];
        for (trace, w) in &self.traces {
            let mut seen = vec![false; self.activities.len()];
            for (i, act) in trace.iter().enumerate() {
                if !seen[*act] {
                    seen[*act] = true;
                    sums[*act] += i as f64 * *w as f64;
                    freq_sums[*act] += w;
                }
            }
        }
        sums.into_iter()
            .zip(freq_sums)
            .map(|(sum, freq)| if freq == 0 { 0.0 } else { sum / freq as f64 })
            .collect()
    }

    /// Frequency-weighted eventually-follows counts
    ///
    /// For every pair of positions `i < j` in a variant, `(trace[i], trace[j])` is counted once.
    pub fn eventually_follows_counts(&self) -> HashMap<(usize, usize), u64> {
        self.traces
            .par_iter()
            .fold(HashMap::<(usize, usize), u64>::new, |mut map, (t, w)| {
                for (i, a) in t.iter().enumerate() {
                    for b in &t[i + 1..] {
                        *map.entry((*a, *b)).or_insert(0) += w;
                    }
                }
                map
            })
            .reduce(HashMap::new, merge_count_maps)
    }
}

fn merge_count_maps(
    mut m1: HashMap<(usize, usize), u64>,
    mut m2: HashMap<(usize, usize), u64>,
) -> HashMap<(usize, usize), u64> {
    if m1.len() < m2.len() {
        std::mem::swap(&mut m1, &mut m2);
    }
    for (k, v) in m2 {
        *m1.entry(k).or_default() += v;
    }
    m1
}

#[derive(Debug, Default, Clone)]
/// Weighted directly-follows graph over the activity indices of an [`EventLogActivityProjection`]
pub struct ActivityProjectionDFG {
    /// Activity indices
    pub nodes: Vec<usize>,
    /// Directly-follows relations and their (frequency-weighted) count
    pub edges: HashMap<(usize, usize), u64>,
}

impl ActivityProjectionDFG {
    /// Number of times `b` directly follows `a`
    pub fn df_between(&self, a: usize, b: usize) -> u64 {
        *self.edges.get(&(a, b)).unwrap_or(&0)
    }

    /// Construct the DFG of a projection
    pub fn from_event_log_projection(log: &EventLogActivityProjection) -> Self {
        ActivityProjectionDFG {
            nodes: (0..log.activities.len()).collect(),
            edges: log
                .traces
                .par_iter()
                .fold(HashMap::<(usize, usize), u64>::new, |mut map, (t, w)| {
                    for pair in t.windows(2) {
                        *map.entry((pair[0], pair[1])).or_insert(0) += w;
                    }
                    map
                })
                .reduce(HashMap::new, merge_count_maps),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EventLogActivityProjection {
        EventLogActivityProjection::from_variants(vec![
            (vec!["a", "b", "c"], 3),
            (vec!["a", "c"], 1),
            (vec!["a", "b", "c"], 2),
            (vec!["b"], 0),
        ])
    }

    #[test]
    fn test_from_variants_merges_duplicates() {
        let log = sample();
        assert_eq!(log.activities, vec!["a", "b", "c"]);
        assert_eq!(log.traces, vec![(vec![0, 1, 2], 5), (vec![0, 2], 1)]);
        assert_eq!(log.total_trace_count(), 6);
        assert_eq!(log.variant_frequency(1), Some(1));
        assert_eq!(log.variant_frequency(2), None);
    }

    #[test]
    fn test_start_end_wrapping_is_idempotent() {
        let mut log = sample();
        log.add_start_end_activities();
        log.add_start_end_activities();
        let start = log.act_to_index[START_ACTIVITY];
        let end = log.act_to_index[END_ACTIVITY];
        assert_eq!(log.activities.len(), 5);
        for (_, _, trace) in log.variants() {
            assert_eq!(trace.first(), Some(&start));
            assert_eq!(trace.last(), Some(&end));
        }
    }

    #[test]
    fn test_log_relations() {
        let log = sample();
        let dfg = ActivityProjectionDFG::from_event_log_projection(&log);
        assert_eq!(dfg.df_between(0, 1), 5);
        assert_eq!(dfg.df_between(0, 2), 1);
        assert_eq!(dfg.df_between(2, 0), 0);

        let ef = log.eventually_follows_counts();
        assert_eq!(ef[&(0, 2)], 6);
        assert_eq!(ef[&(0, 1)], 5);
        assert!(!ef.contains_key(&(2, 0)));

        let afoi = log.average_first_occurrence_indices();
        assert_eq!(afoi[0], 0.0);
        assert_eq!(afoi[1], 1.0);
        // (2 * 5 + 1 * 1) / 6
        assert!((afoi[2] - 11.0 / 6.0).abs() < 1e-12);
    }
}
