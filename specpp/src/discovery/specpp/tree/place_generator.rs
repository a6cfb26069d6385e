use crate::core::{
    encoding::{ActivityTransitionMapping, TransitionID},
    process_models::place_candidate::PlaceCandidate,
};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Node of the candidate tree
pub struct TreeNode {
    candidate: PlaceCandidate,
    /// Index of the next child to generate
    cursor: usize,
    depth: usize,
}

impl TreeNode {
    /// Node without generated children
    pub fn new(candidate: PlaceCandidate, depth: usize) -> Self {
        Self {
            candidate,
            cursor: 0,
            depth,
        }
    }

    /// The place of this node
    pub fn candidate(&self) -> &PlaceCandidate {
        &self.candidate
    }

    /// Distance from the root
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of children generated so far
    pub fn generated_children(&self) -> usize {
        self.cursor
    }
}

#[derive(Debug, Clone)]
/// Canonical child generation of the candidate tree
///
/// Every place over the preset/postset domains is generated exactly once:
/// - the root `(∅, ∅)` has the children `({t}, ∅)`,
/// - `(P, ∅)` first has the children `(P, {q})` and then `(P ∪ {t}, ∅)` for `t > max(P)`,
/// - `(P, Q)` has the children `(P, Q ∪ {q})` for `q > max(Q)`.
pub struct PlaceGenerator {
    preset_domain: Vec<TransitionID>,
    postset_domain: Vec<TransitionID>,
    max_place_size: Option<usize>,
}

impl PlaceGenerator {
    /// Generator over the preset/postset domains of `mapping`
    pub fn new(mapping: &ActivityTransitionMapping, max_place_size: Option<usize>) -> Self {
        Self {
            preset_domain: mapping.preset_domain().collect(),
            postset_domain: mapping.postset_domain().collect(),
            max_place_size,
        }
    }

    /// Transitions of `domain` greater than `bound`
    fn above(domain: &[TransitionID], bound: usize) -> &[TransitionID] {
        &domain[domain.partition_point(|t| t.0 <= bound)..]
    }

    fn at_size_limit(&self, candidate: &PlaceCandidate) -> bool {
        self.max_place_size
            .is_some_and(|max| candidate.size() >= max)
    }

    /// Number of children of `candidate`
    pub fn potential_children_count(&self, candidate: &PlaceCandidate) -> usize {
        if self.at_size_limit(candidate) {
            return 0;
        }
        match (candidate.preset().max_index(), candidate.postset().max_index()) {
            (None, None) => self.preset_domain.len(),
            (Some(p), None) => {
                self.postset_domain.len() + Self::above(&self.preset_domain, p).len()
            }
            (_, Some(q)) => Self::above(&self.postset_domain, q).len(),
        }
    }

    fn child_at(&self, candidate: &PlaceCandidate, index: usize) -> Option<PlaceCandidate> {
        if self.at_size_limit(candidate) {
            return None;
        }
        match (candidate.preset().max_index(), candidate.postset().max_index()) {
            (None, None) => self
                .preset_domain
                .get(index)
                .map(|t| candidate.with_preset_transition(*t)),
            (Some(p), None) => match self.postset_domain.get(index) {
                Some(q) => Some(candidate.with_postset_transition(*q)),
                None => Self::above(&self.preset_domain, p)
                    .get(index - self.postset_domain.len())
                    .map(|t| candidate.with_preset_transition(*t)),
            },
            (_, Some(q)) => Self::above(&self.postset_domain, q)
                .get(index)
                .map(|t| candidate.with_postset_transition(*t)),
        }
    }

    /// All children of `candidate` in generation order
    pub fn potential_children(&self, candidate: &PlaceCandidate) -> Vec<PlaceCandidate> {
        (0..self.potential_children_count(candidate))
            .filter_map(|i| self.child_at(candidate, i))
            .collect()
    }

    /// Generate the next child of `node`, advancing its cursor
    pub fn generate_child(&self, node: &mut TreeNode) -> Option<PlaceCandidate> {
        let child = self.child_at(&node.candidate, node.cursor)?;
        node.cursor += 1;
        Some(child)
    }

    /// Returns `true` if `node` has children which were not generated yet
    pub fn has_children_left(&self, node: &TreeNode) -> bool {
        node.cursor < self.potential_children_count(&node.candidate)
    }
}
