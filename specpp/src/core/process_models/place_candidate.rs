use serde::{Serialize, Serializer};

use crate::core::{bitset::BitSet, encoding::TransitionID};

/// A candidate place: the transitions producing into it (preset) and consuming from it (postset)
///
/// Candidates are immutable values; children are derived by adding a single transition to one side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaceCandidate {
    preset: BitSet,
    postset: BitSet,
}

impl PlaceCandidate {
    /// Create a candidate from the given preset and postset
    pub fn new(preset: BitSet, postset: BitSet) -> Self {
        Self { preset, postset }
    }

    /// The root candidate `(∅, ∅)`
    pub fn empty() -> Self {
        Self::default()
    }

    /// Candidate from transition indices
    pub fn from_transitions<P, Q>(preset: P, postset: Q) -> Self
    where
        P: IntoIterator<Item = TransitionID>,
        Q: IntoIterator<Item = TransitionID>,
    {
        Self {
            preset: preset.into_iter().map(|t| t.0).collect(),
            postset: postset.into_iter().map(|t| t.0).collect(),
        }
    }

    /// Producing transitions
    pub fn preset(&self) -> &BitSet {
        &self.preset
    }

    /// Consuming transitions
    pub fn postset(&self) -> &BitSet {
        &self.postset
    }

    /// `|preset| + |postset|`
    pub fn size(&self) -> usize {
        self.preset.len() + self.postset.len()
    }

    /// Returns `true` if preset or postset is empty
    pub fn is_half_empty(&self) -> bool {
        self.preset.is_empty() || self.postset.is_empty()
    }

    /// Copy of this candidate with `t` added to the preset
    pub fn with_preset_transition(&self, t: TransitionID) -> Self {
        Self {
            preset: self.preset.with(t.0),
            postset: self.postset.clone(),
        }
    }

    /// Copy of this candidate with `t` added to the postset
    pub fn with_postset_transition(&self, t: TransitionID) -> Self {
        Self {
            preset: self.preset.clone(),
            postset: self.postset.with(t.0),
        }
    }

    /// Parent of this candidate in the canonical candidate tree
    ///
    /// The postset is reduced first (removing its largest transition); only candidates with an
    /// empty postset reduce their preset. The root has no parent.
    pub fn parent(&self) -> Option<Self> {
        if let Some(q) = self.postset.max_index() {
            return Some(Self {
                preset: self.preset.clone(),
                postset: self.postset.without(q),
            });
        }
        let p = self.preset.max_index()?;
        Some(Self {
            preset: self.preset.without(p),
            postset: BitSet::new(),
        })
    }
}

impl std::fmt::Display for PlaceCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fmt_set = |s: &BitSet| {
            s.iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(",")
        };
        write!(f, "({{{}}} | {{{}}})", fmt_set(&self.preset), fmt_set(&self.postset))
    }
}

/// Serialized as the two lists of transition indices
impl Serialize for PlaceCandidate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("PlaceCandidate", 2)?;
        state.serialize_field("preset", &self.preset.iter().collect::<Vec<_>>())?;
        state.serialize_field("postset", &self.postset.iter().collect::<Vec<_>>())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(pre: &[usize], post: &[usize]) -> PlaceCandidate {
        PlaceCandidate::from_transitions(
            pre.iter().copied().map(TransitionID),
            post.iter().copied().map(TransitionID),
        )
    }

    #[test]
    fn test_size_and_half_empty() {
        assert!(PlaceCandidate::empty().is_half_empty());
        assert!(place(&[0], &[]).is_half_empty());
        assert!(place(&[], &[2]).is_half_empty());
        let p = place(&[0, 1], &[2]);
        assert!(!p.is_half_empty());
        assert_eq!(p.size(), 3);
    }

    #[test]
    fn test_parent_inverts_child_derivation() {
        let p = place(&[0, 3], &[]);
        let child = p.with_postset_transition(TransitionID(2));
        assert_eq!(child.parent(), Some(p.clone()));
        let grandchild = child.with_postset_transition(TransitionID(4));
        assert_eq!(grandchild.parent(), Some(child));
        assert_eq!(p.parent(), Some(place(&[0], &[])));
        assert_eq!(place(&[0], &[]).parent(), Some(PlaceCandidate::empty()));
        assert_eq!(PlaceCandidate::empty().parent(), None);
    }

    #[test]
    fn test_display_and_serialize() {
        let p = place(&[0, 1], &[3]);
        assert_eq!(p.to_string(), "({0,1} | {3})");
        assert_eq!(
            serde_json::to_string(&p).unwrap(),
            r#"{"preset":[0,1],"postset":[3]}"#
        );
    }
}
