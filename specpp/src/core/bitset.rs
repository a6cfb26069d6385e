//! Compact bit set over dense indices
//!
//! Used for the preset/postset of [`PlaceCandidate`](crate::core::process_models::place_candidate::PlaceCandidate)s
//! (indexed by [`TransitionID`](crate::core::encoding::TransitionID)) and for per-variant marking histories.

/// A bit set backed by a vector of `u64` words.
///
/// The word vector never has trailing zero words, so two sets with the same members
/// compare (and hash) equal regardless of the order in which bits were set or cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BitSet {
    words: Vec<u64>,
}

impl BitSet {
    const BITS_PER_WORD: usize = 64;

    /// Create an empty bit set
    pub fn new() -> Self {
        Self { words: Vec::new() }
    }

    /// Create an empty bit set with room for `bits` bits
    pub fn with_capacity(bits: usize) -> Self {
        Self {
            words: Vec::with_capacity(bits.div_ceil(Self::BITS_PER_WORD)),
        }
    }

    #[inline]
    fn word_and_bit(index: usize) -> (usize, usize) {
        (index / Self::BITS_PER_WORD, index % Self::BITS_PER_WORD)
    }

    fn trim(&mut self) {
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
    }

    /// Number of set bits
    #[inline]
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Returns `true` if no bit is set
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Returns `true` if the bit at `index` is set
    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        let (word_idx, bit_idx) = Self::word_and_bit(index);
        self.words
            .get(word_idx)
            .is_some_and(|w| w & (1u64 << bit_idx) != 0)
    }

    /// Set the bit at `index`. Returns `true` if it was not set before.
    pub fn insert(&mut self, index: usize) -> bool {
        let (word_idx, bit_idx) = Self::word_and_bit(index);
        if word_idx >= self.words.len() {
            self.words.resize(word_idx + 1, 0);
        }
        let mask = 1u64 << bit_idx;
        let was_clear = self.words[word_idx] & mask == 0;
        self.words[word_idx] |= mask;
        was_clear
    }

    /// Clear the bit at `index`. Returns `true` if it was set before.
    pub fn remove(&mut self, index: usize) -> bool {
        let (word_idx, bit_idx) = Self::word_and_bit(index);
        let Some(word) = self.words.get_mut(word_idx) else {
            return false;
        };
        let mask = 1u64 << bit_idx;
        let was_set = *word & mask != 0;
        *word &= !mask;
        self.trim();
        was_set
    }

    /// Copy of this set with the bit at `index` set
    pub fn with(&self, index: usize) -> Self {
        let mut ret = self.clone();
        ret.insert(index);
        ret
    }

    /// Copy of this set with the bit at `index` cleared
    pub fn without(&self, index: usize) -> Self {
        let mut ret = self.clone();
        ret.remove(index);
        ret
    }

    /// Largest set index
    pub fn max_index(&self) -> Option<usize> {
        let last = *self.words.last()?;
        Some((self.words.len() - 1) * Self::BITS_PER_WORD + 63 - last.leading_zeros() as usize)
    }

    /// Smallest set index
    pub fn min_index(&self) -> Option<usize> {
        self.iter().next()
    }

    /// Returns `true` if every bit of `self` is also set in `other`
    pub fn is_subset(&self, other: &BitSet) -> bool {
        self.words.len() <= other.words.len()
            && self
                .words
                .iter()
                .zip(other.words.iter())
                .all(|(a, b)| a & !b == 0)
    }

    /// Iterate over set indices in ascending order
    pub fn iter(&self) -> BitSetIter<'_> {
        BitSetIter {
            words: &self.words,
            word_idx: 0,
            current_word: self.words.first().copied().unwrap_or(0),
        }
    }
}

impl FromIterator<usize> for BitSet {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        let mut ret = BitSet::new();
        for index in iter {
            ret.insert(index);
        }
        ret
    }
}

impl Extend<usize> for BitSet {
    fn extend<T: IntoIterator<Item = usize>>(&mut self, iter: T) {
        for index in iter {
            self.insert(index);
        }
    }
}

impl<'a> IntoIterator for &'a BitSet {
    type Item = usize;
    type IntoIter = BitSetIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the set indices of a [`BitSet`]
#[derive(Debug, Clone)]
pub struct BitSetIter<'a> {
    words: &'a [u64],
    word_idx: usize,
    current_word: u64,
}

impl Iterator for BitSetIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current_word != 0 {
                let bit_idx = self.current_word.trailing_zeros() as usize;
                // Clear lowest set bit
                self.current_word &= self.current_word - 1;
                return Some(self.word_idx * BitSet::BITS_PER_WORD + bit_idx);
            }
            self.word_idx += 1;
            if self.word_idx >= self.words.len() {
                return None;
            }
            self.current_word = self.words[self.word_idx];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_remove_identity() {
        let mut a = BitSet::new();
        assert!(a.insert(3));
        assert!(!a.insert(3));
        assert!(a.insert(130));
        assert_eq!(a.len(), 2);
        assert!(a.contains(130));
        assert!(a.remove(130));
        assert!(!a.contains(130));

        // Clearing high bits must not leave a different representation behind
        let b: BitSet = [3].into_iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_min_max_iter() {
        let s: BitSet = [70, 2, 64, 5].into_iter().collect();
        assert_eq!(s.min_index(), Some(2));
        assert_eq!(s.max_index(), Some(70));
        assert_eq!(s.iter().collect::<Vec<_>>(), vec![2, 5, 64, 70]);
        assert_eq!(BitSet::new().max_index(), None);
    }

    #[test]
    fn test_subset() {
        let small: BitSet = [1, 2].into_iter().collect();
        let large: BitSet = [1, 2, 100].into_iter().collect();
        assert!(small.is_subset(&large));
        assert!(!large.is_subset(&small));
        assert!(BitSet::new().is_subset(&small));
    }
}
