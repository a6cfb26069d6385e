//! Candidate tree
//!
//! Canonical enumeration of all places, driven by a heuristically ordered frontier of leaves.

/// [`ExpansionFrontier`](frontier::ExpansionFrontier): addressable priority queue
pub mod frontier;
/// [`EnumeratingTree`](enumerating_tree::EnumeratingTree): expansion of the best ranked leaf
pub mod enumerating_tree;
/// [`PlaceGenerator`](place_generator::PlaceGenerator): canonical child generation
pub mod place_generator;

#[doc(inline)]
pub use enumerating_tree::EnumeratingTree;
