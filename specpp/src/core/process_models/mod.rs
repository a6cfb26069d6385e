//! Process model structures
/// [`PlaceCandidate`] struct
pub mod place_candidate;
/// Prefix automaton over log variants
pub mod prefix_automaton;

#[doc(inline)]
pub use place_candidate::PlaceCandidate;
#[doc(inline)]
pub use prefix_automaton::PrefixAutomaton;
