//! SPECpp: precision-guided place discovery
//!
//! Places are enumerated from a candidate tree in heuristic order, filtered and handed to an
//! incremental ETC-precision composer, which keeps a set of non-implicit places that restrict
//! escaping behaviour.
pub mod composer;
/// [`SPECppConfig`] and the heuristic selection
pub mod config;
/// Precision cutoff gate
pub mod cutoff;
/// [`SPECppError`] and [`Result`]
pub mod error;
pub mod heuristics;
pub mod marking_history;
pub mod pec_cycle;
pub mod tree;

#[doc(inline)]
pub use config::{SPECppConfig, TreeTraversalHeuristic};
#[doc(inline)]
pub use error::{Result, SPECppError};
#[doc(inline)]
pub use pec_cycle::{discover_places, PECCycle, SPECppResult, StopSignal, Termination};
