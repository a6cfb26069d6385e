#![warn(
    clippy::doc_markdown,
    missing_debug_implementations,
    rust_2018_idioms,
    missing_docs
)]
#![doc = include_str!("../README.md")]

pub mod core;

pub mod discovery;

#[doc(inline)]
pub use crate::core::{EncodedLog, EventLogActivityProjection, PlaceCandidate};

#[doc(inline)]
pub use discovery::specpp::{
    discover_places, PECCycle, SPECppConfig, SPECppError, SPECppResult, StopSignal, Termination,
    TreeTraversalHeuristic,
};

///
/// Serialize [`SPECppConfig`] as a JSON [`String`]
///
pub fn config_to_json(config: &SPECppConfig) -> Result<String, SPECppError> {
    config.to_json()
}

///
/// Deserialize and validate [`SPECppConfig`] from a JSON [`String`]
///
pub fn json_to_config(config_json: &str) -> Result<SPECppConfig, SPECppError> {
    SPECppConfig::from_json(config_json)
}

///
/// Import an [`EventLogActivityProjection`] from a JSON byte slice
///
/// The expected format is a list of `[activities, frequency]` pairs, e.g.
/// `[[["a", "b"], 10], [["a", "c"], 5]]`.
///
pub fn import_variants_json_from_slice(
    slice: &[u8],
) -> Result<EventLogActivityProjection, SPECppError> {
    let variants: Vec<(Vec<String>, u64)> = serde_json::from_slice(slice)?;
    Ok(EventLogActivityProjection::from_variants(variants))
}
