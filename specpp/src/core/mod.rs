//! Core modules for place discovery
//!
//! Event data, its encoding into dense activity/transition indices and the
//! process model structures the search operates on.
pub mod bitset;
pub mod encoded_log;
pub mod encoding;
pub mod event_data;
pub mod process_models;

#[doc(inline)]
pub use encoded_log::EncodedLog;
#[doc(inline)]
pub use event_data::activity_projection::EventLogActivityProjection;
#[doc(inline)]
pub use process_models::place_candidate::PlaceCandidate;
