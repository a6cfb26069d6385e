//! Event Data
//!
//! Activity-level view of event logs
/// Activity projection of event logs
pub mod activity_projection;

#[doc(inline)]
pub use activity_projection::EventLogActivityProjection;
