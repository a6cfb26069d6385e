use crate::core::encoding::{ActivityID, EncodingError, TransitionID};

/// Error type for SPECpp place discovery
#[derive(Debug)]
pub enum SPECppError {
    /// A configuration parameter is out of its valid range
    InvalidParameter {
        /// Name of the parameter
        name: &'static str,
        /// Description of the valid range
        reason: String,
    },
    /// The log is missing the artificial start or end activity
    MissingArtificialActivity(&'static str),
    /// Activity has no transition
    UnmappedActivity(ActivityID),
    /// Transition has no activity
    UnmappedTransition(TransitionID),
    /// No statistics were recorded for an activity
    MissingStatistics(ActivityID),
    /// The log contains no traces
    EmptyLog,
    /// A previous step of the discovery failed
    Halted,
    /// Configuration could not be (de)serialized
    Json(serde_json::Error),
}

impl std::fmt::Display for SPECppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SPECppError::InvalidParameter { name, reason } => {
                write!(f, "Invalid parameter {}: {}", name, reason)
            }
            SPECppError::MissingArtificialActivity(label) => {
                write!(f, "Artificial activity {} is missing from the log", label)
            }
            SPECppError::UnmappedActivity(a) => write!(f, "Activity {} has no transition", a.0),
            SPECppError::UnmappedTransition(t) => write!(f, "Transition {} has no activity", t.0),
            SPECppError::MissingStatistics(a) => {
                write!(f, "No statistics recorded for activity {}", a.0)
            }
            SPECppError::EmptyLog => write!(f, "Event log contains no traces"),
            SPECppError::Halted => write!(f, "Discovery was halted by a previous error"),
            SPECppError::Json(e) => write!(f, "JSON Error: {}", e),
        }
    }
}

impl std::error::Error for SPECppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SPECppError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EncodingError> for SPECppError {
    fn from(e: EncodingError) -> Self {
        match e {
            EncodingError::MissingArtificialActivity(label) => {
                SPECppError::MissingArtificialActivity(label)
            }
            EncodingError::UnmappedActivity(a) => SPECppError::UnmappedActivity(a),
            EncodingError::UnmappedTransition(t) => SPECppError::UnmappedTransition(t),
        }
    }
}

impl From<serde_json::Error> for SPECppError {
    fn from(e: serde_json::Error) -> Self {
        SPECppError::Json(e)
    }
}

/// Result type of SPECpp operations
pub type Result<T> = std::result::Result<T, SPECppError>;
