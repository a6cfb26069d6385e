use serde::{Deserialize, Serialize};

use crate::core::encoding::TransitionOrdering;

use super::error::{Result, SPECppError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Heuristic used to rank the leaves of the candidate tree
pub enum TreeTraversalHeuristic {
    /// Mean directly-follows count between preset and postset
    #[default]
    DirectlyFollows,
    /// Mean eventually-follows count between preset and postset
    EventuallyFollows,
    /// Mean difference of the average first occurrence index between postset and preset
    AverageFirstOccurrenceDelta,
    /// Escaping/allowed ratio of the postset activities
    GreedyETCPrecision,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// SPECpp discovery parameters
pub struct SPECppConfig {
    /// Tree traversal heuristic
    pub heuristic: TreeTraversalHeuristic,
    /// Weight of the heuristic's domain term against the size term (in `[0, 1]`)
    pub alpha: f64,
    /// Precision gain tolerance (`>= 0`); `0` accepts any strict decrease of an escaping count
    pub gamma: f64,
    /// Precision at which the search stops early (in `[0, 1]`)
    pub rho: f64,
    /// Stop as soon as a newly accepted place lifts the precision to `rho`
    pub premature_abort: bool,
    /// Skip candidates whose postset activities already reach this per-activity precision (in `[0, 1]`)
    pub cutoff_rho: Option<f64>,
    /// Minimal fraction of fitting traces for a place to be considered (in `[0, 1]`)
    pub tau: f64,
    /// Maximal `|preset| + |postset|` of generated places (`>= 2`)
    pub max_place_size: Option<usize>,
    /// Order of transition indices, also determining the enumeration order
    pub transition_ordering: TransitionOrdering,
}

impl Default for SPECppConfig {
    fn default() -> Self {
        Self {
            heuristic: TreeTraversalHeuristic::default(),
            alpha: 1.0,
            gamma: 0.0,
            rho: 1.0,
            premature_abort: true,
            cutoff_rho: None,
            tau: 1.0,
            max_place_size: None,
            transition_ordering: TransitionOrdering::default(),
        }
    }
}

fn check_unit_interval(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SPECppError::InvalidParameter {
            name,
            reason: format!("expected a value in [0, 1], got {}", value),
        })
    }
}

impl SPECppConfig {
    /// Check that all parameters are within their valid range
    pub fn validate(&self) -> Result<()> {
        check_unit_interval("alpha", self.alpha)?;
        check_unit_interval("rho", self.rho)?;
        check_unit_interval("tau", self.tau)?;
        if let Some(cutoff_rho) = self.cutoff_rho {
            check_unit_interval("cutoff_rho", cutoff_rho)?;
        }
        if !self.gamma.is_finite() || self.gamma < 0.0 {
            return Err(SPECppError::InvalidParameter {
                name: "gamma",
                reason: format!("expected a finite value >= 0, got {}", self.gamma),
            });
        }
        if let Some(max_size) = self.max_place_size {
            if max_size < 2 {
                return Err(SPECppError::InvalidParameter {
                    name: "max_place_size",
                    reason: format!("expected at least 2, got {}", max_size),
                });
            }
        }
        Ok(())
    }

    /// Serialize parameters to JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize and validate parameters from JSON string
    ///
    /// Missing fields take their default value.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}
