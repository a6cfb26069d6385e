//! Propose, evaluate, compose
//!
//! The [`PECCycle`] repeatedly takes the next candidate from the [`EnumeratingTree`], filters it and
//! hands it to the [`ETCPrecisionComposer`]. Composition events are forwarded to the registered
//! listeners and used to re-score the tree.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::core::{
    encoded_log::EncodedLog, encoding::ActivityTransitionMapping,
    event_data::activity_projection::EventLogActivityProjection,
    process_models::place_candidate::PlaceCandidate,
};

use super::{
    composer::{CandidateCompositionEvent, ETCPrecisionComposer},
    config::SPECppConfig,
    cutoff::ETCPrecisionCutOff,
    error::{Result, SPECppError},
    heuristics::heuristic_from_config,
    marking_history::MarkingHistoryEvaluator,
    tree::{enumerating_tree::EnumeratingTree, place_generator::PlaceGenerator},
};

/// Receives every [`CandidateCompositionEvent`] emitted during discovery
pub trait CompositionEventListener {
    /// Called once per event, in emission order
    fn on_event(&mut self, event: &CandidateCompositionEvent);
}

impl<F: FnMut(&CandidateCompositionEvent)> CompositionEventListener for F {
    fn on_event(&mut self, event: &CandidateCompositionEvent) {
        (*self)(event)
    }
}

#[derive(Debug, Clone, Default)]
/// Cooperative cancellation of a running discovery
///
/// Clones share the same flag. The cycle only checks it between two candidates.
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    /// New, unset signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the discovery to stop
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns `true` if stopping was requested
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Reason for the end of a discovery
pub enum Termination {
    /// Every candidate was generated
    Exhausted,
    /// Precision reached `rho` after accepting a place
    ThresholdReached,
    /// The [`StopSignal`] was set
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// State of a [`PECCycle`]
pub enum CycleState {
    /// More cycles can be run
    Running,
    /// Discovery ended
    Finished(Termination),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Counters of a discovery run
pub struct CycleStatistics {
    /// Generated candidates
    pub generated: usize,
    /// Half-empty candidates (not evaluated)
    pub half_empty: usize,
    /// Candidates filtered by the precision cutoff
    pub cut_off: usize,
    /// Candidates below the fitness threshold
    pub unfit: usize,
    /// Subtrees removed from the search
    pub pruned: usize,
    /// Accepted places
    pub accepted: usize,
    /// Rejected places
    pub rejected: usize,
    /// Revoked places
    pub revoked: usize,
    /// Re-scored tree leaves
    pub rescored: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A place given by activity labels
pub struct LabelledPlace {
    /// Sorted labels of the producing activities
    pub preset: Vec<String>,
    /// Sorted labels of the consuming activities
    pub postset: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
/// Outcome of a discovery run
pub struct SPECppResult {
    /// Accepted places, in order of acceptance
    pub places: Vec<PlaceCandidate>,
    /// Accepted places by activity labels
    pub labelled_places: Vec<LabelledPlace>,
    /// Approximate ETC-precision of the accepted places
    pub precision: f64,
    /// Why the discovery ended
    pub termination: Termination,
    /// Run counters
    pub statistics: CycleStatistics,
    /// Wall-clock time of the run
    pub duration: Duration,
}

impl SPECppResult {
    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Express `place` by the labels of its activities
pub fn place_to_labels(
    place: &PlaceCandidate,
    mapping: &ActivityTransitionMapping,
) -> Result<LabelledPlace> {
    Ok(LabelledPlace {
        preset: mapping.transitions_to_names(place.preset())?,
        postset: mapping.transitions_to_names(place.postset())?,
    })
}

/// Search loop of SPECpp
pub struct PECCycle<'a> {
    log: &'a EncodedLog,
    config: SPECppConfig,
    tree: EnumeratingTree,
    composer: ETCPrecisionComposer<'a>,
    cutoff: Option<ETCPrecisionCutOff>,
    evaluator: MarkingHistoryEvaluator<'a>,
    listeners: Vec<Box<dyn CompositionEventListener + 'a>>,
    stop_signal: StopSignal,
    state: CycleState,
    statistics: CycleStatistics,
    halted: bool,
}

impl std::fmt::Debug for PECCycle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PECCycle")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("halted", &self.halted)
            .field("statistics", &self.statistics)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl<'a> PECCycle<'a> {
    /// Set up the tree, heuristic and composer for `log`
    pub fn new(log: &'a EncodedLog, config: SPECppConfig) -> Result<Self> {
        config.validate()?;
        if log.total_trace_count() == 0 {
            return Err(SPECppError::EmptyLog);
        }
        let composer = ETCPrecisionComposer::new(log, &config)?;
        let tree = EnumeratingTree::new(
            PlaceGenerator::new(log.mapping(), config.max_place_size),
            heuristic_from_config(&config, log)?,
            log.mapping().clone(),
            composer.statistics(),
        )?;
        let cutoff = config
            .cutoff_rho
            .map(|rho| ETCPrecisionCutOff::new(rho, log.mapping().clone()));
        Ok(Self {
            log,
            config,
            tree,
            composer,
            cutoff,
            evaluator: MarkingHistoryEvaluator::new(log),
            listeners: Vec::new(),
            stop_signal: StopSignal::new(),
            state: CycleState::Running,
            statistics: CycleStatistics::default(),
            halted: false,
        })
    }

    /// Use `signal` to stop the cycle
    pub fn with_stop_signal(mut self, signal: StopSignal) -> Self {
        self.stop_signal = signal;
        self
    }

    /// Register a listener for composition events
    pub fn add_listener<L: CompositionEventListener + 'a>(&mut self, listener: L) {
        self.listeners.push(Box::new(listener));
    }

    fn finish(&mut self, termination: Termination) -> CycleState {
        self.state = CycleState::Finished(termination);
        info!(
            "Finished ({:?}) with {} places, precision {:.4}",
            termination,
            self.composer.accepted_places().len(),
            self.composer.current_precision()
        );
        self.state
    }

    fn prune(&mut self, candidate: &PlaceCandidate) -> Result<()> {
        if self.tree.prune(candidate)? {
            self.statistics.pruned += 1;
        }
        Ok(())
    }

    /// Run a single cycle
    ///
    /// After an error the cycle is halted: the accepted places stay as they are and every further
    /// call returns [`SPECppError::Halted`].
    pub fn step(&mut self) -> Result<CycleState> {
        if self.halted {
            return Err(SPECppError::Halted);
        }
        let result = self.try_step();
        if let Err(e) = &result {
            warn!("Discovery halted: {}", e);
            self.halted = true;
        }
        result
    }

    fn try_step(&mut self) -> Result<CycleState> {
        if let CycleState::Finished(_) = self.state {
            return Ok(self.state);
        }
        if self.stop_signal.is_stopped() {
            return Ok(self.finish(Termination::Stopped));
        }
        self.composer.start_cycle();
        let Some(candidate) = self.tree.expand(self.composer.statistics())? else {
            return Ok(self.finish(Termination::Exhausted));
        };
        self.statistics.generated += 1;
        if candidate.is_half_empty() {
            self.statistics.half_empty += 1;
            return Ok(self.state);
        }

        if let Some(cutoff) = &self.cutoff {
            if cutoff.is_cut_off(&candidate, self.composer.statistics())? {
                debug!("Cut off {}", candidate);
                self.statistics.cut_off += 1;
                self.prune(&candidate)?;
                return Ok(self.state);
            }
        }

        let (histories, fitness) = self.evaluator.evaluate(&candidate);
        if fitness.fitting_fraction() < self.config.tau {
            self.statistics.unfit += 1;
            if fitness.underfed_fraction() > 1.0 - self.config.tau {
                debug!("Pruned underfed {} ({:?})", candidate, fitness);
                self.prune(&candidate)?;
            }
            return Ok(self.state);
        }

        self.composer.deliberate_acceptance(candidate, histories)?;
        let events = self.composer.drain_events();
        for event in &events {
            match event {
                CandidateCompositionEvent::Accept(_) => self.statistics.accepted += 1,
                CandidateCompositionEvent::Reject(_) => self.statistics.rejected += 1,
                CandidateCompositionEvent::RevokeAcceptance(_) => self.statistics.revoked += 1,
            }
            for listener in self.listeners.iter_mut() {
                listener.on_event(event);
            }
        }
        self.statistics.rescored +=
            self.tree
                .update_heuristics(&events, self.config.gamma, self.composer.statistics())?;

        if self.composer.is_finished() {
            return Ok(self.finish(Termination::ThresholdReached));
        }
        Ok(self.state)
    }

    /// Run cycles until the discovery is finished
    pub fn run(&mut self) -> Result<SPECppResult> {
        info!(
            "Started SPECpp discovery ({} variants, {} traces, {} transitions)",
            self.log.variants().len(),
            self.log.total_trace_count(),
            self.log.mapping().transition_count()
        );
        let start = Instant::now();
        let termination = loop {
            if let CycleState::Finished(termination) = self.step()? {
                break termination;
            }
        };
        let mut result = self.result(termination)?;
        result.duration = start.elapsed();
        Ok(result)
    }

    fn result(&self, termination: Termination) -> Result<SPECppResult> {
        let places = self.composer.accepted_places().to_vec();
        let labelled_places = places
            .iter()
            .map(|p| place_to_labels(p, self.log.mapping()))
            .collect::<Result<Vec<_>>>()?;
        Ok(SPECppResult {
            places,
            labelled_places,
            precision: self.composer.current_precision(),
            termination,
            statistics: self.statistics,
            duration: Duration::ZERO,
        })
    }

    /// Current state
    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Returns `true` if a step failed
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Run counters so far
    pub fn statistics(&self) -> &CycleStatistics {
        &self.statistics
    }

    /// The composer holding the accepted places
    pub fn composer(&self) -> &ETCPrecisionComposer<'a> {
        &self.composer
    }

    /// The candidate tree
    pub fn tree(&self) -> &EnumeratingTree {
        &self.tree
    }
}

/// Discover places for `log` with SPECpp
///
/// Artificial start/end activities are added to (a copy of) the projection.
pub fn discover_places(
    log: &EventLogActivityProjection,
    config: SPECppConfig,
) -> Result<SPECppResult> {
    config.validate()?;
    let encoded = EncodedLog::new(log.clone(), config.transition_ordering)?;
    let result = PECCycle::new(&encoded, config)?.run();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::encoding::TransitionOrdering;

    #[test]
    fn test_failed_step_halts_cycle() {
        // Transitions (log order): start=0, a=1, end=2
        let log = EncodedLog::new(
            EventLogActivityProjection::from_variants(vec![(vec!["a"], 3)]),
            TransitionOrdering::LogOrder,
        )
        .unwrap();
        // Transition 2 maps to activity "x" here, which is the start activity of `log`
        let mismatched = EncodedLog::new(
            EventLogActivityProjection::from_variants(vec![(vec!["w", "x", "y"], 1)]),
            TransitionOrdering::LogOrder,
        )
        .unwrap();
        let mut cycle = PECCycle::new(&log, SPECppConfig::default()).unwrap();
        cycle.cutoff = Some(ETCPrecisionCutOff::new(0.5, mismatched.mapping().clone()));

        let error = loop {
            match cycle.step() {
                Ok(CycleState::Running) => continue,
                Ok(CycleState::Finished(t)) => panic!("Finished ({:?}) without error", t),
                Err(e) => break e,
            }
        };
        assert!(matches!(error, SPECppError::MissingStatistics(_)));
        assert!(cycle.is_halted());
        assert_eq!(cycle.state(), CycleState::Running);
        let generated = cycle.statistics().generated;
        assert!(matches!(cycle.step(), Err(SPECppError::Halted)));
        assert!(matches!(cycle.run(), Err(SPECppError::Halted)));
        assert_eq!(cycle.statistics().generated, generated);
    }
}
