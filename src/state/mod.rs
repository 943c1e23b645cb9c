// State tracking module
//
// PipelineTracker owns the orchestrator's current PipelineState. It validates
// every transition, times each step, and broadcasts change events to any
// observer (a progress display, for instance). Observers receive copies; the
// state itself stays with the orchestrator.

use crate::models::PipelineState;
use indexmap::IndexMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::broadcast;

/// Change events emitted on every transition.
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// A step finished and the pipeline moved on
    StepCompleted {
        step: PipelineState,
        duration: Duration,
    },

    /// A new step has started
    StepStarted { step: PipelineState },

    /// The pipeline aborted in `step`
    Failed { step: PipelineState, message: String },

    /// The pipeline finished
    Succeeded { total: Duration },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid pipeline transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: PipelineState,
    pub to: PipelineState,
}

/// Validating, timing owner of the pipeline state.
pub struct PipelineTracker {
    current: PipelineState,
    history: Vec<PipelineState>,

    /// Per-step durations in execution order
    timings: IndexMap<PipelineState, Duration>,

    step_started: Instant,
    pipeline_started: Instant,

    /// Broadcast channel for change events; sending with no subscriber is fine
    state_tx: broadcast::Sender<StateChange>,
}

impl PipelineTracker {
    /// A tracker in [`PipelineState::Init`] with a 64-event broadcast buffer.
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(64);
        let now = Instant::now();
        Self {
            current: PipelineState::Init,
            history: vec![PipelineState::Init],
            timings: IndexMap::new(),
            step_started: now,
            pipeline_started: now,
            state_tx,
        }
    }

    pub fn current(&self) -> PipelineState {
        self.current
    }

    /// Every state entered so far, in order.
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    pub fn step_timings(&self) -> &IndexMap<PipelineState, Duration> {
        &self.timings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    /// Move to `next`, closing the timing of the current step.
    pub fn advance(&mut self, next: PipelineState) -> Result<Vec<StateChange>, InvalidTransition> {
        if !self.current.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.current,
                to: next,
            });
        }

        let finished = self.current;
        let duration = self.step_started.elapsed();
        self.timings.insert(finished, duration);

        self.current = next;
        self.history.push(next);
        self.step_started = Instant::now();

        tracing::info!("Pipeline: {} -> {} ({:.2}s)", finished, next, duration.as_secs_f64());

        let mut changes = vec![StateChange::StepCompleted {
            step: finished,
            duration,
        }];
        if next == PipelineState::Succeeded {
            changes.push(StateChange::Succeeded {
                total: self.pipeline_started.elapsed(),
            });
        } else if next != PipelineState::Failed {
            changes.push(StateChange::StepStarted { step: next });
        }

        self.broadcast(&changes);
        Ok(changes)
    }

    /// Enter [`PipelineState::Failed`] from the current step.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<Vec<StateChange>, InvalidTransition> {
        let step = self.current;
        let mut changes = self.advance(PipelineState::Failed)?;

        let failed = StateChange::Failed {
            step,
            message: message.into(),
        };
        let _ = self.state_tx.send(failed.clone());
        changes.push(failed);

        Ok(changes)
    }

    /// Log how long each step took.
    pub fn log_timings(&self) {
        for (step, duration) in &self.timings {
            tracing::info!("  {:<26} {:>8.2}s", step.label(), duration.as_secs_f64());
        }
    }

    fn broadcast(&self, changes: &[StateChange]) {
        for change in changes {
            // Ignore send errors - it's OK if no one is listening
            let _ = self.state_tx.send(change.clone());
        }
    }
}

impl Default for PipelineTracker {
    fn default() -> Self {
        Self::new()
    }
}
