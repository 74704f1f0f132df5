// ABOUTME: Staged service activation: the per-stage executor and the cross-stage sequencer.
// ABOUTME: Exports outcomes, stage results and activation errors.

mod outcome;
mod sequencer;
mod stage;

pub use outcome::{
    ActivationError, ActivationOutcome, ServiceOutcome, StageFailure, StageResult, StageStatus,
};
pub use sequencer::{ActivationSequencer, SequenceContext, SequenceOutcome, rollback_scope};
pub use stage::StageExecutor;
