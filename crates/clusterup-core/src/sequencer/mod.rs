//! Phase sequencing: plan parsing, step dispatch, and ordered execution.
//!
//! - `definition` -- YAML parsing and static plan validation
//! - `step_runner` -- dispatch for the six step kinds
//! - `executor` -- the `PhaseSequencer` (ordering, forks, cleanup, teardown)
//! - `report` -- the `RunReport` returned to callers

pub mod definition;
pub mod executor;
pub mod report;
pub mod step_runner;

#[cfg(test)]
pub(crate) mod testing;

pub use definition::{PlanError, load_plan_file, parse_plan_yaml, validate_plan};
pub use executor::{PhaseSequencer, SequencerError};
pub use report::{CleanupReport, FailureReport, PhaseReport, RunReport};
pub use step_runner::{StepError, StepOutput, StepRunner};
