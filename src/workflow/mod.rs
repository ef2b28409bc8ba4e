//! Multi-resource creation workflows.
//!
//! `CreationSaga` coordinates creating a course plus its ordered lessons and
//! reconciling the course's aggregate duration afterwards. Steps are
//! best-effort, not atomic: a failed lesson is recorded and the workflow
//! continues, leaving the user to fix failed items later.

pub mod creation;

pub use creation::{
    CreationError, CreationReport, CreationSaga, LessonFailure, SagaOutcome, SpecViolation,
};
