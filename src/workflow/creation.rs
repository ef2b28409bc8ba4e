//! Course creation workflow.
//!
//! The saga runs five strictly-forward steps:
//!
//! 1. validate every input (zero network calls on failure)
//! 2. create the course draft with the estimated aggregate duration
//! 3. create lessons one at a time, in input order, recording failures and
//!    continuing
//! 4. patch the course aggregate to the sum of actually-created durations if
//!    it differs from the estimate
//! 5. publish the course
//!
//! Parent-creation failure aborts the whole job; from step 3 on, failures
//! are collected into the report instead of thrown, so the caller always
//! learns exactly which lessons made it.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{ApiError, SessionClient, Transport};
use crate::models::{Course, CourseDraft, CourseStatus, Lesson, LessonSpec};

/// One rejected input field, e.g. `lessons[2].name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecViolation {
    pub field: String,
    pub message: String,
}

/// One lesson the server refused, by input position.
#[derive(Debug)]
pub struct LessonFailure {
    pub index: usize,
    pub name: String,
    pub error: ApiError,
}

/// Terminal failure before any lesson was attempted.
#[derive(Debug, Error)]
pub enum CreationError {
    /// Input rejected up front; no network call was made.
    #[error("creation job rejected: {} invalid field(s)", .0.len())]
    Invalid(Vec<SpecViolation>),

    /// The course itself could not be created, so nothing else was tried.
    #[error("course creation failed: {0}")]
    CourseFailed(#[source] ApiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaOutcome {
    /// Course and every lesson created, aggregate reconciled, published.
    FullSuccess,
    /// Course exists, but at least one lesson, the reconcile patch, or the
    /// publish step failed. Details are itemized in the report.
    PartialSuccess,
}

/// What the workflow accomplished. Returned for every run where the course
/// itself was created.
#[derive(Debug)]
pub struct CreationReport {
    pub course_id: String,
    pub created: Vec<Lesson>,
    pub failed: Vec<LessonFailure>,
    /// Sum of the submitted duration estimates.
    pub estimated_minutes: u32,
    /// Sum of durations the server actually recorded for created lessons.
    pub actual_minutes: u32,
    pub reconcile_error: Option<ApiError>,
    pub publish_error: Option<ApiError>,
}

impl CreationReport {
    pub fn outcome(&self) -> SagaOutcome {
        if self.failed.is_empty() && self.reconcile_error.is_none() && self.publish_error.is_none()
        {
            SagaOutcome::FullSuccess
        } else {
            SagaOutcome::PartialSuccess
        }
    }

    /// False means the course was created but remains an unpublished draft.
    pub fn published(&self) -> bool {
        self.publish_error.is_none()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewCourse<'a> {
    #[serde(flatten)]
    draft: &'a CourseDraft,
    total_duration_minutes: u32,
    status: CourseStatus,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewLesson<'a> {
    #[serde(flatten)]
    spec: &'a LessonSpec,
    position: u32,
}

/// Sequential course + lessons creation coordinator.
pub struct CreationSaga<'a, T: Transport> {
    client: &'a SessionClient<T>,
}

impl<'a, T: Transport> CreationSaga<'a, T> {
    pub fn new(client: &'a SessionClient<T>) -> Self {
        Self { client }
    }

    /// Validate the whole job. Any violation rejects it before a single
    /// network call, so invalid input can never leave partial resources.
    fn validate(draft: &CourseDraft, lessons: &[LessonSpec]) -> Vec<SpecViolation> {
        let mut violations = Vec::new();
        if draft.title.trim().is_empty() {
            violations.push(SpecViolation {
                field: "title".to_string(),
                message: "course title must not be empty".to_string(),
            });
        }
        for (index, lesson) in lessons.iter().enumerate() {
            if lesson.name.trim().is_empty() {
                violations.push(SpecViolation {
                    field: format!("lessons[{}].name", index),
                    message: "lesson name must not be empty".to_string(),
                });
            }
            if lesson.duration_minutes == 0 {
                violations.push(SpecViolation {
                    field: format!("lessons[{}].durationMinutes", index),
                    message: "lesson duration must be greater than zero".to_string(),
                });
            }
        }
        violations
    }

    /// Run the workflow to completion.
    pub async fn run(
        &self,
        draft: CourseDraft,
        lessons: Vec<LessonSpec>,
    ) -> Result<CreationReport, CreationError> {
        let violations = Self::validate(&draft, &lessons);
        if !violations.is_empty() {
            return Err(CreationError::Invalid(violations));
        }

        let estimated_minutes: u32 = lessons.iter().map(|l| l.duration_minutes).sum();

        // The estimate stands in as the aggregate until reconciliation.
        let course: Course = self
            .client
            .post(
                "/courses",
                &NewCourse {
                    draft: &draft,
                    total_duration_minutes: estimated_minutes,
                    status: CourseStatus::Draft,
                },
            )
            .await
            .map_err(CreationError::CourseFailed)?;
        info!(course_id = %course.id, estimated_minutes, "Course draft created");

        // Lessons are created strictly one at a time, in the submitted
        // order: display ordering downstream follows creation order, and the
        // running total stays deterministic.
        let mut created: Vec<Lesson> = Vec::with_capacity(lessons.len());
        let mut failed: Vec<LessonFailure> = Vec::new();
        let mut actual_minutes: u32 = 0;
        let lessons_path = format!("/courses/{}/lessons", course.id);

        for (index, spec) in lessons.iter().enumerate() {
            let result: Result<Lesson, ApiError> = self
                .client
                .post(
                    &lessons_path,
                    &NewLesson {
                        spec,
                        position: index as u32,
                    },
                )
                .await;

            match result {
                Ok(lesson) => {
                    // The aggregate tracks what the server recorded, not
                    // what was submitted.
                    actual_minutes += lesson.duration_minutes;
                    debug!(course_id = %course.id, index, lesson_id = %lesson.id, "Lesson created");
                    created.push(lesson);
                }
                Err(error) => {
                    warn!(course_id = %course.id, index, name = %spec.name, %error,
                        "Lesson creation failed, continuing with remaining lessons");
                    failed.push(LessonFailure {
                        index,
                        name: spec.name.clone(),
                        error,
                    });
                }
            }
        }

        let course_path = format!("/courses/{}", course.id);

        // The persisted aggregate must match the observed sum before
        // publication; a failed patch is reported but never blocks it.
        let reconcile_error = if actual_minutes != estimated_minutes {
            debug!(course_id = %course.id, estimated_minutes, actual_minutes, "Reconciling aggregate duration");
            self.client
                .patch::<serde_json::Value, _>(
                    &course_path,
                    &serde_json::json!({ "totalDurationMinutes": actual_minutes }),
                )
                .await
                .err()
        } else {
            None
        };
        if let Some(ref error) = reconcile_error {
            warn!(course_id = %course.id, %error, "Aggregate reconciliation failed, publishing anyway");
        }

        let publish_error = self
            .client
            .patch::<serde_json::Value, _>(
                &course_path,
                &serde_json::json!({ "status": CourseStatus::Published }),
            )
            .await
            .err();
        match publish_error {
            None => info!(course_id = %course.id, "Course published"),
            Some(ref error) => {
                warn!(course_id = %course.id, %error, "Publish failed, course remains a draft")
            }
        }

        Ok(CreationReport {
            course_id: course.id,
            created,
            failed,
            estimated_minutes,
            actual_minutes,
            reconcile_error,
            publish_error,
        })
    }
}
