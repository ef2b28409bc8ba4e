//! Domain and wire types for the LearnHub API.
//!
//! Successful calls share the envelope `{ success, data, message }`;
//! failures carry `{ success: false, error: { code, message, details? } }`
//! and are mapped to `ApiError` in the api module.

pub mod course;
pub mod enrollment;

use serde::Deserialize;

pub use course::{Course, CourseDraft, CourseStatus, Lesson, LessonSpec};
pub use enrollment::Enrollment;

/// Common success envelope wrapping every 2xx response body.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}
