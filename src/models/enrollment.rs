use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One enrollment of the current user in a course.
///
/// Enrollments are polled frequently by the dashboard, so reads go through
/// the response cache (see `CourseService`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub course_id: String,
    pub course_title: String,
    /// Completion percentage, 0-100.
    pub progress_percent: u8,
    pub enrolled_at: DateTime<Utc>,
    pub last_activity_at: Option<DateTime<Utc>>,
}
