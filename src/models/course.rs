use serde::{Deserialize, Serialize};

/// User-supplied input for a course about to be created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDraft {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
}

/// Lifecycle state of a course. New courses are drafts until the creation
/// workflow finalizes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseStatus {
    Draft,
    Published,
}

/// A course as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    /// Aggregate duration over the course's lessons. Provisional (the
    /// submitted estimate) until the creation workflow reconciles it.
    pub total_duration_minutes: u32,
    pub status: CourseStatus,
}

/// User-supplied input for one lesson, validated before any network call:
/// non-empty name, duration greater than zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonSpec {
    pub name: String,
    pub description: Option<String>,
    /// Author's duration estimate in minutes.
    pub duration_minutes: u32,
}

/// A lesson as returned by the API. `duration_minutes` here is the duration
/// the server actually recorded, which may differ from the submitted
/// estimate (e.g. after media processing).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: u32,
    /// Display position, assigned from the submission order.
    pub position: u32,
}
