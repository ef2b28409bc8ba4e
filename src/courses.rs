//! Enrollment reads and mutations, cache-backed.
//!
//! The learner dashboard polls enrollments frequently, so reads go through
//! the TTL cache. Any enrollment mutation sweeps the whole `enrollment` key
//! family - a stale progress figure is worse than an extra fetch.

use serde_json::Value;
use tracing::debug;

use crate::api::{ApiError, SessionClient, Transport};
use crate::cache::ResponseCache;
use crate::models::Enrollment;

/// Enrollment data is polled often and changes rarely outside the user's
/// own actions; 5 minutes keeps the dashboard snappy without going stale.
const ENROLLMENT_TTL_MINUTES: i64 = 5;

/// Cache key for the full enrollment list.
const ENROLLMENTS_KEY: &str = "enrollments";

/// Key-family prefix swept after any enrollment mutation.
const ENROLLMENT_FAMILY: &str = "enrollment";

/// Course/enrollment operations over the authenticated client.
pub struct CourseService<'a, T: Transport> {
    client: &'a SessionClient<T>,
    cache: ResponseCache,
}

impl<'a, T: Transport> CourseService<'a, T> {
    pub fn new(client: &'a SessionClient<T>, cache: ResponseCache) -> Self {
        Self { client, cache }
    }

    /// All enrollments of the current user, cached.
    ///
    /// Note: concurrent callers missing the cache will each fetch; the cache
    /// does no request coalescing.
    pub async fn enrollments(&self) -> Result<Vec<Enrollment>, ApiError> {
        if let Some(cached) = self.cache.get::<Vec<Enrollment>>(ENROLLMENTS_KEY) {
            debug!("Enrollments served from cache");
            return Ok(cached);
        }
        let fresh: Vec<Enrollment> = self.client.get("/enrollments").await?;
        self.cache.set(ENROLLMENTS_KEY, &fresh, ENROLLMENT_TTL_MINUTES);
        Ok(fresh)
    }

    /// One enrollment by course, cached per course.
    pub async fn enrollment(&self, course_id: &str) -> Result<Enrollment, ApiError> {
        let key = format!("enrollment_{}", course_id);
        if let Some(cached) = self.cache.get::<Enrollment>(&key) {
            debug!(course_id, "Enrollment served from cache");
            return Ok(cached);
        }
        let fresh: Enrollment = self
            .client
            .get(&format!("/enrollments/{}", course_id))
            .await?;
        self.cache.set(&key, &fresh, ENROLLMENT_TTL_MINUTES);
        Ok(fresh)
    }

    /// Record lesson progress, then invalidate every enrollment-derived key.
    pub async fn update_progress(
        &self,
        course_id: &str,
        progress_percent: u8,
    ) -> Result<Enrollment, ApiError> {
        let body = serde_json::json!({ "progressPercent": progress_percent });
        let updated: Enrollment = self
            .client
            .patch(&format!("/enrollments/{}", course_id), &body)
            .await?;
        self.cache.remove_by_prefix(ENROLLMENT_FAMILY);
        Ok(updated)
    }

    /// Drop cached enrollment data without a mutation, e.g. on pull-to-refresh.
    pub fn invalidate_enrollments(&self) {
        self.cache.remove_by_prefix(ENROLLMENT_FAMILY);
    }

    /// Raw passthrough for endpoints without a typed wrapper yet.
    pub async fn fetch_raw(&self, path: &str) -> Result<Value, ApiError> {
        self.client.get(path).await
    }
}
