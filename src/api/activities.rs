//! Activity browsing, enrollment, dashboard and ranking.

use super::types::{Activity, Dashboard, Enrollment, RankingEntry};
use super::{ApiClient, ApiError};

fn enroll_path(activity_id: i64) -> String {
    format!("/activities/{activity_id}/enroll")
}

fn complete_enrollment_path(enrollment_id: i64) -> String {
    format!("/enrollments/{enrollment_id}/complete")
}

impl ApiClient {
    /// `GET /activities`
    ///
    /// # Errors
    ///
    /// Returns the classified HTTP error.
    pub async fn activities(&self) -> Result<Vec<Activity>, ApiError> {
        self.get("/activities").await
    }

    /// Enroll the current user via `POST /activities/{id}/enroll`.
    ///
    /// The response shape varies between deployments, so it is returned raw.
    ///
    /// # Errors
    ///
    /// Returns the classified HTTP error; the server answers an error status
    /// when the user is already enrolled.
    pub async fn enroll(&self, activity_id: i64) -> Result<serde_json::Value, ApiError> {
        self.post(&enroll_path(activity_id)).await
    }

    /// Mark an enrollment completed and credit its points via
    /// `POST /enrollments/{id}/complete`.
    ///
    /// # Errors
    ///
    /// Returns the classified HTTP error.
    pub async fn complete_enrollment(&self, enrollment_id: i64) -> Result<Enrollment, ApiError> {
        self.post(&complete_enrollment_path(enrollment_id))
            .await
    }

    /// `GET /dashboard`
    ///
    /// # Errors
    ///
    /// Returns the classified HTTP error.
    pub async fn dashboard(&self) -> Result<Dashboard, ApiError> {
        self.get("/dashboard").await
    }

    /// `GET /ranking`
    ///
    /// # Errors
    ///
    /// Returns the classified HTTP error.
    pub async fn ranking(&self) -> Result<Vec<RankingEntry>, ApiError> {
        self.get("/ranking").await
    }
}
