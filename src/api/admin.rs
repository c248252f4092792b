//! Administrative CRUD under `/admin/*`.
//!
//! These calls require an `ADMIN` profile server-side; the client only
//! forwards the bearer token and reports 401/403 like any other endpoint.

use reqwest::Method;

use super::types::{Activity, ActivityDraft, AdminUserUpdate, Enrollment, EnrollmentStatus, Ong, OngDraft, Profile};
use super::{ApiClient, ApiError};

fn admin_enrollments_path(status: Option<EnrollmentStatus>) -> String {
    match status.and_then(EnrollmentStatus::as_query) {
        Some(status) => format!("/admin/enrollments?status={status}"),
        None => "/admin/enrollments".to_owned(),
    }
}

impl ApiClient {
    // -------------------------------------------------------------------------
    // Activities
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns the classified HTTP error.
    pub async fn admin_activities(&self) -> Result<Vec<Activity>, ApiError> {
        self.get("/admin/activities").await
    }

    /// # Errors
    ///
    /// Returns the classified HTTP error.
    pub async fn create_activity(&self, draft: &ActivityDraft) -> Result<Activity, ApiError> {
        self.send_body(Method::POST, "/admin/activities", draft)
            .await
    }

    /// # Errors
    ///
    /// Returns the classified HTTP error.
    pub async fn update_activity(&self, id: i64, draft: &ActivityDraft) -> Result<Activity, ApiError> {
        self.send_body(Method::PUT, &format!("/admin/activities/{id}"), draft)
            .await
    }

    /// # Errors
    ///
    /// Returns the classified HTTP error.
    pub async fn delete_activity(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/admin/activities/{id}")).await
    }

    // -------------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns the classified HTTP error.
    pub async fn admin_users(&self) -> Result<Vec<Profile>, ApiError> {
        self.get("/admin/users").await
    }

    /// # Errors
    ///
    /// Returns the classified HTTP error.
    pub async fn update_user(&self, id: i64, update: &AdminUserUpdate) -> Result<Profile, ApiError> {
        self.send_body(Method::PUT, &format!("/admin/users/{id}"), update)
            .await
    }

    /// # Errors
    ///
    /// Returns the classified HTTP error.
    pub async fn delete_user(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/admin/users/{id}")).await
    }

    // -------------------------------------------------------------------------
    // ONGs
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns the classified HTTP error.
    pub async fn admin_ongs(&self) -> Result<Vec<Ong>, ApiError> {
        self.get("/admin/ongs").await
    }

    /// # Errors
    ///
    /// Returns the classified HTTP error.
    pub async fn create_ong(&self, draft: &OngDraft) -> Result<Ong, ApiError> {
        self.send_body(Method::POST, "/admin/ongs", draft).await
    }

    /// # Errors
    ///
    /// Returns the classified HTTP error.
    pub async fn update_ong(&self, id: i64, draft: &OngDraft) -> Result<Ong, ApiError> {
        self.send_body(Method::PUT, &format!("/admin/ongs/{id}"), draft)
            .await
    }

    /// # Errors
    ///
    /// Returns the classified HTTP error.
    pub async fn delete_ong(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/admin/ongs/{id}")).await
    }

    // -------------------------------------------------------------------------
    // Enrollments
    // -------------------------------------------------------------------------

    /// List all enrollments, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns the classified HTTP error.
    pub async fn admin_enrollments(&self, status: Option<EnrollmentStatus>) -> Result<Vec<Enrollment>, ApiError> {
        self.get(&admin_enrollments_path(status)).await
    }

    /// Cancel an enrollment. Points already credited for a completed
    /// enrollment are deducted server-side.
    ///
    /// # Errors
    ///
    /// Returns the classified HTTP error.
    pub async fn cancel_enrollment(&self, enrollment_id: i64) -> Result<Enrollment, ApiError> {
        self.post(&format!("/admin/enrollments/{enrollment_id}/cancel"))
            .await
    }
}
