//! Self-service profile endpoints.

use reqwest::Method;

use super::types::{Enrollment, PasswordChange, Profile, ProfileUpdate};
use super::{ApiClient, ApiError};

impl ApiClient {
    /// Edit the current user's profile via `PATCH /users/me`.
    ///
    /// # Errors
    ///
    /// Returns the classified HTTP error.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile, ApiError> {
        self.send_body(Method::PATCH, "/users/me", update).await
    }

    /// Change the password through the same `PATCH /users/me` endpoint.
    ///
    /// # Errors
    ///
    /// Returns the classified HTTP error.
    pub async fn change_password(&self, change: &PasswordChange) -> Result<Profile, ApiError> {
        self.send_body(Method::PATCH, "/users/me", change).await
    }

    /// List the current user's enrollments via `GET /users/me/enrollments`.
    ///
    /// An authorization failure yields an empty list: the enrollments tab is
    /// informational and must not bounce the user out. Forced logout stays
    /// the session store's decision.
    ///
    /// # Errors
    ///
    /// Returns any non-authorization error.
    pub async fn my_enrollments(&self) -> Result<Vec<Enrollment>, ApiError> {
        match self.get::<Option<Vec<Enrollment>>>("/users/me/enrollments").await {
            Ok(list) => Ok(list.unwrap_or_default()),
            Err(e) if e.is_authorization() => {
                tracing::warn!(error = %e, "not allowed to list enrollments; returning none");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}
