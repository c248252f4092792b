//! Wire DTOs and the error taxonomy for the Donatify REST API.
//!
//! DESIGN
//! ======
//! The API speaks camelCase JSON. Some list endpoints have shipped more than
//! one field name for the same value (`id` vs `enrollmentId`, `status` vs
//! `enrollmentStatus`), so those fields accept both through serde aliases.

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// ERROR
// =============================================================================

/// Coarse classification of an [`ApiError`], used to decide recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The server declared the credentials invalid (401/403).
    Authorization,
    /// The request never produced an HTTP response.
    Network,
    /// Any other non-success HTTP status.
    Server,
    /// A success response whose body could not be understood.
    Decode,
    /// Local client failure before a request was sent.
    Client,
}

/// Errors produced by [`super::ApiClient`] operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// Transport failure or timeout.
    #[error("request failed: {0}")]
    Network(String),

    /// The server rejected the credentials (401) or the caller's rights (403).
    #[error("not authorized: status {status}")]
    Unauthorized { status: u16, body: String },

    /// The server returned any other non-success status.
    #[error("server error: status {status}")]
    Server { status: u16, body: String },

    /// The response body could not be deserialized.
    #[error("response parse failed: {0}")]
    Decode(String),

    /// `POST /auth/login` succeeded but carried no usable `accessToken`.
    #[error("login response did not include an access token")]
    MissingAccessToken,
}

impl ApiError {
    /// Build the error for a non-success HTTP status.
    #[must_use]
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::Unauthorized { status, body },
            _ => Self::Server { status, body },
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::HttpClientBuild(_) => ErrorKind::Client,
            Self::Network(_) => ErrorKind::Network,
            Self::Unauthorized { .. } => ErrorKind::Authorization,
            Self::Server { .. } => ErrorKind::Server,
            Self::Decode(_) | Self::MissingAccessToken => ErrorKind::Decode,
        }
    }

    /// True only when the server declared the credentials invalid.
    #[must_use]
    pub fn is_authorization(&self) -> bool {
        self.kind() == ErrorKind::Authorization
    }

    /// HTTP status, when the error came from a response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { status, .. } | Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
            Self::Network(_) => "E_NETWORK",
            Self::Unauthorized { .. } => "E_UNAUTHORIZED",
            Self::Server { .. } => "E_SERVER",
            Self::Decode(_) => "E_DECODE",
            Self::MissingAccessToken => "E_MISSING_ACCESS_TOKEN",
        }
    }

    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Server { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// AUTH
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<String>,
}

impl LoginResponse {
    /// Extract a non-empty token.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::MissingAccessToken`] when the field is absent or blank.
    pub fn into_token(self) -> Result<String, ApiError> {
        self.access_token
            .filter(|t| !t.trim().is_empty())
            .ok_or(ApiError::MissingAccessToken)
    }
}

/// Body of `POST /users/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub nickname: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub address: String,
}

// =============================================================================
// PROFILE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    User,
    /// Any role this client does not know about; treated as non-admin.
    #[serde(other)]
    Unknown,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Admin => "ADMIN",
            Self::User => "USER",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(label)
    }
}

/// A user profile as returned by `/users/me` and friends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub nickname: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub role: Role,
    /// Accumulated volunteering points.
    #[serde(default, alias = "totalPoints")]
    pub points: i64,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Profile {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Body of `PATCH /users/me` for profile edits. Absent fields are untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Body of `PATCH /users/me` for a password change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

/// Body of `PUT /admin/users/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUserUpdate {
    pub name: String,
    pub nickname: String,
    pub email: String,
}

// =============================================================================
// ACTIVITIES & ENROLLMENTS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub points_value: i64,
    #[serde(default)]
    pub location: String,
    /// Activity category (e.g. `EVENT`, `donation`).
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub status: String,
    /// Local ISO-8601 timestamp without offset (`YYYY-MM-DDTHH:MM:SS`).
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

/// Body of the admin activity create/update calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    pub description: String,
    pub location: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub points_value: i64,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    Enrolled,
    Completed,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl EnrollmentStatus {
    /// Query-string value used by `GET /admin/enrollments?status=`.
    #[must_use]
    pub fn as_query(self) -> Option<&'static str> {
        match self {
            Self::Enrolled => Some("ENROLLED"),
            Self::Completed => Some("COMPLETED"),
            Self::Canceled => Some("CANCELED"),
            Self::Unknown => None,
        }
    }
}

fn default_enrollment_status() -> EnrollmentStatus {
    EnrollmentStatus::Enrolled
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    #[serde(alias = "id")]
    pub enrollment_id: i64,
    #[serde(default)]
    pub activity_id: Option<i64>,
    #[serde(default)]
    pub activity_title: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default = "default_enrollment_status", alias = "status")]
    pub enrollment_status: EnrollmentStatus,
    #[serde(default)]
    pub enrollment_date: Option<String>,
    #[serde(default)]
    pub completed_date: Option<String>,
    #[serde(default, alias = "pointsValue")]
    pub points: Option<i64>,
}

// =============================================================================
// DASHBOARD & RANKING
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub points: i64,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    #[serde(default)]
    pub total_points: i64,
    #[serde(default)]
    pub completed_activities: i64,
    #[serde(default)]
    pub ranking_position: Option<i64>,
    #[serde(default)]
    pub recent_activities: Vec<RecentActivity>,
    #[serde(default)]
    pub enrollments: Vec<Enrollment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub rank: i64,
    pub name: String,
    pub points: i64,
}

// =============================================================================
// ONGS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ong {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OngDraft {
    pub name: String,
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
