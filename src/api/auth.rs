//! Credential exchange, registration, and profile lookup.

use reqwest::Method;

use super::types::{LoginRequest, LoginResponse, Profile, RegisterRequest};
use super::{ApiClient, ApiError};
use crate::session::{ProfileLookup, SessionBackend};

fn profile_lookup_path(lookup: &ProfileLookup) -> String {
    match lookup {
        ProfileLookup::Me => "/users/me".to_owned(),
        // One path segment, whatever the address contains (`#`, `/`, `?` are legal).
        ProfileLookup::ByEmail(email) => format!("/users/email/{}", urlencoding::encode(email)),
    }
}

impl ApiClient {
    /// Exchange credentials for a bearer token via `POST /auth/login`.
    ///
    /// Does not persist anything; the session store decides when the token
    /// becomes the stored credential.
    ///
    /// # Errors
    ///
    /// Returns the classified HTTP error, or [`ApiError::MissingAccessToken`]
    /// when a success response carries no token.
    pub async fn login(&self, email: &str, password: &str) -> Result<String, ApiError> {
        let body = LoginRequest { email, password };
        let resp: LoginResponse = self.send_body(Method::POST, "/auth/login", &body).await?;
        resp.into_token()
    }

    /// Create an account via `POST /users/register`.
    ///
    /// # Errors
    ///
    /// Returns the classified HTTP error.
    pub async fn register(&self, request: &RegisterRequest) -> Result<Profile, ApiError> {
        self.send_body(Method::POST, "/users/register", request)
            .await
    }

    /// Resolve a profile with an explicit token using one lookup strategy.
    ///
    /// # Errors
    ///
    /// Returns the classified HTTP error.
    pub async fn fetch_profile(&self, token: &str, lookup: &ProfileLookup) -> Result<Profile, ApiError> {
        let path = profile_lookup_path(lookup);
        Self::send_json(self.request_with_token(Method::GET, &path, token)).await
    }
}

#[async_trait::async_trait]
impl SessionBackend for ApiClient {
    async fn exchange_credentials(&self, email: &str, password: &str) -> Result<String, ApiError> {
        self.login(email, password).await
    }

    async fn fetch_profile(&self, token: &str, lookup: &ProfileLookup) -> Result<Profile, ApiError> {
        ApiClient::fetch_profile(self, token, lookup).await
    }
}
