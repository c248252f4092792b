//! REST client for the Donatify API.
//!
//! DESIGN
//! ======
//! One `ApiClient` wraps a shared `reqwest::Client`. Every request goes
//! through [`ApiClient::request`], which plays the role of a request
//! interceptor: it reads the persisted token and attaches
//! `Authorization: Bearer <token>` whenever one is present, regardless of
//! endpoint. Endpoint wrappers live in per-area submodules.
//!
//! ERROR HANDLING
//! ==============
//! Responses are classified once, in [`ApiClient::send_text`]: transport
//! failures become `Network`, 401/403 become `Unauthorized`, any other
//! non-2xx becomes `Server`. Callers never inspect numeric codes to decide
//! recovery; they match on [`ErrorKind`].

pub mod activities;
pub mod admin;
pub mod auth;
pub mod types;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::storage::{TOKEN_KEY, TokenStore};
pub use types::{ApiError, ErrorKind};

/// HTTP client bound to one API root and one token store.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    store: Arc<dyn TokenStore>,
}

impl ApiClient {
    /// Build a client from typed config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &ClientConfig, store: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.base_url.clone(), store })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Start a request, attaching the persisted bearer token if one exists.
    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.endpoint(path));
        match self.store.get_item(TOKEN_KEY).await {
            Ok(Some(token)) => builder.bearer_auth(token),
            Ok(None) => builder,
            Err(e) => {
                tracing::warn!(error = %e, path, "token read failed; sending request without credentials");
                builder
            }
        }
    }

    /// Start a request carrying an explicit token instead of the persisted one.
    fn request_with_token(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        self.http
            .request(method, self.endpoint(path))
            .bearer_auth(token)
    }

    async fn send_text(builder: RequestBuilder) -> Result<String, ApiError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let url = response.url().path().to_owned();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !(200..300).contains(&status) {
            tracing::debug!(status, path = %url, "api request rejected");
            return Err(ApiError::from_status(status, text));
        }
        Ok(text)
    }

    async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ApiError> {
        let text = Self::send_text(builder).await?;
        decode_body(&text)
    }

    async fn send_empty(builder: RequestBuilder) -> Result<(), ApiError> {
        Self::send_text(builder).await.map(|_| ())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        Self::send_json(self.request(Method::GET, path).await).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        Self::send_json(self.request(Method::POST, path).await).await
    }

    async fn send_body<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        Self::send_json(self.request(method, path).await.json(body)).await
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        Self::send_empty(self.request(Method::DELETE, path).await).await
    }
}

/// Decode a success body. An empty body decodes as JSON `null`, so callers
/// expecting `Option`/`Value` see "nothing" instead of a parse failure.
fn decode_body<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    let text = if text.trim().is_empty() { "null" } else { text };
    serde_json::from_str(text).map_err(|e| ApiError::Decode(e.to_string()))
}
