//! HTTP catalog client
//!
//! Reads users and books from the host application's JSON API. Requests that
//! fail with a connection error, a timeout or a 5xx are retried with
//! exponential backoff; every other failure is returned immediately.

use super::models::{BookStatuses, CatalogEdition, CatalogUser, ListMembership, ReadingGoal};
use super::traits::Catalog;
use crate::config::CatalogConfig;
use crate::domain::{CatalogError, EditionId, Result, ShelfpackError, UserId};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::{Client, ClientBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Catalog backed by the host application's REST API
///
/// # Example
///
/// ```no_run
/// use shelfpack::adapters::catalog::{Catalog, HttpCatalog};
/// use shelfpack::config::CatalogConfig;
/// use shelfpack::domain::UserId;
///
/// # async fn example(config: CatalogConfig) -> shelfpack::domain::Result<()> {
/// let catalog = HttpCatalog::new(config)?;
/// let user = catalog.user(&UserId::new("mouse").unwrap()).await?;
/// println!("{}", user.activity);
/// # Ok(())
/// # }
/// ```
pub struct HttpCatalog {
    base_url: Url,
    client: Client,
    config: CatalogConfig,
}

impl HttpCatalog {
    /// Build a client from configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `base_url` is not a valid base URL or
    /// the HTTP client cannot be built.
    pub fn new(config: CatalogConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            ShelfpackError::Configuration(format!(
                "Invalid catalog.base_url '{}': {e}",
                config.base_url
            ))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ShelfpackError::Configuration(format!(
                "catalog.base_url '{}' cannot be used as a base URL",
                config.base_url
            )));
        }

        let mut client_builder = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.timeout_seconds.min(30)));

        if !config.tls_verify {
            client_builder = client_builder.danger_accept_invalid_certs(true);
        }

        let client = client_builder.build().map_err(|e| {
            ShelfpackError::Configuration(format!("Failed to build HTTP client: {e}"))
        })?;

        Ok(Self {
            base_url,
            client,
            config,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Build authorization header value
    fn auth_header_value(&self) -> Option<String> {
        match self.config.auth_type.as_str() {
            "bearer" => self
                .config
                .api_token
                .as_ref()
                .map(|token| format!("Bearer {}", token.expose_secret().as_ref())),
            "basic" => match (&self.config.username, &self.config.password) {
                (Some(username), Some(password)) => {
                    let credentials = format!("{username}:{}", password.expose_secret().as_ref());
                    let encoded = general_purpose::STANDARD.encode(credentials.as_bytes());
                    Some(format!("Basic {encoded}"))
                }
                _ => None,
            },
            _ => None,
        }
    }

    /// Append percent-encoded path segments to the base URL
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ShelfpackError::Configuration(format!(
                    "catalog.base_url '{}' cannot be used as a base URL",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn backoff_delay(&self, attempt: usize) -> Duration {
        let retry = &self.config.retry;
        let factor = retry.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        let delay_ms = (retry.initial_delay_ms as f64 * factor) as u64;
        Duration::from_millis(delay_ms.min(retry.max_delay_ms))
    }

    /// Retry a request with exponential backoff
    async fn retry_request<F, T, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let max_retries = self.config.retry.max_retries;
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(ShelfpackError::Catalog(e)) if e.is_retryable() && attempt < max_retries => {
                    attempt += 1;
                    let delay = self.backoff_delay(attempt);

                    tracing::debug!(delay_ms = delay.as_millis() as u64, "Catalog backoff");
                    crate::log_retry_attempt!(attempt, max_retries, e);

                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_json<T: DeserializeOwned + Send>(&self, segments: &[&str]) -> Result<T> {
        let url = self.endpoint(segments)?;

        tracing::debug!(url = %url, "Catalog request");

        self.retry_request(|| self.fetch_once(&url)).await
    }

    async fn fetch_once<T: DeserializeOwned + Send>(&self, url: &Url) -> Result<T> {
        let mut request = self.client.get(url.clone());

        if let Some(auth) = self.auth_header_value() {
            request = request.header("Authorization", auth);
        }

        let resp = request.send().await.map_err(|e| {
            if e.is_timeout() {
                CatalogError::Timeout(e.to_string())
            } else {
                CatalogError::ConnectionFailed(e.to_string())
            }
        })?;

        let status = resp.status();
        if status.is_success() {
            let body = resp
                .json::<T>()
                .await
                .map_err(|e| CatalogError::InvalidResponse(e.to_string()))?;
            return Ok(body);
        }

        let body = resp.text().await.unwrap_or_default();
        Err(status_error(status, url.path(), body).into())
    }
}

fn status_error(status: StatusCode, path: &str, body: String) -> CatalogError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            CatalogError::AuthenticationFailed(format!("{status} for {path}"))
        }
        StatusCode::NOT_FOUND => CatalogError::NotFound(path.to_string()),
        s if s.is_server_error() => CatalogError::ServerError {
            status: s.as_u16(),
            message: body,
        },
        s => CatalogError::ClientError {
            status: s.as_u16(),
            message: body,
        },
    }
}

#[async_trait]
impl Catalog for HttpCatalog {
    async fn user(&self, user: &UserId) -> Result<CatalogUser> {
        self.get_json(&["users", user.as_str()]).await
    }

    async fn books_for_user(&self, user: &UserId) -> Result<Vec<EditionId>> {
        self.get_json(&["users", user.as_str(), "editions"]).await
    }

    async fn edition(&self, edition: &EditionId) -> Result<CatalogEdition> {
        self.get_json(&["editions", edition.as_str()]).await
    }

    async fn shelves_for(&self, user: &UserId, edition: &EditionId) -> Result<Vec<Value>> {
        self.get_json(&["users", user.as_str(), "editions", edition.as_str(), "shelves"])
            .await
    }

    async fn list_memberships_for(
        &self,
        user: &UserId,
        edition: &EditionId,
    ) -> Result<Vec<ListMembership>> {
        self.get_json(&["users", user.as_str(), "editions", edition.as_str(), "lists"])
            .await
    }

    async fn statuses_for(&self, user: &UserId, edition: &EditionId) -> Result<BookStatuses> {
        self.get_json(&["users", user.as_str(), "editions", edition.as_str(), "statuses"])
            .await
    }

    async fn readthroughs_for(&self, user: &UserId, edition: &EditionId) -> Result<Vec<Value>> {
        self.get_json(&[
            "users",
            user.as_str(),
            "editions",
            edition.as_str(),
            "readthroughs",
        ])
        .await
    }

    async fn saved_lists(&self, user: &UserId) -> Result<Vec<String>> {
        self.get_json(&["users", user.as_str(), "saved-lists"]).await
    }

    async fn follows(&self, user: &UserId) -> Result<Vec<String>> {
        self.get_json(&["users", user.as_str(), "follows"]).await
    }

    async fn blocks(&self, user: &UserId) -> Result<Vec<String>> {
        self.get_json(&["users", user.as_str(), "blocks"]).await
    }

    async fn reading_goals(&self, user: &UserId) -> Result<Vec<ReadingGoal>> {
        self.get_json(&["users", user.as_str(), "goals"]).await
    }
}
