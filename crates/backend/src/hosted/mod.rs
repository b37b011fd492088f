//! Client for the hosted relational backend.
//!
//! # Architecture
//!
//! - Table access goes through the REST API at `rest/v1/{table}` (see [`rest`])
//! - Authentication goes through the auth API at `auth/v1/*`
//! - The backend is the source of truth; nothing is synced locally
//! - Catalog reads (seasons and products) are cached with `moka` and the
//!   cache is cleared on every catalog write made through this client
//!
//! Every request carries the `apikey` header. Table requests authorize with
//! the service key when one is configured, otherwise with the anon key.

mod auth;
mod cache;
pub mod rest;
mod store;

use std::sync::Arc;

use chocolatier_core::store::StoreError;
use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::HostedConfig;

pub use rest::RestQuery;

use cache::{CacheKey, CacheValue};

/// Errors that can occur when talking to the hosted backend.
#[derive(Debug, Error)]
pub enum HostedError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Request URL could not be built.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The backend answered with an error payload.
    #[error("backend returned {status}: {message}")]
    Api {
        status: u16,
        /// Database error code (e.g. `23505`) when the backend reports one.
        code: Option<String>,
        message: String,
    },

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

impl From<HostedError> for StoreError {
    fn from(error: HostedError) -> Self {
        match error {
            HostedError::Api {
                code: Some(code),
                message,
                ..
            } if code == UNIQUE_VIOLATION || code == FOREIGN_KEY_VIOLATION => {
                Self::Conflict(message)
            }
            HostedError::Api {
                status: 400 | 422,
                message,
                ..
            } => Self::Invalid(message),
            other => Self::Backend(other.to_string()),
        }
    }
}

#[derive(Debug, Default, serde::Deserialize)]
struct ApiErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

/// Client for the hosted backend's REST and auth APIs.
#[derive(Clone)]
pub struct HostedClient {
    inner: Arc<HostedClientInner>,
}

struct HostedClientInner {
    client: reqwest::Client,
    base_url: Url,
    anon_key: String,
    data_key: String,
    cache: Cache<CacheKey, CacheValue>,
}

impl HostedClient {
    /// Create a new client.
    #[must_use]
    pub fn new(config: &HostedConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.cache_ttl)
            .build();

        Self {
            inner: Arc::new(HostedClientInner {
                client: reqwest::Client::new(),
                base_url: config.url.clone(),
                anon_key: config.anon_key.expose_secret().to_string(),
                data_key: config.data_key().to_string(),
                cache,
            }),
        }
    }

    /// Drop every cached catalog read.
    pub fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
        debug!("Catalog cache invalidated");
    }

    async fn cached(&self, key: &CacheKey) -> Option<CacheValue> {
        self.inner.cache.get(key).await
    }

    async fn remember(&self, key: CacheKey, value: CacheValue) {
        self.inner.cache.insert(key, value).await;
    }

    async fn forget(&self, key: &CacheKey) {
        self.inner.cache.invalidate(key).await;
    }

    // =========================================================================
    // REST API
    // =========================================================================

    fn rest_request(&self, method: Method, query: &RestQuery) -> Result<RequestBuilder, HostedError> {
        let url = query.url(&self.inner.base_url)?;
        Ok(self
            .inner
            .client
            .request(method, url)
            .header("apikey", &self.inner.data_key)
            .bearer_auth(&self.inner.data_key))
    }

    /// Select rows.
    async fn select<T: DeserializeOwned>(&self, query: &RestQuery) -> Result<Vec<T>, HostedError> {
        let request = self.rest_request(Method::GET, query)?;
        self.send_json(request).await
    }

    /// Select at most one row.
    async fn select_one<T: DeserializeOwned>(
        &self,
        query: RestQuery,
    ) -> Result<Option<T>, HostedError> {
        let rows: Vec<T> = self.select(&query.limit(1)).await?;
        Ok(rows.into_iter().next())
    }

    /// Insert a row and return its stored representation.
    async fn insert<B, T>(&self, table: &'static str, body: &B) -> Result<T, HostedError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .rest_request(Method::POST, &RestQuery::table(table))?
            .header("Prefer", "return=representation")
            .json(body);
        let rows: Vec<T> = self.send_json(request).await?;
        rows.into_iter().next().ok_or_else(|| empty_representation(table))
    }

    /// Insert a row or merge into the existing row with the same `key`.
    async fn upsert<B, T>(&self, table: &'static str, key: &'static str, body: &B) -> Result<T, HostedError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .rest_request(Method::POST, &RestQuery::table(table).on_conflict(key))?
            .header("Prefer", "return=representation,resolution=merge-duplicates")
            .json(body);
        let rows: Vec<T> = self.send_json(request).await?;
        rows.into_iter().next().ok_or_else(|| empty_representation(table))
    }

    /// Update the rows matched by `query`, returning the first updated row.
    async fn update<B, T>(&self, query: &RestQuery, body: &B) -> Result<Option<T>, HostedError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .rest_request(Method::PATCH, query)?
            .header("Prefer", "return=representation")
            .json(body);
        let rows: Vec<T> = self.send_json(request).await?;
        Ok(rows.into_iter().next())
    }

    /// Delete the rows matched by `query`, returning how many were removed.
    async fn delete(&self, query: &RestQuery) -> Result<usize, HostedError> {
        let request = self
            .rest_request(Method::DELETE, query)?
            .header("Prefer", "return=representation");
        let rows: Vec<serde_json::Value> = self.send_json(request).await?;
        Ok(rows.len())
    }

    // =========================================================================
    // Auth API
    // =========================================================================

    fn auth_request(&self, method: Method, path: &str) -> Result<RequestBuilder, HostedError> {
        let url = self.inner.base_url.join(&format!("auth/v1/{path}"))?;
        Ok(self
            .inner
            .client
            .request(method, url)
            .header("apikey", &self.inner.anon_key))
    }

    // =========================================================================
    // Transport
    // =========================================================================

    /// Send a request and decode a JSON body.
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, HostedError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(HostedError::RateLimited(retry_after(&response)));
        }

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "Backend returned non-success status"
            );
            return Err(api_error(status, &response_text));
        }

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %response_text.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            HostedError::Parse(e)
        })
    }
}

fn retry_after(response: &reqwest::Response) -> u64 {
    response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(1)
}

fn api_error(status: StatusCode, body: &str) -> HostedError {
    let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = match (parsed.message, parsed.details) {
        (Some(message), Some(details)) => format!("{message} ({details})"),
        (Some(message), None) => message,
        (None, _) => body.chars().take(200).collect(),
    };
    HostedError::Api {
        status: status.as_u16(),
        code: parsed.code,
        message,
    }
}

fn empty_representation(table: &str) -> HostedError {
    HostedError::Api {
        status: StatusCode::OK.as_u16(),
        code: None,
        message: format!("backend returned no representation for {table}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_maps_to_conflict() {
        let error = api_error(
            StatusCode::CONFLICT,
            r#"{"code":"23505","message":"duplicate key value violates unique constraint","details":"Key (cycle_id, product_id) already exists.","hint":null}"#,
        );
        assert!(matches!(StoreError::from(error), StoreError::Conflict(_)));
    }

    #[test]
    fn test_foreign_key_violation_maps_to_conflict() {
        let error = api_error(
            StatusCode::CONFLICT,
            r#"{"code":"23503","message":"update or delete on table \"seasons\" violates foreign key constraint"}"#,
        );
        assert!(matches!(StoreError::from(error), StoreError::Conflict(_)));
    }

    #[test]
    fn test_bad_request_maps_to_invalid() {
        let error = api_error(
            StatusCode::BAD_REQUEST,
            r#"{"code":"22P02","message":"invalid input syntax for type numeric"}"#,
        );
        match StoreError::from(error) {
            StoreError::Invalid(message) => {
                assert_eq!(message, "invalid input syntax for type numeric");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_non_json_error_body_is_kept() {
        let error = api_error(StatusCode::BAD_GATEWAY, "upstream connect error");
        assert!(error.to_string().contains("upstream connect error"));
        assert!(matches!(StoreError::from(error), StoreError::Backend(_)));
    }
}
