use std::time::Duration;

use async_trait::async_trait;
use querydeck_core::config::AppConfig;
use querydeck_core::query_pipeline::{QueryBackend, QueryBackendError};
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpBackendError {
    #[error("failed to build http client: {0}")]
    Build(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct HttpQueryBackend {
    client: Client,
    base_url: String,
}

impl HttpQueryBackend {
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, HttpBackendError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.into(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, HttpBackendError> {
        Self::new(config.base_url.clone(), config.request_timeout())
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn resolve_url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }
}

#[async_trait]
impl QueryBackend for HttpQueryBackend {
    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, QueryBackendError> {
        let url = self.resolve_url(path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(to_query_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .ok()
                .filter(|text| !text.trim().is_empty())
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());
            tracing::warn!(%url, status = status.as_u16(), "request rejected");
            return Err(QueryBackendError::with_status(
                status.as_u16(),
                format!("HTTP {}: {message}", status.as_u16()),
            ));
        }

        response.json::<Value>().await.map_err(to_query_error)
    }
}

fn to_query_error(error: reqwest::Error) -> QueryBackendError {
    if error.is_timeout() {
        return QueryBackendError::new(format!("request timed out: {error}"));
    }
    QueryBackendError::new(error.to_string())
}

#[cfg(test)]
mod tests {
    use querydeck_core::config::AppConfig;

    use super::HttpQueryBackend;

    #[test]
    fn resolve_url_joins_base_and_path_once() {
        let backend =
            HttpQueryBackend::new("http://localhost:3000", None).expect("client should build");
        assert_eq!(
            backend.resolve_url("/api/generate"),
            "http://localhost:3000/api/generate"
        );
        assert_eq!(
            backend.resolve_url("api/query"),
            "http://localhost:3000/api/query"
        );
    }

    #[test]
    fn resolve_url_tolerates_trailing_slash_in_base() {
        let backend =
            HttpQueryBackend::new("https://deck.example.com/", None).expect("client should build");
        assert_eq!(
            backend.resolve_url("/api/users"),
            "https://deck.example.com/api/users"
        );
    }

    #[test]
    fn from_config_uses_configured_origin() {
        let config = AppConfig {
            base_url: "http://10.0.0.5:8080".to_string(),
            request_timeout_ms: Some(500),
            ..AppConfig::default()
        };
        let backend = HttpQueryBackend::from_config(&config).expect("client should build");
        assert_eq!(backend.base_url(), "http://10.0.0.5:8080");
    }
}
