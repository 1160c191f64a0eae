//! Thin reqwest wrapper for the backend REST API
//!
//! Requests go to `<base_url><path>`. Errors are reported as
//! [`MonitorError`] so pages can show them directly; nothing is retried.

use std::time::Duration;

use monitor_core::{ApiEnvelope, MonitorError, MonitorResult};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

/// Connection settings for [`ApiClient`]
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Absolute base URL including the `/api` prefix
    pub base_url: String,
    /// Per-request timeout; `None` leaves requests unbounded
    pub timeout: Option<Duration>,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000/api".to_string(),
            timeout: None,
        }
    }
}

/// Body returned by a successful request
#[derive(Debug, Clone, PartialEq)]
pub enum ApiPayload {
    Json(Value),
    Text(String),
}

impl ApiPayload {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ApiPayload::Json(value) => Some(value),
            ApiPayload::Text(_) => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            ApiPayload::Json(value) => Some(value),
            ApiPayload::Text(_) => None,
        }
    }
}

/// Query pairs; entries whose value is `None` are left out of the URL
pub type QueryParams<'a> = [(&'a str, Option<String>)];

/// Backend REST client
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: ApiClientConfig) -> MonitorResult<Self> {
        Url::parse(&config.base_url)
            .map_err(|err| MonitorError::config(format!("invalid api base url {}: {err}", config.base_url)))?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| MonitorError::config(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// `GET <path>?<query>`
    #[instrument(skip(self, query), fields(path = %path))]
    pub async fn get(&self, path: &str, query: &QueryParams<'_>) -> MonitorResult<ApiPayload> {
        let pairs: Vec<(&str, &str)> = query
            .iter()
            .filter_map(|(key, value)| value.as_deref().map(|v| (*key, v)))
            .collect();

        let request = self.client.request(Method::GET, self.url(path)).query(&pairs);
        self.send(Method::GET, path, request).await
    }

    /// `POST <path>` with a JSON body
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> MonitorResult<ApiPayload> {
        let request = self.client.request(Method::POST, self.url(path)).json(body);
        self.send(Method::POST, path, request).await
    }

    /// `POST <path>` with an empty JSON object
    pub async fn post_empty(&self, path: &str) -> MonitorResult<ApiPayload> {
        self.post(path, &serde_json::json!({})).await
    }

    async fn send(&self, method: Method, path: &str, request: RequestBuilder) -> MonitorResult<ApiPayload> {
        debug!("➡️ {} {}", method, path);

        let response = request.send().await.map_err(|err| {
            warn!("❌ {} {} transport failure: {}", method, path, err);
            MonitorError::transport(method.as_str(), path, err.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("Unknown").to_string();
            warn!("❌ {} {} returned HTTP {}", method, path, status.as_u16());
            return Err(MonitorError::http_status(method.as_str(), path, status.as_u16(), reason));
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.contains("application/json"))
            .unwrap_or(false);

        let body = response
            .text()
            .await
            .map_err(|err| MonitorError::transport(method.as_str(), path, err.to_string()))?;

        if is_json {
            let value = serde_json::from_str(&body)
                .map_err(|err| MonitorError::decode(format!("{} {}: {err}", method, path)))?;
            debug!("✅ {} {} -> json", method, path);
            Ok(ApiPayload::Json(value))
        } else {
            debug!("✅ {} {} -> text ({} bytes)", method, path, body.len());
            Ok(ApiPayload::Text(body))
        }
    }

    /// GET and unwrap the `{success, data}` envelope
    pub async fn get_data<T: DeserializeOwned>(&self, path: &str, query: &QueryParams<'_>) -> MonitorResult<T> {
        let payload = self.get(path, query).await?;
        unwrap_envelope(path, payload)
    }

    /// POST and only check `success`
    pub async fn post_ack<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> MonitorResult<()> {
        let payload = self.post(path, body).await?;
        let _: Value = unwrap_envelope(path, payload)?;
        Ok(())
    }
}

/// Decode an envelope payload into `T`.
///
/// `success: false` becomes [`MonitorError::Rejected`]. A missing `data`
/// field decodes as JSON `null`, so `Option<T>` and `Value` targets accept it.
pub fn unwrap_envelope<T: DeserializeOwned>(path: &str, payload: ApiPayload) -> MonitorResult<T> {
    let value = match payload {
        ApiPayload::Json(value) => value,
        ApiPayload::Text(_) => {
            return Err(MonitorError::decode(format!("{path}: expected a JSON response")));
        }
    };

    let envelope: ApiEnvelope<Value> =
        serde_json::from_value(value).map_err(|err| MonitorError::decode(format!("{path}: {err}")))?;

    if !envelope.success {
        let message = envelope.error.unwrap_or_else(|| "request was rejected".to_string());
        return Err(MonitorError::rejected(message));
    }

    serde_json::from_value(envelope.data.unwrap_or(Value::Null))
        .map_err(|err| MonitorError::decode(format!("{path}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rejects_invalid_base_url() {
        let err = ApiClient::new(ApiClientConfig {
            base_url: "not a url".to_string(),
            timeout: None,
        })
        .unwrap_err();
        assert!(matches!(err, MonitorError::Config(_)));
    }

    #[test]
    fn test_url_joining() {
        let client = ApiClient::new(ApiClientConfig {
            base_url: "http://localhost:5000/api/".to_string(),
            timeout: None,
        })
        .unwrap();
        assert_eq!(client.url("/system/status"), "http://localhost:5000/api/system/status");
        assert_eq!(client.url("logs/recent"), "http://localhost:5000/api/logs/recent");
    }

    #[test]
    fn test_unwrap_envelope_rejected() {
        let payload = ApiPayload::Json(json!({"success": false, "error": "matrix unavailable"}));
        let err = unwrap_envelope::<Value>("/strategy/matrix", payload).unwrap_err();
        assert_eq!(err.to_string(), "matrix unavailable");
    }

    #[test]
    fn test_unwrap_envelope_missing_data() {
        let payload = ApiPayload::Json(json!({"success": true}));
        let data: Option<Vec<u32>> = unwrap_envelope("/x", payload).unwrap();
        assert!(data.is_none());

        let payload = ApiPayload::Json(json!({"success": true}));
        assert!(matches!(
            unwrap_envelope::<Vec<u32>>("/x", payload),
            Err(MonitorError::Decode(_))
        ));
    }

    #[test]
    fn test_unwrap_envelope_text() {
        let err = unwrap_envelope::<Value>("/x", ApiPayload::Text("<html>".into())).unwrap_err();
        assert!(matches!(err, MonitorError::Decode(_)));
    }
}
