//! Testing service client
//!
//! HTTP client for the remote SDK testing service. The service plays all
//! three collaborator roles: it gates operations, hands out recorded
//! requests and validates results.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::TestingServiceConfig;
use crate::error::{BoxError, StoreError};
use crate::models::OperationKey;
use crate::sdk::{ErrorReport, OperationRegistry, ReferenceDataStore, ServiceError, Validator};

const SERVICE_PATH: &str = "SDKTestingService";

/// Header carrying the session id, when a session was started
pub const SESSION_HEADER: &str = "opc-test-session-id";

/// Testing service errors
#[derive(Error, Debug)]
pub enum TestingServiceError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Connection refused to {0}")]
    ConnectionRefused(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Testing service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

/// Body posted to the validation endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidationPayload<'a> {
    container_id: &'a str,
    request: &'a Value,
    response: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorReport>,
}

/// Client for the SDK testing service
#[derive(Clone)]
pub struct TestingServiceClient {
    client: Client,
    base_url: String,
    lang: String,
    session_id: Option<String>,
    timeout_secs: u64,
}

impl TestingServiceClient {
    pub fn new(
        base_url: &str,
        lang: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, TestingServiceError> {
        let url =
            Url::parse(base_url).map_err(|_| TestingServiceError::InvalidUrl(base_url.to_string()))?;
        if !url.has_host() {
            return Err(TestingServiceError::InvalidUrl(base_url.to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TestingServiceError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            lang: lang.into(),
            session_id: None,
            timeout_secs,
        })
    }

    pub fn from_config(config: &TestingServiceConfig) -> Result<Self, TestingServiceError> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| TestingServiceError::InvalidUrl("no testing service URL".to_string()))?;
        Self::new(url, config.lang.clone(), config.timeout_secs)
    }

    /// Reuse an existing session
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Ask the service for a session id and attach it to later calls
    pub async fn start_session(&mut self) -> Result<&str, TestingServiceError> {
        let builder = self
            .client
            .post(self.endpoint("SessionId"))
            .query(&[("lang", self.lang.as_str())]);
        let response = self.send(builder).await?;
        let id = response
            .text()
            .await
            .map_err(|e| TestingServiceError::Decode(e.to_string()))?;
        let id = id.trim().trim_matches('"').to_string();
        if id.is_empty() {
            return Err(TestingServiceError::Decode("empty session id".to_string()));
        }
        debug!("Testing service session {}", id);
        Ok(self.session_id.insert(id).as_str())
    }

    /// Whether the service wants `key` exercised
    pub async fn is_api_enabled(&self, key: &OperationKey) -> Result<bool, TestingServiceError> {
        let builder = self
            .client
            .get(self.endpoint("IsApiEnabled"))
            .query(&self.operation_query(key));
        self.send(builder)
            .await?
            .json::<bool>()
            .await
            .map_err(|e| TestingServiceError::Decode(e.to_string()))
    }

    /// Raw recorded batch for `key`
    pub async fn get_requests(&self, key: &OperationKey) -> Result<Vec<u8>, TestingServiceError> {
        let builder = self
            .client
            .get(self.endpoint("Request"))
            .query(&self.operation_query(key));
        let body = self
            .send(builder)
            .await?
            .bytes()
            .await
            .map_err(|e| TestingServiceError::Decode(e.to_string()))?;
        Ok(body.to_vec())
    }

    /// Post a result for validation; an empty reply means accepted
    pub async fn validate_result(
        &self,
        container_id: &str,
        request: &Value,
        response: &Value,
        error: Option<ErrorReport>,
    ) -> Result<String, TestingServiceError> {
        let payload = ValidationPayload {
            container_id,
            request,
            response,
            error,
        };
        let builder = self
            .client
            .post(self.endpoint("Response"))
            .query(&[("lang", self.lang.as_str()), ("containerId", container_id)])
            .json(&payload);
        let message = self
            .send(builder)
            .await?
            .text()
            .await
            .map_err(|e| TestingServiceError::Decode(e.to_string()))?;
        Ok(message.trim().to_string())
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{}/{}", self.base_url, SERVICE_PATH, name)
    }

    fn operation_query<'a>(&'a self, key: &'a OperationKey) -> [(&'static str, &'a str); 3] {
        [
            ("lang", self.lang.as_str()),
            ("serviceName", key.service.as_str()),
            ("apiName", key.operation.as_str()),
        ]
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, TestingServiceError> {
        let builder = match &self.session_id {
            Some(id) => builder.header(SESSION_HEADER, id),
            None => builder,
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TestingServiceError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                TestingServiceError::ConnectionRefused(self.base_url.clone())
            } else {
                TestingServiceError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        debug!("{} -> {}", response.url(), status);
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(TestingServiceError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl OperationRegistry for TestingServiceClient {
    async fn is_enabled(&self, key: &OperationKey) -> Result<bool, BoxError> {
        Ok(self.is_api_enabled(key).await?)
    }
}

#[async_trait]
impl ReferenceDataStore for TestingServiceClient {
    async fn get_requests(&self, key: &OperationKey) -> Result<Vec<u8>, StoreError> {
        match TestingServiceClient::get_requests(self, key).await {
            Ok(body) => Ok(body),
            Err(TestingServiceError::Status { status, .. })
                if status == StatusCode::NOT_FOUND.as_u16() =>
            {
                Err(StoreError::Missing(key.clone()))
            }
            Err(e) => Err(StoreError::Service(e.to_string())),
        }
    }
}

#[async_trait]
impl Validator for TestingServiceClient {
    async fn validate(
        &self,
        container_id: &str,
        request: &Value,
        response: &Value,
        error: Option<&dyn ServiceError>,
    ) -> Result<String, BoxError> {
        let report = error.map(ErrorReport::from_error);
        Ok(self
            .validate_result(container_id, request, response, report)
            .await?)
    }
}
