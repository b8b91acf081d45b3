//! In-process widget service used by module tests
//!
//! Responses are scripted per operation; unscripted calls succeed with a
//! default value. Every call is recorded for later assertions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use super::{
    ErrorKind, ExecutionContext, PaginatedRequest, PaginatedResponse, ReferenceDataStore,
    SdkRequest, ServiceClient, ServiceError, Validator,
};
use crate::error::{BoxError, StoreError};
use crate::models::OperationKey;
use crate::retry::{self, RetryError, RetryPolicy};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateWidgetRequest {
    pub compartment_id: String,
    pub display_name: Option<String>,
    pub size_in_gbs: Option<i64>,
    pub opc_retry_token: Option<String>,
    #[serde(skip)]
    pub retry_policy: Option<RetryPolicy>,
}

impl SdkRequest for CreateWidgetRequest {
    fn retry_policy(&self) -> Option<&RetryPolicy> {
        self.retry_policy.as_ref()
    }

    fn set_retry_policy(&mut self, policy: Option<RetryPolicy>) {
        self.retry_policy = policy;
    }

    fn retry_token(&self) -> Option<&str> {
        self.opc_retry_token.as_deref()
    }

    fn set_retry_token(&mut self, token: String) {
        self.opc_retry_token = Some(token);
    }

    fn accepts_retry_token(&self) -> bool {
        true
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListWidgetsRequest {
    pub compartment_id: String,
    pub limit: Option<u32>,
    pub page: Option<String>,
    pub lifecycle_state: Option<String>,
    #[serde(skip)]
    pub retry_policy: Option<RetryPolicy>,
}

impl SdkRequest for ListWidgetsRequest {
    fn retry_policy(&self) -> Option<&RetryPolicy> {
        self.retry_policy.as_ref()
    }

    fn set_retry_policy(&mut self, policy: Option<RetryPolicy>) {
        self.retry_policy = policy;
    }
}

impl PaginatedRequest for ListWidgetsRequest {
    fn set_page(&mut self, page: Option<String>) {
        self.page = page;
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Widget {
    pub id: String,
    pub display_name: String,
}

impl Widget {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: id.to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListWidgetsResponse {
    pub items: Vec<Widget>,
    pub opc_next_page: Option<String>,
}

impl ListWidgetsResponse {
    pub fn page(ids: &[&str], next: Option<&str>) -> Self {
        Self {
            items: ids.iter().map(|id| Widget::new(id)).collect(),
            opc_next_page: next.map(str::to_string),
        }
    }
}

impl PaginatedResponse for ListWidgetsResponse {
    fn next_page(&self) -> Option<&str> {
        self.opc_next_page.as_deref()
    }
}

#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct FakeError {
    pub kind: ErrorKind,
    pub message: String,
}

impl FakeError {
    pub fn service(status: u16) -> Self {
        Self {
            kind: ErrorKind::service(status),
            message: format!("service returned {status}"),
        }
    }

    pub fn retryable(status: u16) -> Self {
        Self {
            kind: ErrorKind::Service {
                status,
                code: None,
                retryable: Some(true),
            },
            message: format!("service returned {status}"),
        }
    }
}

impl ServiceError for FakeError {
    fn kind(&self) -> ErrorKind {
        self.kind.clone()
    }
}

pub type FakeResult<T> = Result<T, RetryError<FakeError>>;

#[derive(Default)]
pub struct FakeState {
    creates: Mutex<VecDeque<Result<Widget, FakeError>>>,
    pages: Mutex<VecDeque<Result<ListWidgetsResponse, FakeError>>>,
    create_calls: Mutex<Vec<CreateWidgetRequest>>,
    list_calls: Mutex<Vec<ListWidgetsRequest>>,
}

impl FakeState {
    fn next_create(&self, request: &CreateWidgetRequest) -> Result<Widget, FakeError> {
        self.create_calls.lock().unwrap().push(request.clone());
        self.creates.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(Widget {
                id: "ocid1.widget.default".to_string(),
                display_name: request.display_name.clone().unwrap_or_default(),
            })
        })
    }

    fn next_page(&self, request: &ListWidgetsRequest) -> Result<ListWidgetsResponse, FakeError> {
        self.list_calls.lock().unwrap().push(request.clone());
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ListWidgetsResponse::default()))
    }
}

/// Widget service client; clones share their script and call log
#[derive(Clone, Default)]
pub struct FakeClient {
    pub host: String,
    pub region: String,
    state: Arc<FakeState>,
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_create(&self, result: Result<Widget, FakeError>) {
        self.state.creates.lock().unwrap().push_back(result);
    }

    pub fn script_page(&self, result: Result<ListWidgetsResponse, FakeError>) {
        self.state.pages.lock().unwrap().push_back(result);
    }

    pub fn create_calls(&self) -> Vec<CreateWidgetRequest> {
        self.state.create_calls.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> Vec<ListWidgetsRequest> {
        self.state.list_calls.lock().unwrap().clone()
    }

    pub async fn create_widget(
        &self,
        ctx: ExecutionContext,
        request: CreateWidgetRequest,
    ) -> FakeResult<Widget> {
        let state = &self.state;
        let request = &request;
        retry::execute(&ctx, request.retry_policy(), move || async move {
            state.next_create(request)
        })
        .await
    }

    pub async fn list_widgets(
        &self,
        ctx: ExecutionContext,
        request: ListWidgetsRequest,
    ) -> FakeResult<ListWidgetsResponse> {
        let state = &self.state;
        let request = &request;
        retry::execute(&ctx, request.retry_policy(), move || async move {
            state.next_page(request)
        })
        .await
    }
}

impl ServiceClient for FakeClient {
    fn set_host(&mut self, host: &str) {
        self.host = host.to_string();
    }

    fn set_region(&mut self, region: &str) {
        self.region = region.to_string();
        self.host = format!("https://widgets.{region}.example.com");
    }

    fn host(&self) -> &str {
        &self.host
    }
}

/// Arguments of one validator call
#[derive(Clone, Debug)]
pub struct ValidationCall {
    pub container_id: String,
    pub request: Value,
    pub response: Value,
    pub error: Option<ErrorKind>,
}

/// Validator with scripted replies; unscripted calls accept
#[derive(Default)]
pub struct RecordingValidator {
    replies: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<ValidationCall>>,
}

impl RecordingValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_diff(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(message.to_string()));
        self
    }

    pub fn with_accept(self) -> Self {
        self.replies.lock().unwrap().push_back(Ok(String::new()));
        self
    }

    pub fn with_failure(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<ValidationCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Validator for RecordingValidator {
    async fn validate(
        &self,
        container_id: &str,
        request: &Value,
        response: &Value,
        error: Option<&dyn ServiceError>,
    ) -> Result<String, BoxError> {
        self.calls.lock().unwrap().push(ValidationCall {
            container_id: container_id.to_string(),
            request: request.clone(),
            response: response.clone(),
            error: error.map(|e| e.kind()),
        });
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(message)) => Ok(message),
            Some(Err(message)) => Err(message.into()),
            None => Ok(String::new()),
        }
    }
}

/// Reference store wrapper that counts fetches
pub struct CountingStore<S> {
    inner: S,
    fetches: AtomicUsize,
}

impl<S> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: ReferenceDataStore> ReferenceDataStore for CountingStore<S> {
    async fn get_requests(&self, key: &OperationKey) -> Result<Vec<u8>, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.get_requests(key).await
    }
}

/// In-memory log writer for asserting on formatted tracing output
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
