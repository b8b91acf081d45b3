//! Scenario runner
//!
//! Runs one operation end to end: gate, client, recorded batch, then each
//! request in recorded order through the SDK and the validator. A panic in
//! a request scope fails that request only.

use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument::WithSubscriber;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::harness::Harness;
use crate::error::HarnessError;
use crate::gate;
use crate::loader::{load_requests, LoaderOptions, TypedRequestInfo};
use crate::models::{FailureKind, OperationSpec, RequestResult, ScenarioReport, ScenarioStatus};
use crate::pagination::{ListReplayer, PaginationError};
use crate::retry::retry_token;
use crate::sdk::{
    ClientFactory, ContextError, ExecutionContext, PaginatedRequest, PaginatedResponse,
    SdkRequest, ServiceClient, ServiceError,
};

/// What a single SDK invocation produced
enum Outcome {
    Completed {
        response: Value,
        error: Option<Box<dyn ServiceError>>,
        pages: Option<usize>,
    },
    Cancelled(ContextError),
    Encode(String),
}

impl Outcome {
    fn completed<T: Serialize + ?Sized>(
        response: Option<&T>,
        error: Option<Box<dyn ServiceError>>,
        pages: Option<usize>,
    ) -> Self {
        let response = match response.map(serde_json::to_value).transpose() {
            Ok(value) => value.unwrap_or(Value::Null),
            Err(err) => return Outcome::Encode(format!("failed to encode response: {err}")),
        };
        Outcome::Completed {
            response,
            error,
            pages,
        }
    }
}

/// Runs scenarios against one harness and execution context
#[derive(Clone)]
pub struct ScenarioRunner {
    harness: Harness,
    ctx: ExecutionContext,
}

impl ScenarioRunner {
    pub fn new(harness: Harness, ctx: ExecutionContext) -> Self {
        Self { harness, ctx }
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    /// Run a unary operation
    ///
    /// `call` invokes the client method once per recorded request. Gate,
    /// client construction and loading failures abort the scenario.
    pub async fn run_unary<C, F, R, T, E, Call, Fut>(
        &self,
        spec: &OperationSpec,
        factory: &F,
        call: Call,
    ) -> Result<ScenarioReport, HarnessError>
    where
        C: ServiceClient,
        F: ClientFactory<C> + ?Sized,
        R: SdkRequest + Serialize + DeserializeOwned + Default,
        T: Serialize,
        E: ServiceError,
        Call: Fn(Arc<C>, ExecutionContext, R) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let ctx = &self.ctx;
        let call = &call;
        let exec = move |client: Arc<C>, request: R| async move {
            match ctx.run(call(client, ctx.clone(), request)).await {
                Err(err) => Outcome::Cancelled(err),
                Ok(Ok(response)) => Outcome::completed(Some(&response), None, None),
                Ok(Err(err)) => match ctx.check() {
                    Err(done) => Outcome::Cancelled(done),
                    Ok(()) => {
                        let err = Box::new(err) as Box<dyn ServiceError>;
                        Outcome::completed(None::<&T>, Some(err), None)
                    }
                },
            }
        };
        self.scoped(spec, self.drive(spec, factory, exec)).await
    }

    /// Run a paginated list operation
    ///
    /// Every recorded request seeds a replay; the validator sees the pages
    /// collected, plus the error that stopped the replay early, if any.
    pub async fn run_paginated<C, F, R, T, E, Call, Fut>(
        &self,
        spec: &OperationSpec,
        factory: &F,
        call: Call,
    ) -> Result<ScenarioReport, HarnessError>
    where
        C: ServiceClient,
        F: ClientFactory<C> + ?Sized,
        R: PaginatedRequest + Serialize + DeserializeOwned + Default,
        T: PaginatedResponse + Serialize,
        E: ServiceError,
        Call: Fn(Arc<C>, ExecutionContext, R) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let ctx = &self.ctx;
        let call = &call;
        let replayer = ListReplayer::new(self.harness.settings().max_pages);
        let exec = move |client: Arc<C>, request: R| async move {
            let pages = replayer
                .replay(ctx, &request, |page| call(client.clone(), ctx.clone(), page))
                .await;
            let count = Some(pages.len());
            match pages.error {
                None => Outcome::completed(Some(&pages.responses), None, count),
                Some(PaginationError::Context(err)) => Outcome::Cancelled(err),
                Some(PaginationError::Invoke { error, .. }) => match ctx.check() {
                    Err(done) => Outcome::Cancelled(done),
                    Ok(()) => {
                        let error = Box::new(error) as Box<dyn ServiceError>;
                        Outcome::completed(Some(&pages.responses), Some(error), count)
                    }
                },
            }
        };
        self.scoped(spec, self.drive(spec, factory, exec)).await
    }

    /// Attach the scenario span and, when configured, the log sink
    async fn scoped<Fut: Future>(&self, spec: &OperationSpec, fut: Fut) -> Fut::Output {
        let scenario = async {
            let span = info_span!(
                "scenario",
                service = %spec.service(),
                operation = %spec.operation()
            );
            fut.instrument(span).await
        };
        match self.harness.log_sink() {
            Some(dispatch) => scenario.with_subscriber(dispatch.clone()).await,
            None => scenario.await,
        }
    }

    async fn drive<C, F, R, Exec, Fut>(
        &self,
        spec: &OperationSpec,
        factory: &F,
        exec: Exec,
    ) -> Result<ScenarioReport, HarnessError>
    where
        C: ServiceClient,
        F: ClientFactory<C> + ?Sized,
        R: SdkRequest + Serialize + DeserializeOwned + Default,
        Exec: Fn(Arc<C>, R) -> Fut,
        Fut: Future<Output = Outcome>,
    {
        let start = Instant::now();
        let key = spec.key.clone();
        info!("Running {}", spec);

        let Some((client, requests)) = self.prepare::<C, F, R>(spec, factory).await? else {
            info!("{} is not enabled, skipping", key);
            return Ok(ScenarioReport::skipped(key, "operation is not enabled"));
        };

        let mut results = Vec::with_capacity(requests.len());
        let mut interrupted = None;

        for (index, info) in requests.into_iter().enumerate() {
            if let Err(err) = self.ctx.check() {
                interrupted = Some(err);
                break;
            }

            let result = self
                .run_request(index, info, |request| exec(client.clone(), request))
                .await;
            debug!("  {}", result);

            let cancelled = result.failure == Some(FailureKind::Cancelled);
            results.push(result);
            if cancelled {
                interrupted = self.ctx.check().err().or(Some(ContextError::Cancelled));
                break;
            }
        }

        let report = match interrupted {
            Some(err) => {
                warn!("{} interrupted after {} request(s): {}", key, results.len(), err);
                ScenarioReport::new(key, ScenarioStatus::Cancelled, results)
                    .with_reason(err.to_string())
            }
            None => ScenarioReport::new(key, ScenarioStatus::Completed, results),
        };
        let report = report.with_duration(start.elapsed().as_millis() as u64);

        info!(
            "{} completed in {}ms - Pass: {}/{} ({:.1}%)",
            report.key,
            report.total_duration_ms,
            report.passed,
            report.total,
            report.pass_rate()
        );
        Ok(report)
    }

    /// Gate, client and recorded requests; `None` when the gate says no
    async fn prepare<C, F, R>(
        &self,
        spec: &OperationSpec,
        factory: &F,
    ) -> Result<Option<(Arc<C>, Vec<TypedRequestInfo<R>>)>, HarnessError>
    where
        C: ServiceClient,
        F: ClientFactory<C> + ?Sized,
        R: Serialize + DeserializeOwned + Default,
    {
        let harness = &self.harness;
        if !gate::is_enabled(harness.registry(), &spec.key).await? {
            return Ok(None);
        }

        let client = gate::create_client_for_operation(
            spec,
            factory,
            harness.provider(),
            harness.testing(),
        )?;

        let body = harness
            .store()
            .get_requests(&spec.key)
            .await
            .map_err(|source| HarnessError::ReferenceData {
                key: spec.key.clone(),
                source,
            })?;

        let options = LoaderOptions::new(harness.settings().unknown_fields);
        let requests =
            load_requests(&body, &spec.key, &options).map_err(|source| HarnessError::Load {
                key: spec.key.clone(),
                source,
            })?;

        Ok(Some((Arc::new(client), requests)))
    }

    /// One request inside the panic trap
    async fn run_request<R, Exec, Fut>(
        &self,
        index: usize,
        info: TypedRequestInfo<R>,
        exec: Exec,
    ) -> RequestResult
    where
        R: SdkRequest + Serialize,
        Exec: FnOnce(R) -> Fut,
        Fut: Future<Output = Outcome>,
    {
        let start = Instant::now();
        let container_id = info.container_id;
        let request = info.request;

        let scope = async {
            let mut request = request;
            self.install_retry(&mut request);
            let request_json = match serde_json::to_value(&request) {
                Ok(value) => value,
                Err(err) => {
                    return RequestResult::error(
                        index,
                        container_id.as_str(),
                        FailureKind::Encode,
                        format!("failed to encode request: {err}"),
                    )
                }
            };
            let outcome = exec(request).await;
            self.judge(index, &container_id, &request_json, outcome).await
        };

        let result = match AssertUnwindSafe(scope).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("request:{} ({}) panicked: {}", index, container_id, message);
                RequestResult::error(
                    index,
                    container_id.as_str(),
                    FailureKind::Panic,
                    format!("panicked: {message}"),
                )
            }
        };
        result.with_duration(start.elapsed().as_millis() as u64)
    }

    fn install_retry<R: SdkRequest>(&self, request: &mut R) {
        let settings = self.harness.settings();
        request.set_retry_policy(settings.retry_policy());
        if settings.retries_enabled
            && request.accepts_retry_token()
            && request.retry_token().is_none()
        {
            request.set_retry_token(retry_token());
        }
    }

    async fn judge(
        &self,
        index: usize,
        container_id: &str,
        request: &Value,
        outcome: Outcome,
    ) -> RequestResult {
        let (response, error, pages) = match outcome {
            Outcome::Completed {
                response,
                error,
                pages,
            } => (response, error, pages),
            Outcome::Cancelled(err) => {
                warn!("request:{} ({}) cancelled: {}", index, container_id, err);
                return RequestResult::error(
                    index,
                    container_id,
                    FailureKind::Cancelled,
                    err.to_string(),
                );
            }
            Outcome::Encode(message) => {
                error!("request:{} ({}): {}", index, container_id, message);
                return RequestResult::error(
                    index,
                    container_id,
                    FailureKind::Encode,
                    message,
                );
            }
        };

        if let Some(err) = &error {
            debug!("request:{} SDK call failed ({}): {}", index, err.kind(), err);
        }

        let verdict = self
            .harness
            .validator()
            .validate(container_id, request, &response, error.as_deref())
            .await;

        let result = match verdict {
            Ok(message) if message.is_empty() => RequestResult::pass(index, container_id, 0),
            Ok(message) => RequestResult::fail(index, container_id, 0, message),
            Err(err) => {
                error!("request:{} validator failed: {}", index, err);
                RequestResult::error(index, container_id, FailureKind::Validator, err.to_string())
            }
        };
        result.with_pages(pages)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
