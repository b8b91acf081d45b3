//! List replayer
//!
//! Drives a list operation across its pages. Each call gets its own copy
//! of the seed request with the page cursor taken from the previous
//! response; the seed itself is never touched.

use std::future::Future;
use thiserror::Error;
use tracing::{debug, warn};

use crate::sdk::{
    ContextError, ErrorKind, ExecutionContext, PaginatedRequest, PaginatedResponse, ServiceError,
};

/// Page ceiling guarding against servers that never stop paging
pub const DEFAULT_MAX_PAGES: usize = 50;

#[derive(Error, Debug)]
pub enum PaginationError<E> {
    /// Invoking page `page` (1-based) failed
    #[error("page {page} failed: {error}")]
    Invoke { page: usize, error: E },

    /// Context ended before or during a page
    #[error("{0}")]
    Context(ContextError),
}

impl<E: ServiceError> ServiceError for PaginationError<E> {
    fn kind(&self) -> ErrorKind {
        match self {
            PaginationError::Invoke { error, .. } => error.kind(),
            PaginationError::Context(err) => err.kind(),
        }
    }
}

/// Pages collected by a replay, in server order
#[derive(Debug)]
pub struct Pages<T, E> {
    pub responses: Vec<T>,
    /// Set when the replay stopped early
    pub error: Option<PaginationError<E>>,
    /// Replay stopped at the ceiling while the server still had a cursor
    pub reached_ceiling: bool,
}

impl<T, E> Pages<T, E> {
    fn finished(responses: Vec<T>, reached_ceiling: bool) -> Self {
        Self {
            responses,
            error: None,
            reached_ceiling,
        }
    }

    fn failed(responses: Vec<T>, error: PaginationError<E>) -> Self {
        Self {
            responses,
            error: Some(error),
            reached_ceiling: false,
        }
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ListReplayer {
    max_pages: usize,
}

impl Default for ListReplayer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAGES)
    }
}

impl ListReplayer {
    pub fn new(max_pages: usize) -> Self {
        Self {
            max_pages: max_pages.max(1),
        }
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// Invoke `seed` and its follow-up pages until the cursor runs out
    ///
    /// An invocation error or a done context stops the replay; the pages
    /// collected so far are returned alongside the error.
    pub async fn replay<Req, Resp, E, F, Fut>(
        &self,
        ctx: &ExecutionContext,
        seed: &Req,
        mut invoke: F,
    ) -> Pages<Resp, E>
    where
        Req: PaginatedRequest,
        Resp: PaginatedResponse,
        F: FnMut(Req) -> Fut,
        Fut: Future<Output = Result<Resp, E>>,
    {
        let mut responses = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = responses.len() + 1;
            let mut request = seed.clone();
            if let Some(token) = cursor.take() {
                request.set_page(Some(token));
            }

            let response = match ctx.run(invoke(request)).await {
                Ok(Ok(response)) => response,
                Ok(Err(error)) => {
                    debug!(page, "Page invocation failed");
                    return Pages::failed(responses, PaginationError::Invoke { page, error });
                }
                Err(err) => {
                    debug!(page, error = %err, "Replay interrupted");
                    return Pages::failed(responses, PaginationError::Context(err));
                }
            };

            let next = response
                .next_page()
                .filter(|token| !token.is_empty())
                .map(str::to_string);
            responses.push(response);

            match next {
                None => {
                    debug!(pages = responses.len(), "Replay finished");
                    return Pages::finished(responses, false);
                }
                Some(_) if responses.len() >= self.max_pages => {
                    warn!(
                        pages = responses.len(),
                        "Page ceiling reached with a cursor still pending"
                    );
                    return Pages::finished(responses, true);
                }
                Some(token) => cursor = Some(token),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::fake::{FakeClient, FakeError, ListWidgetsRequest, ListWidgetsResponse};

    fn seed() -> ListWidgetsRequest {
        ListWidgetsRequest {
            compartment_id: "ocid1.compartment.test".to_string(),
            limit: Some(2),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_single_page() {
        let client = FakeClient::new();
        client.script_page(Ok(ListWidgetsResponse::page(&["w1"], Some(""))));
        let ctx = ExecutionContext::background();

        let pages = ListReplayer::default()
            .replay(&ctx, &seed(), |req| client.list_widgets(ctx.clone(), req))
            .await;

        assert!(pages.is_complete());
        assert_eq!(pages.len(), 1);
        assert_eq!(client.list_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_follows_cursor_in_order() {
        let client = FakeClient::new();
        client.script_page(Ok(ListWidgetsResponse::page(&["w1", "w2"], Some("t2"))));
        client.script_page(Ok(ListWidgetsResponse::page(&["w3", "w4"], Some("t3"))));
        client.script_page(Ok(ListWidgetsResponse::page(&["w5"], None)));
        let ctx = ExecutionContext::background();
        let seed = seed();

        let pages = ListReplayer::default()
            .replay(&ctx, &seed, |req| client.list_widgets(ctx.clone(), req))
            .await;

        assert!(pages.is_complete());
        assert!(!pages.reached_ceiling);
        let ids: Vec<_> = pages
            .responses
            .iter()
            .flat_map(|page| page.items.iter().map(|w| w.id.as_str()))
            .collect();
        assert_eq!(ids, ["w1", "w2", "w3", "w4", "w5"]);

        let cursors: Vec<_> = client.list_calls().into_iter().map(|req| req.page).collect();
        assert_eq!(cursors, [None, Some("t2".to_string()), Some("t3".to_string())]);
        assert!(seed.page.is_none());
    }

    #[tokio::test]
    async fn test_seed_cursor_kept_for_first_call() {
        let client = FakeClient::new();
        let ctx = ExecutionContext::background();
        let mut seed = seed();
        seed.page = Some("recorded".to_string());

        ListReplayer::default()
            .replay(&ctx, &seed, |req| client.list_widgets(ctx.clone(), req))
            .await;

        assert_eq!(client.list_calls()[0].page.as_deref(), Some("recorded"));
        assert_eq!(seed.page.as_deref(), Some("recorded"));
    }

    #[tokio::test]
    async fn test_error_returns_collected_pages() {
        let client = FakeClient::new();
        client.script_page(Ok(ListWidgetsResponse::page(&["w1"], Some("t2"))));
        client.script_page(Err(FakeError::service(500)));
        let ctx = ExecutionContext::background();

        let pages = ListReplayer::default()
            .replay(&ctx, &seed(), |req| client.list_widgets(ctx.clone(), req))
            .await;

        assert_eq!(pages.len(), 1);
        match pages.error {
            Some(PaginationError::Invoke { page, ref error }) => {
                assert_eq!(page, 2);
                assert_eq!(error.kind(), ErrorKind::service(500));
            }
            ref other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fixed_cursor_stops_at_ceiling() {
        let ctx = ExecutionContext::background();
        let mut calls = 0;

        let pages: Pages<ListWidgetsResponse, FakeError> = ListReplayer::new(5)
            .replay(&ctx, &seed(), |_req| {
                calls += 1;
                async { Ok(ListWidgetsResponse::page(&["w"], Some("same"))) }
            })
            .await;

        assert!(pages.is_complete());
        assert!(pages.reached_ceiling);
        assert_eq!(pages.len(), 5);
        assert_eq!(calls, 5);
    }

    #[tokio::test]
    async fn test_cancellation_between_pages() {
        let (ctx, handle) = ExecutionContext::with_cancel();
        let client = FakeClient::new();
        client.script_page(Ok(ListWidgetsResponse::page(&["w1"], Some("t2"))));
        client.script_page(Ok(ListWidgetsResponse::page(&["w2"], None)));

        let pages = ListReplayer::default()
            .replay(&ctx, &seed(), |req| {
                let call = client.list_widgets(ctx.clone(), req);
                handle.cancel();
                call
            })
            .await;

        assert_eq!(pages.len(), 0);
        assert!(matches!(
            pages.error,
            Some(PaginationError::Context(ContextError::Cancelled))
        ));
        assert!(client.list_calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_after_first_page() {
        let (ctx, handle) = ExecutionContext::with_cancel();
        let client = FakeClient::new();
        client.script_page(Ok(ListWidgetsResponse::page(&["w1"], Some("t2"))));
        client.script_page(Ok(ListWidgetsResponse::page(&["w2"], None)));
        let mut page = 0;

        let pages = ListReplayer::default()
            .replay(&ctx, &seed(), |req| {
                page += 1;
                if page == 2 {
                    handle.cancel();
                }
                client.list_widgets(ctx.clone(), req)
            })
            .await;

        assert_eq!(pages.len(), 1);
        assert!(matches!(
            pages.error,
            Some(PaginationError::Context(ContextError::Cancelled))
        ));
        assert_eq!(client.list_calls().len(), 1);
    }
}
