//! Responses for requests that fail CSRF validation

use async_trait::async_trait;
use palisade_core::{Error, HttpRequest, HttpResponse, Next};

/// Body of the default rejection response
pub const DEFAULT_FAILURE_BODY: &str = "Failed CSRF check!";

/// Produces the response for a request whose token pair did not validate.
///
/// The request already carries a freshly issued pair in its attributes, so a
/// handler that renders a form again can embed it for the retry. `next` is the
/// rest of the chain; most handlers drop it, but a handler may choose to
/// continue (for example to log and pass through in a report-only rollout).
#[async_trait]
pub trait FailureHandler: Send + Sync {
    async fn on_failure(&self, req: HttpRequest, next: Next) -> Result<HttpResponse, Error>;
}

/// `400 Bad Request`, `text/plain`, `Failed CSRF check!`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFailureHandler;

#[async_trait]
impl FailureHandler for DefaultFailureHandler {
    async fn on_failure(&self, _req: HttpRequest, _next: Next) -> Result<HttpResponse, Error> {
        Ok(HttpResponse::bad_request().with_text(DEFAULT_FAILURE_BODY))
    }
}

/// Adapts a synchronous closure into a [`FailureHandler`].
///
/// ```
/// use palisade_core::HttpResponse;
/// use palisade_csrf::FailureHandlerFn;
///
/// let handler = FailureHandlerFn::new(|_req| HttpResponse::forbidden().with_text("denied"));
/// ```
pub struct FailureHandlerFn<F> {
    f: F,
}

impl<F> FailureHandlerFn<F>
where
    F: Fn(HttpRequest) -> HttpResponse + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> FailureHandler for FailureHandlerFn<F>
where
    F: Fn(HttpRequest) -> HttpResponse + Send + Sync,
{
    async fn on_failure(&self, req: HttpRequest, _next: Next) -> Result<HttpResponse, Error> {
        Ok((self.f)(req))
    }
}
