//! Middleware pipeline — composable before/after request handler logic.
//!
//! A [`Pipeline`] is an ordered middleware stack terminated by a single endpoint
//! handler. Each middleware wraps the next layer, enabling request inspection,
//! short-circuit responses (a cache hit), and response decoration (a cache
//! write-back) without coupling handlers to infrastructure concerns.
//!
//! ## Core types
//!
//! - [`Middleware`] — trait implemented by all middleware.
//! - [`Next`] — cursor into the remaining middleware chain; call [`Next::run`] to
//!   advance to the next layer.
//! - [`MiddlewareHandler`] — type-erased, cheaply-cloneable middleware function.
//! - [`Pipeline`] / [`PipelineBuilder`] — assemble and drive a stack.
//! - [`LoggerMiddleware`] — built-in request/response logger.
//!
//! ## Faults
//!
//! Middleware returns `Result<Response, BoxError>`. A fault is not converted
//! into a response by the layer that raised it; it travels outward through every
//! enclosing layer up to [`Pipeline::respond`], which logs it and answers
//! `500 Internal Server Error`.

use std::{future::Future, pin::Pin, sync::Arc};

use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::{Request, Response, StatusCode, context::Context};

/// A fault raised somewhere in the pipeline.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The boxed future every middleware returns.
pub type MiddlewareFuture = Pin<Box<dyn Future<Output = Result<Response, BoxError>> + Send>>;

/// A type-erased, reference-counted middleware function.
///
/// Every entry in the middleware stack is stored as a `MiddlewareHandler`.
/// The [`Arc`] wrapper makes handlers cheap to clone so that [`Next`] can
/// advance through the chain without copying closures.
pub type MiddlewareHandler = Arc<dyn Fn(Context, Next) -> MiddlewareFuture + Send + Sync + 'static>;

/// Converts a [`Middleware`] implementation into a [`MiddlewareHandler`].
pub fn from_middleware<M>(middleware: Arc<M>) -> MiddlewareHandler
where
    M: Middleware + 'static,
{
    Arc::new(move |ctx: Context, next: Next| middleware.handle(ctx, next))
}

/// A cursor into the remaining middleware chain for a single request.
///
/// `Next` is consumed on each call to [`run`](Self::run), so it cannot be called
/// more than once per middleware invocation.
pub struct Next {
    middlewares: Arc<[MiddlewareHandler]>,
    // Tracks which middleware to invoke on the next `run` call.
    index: usize,
}

impl Next {
    /// Creates a new `Next` positioned at the start of the given middleware stack.
    pub fn new(middlewares: Arc<[MiddlewareHandler]>) -> Self {
        Self {
            middlewares,
            index: 0,
        }
    }

    /// Invokes the next middleware in the chain and returns its result.
    ///
    /// If no handler remains (the chain is exhausted without producing a
    /// response), a `500 Internal Server Error` response is returned as a safe
    /// fallback.
    pub async fn run(mut self, ctx: Context) -> Result<Response, BoxError> {
        match self.middlewares.get(self.index).cloned() {
            Some(handler) => {
                self.index += 1;
                handler(ctx, self).await
            }
            None => Ok(Response::new(StatusCode::InternalServerError)
                .body("No response generated by middleware pipeline")),
        }
    }
}

/// The core trait for all middleware.
///
/// Implementors receive a [`Context`] and a [`Next`] cursor. They may:
///
/// - **Pass through** — call `next.run(ctx).await` without modification.
/// - **Short-circuit** — return a [`Response`] directly without calling `next`.
/// - **Decorate** — call `next.run(ctx).await`, inspect the response, and return
///   it, possibly modified.
/// - **Fail** — return `Err`; the fault propagates to [`Pipeline::respond`].
///
/// Implementations **must** be `Send + Sync` because middleware is shared across
/// Tokio tasks, and **should not** hold locks across an `.await` point.
pub trait Middleware: Send + Sync {
    /// Handle the request and optionally delegate to the next middleware.
    fn handle(&self, ctx: Context, next: Next) -> MiddlewareFuture;
}

/// Collects middleware in execution order, then seals the stack with an endpoint.
///
/// The first middleware added is the outermost layer: it sees the request first
/// and the response last.
#[derive(Default)]
pub struct PipelineBuilder {
    middlewares: Vec<MiddlewareHandler>,
}

impl PipelineBuilder {
    /// Appends a middleware layer.
    #[must_use]
    pub fn with<M>(mut self, middleware: M) -> Self
    where
        M: Middleware + 'static,
    {
        self.middlewares.push(from_middleware(Arc::new(middleware)));
        self
    }

    /// Terminates the stack with `handler` and builds the pipeline.
    ///
    /// The handler is the innermost layer; it never sees a [`Next`].
    pub fn handler<H, F>(mut self, handler: H) -> Pipeline
    where
        H: Fn(Context) -> F + Send + Sync + 'static,
        F: Future<Output = Response> + Send + 'static,
    {
        let endpoint: MiddlewareHandler = Arc::new(move |ctx: Context, _next: Next| {
            let response = handler(ctx);
            let fut: MiddlewareFuture = Box::pin(async move { Ok::<_, BoxError>(response.await) });
            fut
        });
        self.middlewares.push(endpoint);

        Pipeline {
            stack: self.middlewares.into(),
        }
    }
}

/// An immutable, cheaply-cloneable middleware stack ending in an endpoint handler.
///
/// # Examples
///
/// ```rust,no_run
/// use rttp_cache::{Response, StatusCode};
/// use rttp_cache::middleware::{LoggerMiddleware, Pipeline};
///
/// let pipeline = Pipeline::builder()
///     .with(LoggerMiddleware)
///     .handler(|_ctx| async { Response::new(StatusCode::Ok).body("hello") });
/// ```
#[derive(Clone)]
pub struct Pipeline {
    stack: Arc<[MiddlewareHandler]>,
}

impl Pipeline {
    /// Starts an empty [`PipelineBuilder`].
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Drives `request` through the stack, surfacing any fault to the caller.
    pub async fn handle(&self, request: Request) -> Result<Response, BoxError> {
        Next::new(Arc::clone(&self.stack))
            .run(Context::new(request))
            .await
    }

    /// Top-level fault handler: drives `request` through the stack and turns
    /// a fault into a logged `500 Internal Server Error`.
    pub async fn respond(&self, request: Request) -> Response {
        let method = request.method().clone();
        let path = request.path().to_owned();

        match self.handle(request).await {
            Ok(response) => response,
            Err(e) => {
                error!(%method, %path, error = %e, "request failed in middleware pipeline");
                Response::new(StatusCode::InternalServerError).body("Internal Server Error")
            }
        }
    }
}

/// Built-in middleware that logs each request's method, path, status, and duration.
///
/// Emits a single `tracing::info!` line after the downstream handler completes,
/// or a `tracing::warn!` line when a fault passes through it.
pub struct LoggerMiddleware;

impl Middleware for LoggerMiddleware {
    fn handle(&self, ctx: Context, next: Next) -> MiddlewareFuture {
        Box::pin(async move {
            let start = Instant::now();
            let method = ctx.request().method().as_str().to_string();
            let path = ctx.request().path().to_string();

            let result = next.run(ctx).await;
            let duration = start.elapsed();

            match &result {
                Ok(response) => {
                    info!("{} {} - {} ({:?})", method, path, response.status().as_u16(), duration)
                }
                Err(e) => warn!("{} {} - fault: {} ({:?})", method, path, e, duration),
            }

            result
        })
    }
}
