//! The handler contract and the pre-defined middleware.
//!
//! Every unit of request-handling behavior in this crate — route handlers,
//! filters, the built-in cookie/static/auth helpers — is a [`Middleware`]:
//! an async callable that may mutate the request and the response builder.
//! Middleware do not return responses; they record everything on the
//! [`crate::ResponseBuilder`], and signal completion by submitting it.
//!
//! ```rust
//! # #[tokio::main] async fn main() -> Result<(), anyhow::Error> {
//! let mut http = shunt::router();
//! http.get("/home", shunt::middleware::sync(|_req, res| {
//!     res.send("hello, there!");
//!     Ok(())
//! }));
//! # Ok(())
//! # }
//! ```

mod basic_auth;
mod chain;
mod cookies;
mod static_files;

pub use self::basic_auth::BasicAuth;
pub use self::chain::{Chain, IntoChain};
pub use self::cookies::{CookieJar, CookieMiddleware};
pub use self::static_files::StaticFiles;
use crate::{Request, ResponseBuilder};
use futures::future::BoxFuture;

#[async_trait]
/// An HTTP request handler.
///
/// A middleware receives the request and the in-progress response builder,
/// and may mutate either.  Execution of the surrounding chain and of the
/// route scan stops once the builder has been submitted (or the request
/// upgraded); a middleware that returns without submitting simply passes
/// control to the next handler in line.
///
/// Errors returned from a middleware are not interpreted by the dispatch
/// engine; they propagate out of [`crate::Router::handle`] untouched, and it
/// is the embedder's decision what to make of them.  The bundled listener
/// turns them into an empty 500.
pub trait Middleware: Send + Sync + 'static {
    /// Handles the given request, mutating the response builder as needed.
    async fn call(
        &self,
        request: &mut Request,
        response: &mut ResponseBuilder,
    ) -> Result<(), anyhow::Error>;

    #[doc(hidden)]
    fn describe(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", std::any::type_name::<Self>())
    }
}

impl std::fmt::Debug for dyn Middleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.describe(f)
    }
}

/// Creates a middleware that handles the request synchronously.
///
/// This does not spawn a blocking task; any middleware built from this should
/// not block the task in its processing.  This is the right tool for handlers
/// that inspect the request and record a response without waiting on
/// anything.
///
/// # Examples
/// ```rust
/// # #[tokio::main] async fn main() -> Result<(), anyhow::Error> {
/// let mut http = shunt::router();
/// http.get("/ping", shunt::middleware::sync(|_req, res| {
///     res.send("pong");
///     Ok(())
/// }));
/// # Ok(())
/// # }
/// ```
pub fn sync<F>(func: F) -> impl Middleware
where
    F: Fn(&mut Request, &mut ResponseBuilder) -> Result<(), anyhow::Error>
        + Send
        + Sync
        + 'static,
{
    SyncFn(func)
}

/// Creates a middleware from a function returning a boxed future.
///
/// Use this when the handler has to wait on something — a file check, an
/// upstream call — before it can finish.  The future borrows the request and
/// response for the duration of the call.
///
/// # Examples
/// ```rust
/// # #[tokio::main] async fn main() -> Result<(), anyhow::Error> {
/// let mut http = shunt::router();
/// http.get("/slow", shunt::middleware::async_fn(|_req, res| {
///     Box::pin(async move {
///         tokio::task::yield_now().await;
///         res.send("eventually");
///         Ok(())
///     })
/// }));
/// # Ok(())
/// # }
/// ```
pub fn async_fn<F>(func: F) -> impl Middleware
where
    F: for<'a> Fn(
            &'a mut Request,
            &'a mut ResponseBuilder,
        ) -> BoxFuture<'a, Result<(), anyhow::Error>>
        + Send
        + Sync
        + 'static,
{
    AsyncFn(func)
}

struct SyncFn<F>(F);

#[async_trait]
impl<F> Middleware for SyncFn<F>
where
    F: Fn(&mut Request, &mut ResponseBuilder) -> Result<(), anyhow::Error>
        + Send
        + Sync
        + 'static,
{
    async fn call(
        &self,
        request: &mut Request,
        response: &mut ResponseBuilder,
    ) -> Result<(), anyhow::Error> {
        (self.0)(request, response)
    }
}

struct AsyncFn<F>(F);

#[async_trait]
impl<F> Middleware for AsyncFn<F>
where
    F: for<'a> Fn(
            &'a mut Request,
            &'a mut ResponseBuilder,
        ) -> BoxFuture<'a, Result<(), anyhow::Error>>
        + Send
        + Sync
        + 'static,
{
    async fn call(
        &self,
        request: &mut Request,
        response: &mut ResponseBuilder,
    ) -> Result<(), anyhow::Error> {
        (self.0)(request, response).await
    }
}
