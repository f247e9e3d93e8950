//! Shunt is a small, ordered-scan HTTP router and middleware toolkit built
//! on hyper.  Routes are tried strictly in the order they were registered,
//! wildcard path segments capture positional parameters, and every matching
//! route acts as middleware for the ones after it until a handler submits
//! the response.
//!
//! # Getting Started
//! To get started, just add shunt and tokio to your `Cargo.toml`:
//!
//! ```toml
//! shunt = "0.1.0"
//! tokio = { version = "1.26.0", features = ["full"] } # or whatever the latest version is
//! ```
//!
//! # Examples
//! ```rust,no_run
//! #[tokio::main]
//! async fn main() -> Result<(), anyhow::Error> {
//!     let mut http = shunt::router();
//!     http.get("/", shunt::middleware::sync(|_req, res| {
//!         res.send("hello, world!");
//!         Ok(())
//!     }));
//!     http.get("/echo/**", shunt::middleware::sync(|req, res| {
//!         res.send(req.path_params().join("/"));
//!         Ok(())
//!     }));
//!     http.listen("0.0.0.0:8080").await?;
//!     Ok(())
//! }
//! ```
#![warn(missing_debug_implementations, missing_docs, rust_2018_idioms)]
#![deny(clippy::correctness, unused_must_use)]

#[macro_use]
extern crate async_trait;

mod error;
pub mod middleware;
mod request;
mod response;
mod router;

pub use self::error::RouterError;
pub use self::middleware::{Chain, IntoChain, Middleware};
pub use self::request::Request;
pub use self::response::{BeforeSent, Response, ResponseBuilder};
pub use self::router::{split_path, PathMatch, RoutePath, Router, Segment, ServerHandle};

pub use ::http;
pub use cookie::{Cookie, SameSite};
pub use hyper::Body;

/// A type alias for [`std::result::Result`].
///
/// The most common use-case for this type is handlers, which mutate the
/// response builder and return `Ok(())`, or bail with any error.
///
/// # Examples
/// ```rust
/// fn handle(
///     _req: &mut shunt::Request,
///     res: &mut shunt::ResponseBuilder,
/// ) -> shunt::Result {
///     res.send("hello, world!");
///     Ok(())
/// }
///
/// # fn main() {
/// let mut http = shunt::router();
/// http.get("/", shunt::middleware::sync(handle));
/// # }
/// ```
pub type Result<R = (), E = anyhow::Error> = std::result::Result<R, E>;

#[must_use]
#[inline]
/// This creates a new HTTP router.  This is a shortcut for
/// [`Router::default`].
pub fn router() -> Router {
    Router::default()
}
