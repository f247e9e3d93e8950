mod path;
mod route;
mod service;

pub use self::path::{split_path, PathMatch, RoutePath, Segment};
pub(crate) use self::route::Route;
pub use self::service::ServerHandle;
use crate::middleware::{self, BasicAuth, Chain, CookieMiddleware, IntoChain, StaticFiles};
use crate::response::NOT_FOUND_BODY;
use crate::{Request, Response, ResponseBuilder, RouterError};
use std::path::PathBuf;

/// An HTTP router.
///
/// This is an ordered table of routes, where each route is a method filter,
/// a compiled path selector, and a chain of handlers.  Dispatch is a linear
/// scan: every route is tried in registration order, and every route that
/// matches runs — handlers act as middleware for the routes after them —
/// until one of them submits the response (or upgrades the connection).
/// Reaching the end of the table without a submission produces the default
/// "not found" response.
///
/// Registrations to the same method and path back to back fuse into a single
/// route: the new handlers are spliced onto the end of the previous route's
/// chain.  Only the immediately preceding route is considered, so
/// interleaving a different path breaks the run.
///
/// The table is built up front and then treated as read-only; [`handle`]
/// takes `&self`, and nothing about dispatch mutates the table.
///
/// [`handle`]: Router::handle
///
/// # Examples
/// ```rust
/// # #[tokio::main] async fn main() -> Result<(), anyhow::Error> {
/// let mut http = shunt::router();
/// http.get("/", shunt::middleware::sync(|_req, res| {
///     res.send("hello, world!");
///     Ok(())
/// }));
/// let response = http.handle(shunt::Request::get("/")?).await?.unwrap();
/// assert_eq!(response.status(), http::StatusCode::OK);
/// # Ok(())
/// # }
/// ```
pub struct Router {
    routes: Vec<Route>,
    merge_handlers: bool,
}

impl Default for Router {
    fn default() -> Self {
        Router {
            routes: vec![],
            merge_handlers: true,
        }
    }
}

macro_rules! method {
    ($($(#[$m:meta])* $v:vis fn $n:ident = $meth:expr;)+) => {
        $(
            $(#[$m])* $v fn $n<C: IntoChain>(&mut self, path: &str, handlers: C) -> &mut Self {
                match self.register(Some($meth), path, handlers) {
                    Ok(router) => router,
                    Err(error) => panic!("{}", error),
                }
            }
        )+
    };
}

impl Router {
    /// Registers a route.  This is the fallible core that all the per-method
    /// registration methods funnel into; `method` of `None` accepts every
    /// request method.
    ///
    /// If the immediately preceding route has the same method and the same
    /// path, the two registrations fuse: the previous chain is spliced in
    /// front of the new handlers and the table keeps a single route.  Use
    /// [`Router::merge_handlers`] to turn this off.
    ///
    /// # Errors
    /// Returns [`RouterError::InvalidRoutePath`] if the path places a `**`
    /// anywhere but last.  Registration is the only place this can surface;
    /// requests never see it.
    ///
    /// # Examples
    /// ```rust
    /// let mut http = shunt::router();
    /// http.register(
    ///     Some(http::Method::GET),
    ///     "/user/*",
    ///     shunt::middleware::sync(|req, res| {
    ///         res.send(format!("user {}", req.path_param(0).unwrap_or("?")));
    ///         Ok(())
    ///     }),
    /// ).unwrap();
    /// assert!(http.register(None, "/**/broken", shunt::middleware::sync(|_, _| Ok(()))).is_err());
    /// ```
    pub fn register<C: IntoChain>(
        &mut self,
        method: Option<http::Method>,
        path: &str,
        handlers: C,
    ) -> Result<&mut Self, RouterError> {
        let path = RoutePath::compile(path)?;
        let mut route = Route {
            method,
            path,
            chain: handlers.into_chain(),
        };

        if self.merge_handlers {
            let fuse = self
                .routes
                .last()
                .map(|last| last.mergeable_with(&route))
                .unwrap_or(false);
            if fuse {
                if let Some(previous) = self.routes.pop() {
                    route.chain = Chain::concat(previous.chain, route.chain);
                }
            }
        }

        self.routes.push(route);
        Ok(self)
    }

    /// Enables or disables fusing back-to-back registrations for the same
    /// method and path into a single route.  On by default.
    pub fn merge_handlers(&mut self, merge: bool) -> &mut Self {
        self.merge_handlers = merge;
        self
    }

    pub(crate) fn routes(&self) -> &[Route] {
        &self.routes[..]
    }

    method![
        /// Registers a route for the `GET` method.
        ///
        /// Handlers may be a single [`crate::Middleware`], a tuple of them
        /// (run in order, as one chain), or a prebuilt [`Chain`].
        ///
        /// # Panics
        /// Panics if the path is invalid; see [`Router::register`] for the
        /// fallible form.
        ///
        /// # Examples
        /// ```rust
        /// # #[tokio::main] async fn main() -> Result<(), anyhow::Error> {
        /// let mut http = shunt::router();
        /// http.get("/user", shunt::middleware::sync(|_req, res| {
        ///     res.send("user index");
        ///     Ok(())
        /// }));
        /// let response = http.handle(shunt::Request::get("/user")?).await?.unwrap();
        /// assert_eq!(response.status(), http::StatusCode::OK);
        /// # Ok(())
        /// # }
        /// ```
        pub fn get = http::Method::GET;
        /// Registers a route for the `POST` method.  See [`Router::get`].
        pub fn post = http::Method::POST;
        /// Registers a route for the `PUT` method.  See [`Router::get`].
        pub fn put = http::Method::PUT;
        /// Registers a route for the `DELETE` method.  See [`Router::get`].
        pub fn delete = http::Method::DELETE;
        /// Registers a route for the `PATCH` method.  See [`Router::get`].
        pub fn patch = http::Method::PATCH;
        /// Registers a route for the `HEAD` method.  See [`Router::get`].
        pub fn head = http::Method::HEAD;
        /// Registers a route for the `OPTIONS` method.  See [`Router::get`].
        pub fn options = http::Method::OPTIONS;
        /// Registers a route for the `TRACE` method.  See [`Router::get`].
        pub fn trace = http::Method::TRACE;
        /// Registers a route for the `CONNECT` method.  See [`Router::get`].
        pub fn connect = http::Method::CONNECT;
    ];

    /// Registers a route that accepts every request method.
    ///
    /// # Panics
    /// Panics if the path is invalid; see [`Router::register`] for the
    /// fallible form.
    pub fn all<C: IntoChain>(&mut self, path: &str, handlers: C) -> &mut Self {
        match self.register(None, path, handlers) {
            Ok(router) => router,
            Err(error) => panic!("{}", error),
        }
    }

    /// Registers a GET route that hands the connection over to a streaming
    /// protocol by asking the request's [`ServerHandle`] to upgrade it.  If
    /// the handle declines, the scan simply continues past this route.
    pub fn ws(&mut self, path: &str) -> &mut Self {
        self.get(
            path,
            middleware::sync(|req, _res| {
                req.upgrade();
                Ok(())
            }),
        )
    }

    /// Registers a GET route that redirects to the given target with 307,
    /// or 308 when `permanent` is set.
    pub fn redirect(&mut self, path: &str, target: &str, permanent: bool) -> &mut Self {
        let target = target.to_owned();
        self.get(
            path,
            middleware::sync(move |_req, res| {
                res.redirect(target.clone(), permanent)?;
                res.send_empty();
                Ok(())
            }),
        )
    }

    /// Registers the cookie middleware for every method on the given path.
    /// With `auto_sync`, jar changes are written back onto the response once
    /// dispatch finishes.  See [`CookieMiddleware`].
    pub fn cookies(&mut self, path: &str, auto_sync: bool) -> &mut Self {
        let middleware = if auto_sync {
            CookieMiddleware::auto_sync()
        } else {
            CookieMiddleware::new()
        };
        self.all(path, middleware)
    }

    /// Protects every method on the given path with HTTP Basic auth.  See
    /// [`BasicAuth`] for the challenge details and for customizing the
    /// realm.
    pub fn basic_auth<F>(&mut self, path: &str, check: F) -> &mut Self
    where
        F: Fn(&str, &str) -> bool + Send + Sync + 'static,
    {
        self.all(path, BasicAuth::new(check))
    }

    /// Serves files from the given directory for GET requests on the given
    /// path.  See [`StaticFiles`].
    ///
    /// # Panics
    /// Panics if the root is not an existing directory.
    pub fn files<P: Into<PathBuf>>(&mut self, path: &str, root: P) -> &mut Self {
        self.get(path, StaticFiles::new(root))
    }

    /// Handles a single request, producing the materialized response — or
    /// `None` when a handler upgraded the connection, in which case the
    /// transport owns it from here and nothing must be written.
    ///
    /// This is the whole per-request lifecycle: dispatch over the route
    /// table, then (if not upgraded) the before-sent hooks, then the build.
    ///
    /// # Errors
    /// An error returned by a handler or a hook passes through untouched;
    /// converting it into a response (the bundled listener uses an empty
    /// 500) is the caller's decision.
    pub async fn handle(&self, request: Request) -> Result<Option<Response>, anyhow::Error> {
        let mut request = request;
        let mut response = ResponseBuilder::new();
        self.dispatch(&mut request, &mut response).await?;
        if request.is_upgraded() {
            return Ok(None);
        }
        response.run_before_sent_hooks(&mut request).await?;
        Ok(Some(response.build()))
    }

    /// Runs the route scan for one request against the given response
    /// builder, without draining hooks or building.
    ///
    /// Routes are scanned in registration order.  A route runs when its
    /// method filter accepts the request and its path selector fits; a match
    /// that captures parameters overwrites the request's captured set, while
    /// a zero-capture match leaves the previous captures in place.  The scan
    /// stops as soon as a chain submits the response or upgrades the
    /// request — a chain that has to wait suspends the scan right here, and
    /// the scan resumes at the following route, never earlier.  If no route
    /// terminates the scan, the builder is reset to the shared "not found"
    /// response (unless the request was upgraded, which produces nothing).
    ///
    /// # Errors
    /// Returns the first handler error, unmodified.
    pub async fn dispatch(
        &self,
        request: &mut Request,
        response: &mut ResponseBuilder,
    ) -> Result<(), anyhow::Error> {
        for route in &self.routes {
            if !route.accepts(request.method()) {
                continue;
            }
            match route.path.fits(request.split_path()) {
                PathMatch::Miss => continue,
                PathMatch::Fits => {}
                PathMatch::Captures(params) => request.set_path_params(params),
            }

            log::trace!("{} {} --> {}", request.method(), request.uri(), route.path);
            route.chain.call(request, response).await?;
            if response.submitted() || request.is_upgraded() {
                return Ok(());
            }
        }

        if request.is_upgraded() {
            return Ok(());
        }

        log::trace!("{} {} --> (not found)", request.method(), request.uri());
        response
            .reset()
            .status(http::StatusCode::NOT_FOUND)
            .set_body(NOT_FOUND_BODY);
        Ok(())
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("merge_handlers", &self.merge_handlers)
            .finish()
    }
}
