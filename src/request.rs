use crate::middleware::CookieJar;
use crate::router::ServerHandle;
use std::convert::TryFrom;
use std::net::SocketAddr;
use std::sync::Arc;

macro_rules! forward {
    () => {};
    (
        $(#[$m:meta])* $v:vis fn $name:ident(&self $(, $pn:ident: $pt:ty)*) -> $ret:ty;
        $($tail:tt)*
    ) => {
        $(#[$m])* $v fn $name(&self $(, $pn: $pt)*) -> $ret {
            self.inner.$name($($pn),*)
        }

        forward! { $($tail)* }
    };

    (
        $(#[$m:meta])* $v:vis fn $name:ident(&mut self $(, $pn:ident: $pt:ty)*) -> $ret:ty;
        $($tail:tt)*
    ) => {
        $(#[$m])* $v fn $name(&mut self $(, $pn: $pt)*) -> $ret {
            self.inner.$name($($pn),*)
        }

        forward! { $($tail)* }
    }
}

macro_rules! construct {
    () => {};
    ($($(#[$m:meta])* $v:vis fn $method:ident = $action:expr;)+) => {
        $($(#[$m])* $v fn $method<U>(uri: U) -> Result<Self, http::Error>
        where
            http::Uri: TryFrom<U>,
            <http::Uri as TryFrom<U>>::Error: Into<http::Error>
        {
            http::request::Builder::new()
                .method($action)
                .uri(uri)
                .body(hyper::Body::empty())
                .map(Request::from)
        })+
    };
}

/// Represents an HTTP request.
///
/// This wraps the underlying hyper request and carries the per-request state
/// the router works with: the path split into segments, the parameters
/// captured by the most recent wildcard match, the parsed cookie jar, the
/// upgraded flag, and the handle back to the server that accepted the
/// connection.  All of this state is created when the request arrives and
/// discarded once the response has been built.
///
/// # Examples
/// ```rust
/// let request = shunt::Request::get("/user/42").unwrap();
/// assert_eq!(request.method(), http::Method::GET);
/// assert_eq!(request.split_path(), ["user", "42"]);
/// ```
pub struct Request {
    inner: http::Request<hyper::Body>,
    split_path: Vec<String>,
    path_params: Option<Vec<String>>,
    cookies: Option<CookieJar>,
    upgraded: bool,
    server: Option<Arc<dyn ServerHandle>>,
}

impl Request {
    construct! {
        /// Creates a new request initialized with the GET method and the
        /// given URI.
        ///
        /// # Examples
        /// ```rust
        /// let request = shunt::Request::get("/a").unwrap();
        /// assert_eq!(request.method(), http::Method::GET);
        /// ```
        pub fn get = http::Method::GET;
        /// Creates a new request initialized with the POST method and the
        /// given URI.
        pub fn post = http::Method::POST;
        /// Creates a new request initialized with the PUT method and the
        /// given URI.
        pub fn put = http::Method::PUT;
        /// Creates a new request initialized with the DELETE method and the
        /// given URI.
        pub fn delete = http::Method::DELETE;
        /// Creates a new request initialized with the PATCH method and the
        /// given URI.
        pub fn patch = http::Method::PATCH;
        /// Creates a new request initialized with the HEAD method and the
        /// given URI.
        pub fn head = http::Method::HEAD;
        /// Creates a new request initialized with the OPTIONS method and the
        /// given URI.
        pub fn options = http::Method::OPTIONS;
        /// Creates a new request initialized with the TRACE method and the
        /// given URI.
        pub fn trace = http::Method::TRACE;
        /// Creates a new request initialized with the CONNECT method and the
        /// given URI.
        pub fn connect = http::Method::CONNECT;
    }

    /// Creates a new request initialized with the provided method and the
    /// given URI.
    ///
    /// # Errors
    /// This method will return an error if the provided URI is invalid.
    ///
    /// # Examples
    /// ```rust
    /// let request =
    ///     shunt::Request::from_method("/a", http::Method::POST).unwrap();
    /// assert_eq!(request.method(), http::Method::POST);
    /// ```
    pub fn from_method<U>(uri: U, method: http::Method) -> Result<Self, http::Error>
    where
        http::Uri: TryFrom<U>,
        <http::Uri as TryFrom<U>>::Error: Into<http::Error>,
    {
        http::request::Builder::new()
            .method(method)
            .uri(uri)
            .body(hyper::Body::empty())
            .map(Request::from)
    }

    /// The request's URI path.
    pub fn path(&self) -> &str {
        self.inner.uri().path()
    }

    /// The request path split into its non-empty segments.  An empty slice
    /// is the root path.
    pub fn split_path(&self) -> &[String] {
        &self.split_path
    }

    /// The parameters captured by the most recent wildcard match for this
    /// request, in path order.
    ///
    /// A match that captures nothing leaves this untouched, so the values
    /// seen here are those of the last route whose wildcards actually
    /// consumed request segments.
    pub fn path_params(&self) -> &[String] {
        self.path_params.as_deref().unwrap_or(&[])
    }

    /// The captured parameter at the given index, if any.
    pub fn path_param(&self, index: usize) -> Option<&str> {
        self.path_params().get(index).map(String::as_str)
    }

    pub(crate) fn set_path_params(&mut self, params: Vec<String>) {
        self.path_params = Some(params);
    }

    /// A single header value, by name.
    ///
    /// # Examples
    /// ```rust
    /// let request = shunt::Request::get("/").unwrap();
    /// assert!(request.header(http::header::AUTHORIZATION).is_none());
    /// ```
    pub fn header<K: http::header::AsHeaderName>(&self, key: K) -> Option<&http::HeaderValue> {
        self.inner.headers().get(key)
    }

    /// Takes the body out of the request, leaving an empty one in its place.
    pub fn take_body(&mut self) -> hyper::Body {
        std::mem::take(self.inner.body_mut())
    }

    /// The parsed cookie jar, if the cookies were parsed for this request.
    pub fn cookies(&self) -> Option<&CookieJar> {
        self.cookies.as_ref()
    }

    /// The parsed cookie jar, mutably, if the cookies were parsed for this
    /// request.
    pub fn cookies_mut(&mut self) -> Option<&mut CookieJar> {
        self.cookies.as_mut()
    }

    /// Parses the request's `Cookie` headers into a jar.
    ///
    /// The first parse snapshots the incoming cookies as the jar's origin;
    /// later calls reuse the existing jar (and its snapshot) unless `force`
    /// is set, which discards the jar and parses the headers afresh.
    ///
    /// # Examples
    /// ```rust
    /// let mut request = shunt::Request::get("/").unwrap();
    /// request
    ///     .headers_mut()
    ///     .insert(http::header::COOKIE, "a=1; b=2".parse().unwrap());
    /// let jar = request.parse_cookies(false);
    /// assert_eq!(jar.get("a"), Some("1"));
    /// ```
    pub fn parse_cookies(&mut self, force: bool) -> &mut CookieJar {
        if force {
            self.cookies = None;
        }
        if self.cookies.is_none() {
            self.cookies = Some(CookieJar::parse(self.inner.headers()));
        }
        self.cookies.get_or_insert_with(CookieJar::default)
    }

    /// Whether the connection was handed over to a streaming protocol.  Once
    /// set, the route scan stops and no response is produced.
    pub fn is_upgraded(&self) -> bool {
        self.upgraded
    }

    /// Asks the server that accepted this connection to take it over for a
    /// streaming protocol, marking the request as upgraded if it does.
    /// Returns the upgraded flag.  Without a server handle (or when the
    /// handle declines) the request stays unupgraded.
    pub fn upgrade(&mut self) -> bool {
        if self.upgraded {
            return true;
        }
        if let Some(server) = self.server.clone() {
            if server.upgrade(self) {
                self.upgraded = true;
            }
        }
        self.upgraded
    }

    /// The address of the peer that sent this request, as reported by the
    /// server handle.
    pub fn remote_address(&self) -> Option<SocketAddr> {
        self.server.as_ref().and_then(|server| server.remote_address())
    }

    /// The handle to the server that accepted this connection, if any.
    pub fn server(&self) -> Option<&Arc<dyn ServerHandle>> {
        self.server.as_ref()
    }

    /// Attaches the server handle used for peer-address retrieval and
    /// connection upgrades.  The bundled listener does this for every
    /// incoming request.
    pub fn set_server(&mut self, server: Arc<dyn ServerHandle>) -> &mut Self {
        self.server = Some(server);
        self
    }

    forward! {
        /// Returns the [`http::Method`] of the request.
        pub fn method(&self) -> &http::Method;
        /// Returns the [`http::Uri`] of the request.
        pub fn uri(&self) -> &http::Uri;
        /// Returns a reference to the associated header field map.
        pub fn headers(&self) -> &http::HeaderMap<http::HeaderValue>;
        /// Returns a mutable reference to the associated header field map.
        pub fn headers_mut(&mut self) -> &mut http::HeaderMap<http::HeaderValue>;
        /// Returns a reference to the associated extensions.
        pub fn extensions(&self) -> &http::Extensions;
        /// Returns a mutable reference to the associated extensions.
        pub fn extensions_mut(&mut self) -> &mut http::Extensions;
    }
}

impl From<http::Request<hyper::Body>> for Request {
    fn from(inner: http::Request<hyper::Body>) -> Self {
        let split_path = crate::split_path(inner.uri().path());
        Request {
            inner,
            split_path,
            path_params: None,
            cookies: None,
            upgraded: false,
            server: None,
        }
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", self.inner.method())
            .field("uri", self.inner.uri())
            .field("path_params", &self.path_params)
            .field("upgraded", &self.upgraded)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_split_path_on_construction() {
        let request = Request::get("/a/b//c/").unwrap();
        assert_eq!(request.split_path(), ["a", "b", "c"]);
        let request = Request::get("/").unwrap();
        assert!(request.split_path().is_empty());
    }

    #[test]
    fn test_path_params_default_empty() {
        let mut request = Request::get("/").unwrap();
        assert!(request.path_params().is_empty());
        request.set_path_params(vec!["x".into()]);
        assert_eq!(request.path_param(0), Some("x"));
        assert_eq!(request.path_param(1), None);
    }

    #[test]
    fn test_upgrade_without_server_declines() {
        let mut request = Request::get("/").unwrap();
        assert!(!request.upgrade());
        assert!(!request.is_upgraded());
    }

    #[test]
    fn test_parse_cookies_reuses_snapshot() {
        let mut request = Request::get("/").unwrap();
        request
            .headers_mut()
            .insert(http::header::COOKIE, "a=1".parse().unwrap());
        request.parse_cookies(false).set("a", "2");
        // a second unforced parse keeps the mutated jar
        assert_eq!(request.parse_cookies(false).get("a"), Some("2"));
        // a forced parse starts over from the headers
        assert_eq!(request.parse_cookies(true).get("a"), Some("1"));
    }
}
