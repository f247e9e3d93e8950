#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
/// Errors generated specifically from this library, and not its interactions
/// with user code.
pub enum RouterError {
    /// Generated when compiling a route path that places a multi wildcard
    /// (`**`) anywhere but the final segment.  This is raised while the route
    /// table is being built, never while a request is in flight.
    #[error("multi wildcard before the final segment in route path {0:?}")]
    InvalidRoutePath(String),
    /// Generated when a route registration or a chain merge is asked to
    /// produce a chain out of zero handlers.
    #[error("no handlers supplied for the route")]
    InvalidRegistration,
    /// Generated when the cookie store hook runs against a request whose
    /// cookies were never parsed.  The cookie middleware degrades this into
    /// a 500 response rather than propagating it.
    #[error("cookie store requested but no cookies were parsed for the request")]
    CookieStore,
    /// Generated when attempting to parse an address (during
    /// [`crate::Router::listen`]), but the address was invalid.
    #[error("could not parse the given string ({0:?}) as an address")]
    InvalidAddress(String),
    /// Generated when attempting to bind and listen using hyper, but it
    /// failed for some underlying reason.
    #[error("could not serve server")]
    HyperServer(#[source] hyper::Error),
}
