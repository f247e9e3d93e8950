use super::RoutePath;
use crate::middleware::Chain;

pub(crate) struct Route {
    pub(crate) method: Option<http::Method>,
    pub(crate) path: RoutePath,
    pub(crate) chain: Chain,
}

impl Route {
    /// Whether this route accepts the given request method.  A route without
    /// a method accepts them all.
    pub(crate) fn accepts(&self, method: &http::Method) -> bool {
        self.method.is_none() || self.method.as_ref() == Some(method)
    }

    /// Whether a newly registered route may fuse into this one: the methods
    /// must be equal and the selectors must join to the same string.
    pub(crate) fn mergeable_with(&self, other: &Route) -> bool {
        self.method == other.method && self.path.selector() == other.path.selector()
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path.selector())
            .field("handlers", &self.chain.len())
            .finish_non_exhaustive()
    }
}
