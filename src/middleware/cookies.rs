use super::Middleware;
use crate::{Request, ResponseBuilder, RouterError};
use std::collections::BTreeMap;

/// The cookies of a single request.
///
/// The jar is parsed once per request from the `Cookie` headers; the parsed
/// state is immediately snapshotted as the jar's *origin*.  Handlers then
/// mutate the *current* side freely — set, delete, clear — and
/// [`CookieJar::store`] diffs current against origin to emit the minimal
/// `Set-Cookie` headers: one addition per changed or added cookie, one
/// expiry per cookie that is gone.
///
/// # Examples
/// ```rust
/// let mut request = shunt::Request::get("/").unwrap();
/// request
///     .headers_mut()
///     .insert(http::header::COOKIE, "a=1; b=2".parse().unwrap());
/// let jar = request.parse_cookies(false);
/// jar.set("a", "9");
/// jar.delete("b");
///
/// let mut res = shunt::ResponseBuilder::new();
/// jar.store(&mut res);
/// assert_eq!(res.headers().len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    current: BTreeMap<String, Option<String>>,
    origin: BTreeMap<String, String>,
}

impl CookieJar {
    /// Parses the `Cookie` headers of a request into a jar, snapshotting the
    /// result as the origin.
    ///
    /// Pairs are split on `;`, the name is the trimmed text up to the first
    /// `=`, and the value — everything after it, further `=` included — is
    /// percent-decoded.  Pairs with an empty name are skipped; a pair with
    /// no `=` at all is kept with an empty value.
    pub(crate) fn parse(headers: &http::HeaderMap) -> Self {
        let mut jar = CookieJar::default();
        let pairs = headers
            .get_all(http::header::COOKIE)
            .into_iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|header| header.split(';'));
        for pair in pairs {
            let pair = pair.trim();
            match cookie::Cookie::parse_encoded(pair) {
                Ok(cookie) => {
                    jar.current
                        .insert(cookie.name().to_owned(), Some(cookie.value().to_owned()));
                }
                // a bare name is a cookie with an empty value
                Err(_) if !pair.is_empty() && !pair.contains('=') => {
                    jar.current.insert(pair.to_owned(), Some(String::new()));
                }
                Err(_) => {}
            }
        }
        jar.origin = jar
            .current
            .iter()
            .filter_map(|(name, value)| value.as_ref().map(|v| (name.clone(), v.clone())))
            .collect();
        jar
    }

    /// The current value of the named cookie, if it is set.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.current.get(name).and_then(|value| value.as_deref())
    }

    /// The value the named cookie arrived with, if it did.
    pub fn origin(&self, name: &str) -> Option<&str> {
        self.origin.get(name).map(String::as_str)
    }

    /// Sets (or overwrites) the named cookie.
    pub fn set<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) {
        self.current.insert(name.into(), Some(value.into()));
    }

    /// Deletes the named cookie.  [`CookieJar::store`] will expire it on the
    /// client if it arrived with the request.
    pub fn delete(&mut self, name: &str) {
        self.current.insert(name.to_owned(), None);
    }

    /// Deletes every cookie.
    pub fn clear(&mut self) {
        self.current.clear();
    }

    /// Iterates over the currently set cookies, in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.current
            .iter()
            .filter_map(|(name, value)| value.as_deref().map(|v| (name.as_str(), v)))
    }

    /// Diffs the jar against its origin snapshot and writes the resulting
    /// `Set-Cookie` headers onto the response: an addition for every cookie
    /// whose value is new or changed, an expiry for every cookie that
    /// arrived with the request but is no longer set.
    pub fn store(&self, response: &mut ResponseBuilder) {
        for (name, value) in &self.current {
            if let Some(value) = value {
                if self.origin.get(name) != Some(value) {
                    response.set_cookie(cookie::Cookie::new(name.clone(), value.clone()));
                }
            }
        }
        for name in self.origin.keys() {
            if !matches!(self.current.get(name), Some(Some(_))) {
                response.unset_cookie(name);
            }
        }
    }
}

/// Middleware that parses the request's cookies, and optionally syncs the
/// changes back onto the response.
///
/// On every request it matches, this parses the `Cookie` headers into the
/// request's [`CookieJar`] (reusing the jar if one was parsed already).
/// When built with [`CookieMiddleware::auto_sync`], it additionally defers a
/// store hook: once dispatch is done, the jar is diffed against its origin
/// and the `Set-Cookie`/expiry headers appended, without any handler having
/// to think about it.
///
/// If the store hook ever runs against a request with no parsed jar, that is
/// a jar-internal error: it is logged and degraded to an empty 500, never
/// propagated.
///
/// # Examples
/// ```rust
/// use shunt::middleware::CookieMiddleware;
///
/// # #[tokio::main] async fn main() -> Result<(), anyhow::Error> {
/// let mut http = shunt::router();
/// http.all("/**", CookieMiddleware::auto_sync());
/// http.get("/visit", shunt::middleware::sync(|req, res| {
///     let visits = req
///         .cookies()
///         .and_then(|jar| jar.get("visits"))
///         .and_then(|count| count.parse::<u32>().ok())
///         .unwrap_or(0);
///     if let Some(jar) = req.cookies_mut() {
///         jar.set("visits", (visits + 1).to_string());
///     }
///     res.send(format!("visit #{}", visits + 1));
///     Ok(())
/// }));
/// let response = http.handle(shunt::Request::get("/visit")?).await?;
/// let response = response.expect("not upgraded");
/// assert!(response.headers().contains_key("set-cookie"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct CookieMiddleware {
    auto_sync: bool,
}

impl CookieMiddleware {
    /// Creates a cookie middleware that only parses.
    #[must_use]
    pub fn new() -> Self {
        CookieMiddleware { auto_sync: false }
    }

    /// Creates a cookie middleware that parses and also defers a store hook
    /// to sync jar changes onto the response.
    #[must_use]
    pub fn auto_sync() -> Self {
        CookieMiddleware { auto_sync: true }
    }
}

#[async_trait]
impl Middleware for CookieMiddleware {
    async fn call(
        &self,
        request: &mut Request,
        response: &mut ResponseBuilder,
    ) -> Result<(), anyhow::Error> {
        if self.auto_sync {
            response.before_sent(|request, response| {
                match request.cookies() {
                    Some(jar) => jar.store(response),
                    None => {
                        log::error!("{}", RouterError::CookieStore);
                        response.reset().status(http::StatusCode::INTERNAL_SERVER_ERROR);
                    }
                }
                Ok(())
            });
        }
        request.parse_cookies(false);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn jar_from(header: &str) -> CookieJar {
        let mut headers = http::HeaderMap::new();
        headers.insert(http::header::COOKIE, header.parse().unwrap());
        CookieJar::parse(&headers)
    }

    #[test]
    fn test_parse_pairs() {
        let jar = jar_from("a=1; b=2");
        assert_eq!(jar.get("a"), Some("1"));
        assert_eq!(jar.get("b"), Some("2"));
        assert_eq!(jar.get("c"), None);
    }

    #[test]
    fn test_parse_decodes_and_rejoins() {
        let jar = jar_from("token=a%20b; expr=1%3D2=3");
        assert_eq!(jar.get("token"), Some("a b"));
        // everything after the first `=` belongs to the value
        assert_eq!(jar.get("expr"), Some("1=2=3"));
    }

    #[test]
    fn test_parse_skips_empty_names() {
        let jar = jar_from("=ghost; a=1; ; bare");
        assert_eq!(jar.get(""), None);
        assert_eq!(jar.get("a"), Some("1"));
        assert_eq!(jar.get("bare"), Some(""));
    }

    #[test]
    fn test_origin_snapshot_is_immutable() {
        let mut jar = jar_from("a=1");
        jar.set("a", "2");
        assert_eq!(jar.get("a"), Some("2"));
        assert_eq!(jar.origin("a"), Some("1"));
    }

    #[test]
    fn test_store_diffs_changes_and_deletions() {
        let mut jar = jar_from("a=1; b=2");
        jar.set("a", "9");
        jar.delete("b");

        let mut res = ResponseBuilder::new();
        jar.store(&mut res);

        let values: Vec<_> = res
            .headers()
            .iter()
            .map(|(_, value)| value.to_str().unwrap().to_owned())
            .collect();
        assert_eq!(values.len(), 2);
        assert!(values.iter().any(|v| v.starts_with("a=9")));
        assert!(values
            .iter()
            .any(|v| v.starts_with("b=") && v.contains("Max-Age=0")));
    }

    #[test]
    fn test_store_skips_unchanged() {
        let mut jar = jar_from("a=1; b=2");
        jar.set("b", "2");

        let mut res = ResponseBuilder::new();
        jar.store(&mut res);
        assert!(res.headers().is_empty());
    }

    #[test]
    fn test_store_emits_additions() {
        let mut jar = jar_from("");
        jar.set("fresh", "yes");

        let mut res = ResponseBuilder::new();
        jar.store(&mut res);
        assert_eq!(res.headers().len(), 1);
        let value = res.header("set-cookie").unwrap().to_str().unwrap();
        assert!(value.starts_with("fresh=yes"));
    }

    #[test]
    fn test_clear_expires_everything() {
        let mut jar = jar_from("a=1; b=2");
        jar.clear();

        let mut res = ResponseBuilder::new();
        jar.store(&mut res);
        let values: Vec<_> = res
            .headers()
            .iter()
            .map(|(_, value)| value.to_str().unwrap().to_owned())
            .collect();
        assert_eq!(values.len(), 2);
        assert!(values.iter().all(|v| v.contains("Max-Age=0")));
    }

    #[tokio::test]
    async fn test_store_without_parse_degrades_to_500() {
        let mut request = crate::Request::get("/").unwrap();
        let mut response = ResponseBuilder::new();

        let middleware = CookieMiddleware::auto_sync();
        middleware.call(&mut request, &mut response).await.unwrap();

        // simulate a jar going missing before the hooks drain
        let mut bare = crate::Request::get("/").unwrap();
        response.run_before_sent_hooks(&mut bare).await.unwrap();
        assert_eq!(
            response.status_code(),
            http::StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
