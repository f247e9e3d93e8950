use crate::Request;
use std::convert::TryFrom;

/// The materialized HTTP response handed back to the transport.
pub type Response = http::Response<hyper::Body>;

/// The shared body of the default "not found" response.  Stateless and never
/// mutated per-request.
pub(crate) const NOT_FOUND_BODY: &str = "Not found";

#[async_trait]
/// A hook run after dispatch finishes, just before the response is built.
///
/// Hooks are drained from a stack: the hook registered last runs first, and
/// each hook — including ones that have to wait on an external result —
/// fully resolves before the next one is popped.  A hook may itself push
/// further hooks; they are drained in the same pass.
///
/// Closures can be registered directly through
/// [`ResponseBuilder::before_sent`]; implement this trait for hooks that
/// need to await something.
pub trait BeforeSent: Send + 'static {
    /// Runs the hook.  The hook consumes itself; it runs at most once.
    async fn run(
        self: Box<Self>,
        request: &mut Request,
        response: &mut ResponseBuilder,
    ) -> Result<(), anyhow::Error>;
}

struct FnHook<F>(F);

#[async_trait]
impl<F> BeforeSent for FnHook<F>
where
    F: FnOnce(&mut Request, &mut ResponseBuilder) -> Result<(), anyhow::Error> + Send + 'static,
{
    async fn run(
        self: Box<Self>,
        request: &mut Request,
        response: &mut ResponseBuilder,
    ) -> Result<(), anyhow::Error> {
        (self.0)(request, response)
    }
}

/// An HTTP response under construction.
///
/// Handlers accumulate the response here: a status code (plus an optional
/// reason text), a body, and an ordered header list that permits duplicate
/// names.  Calling [`ResponseBuilder::send`] marks the builder submitted,
/// which is the signal that stops the route scan; it is purely an observable
/// flag, not a network action.  Once dispatch is done the pending hooks are
/// drained and [`ResponseBuilder::build`] materializes the wire response.
///
/// # Examples
/// ```rust
/// let mut res = shunt::ResponseBuilder::new();
/// res.status(http::StatusCode::CREATED);
/// res.set_header("x-request-id", "77").unwrap();
/// res.send("created");
/// assert!(res.submitted());
/// let response = res.build();
/// assert_eq!(response.status(), http::StatusCode::CREATED);
/// ```
pub struct ResponseBuilder {
    submitted: bool,
    status: http::StatusCode,
    status_text: Option<String>,
    body: Option<hyper::Body>,
    headers: Vec<(http::HeaderName, http::HeaderValue)>,
    hooks: Vec<Box<dyn BeforeSent>>,
}

impl ResponseBuilder {
    /// Creates a builder in its default state: status 200, no body, no
    /// headers, not submitted.
    #[must_use]
    pub fn new() -> Self {
        ResponseBuilder {
            submitted: false,
            status: http::StatusCode::OK,
            status_text: None,
            body: None,
            headers: Vec::new(),
            hooks: Vec::new(),
        }
    }

    /// Restores the builder to its default state.  Hooks that were already
    /// registered stay registered; everything else is cleared.
    pub fn reset(&mut self) -> &mut Self {
        self.submitted = false;
        self.status = http::StatusCode::OK;
        self.status_text = None;
        self.body = None;
        self.headers.clear();
        self
    }

    /// Whether the response was submitted.  Submission is terminal for the
    /// dispatch of the current request.
    pub fn submitted(&self) -> bool {
        self.submitted
    }

    /// Sets the status code of the response.
    pub fn status(&mut self, status: http::StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    /// The current status code.
    pub fn status_code(&self) -> http::StatusCode {
        self.status
    }

    /// Sets the reason text accompanying the status code.  hyper does not
    /// transmit custom reason phrases, so this is informational: it is kept
    /// for introspection but does not appear on the wire.
    pub fn set_status_text<T: Into<String>>(&mut self, text: T) -> &mut Self {
        self.status_text = Some(text.into());
        self
    }

    /// The reason text, if one was set.
    pub fn status_text(&self) -> Option<&str> {
        self.status_text.as_deref()
    }

    /// Sets a header on the response, removing any prior header whose name
    /// matches case-insensitively.
    ///
    /// # Errors
    /// Fails if the name or value cannot be converted into a valid header
    /// name or value.
    ///
    /// # Examples
    /// ```rust
    /// let mut res = shunt::ResponseBuilder::new();
    /// res.set_header("X-Kind", "a").unwrap();
    /// res.set_header("x-kind", "b").unwrap();
    /// assert_eq!(res.headers().len(), 1);
    /// ```
    pub fn set_header<N, V>(&mut self, name: N, value: V) -> Result<&mut Self, http::Error>
    where
        http::HeaderName: TryFrom<N>,
        <http::HeaderName as TryFrom<N>>::Error: Into<http::Error>,
        http::HeaderValue: TryFrom<V>,
        <http::HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        let name = http::HeaderName::try_from(name).map_err(Into::into)?;
        let value = http::HeaderValue::try_from(value).map_err(Into::into)?;
        self.unset_header(name.as_str());
        self.headers.push((name, value));
        Ok(self)
    }

    /// Appends a header to the response without touching existing headers of
    /// the same name.  This is what multi-valued headers such as
    /// `Set-Cookie` need.
    ///
    /// # Errors
    /// Fails if the name or value cannot be converted into a valid header
    /// name or value.
    pub fn append_header<N, V>(&mut self, name: N, value: V) -> Result<&mut Self, http::Error>
    where
        http::HeaderName: TryFrom<N>,
        <http::HeaderName as TryFrom<N>>::Error: Into<http::Error>,
        http::HeaderValue: TryFrom<V>,
        <http::HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        let name = http::HeaderName::try_from(name).map_err(Into::into)?;
        let value = http::HeaderValue::try_from(value).map_err(Into::into)?;
        self.headers.push((name, value));
        Ok(self)
    }

    /// Removes every header whose name matches the given one,
    /// case-insensitively.
    pub fn unset_header(&mut self, name: &str) -> &mut Self {
        self.headers
            .retain(|(existing, _)| !existing.as_str().eq_ignore_ascii_case(name));
        self
    }

    /// The first header value with the given name, if any.
    pub fn header(&self, name: &str) -> Option<&http::HeaderValue> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.as_str().eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// The accumulated headers, in insertion order, duplicates included.
    pub fn headers(&self) -> &[(http::HeaderName, http::HeaderValue)] {
        &self.headers
    }

    /// Sets the body of the response without submitting it.
    pub fn set_body<B: Into<hyper::Body>>(&mut self, body: B) -> &mut Self {
        self.body = Some(body.into());
        self
    }

    /// Submits the response with the given body.  Submission stops the route
    /// scan; it does not itself touch the network.
    pub fn send<B: Into<hyper::Body>>(&mut self, body: B) {
        self.body = Some(body.into());
        self.submitted = true;
    }

    /// Submits the response with no body, discarding any body set earlier.
    pub fn send_empty(&mut self) {
        self.body = None;
        self.submitted = true;
    }

    /// Redirects to the given location with 307 (temporary) or 308
    /// (permanent).
    ///
    /// # Errors
    /// Fails if the location cannot be converted into a header value.
    ///
    /// # Examples
    /// ```rust
    /// let mut res = shunt::ResponseBuilder::new();
    /// res.redirect("/new-home", false).unwrap();
    /// assert_eq!(res.status_code(), http::StatusCode::TEMPORARY_REDIRECT);
    /// assert!(res.header("location").is_some());
    /// ```
    pub fn redirect<L>(&mut self, location: L, permanent: bool) -> Result<&mut Self, http::Error>
    where
        http::HeaderValue: TryFrom<L>,
        <http::HeaderValue as TryFrom<L>>::Error: Into<http::Error>,
    {
        let status = if permanent {
            http::StatusCode::PERMANENT_REDIRECT
        } else {
            http::StatusCode::TEMPORARY_REDIRECT
        };
        self.redirect_with_status(location, status)
    }

    /// Redirects to the given location with a caller-supplied status code.
    ///
    /// # Errors
    /// Fails if the location cannot be converted into a header value.
    pub fn redirect_with_status<L>(
        &mut self,
        location: L,
        status: http::StatusCode,
    ) -> Result<&mut Self, http::Error>
    where
        http::HeaderValue: TryFrom<L>,
        <http::HeaderValue as TryFrom<L>>::Error: Into<http::Error>,
    {
        let value = http::HeaderValue::try_from(location).map_err(Into::into)?;
        self.status = status;
        self.headers.push((http::header::LOCATION, value));
        Ok(self)
    }

    /// Appends a `Set-Cookie` header for the given cookie.  The cookie value
    /// is percent-encoded; a cookie that somehow serializes into an invalid
    /// header value is skipped.
    ///
    /// # Examples
    /// ```rust
    /// use cookie::Cookie;
    /// let mut res = shunt::ResponseBuilder::new();
    /// res.set_cookie(Cookie::new("session", "opaque"));
    /// assert_eq!(
    ///     res.header("set-cookie").unwrap(),
    ///     &"session=opaque"
    /// );
    /// ```
    pub fn set_cookie(&mut self, cookie: cookie::Cookie<'static>) -> &mut Self {
        if let Ok(value) = cookie.encoded().to_string().try_into() {
            self.headers.push((http::header::SET_COOKIE, value));
        }
        self
    }

    /// Appends a `Set-Cookie` header that expires the named cookie
    /// immediately (`Max-Age=0`).
    pub fn unset_cookie(&mut self, name: &str) -> &mut Self {
        let removal = cookie::Cookie::build(name.to_owned(), "")
            .max_age(cookie::time::Duration::ZERO)
            .finish();
        self.set_cookie(removal)
    }

    /// Pushes a hook to run before the response is built.  Hooks run in
    /// reverse registration order (last in, first out), after dispatch has
    /// finished and only if the request was not upgraded.
    ///
    /// # Examples
    /// ```rust
    /// let mut res = shunt::ResponseBuilder::new();
    /// res.before_sent(|_req, res| {
    ///     res.set_header("x-finished", "yes")?;
    ///     Ok(())
    /// });
    /// ```
    pub fn before_sent<F>(&mut self, hook: F) -> &mut Self
    where
        F: FnOnce(&mut Request, &mut ResponseBuilder) -> Result<(), anyhow::Error>
            + Send
            + 'static,
    {
        self.hooks.push(Box::new(FnHook(hook)));
        self
    }

    /// Pushes a [`BeforeSent`] hook.  Use this for hooks that need to await
    /// an external result; the drain waits for each hook before popping the
    /// next.
    pub fn before_sent_hook<H: BeforeSent>(&mut self, hook: H) -> &mut Self {
        self.hooks.push(Box::new(hook));
        self
    }

    /// The number of hooks still pending.
    pub fn pending_hooks(&self) -> usize {
        self.hooks.len()
    }

    /// Drains the hook stack, last-registered first, waiting for each hook
    /// to resolve before running the next.  Hooks pushed while draining are
    /// drained in the same pass.
    ///
    /// # Errors
    /// Stops at the first hook that fails and returns its error.
    pub async fn run_before_sent_hooks(
        &mut self,
        request: &mut Request,
    ) -> Result<(), anyhow::Error> {
        while let Some(hook) = self.hooks.pop() {
            hook.run(request, self).await?;
        }
        Ok(())
    }

    /// Materializes the wire response from the accumulated state, consuming
    /// the builder.  Dropping the builder without building is safe; the body
    /// is simply discarded.
    pub fn build(self) -> Response {
        let mut response = http::Response::new(self.body.unwrap_or_else(hyper::Body::empty));
        *response.status_mut() = self.status;
        let headers = response.headers_mut();
        for (name, value) in self.headers {
            headers.append(name, value);
        }
        response
    }
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        ResponseBuilder::new()
    }
}

#[cfg(feature = "json")]
impl ResponseBuilder {
    /// Sets the body to the JSON serialization of the given value and the
    /// `Content-Type` to `application/json; charset=utf-8`.
    ///
    /// # Errors
    /// This errors if the underlying JSON serialization fails; and it will
    /// return that exact error.
    ///
    /// # Examples
    /// ```rust
    /// let mut res = shunt::ResponseBuilder::new();
    /// res.json(&serde_json::json!({ "hello": "world" })).unwrap();
    /// ```
    pub fn json<T: serde::Serialize>(
        &mut self,
        value: &T,
    ) -> Result<&mut Self, serde_json::Error> {
        let body = serde_json::to_string(value)?;
        self.unset_header("content-type");
        self.headers.push((
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json; charset=utf-8"),
        ));
        self.body = Some(body.into());
        Ok(self)
    }

    /// Submits the response with the JSON serialization of the given value.
    ///
    /// # Errors
    /// This errors if the underlying JSON serialization fails.
    pub fn send_json<T: serde::Serialize>(
        &mut self,
        value: &T,
    ) -> Result<&mut Self, serde_json::Error> {
        self.json(value)?;
        self.submitted = true;
        Ok(self)
    }
}

impl std::fmt::Debug for ResponseBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseBuilder")
            .field("submitted", &self.submitted)
            .field("status", &self.status)
            .field("status_text", &self.status_text)
            .field("headers", &self.headers)
            .field("pending_hooks", &self.hooks.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let res = ResponseBuilder::new();
        assert!(!res.submitted());
        assert_eq!(res.status_code(), http::StatusCode::OK);
        assert!(res.headers().is_empty());
        assert_eq!(res.pending_hooks(), 0);
    }

    #[test]
    fn test_reset_keeps_hooks() {
        let mut res = ResponseBuilder::new();
        res.status(http::StatusCode::IM_A_TEAPOT);
        res.set_status_text("teapot");
        res.set_header("x-kind", "tea").unwrap();
        res.send("leaves");
        res.before_sent(|_req, _res| Ok(()));

        res.reset();
        assert!(!res.submitted());
        assert_eq!(res.status_code(), http::StatusCode::OK);
        assert_eq!(res.status_text(), None);
        assert!(res.headers().is_empty());
        assert_eq!(res.pending_hooks(), 1);
    }

    #[test]
    fn test_set_header_overwrites_case_insensitively() {
        let mut res = ResponseBuilder::new();
        res.append_header("X-Kind", "a").unwrap();
        res.append_header("x-kind", "b").unwrap();
        assert_eq!(res.headers().len(), 2);
        res.set_header("X-KIND", "c").unwrap();
        assert_eq!(res.headers().len(), 1);
        assert_eq!(res.header("x-kind").unwrap(), &"c");
    }

    #[test]
    fn test_unset_cookie_expires() {
        let mut res = ResponseBuilder::new();
        res.unset_cookie("session");
        let value = res.header("set-cookie").unwrap().to_str().unwrap();
        assert!(value.starts_with("session="));
        assert!(value.contains("Max-Age=0"));
    }

    #[test]
    fn test_set_cookie_attributes() {
        let mut res = ResponseBuilder::new();
        let cookie = cookie::Cookie::build("id", "4 2")
            .path("/")
            .http_only(true)
            .same_site(cookie::SameSite::Lax)
            .finish();
        res.set_cookie(cookie);
        let value = res.header("set-cookie").unwrap().to_str().unwrap();
        assert!(value.starts_with("id=4%202"));
        assert!(value.contains("Path=/"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("SameSite=Lax"));
    }

    #[tokio::test]
    async fn test_hooks_drain_last_in_first_out() {
        let mut req = crate::Request::get("/").unwrap();
        let mut res = ResponseBuilder::new();
        res.before_sent(|_req, res| {
            res.append_header("x-order", "first-registered")?;
            Ok(())
        });
        res.before_sent(|_req, res| {
            res.append_header("x-order", "second-registered")?;
            Ok(())
        });

        res.run_before_sent_hooks(&mut req).await.unwrap();
        let order: Vec<_> = res
            .headers()
            .iter()
            .filter(|(name, _)| name.as_str() == "x-order")
            .map(|(_, value)| value.to_str().unwrap().to_owned())
            .collect();
        assert_eq!(order, ["second-registered", "first-registered"]);
        assert_eq!(res.pending_hooks(), 0);
    }

    #[tokio::test]
    async fn test_async_hook_sequences_remainder() {
        struct Waiting;

        #[async_trait]
        impl BeforeSent for Waiting {
            async fn run(
                self: Box<Self>,
                _request: &mut crate::Request,
                response: &mut ResponseBuilder,
            ) -> Result<(), anyhow::Error> {
                tokio::task::yield_now().await;
                response.append_header("x-order", "waited")?;
                Ok(())
            }
        }

        let mut req = crate::Request::get("/").unwrap();
        let mut res = ResponseBuilder::new();
        res.before_sent(|_req, res| {
            res.append_header("x-order", "plain")?;
            Ok(())
        });
        res.before_sent_hook(Waiting);

        res.run_before_sent_hooks(&mut req).await.unwrap();
        let order: Vec<_> = res
            .headers()
            .iter()
            .filter(|(name, _)| name.as_str() == "x-order")
            .map(|(_, value)| value.to_str().unwrap().to_owned())
            .collect();
        // the hook stack is popped: the waiting hook was pushed last, so it
        // runs (and fully resolves) before the plain one
        assert_eq!(order, ["waited", "plain"]);
    }

    #[tokio::test]
    async fn test_hook_pushed_while_draining_runs() {
        let mut req = crate::Request::get("/").unwrap();
        let mut res = ResponseBuilder::new();
        res.before_sent(|_req, res| {
            res.before_sent(|_req, res| {
                res.append_header("x-order", "nested")?;
                Ok(())
            });
            res.append_header("x-order", "outer")?;
            Ok(())
        });

        res.run_before_sent_hooks(&mut req).await.unwrap();
        let order: Vec<_> = res
            .headers()
            .iter()
            .filter(|(name, _)| name.as_str() == "x-order")
            .map(|(_, value)| value.to_str().unwrap().to_owned())
            .collect();
        assert_eq!(order, ["outer", "nested"]);
    }

    #[tokio::test]
    async fn test_build_keeps_duplicate_headers() {
        let mut res = ResponseBuilder::new();
        res.append_header("set-cookie", "a=1").unwrap();
        res.append_header("set-cookie", "b=2").unwrap();
        res.send("done");
        let response = res.build();
        let values: Vec<_> = response
            .headers()
            .get_all("set-cookie")
            .into_iter()
            .collect();
        assert_eq!(values.len(), 2);
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        assert_eq!(&body[..], b"done");
    }
}
