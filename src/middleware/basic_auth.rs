use super::Middleware;
use crate::{Request, ResponseBuilder};
use base64::Engine;

/// Middleware that guards the routes behind it with HTTP Basic auth.
///
/// The middleware decodes the `Authorization` header and passes the
/// credentials to the check callback.  When the callback accepts, the
/// request falls through to the handlers registered after this one; when it
/// declines — or the header is missing or malformed — the middleware
/// submits a `401` challenge
/// (`WWW-Authenticate: Basic realm="...", charset="..."`) and the scan
/// stops.
///
/// # Examples
/// ```rust
/// use shunt::middleware::BasicAuth;
///
/// # #[tokio::main] async fn main() -> Result<(), anyhow::Error> {
/// let mut http = shunt::router();
/// http.all(
///     "/**",
///     BasicAuth::new(|user, pass| user == "tester" && pass == "changeme")
///         .realm("staging"),
/// );
/// http.get("/hello", shunt::middleware::sync(|_req, res| {
///     res.send("Hello World!");
///     Ok(())
/// }));
/// let response = http.handle(shunt::Request::get("/hello")?).await?.unwrap();
/// assert_eq!(response.status(), http::StatusCode::UNAUTHORIZED);
/// # Ok(())
/// # }
/// ```
pub struct BasicAuth<F> {
    check: F,
    realm: String,
    charset: String,
}

impl<F> BasicAuth<F>
where
    F: Fn(&str, &str) -> bool + Send + Sync + 'static,
{
    /// Creates the middleware with the given credential check.  The
    /// challenge defaults to realm `"Restricted"` and charset `"UTF-8"`.
    pub fn new(check: F) -> Self {
        BasicAuth {
            check,
            realm: "Restricted".to_owned(),
            charset: "UTF-8".to_owned(),
        }
    }

    /// Sets the realm announced in the challenge.
    #[must_use]
    pub fn realm<R: Into<String>>(mut self, realm: R) -> Self {
        self.realm = realm.into();
        self
    }

    /// Sets the charset announced in the challenge.
    #[must_use]
    pub fn charset<C: Into<String>>(mut self, charset: C) -> Self {
        self.charset = charset.into();
        self
    }

    fn credentials(&self, request: &Request) -> Option<(String, String)> {
        let header = request.header(http::header::AUTHORIZATION)?.to_str().ok()?;
        let (scheme, encoded) = header.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (user, password) = decoded.split_once(':')?;
        Some((user.to_owned(), password.to_owned()))
    }
}

#[async_trait]
impl<F> Middleware for BasicAuth<F>
where
    F: Fn(&str, &str) -> bool + Send + Sync + 'static,
{
    async fn call(
        &self,
        request: &mut Request,
        response: &mut ResponseBuilder,
    ) -> Result<(), anyhow::Error> {
        if let Some((user, password)) = self.credentials(request) {
            if (self.check)(&user, &password) {
                return Ok(());
            }
        }

        let challenge = format!(
            "Basic realm=\"{}\", charset=\"{}\"",
            self.realm, self.charset
        );
        response.status(http::StatusCode::UNAUTHORIZED);
        response.set_header(http::header::WWW_AUTHENTICATE, challenge)?;
        response.send("Unauthorized");
        Ok(())
    }

    fn describe(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BasicAuth(realm={:?})", self.realm)
    }
}
