use super::Router;
use crate::{Request, RouterError};
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

/// The handle a request carries back to the server that accepted its
/// connection.
///
/// The router only needs two things from the transport: the address of the
/// peer, and the ability to hand the connection over to a streaming protocol
/// (a websocket, say).  Both default to "not available", which is correct
/// for requests constructed by hand in tests and for transports that do not
/// support upgrades — the bundled listener provides the peer address but
/// declines upgrades, since after an upgrade the connection is no longer
/// hyper's to manage here.
pub trait ServerHandle: Send + Sync + 'static {
    /// The address of the connected peer, if known.
    fn remote_address(&self) -> Option<SocketAddr> {
        None
    }

    /// Attempts to take over the connection for a streaming protocol.
    /// Returning `true` means the transport owns the connection from now on;
    /// the router will mark the request upgraded and produce no response.
    fn upgrade(&self, request: &mut Request) -> bool {
        let _ = request;
        false
    }
}

struct PeerHandle(SocketAddr);

impl ServerHandle for PeerHandle {
    fn remote_address(&self) -> Option<SocketAddr> {
        Some(self.0)
    }
}

impl Router {
    /// Creates a listen server on the specified address.
    ///
    /// # Errors
    /// This can fail if the socket address is invalid, or if the socket is
    /// already in use.
    ///
    /// # Examples
    /// ```rust,no_run
    /// # #[tokio::main] async fn main() -> Result<(), anyhow::Error> {
    /// let mut http = shunt::router();
    /// http.get("/", shunt::middleware::sync(|_req, res| {
    ///     res.send("hello, world!");
    ///     Ok(())
    /// }));
    /// http.listen("0.0.0.0:8080").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn listen(self, address: &str) -> Result<(), RouterError> {
        let address: SocketAddr = address
            .parse()
            .map_err(|_| RouterError::InvalidAddress(address.to_owned()))?;

        log::info!("listen({})", address);

        if log::log_enabled!(log::Level::Trace) {
            for route in self.routes() {
                log::trace!(
                    "route: {} {} ({} deep)",
                    route.method.as_ref().map_or("(all)", http::Method::as_str),
                    route.path,
                    route.chain.len(),
                );
            }
        }

        let this = Arc::new(self);

        hyper::server::Server::bind(&address)
            .serve(hyper::service::make_service_fn(
                |v: &hyper::server::conn::AddrStream| {
                    let router = this.clone();
                    let service = RouterService(router, v.remote_addr());
                    async move { Ok::<_, std::convert::Infallible>(service) }
                },
            ))
            .await
            .map_err(RouterError::HyperServer)?;

        Ok(())
    }
}

#[derive(Clone)]
struct RouterService(Arc<Router>, SocketAddr);

type RouterFuture<R, E> = Pin<Box<dyn Future<Output = Result<R, E>> + Send + 'static>>;

impl tower::Service<hyper::Request<hyper::Body>> for RouterService {
    type Response = hyper::Response<hyper::Body>;
    type Error = std::convert::Infallible;
    type Future = RouterFuture<Self::Response, Self::Error>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: hyper::Request<hyper::Body>) -> Self::Future {
        let router = self.0.clone();
        let handle: Arc<dyn ServerHandle> = Arc::new(PeerHandle(self.1));
        Box::pin(async move {
            let mut request = Request::from(request);
            request.set_server(handle);
            let response = match router.handle(request).await {
                Ok(Some(response)) => response,
                // the connection belongs to whoever upgraded it; hyper still
                // wants a response value, so acknowledge the switch
                Ok(None) => empty_response(http::StatusCode::SWITCHING_PROTOCOLS),
                Err(error) => {
                    log::error!("unhandled handler error: {:#}", error);
                    empty_response(http::StatusCode::INTERNAL_SERVER_ERROR)
                }
            };
            Ok(response)
        })
    }
}

fn empty_response(status: http::StatusCode) -> hyper::Response<hyper::Body> {
    let mut response = hyper::Response::new(hyper::Body::empty());
    *response.status_mut() = status;
    response
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_invalid_address_is_rejected() {
        let router = Router::default();
        let result = router.listen("not-an-address").await;
        assert!(matches!(result, Err(RouterError::InvalidAddress(_))));
    }

    #[test]
    fn test_peer_handle_reports_address() {
        let addr: SocketAddr = "127.0.0.1:4096".parse().unwrap();
        let handle = PeerHandle(addr);
        assert_eq!(handle.remote_address(), Some(addr));
        let mut request = Request::get("/").unwrap();
        assert!(!handle.upgrade(&mut request));
    }
}
