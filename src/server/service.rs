use http::Method;
use may_minihttp::{HttpService, Request, Response};
use std::io;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::request::parse_request;
use super::response::write_sink;
use crate::dispatcher::{Dispatcher, ResponseSink};
use crate::ids::RequestId;

/// The HTTP front end: parses each raw request and hands it to the shared
/// [`Dispatcher`]. Cloned per connection by the server runtime; all clones
/// share the dispatcher reference and the in-flight counter.
#[derive(Clone)]
pub struct GatewayService {
    dispatcher: Arc<Dispatcher>,
    in_flight: Arc<AtomicUsize>,
}

impl GatewayService {
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Count of requests currently inside [`HttpService::call`]. Shutdown
    /// waits on this before tearing down the backend.
    #[must_use]
    pub fn in_flight(&self) -> Arc<AtomicUsize> {
        self.in_flight.clone()
    }
}

/// Holds the in-flight count up for one request, released on every exit
/// path.
struct InFlightGuard(Arc<AtomicUsize>);

impl InFlightGuard {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl HttpService for GatewayService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let _guard = InFlightGuard::enter(&self.in_flight);
        let parsed = parse_request(req);
        let request_id = RequestId::from_header_or_new(
            parsed.headers.get("x-request-id").map(String::as_str),
        );

        let sink = match Method::from_str(&parsed.method) {
            Ok(method) => self.dispatcher.dispatch(
                method,
                &parsed.path,
                parsed.query_params,
                parsed.headers,
                parsed.body,
                request_id,
            ),
            Err(_) => {
                // An unparseable method token cannot match any route.
                let mut sink = ResponseSink::new();
                sink.not_found();
                sink
            }
        };

        write_sink(res, sink);
        Ok(())
    }
}
