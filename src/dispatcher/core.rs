//! Dispatcher core - hot path for request dispatch.
//!
//! Drives the per-route pipeline:
//!
//! ```text
//! MATCHING -> BEFORE -> (HIJACK | PREPROCESS -> BIND -> INVOKE)
//!          -> (POSTPROCESS | ERROR | DEFAULT_ENCODE) -> AFTER -> DONE
//! ```
//!
//! Every request pins the route table it matched against for its whole
//! lifetime, so a concurrent reload never changes semantics mid-flight.

use arc_swap::ArcSwap;
use http::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

use crate::binder::bind_arguments;
use crate::error::GatewayError;
use crate::ids::RequestId;
use crate::middleware::Interceptor;
use crate::router::{ParamVec, Route, RouteTable};
use crate::switcher::Switcher;

/// Body written for unmatched requests; matches the Go stdlib `http.NotFound`
/// wording REST callers tend to have fixtures for.
pub const NOT_FOUND_BODY: &str = "404 page not found\n";

/// Per-request scratch state visible to every middleware hook and to
/// argument binding. Created by the dispatcher, discarded when the
/// response is sent; nothing in it outlives the request.
pub struct RequestContext {
    pub request_id: RequestId,
    pub method: Method,
    pub path: String,
    /// Target RPC method name from the matched route.
    pub target: String,
    pub path_params: ParamVec,
    pub query_params: HashMap<String, String>,
    /// HTTP headers, lowercase keys.
    pub headers: HashMap<String, String>,
    /// Request body parsed as JSON, when one was sent.
    pub body: Option<Value>,
    /// Context value bag; interceptors attach values here for later hooks
    /// and for argument binding.
    pub values: HashMap<String, Value>,
    pub started: Instant,
}

impl RequestContext {
    /// Last occurrence wins when duplicate placeholder names exist at
    /// different path depths.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    /// Case-insensitive per RFC 7230.
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn set_value(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    #[must_use]
    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}

/// Buffered response under construction.
///
/// Middleware writes bytes here instead of straight to the socket so an
/// aborted pipeline still produces exactly the bytes written so far. The
/// status is final once any body byte exists: later `set_status` calls are
/// ignored, which keeps an error path from rewriting a response a hook
/// already started.
#[derive(Debug, Clone)]
pub struct ResponseSink {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Default for ResponseSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseSink {
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Ignored once body bytes have been written.
    pub fn set_status(&mut self, status: u16) {
        if self.body.is_empty() {
            self.status = status;
        }
    }

    /// Add or replace a header (case-insensitive name match).
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
    }

    pub fn write_str(&mut self, s: &str) {
        self.body.extend_from_slice(s.as_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    #[must_use]
    pub fn into_parts(self) -> (u16, Vec<(String, String)>, Vec<u8>) {
        (self.status, self.headers, self.body)
    }

    pub(crate) fn not_found(&mut self) {
        self.set_status(404);
        self.set_header("Content-Type", "text/plain; charset=utf-8");
        self.write_str(NOT_FOUND_BODY);
    }
}

/// HTTP entry point: matches the live route table and drives the
/// middleware pipeline around binder and invoker.
///
/// The route table is behind an `ArcSwap` so reloads republish it with a
/// single atomic pointer swap while in-flight requests keep the table they
/// started with. The switcher is fixed at startup; only routing and
/// middleware configuration participate in reload.
pub struct Dispatcher {
    table: ArcSwap<RouteTable>,
    switcher: Switcher,
}

impl Dispatcher {
    /// Validates that every route target resolves against the switcher,
    /// then installs the initial table.
    pub fn new(table: RouteTable, switcher: Switcher) -> anyhow::Result<Self> {
        validate_targets(&table, &switcher)?;
        Ok(Self {
            table: ArcSwap::from_pointee(table),
            switcher,
        })
    }

    /// Atomically republish a rebuilt table. On validation failure the
    /// current table stays live and the error is returned to the caller.
    pub fn install(&self, table: RouteTable) -> anyhow::Result<usize> {
        validate_targets(&table, &self.switcher)?;
        let count = table.len();
        self.table.store(Arc::new(table));
        Ok(count)
    }

    /// Snapshot of the currently published table.
    #[must_use]
    pub fn table(&self) -> Arc<RouteTable> {
        self.table.load_full()
    }

    /// Run one request through the pipeline and return the buffered
    /// response. Never panics, never errors: every failure mode ends as
    /// response bytes.
    #[must_use]
    pub fn dispatch(
        &self,
        method: Method,
        path: &str,
        query_params: HashMap<String, String>,
        headers: HashMap<String, String>,
        body: Option<Value>,
        request_id: RequestId,
    ) -> ResponseSink {
        // Pin the table for the whole request; a concurrent reload swaps
        // the pointer without touching this snapshot.
        let table = self.table.load_full();
        let mut sink = ResponseSink::new();

        let Some(matched) = table.matches(&method, path) else {
            let err = GatewayError::RouteNotFound {
                method: method.to_string(),
                path: path.to_string(),
            };
            debug!(%request_id, error = %err, kind = err.kind(), "no route matched");
            sink.not_found();
            return sink;
        };

        let route = matched.route;
        let mut ctx = RequestContext {
            request_id,
            method,
            path: path.to_string(),
            target: route.target.clone(),
            path_params: matched.path_params,
            query_params,
            headers,
            body,
            values: HashMap::new(),
            started: Instant::now(),
        };

        let interceptors: &[Arc<dyn Interceptor>] = if route.binding.interceptors.is_empty() {
            table.common_interceptors()
        } else {
            &route.binding.interceptors
        };

        let mut aborted = false;
        for interceptor in interceptors {
            if let Err(cause) = interceptor.before(&mut sink, &mut ctx) {
                let err = GatewayError::InterceptorAborted {
                    message: cause.to_string(),
                };
                warn!(
                    %request_id,
                    target = %route.target,
                    kind = err.kind(),
                    error = %err,
                    "before hook aborted the pipeline"
                );
                aborted = true;
                break;
            }
        }

        if !aborted {
            if let Some(hijacker) = &route.binding.hijacker {
                hijacker(&mut sink, &mut ctx);
            } else {
                match self.call_backend(&table, &route, &mut sink, &mut ctx) {
                    Ok(response) => match &route.binding.postprocessor {
                        Some(postprocessor) => postprocessor(&mut sink, &mut ctx, &response),
                        None => encode_response(&mut sink, &response),
                    },
                    Err(err) => {
                        debug!(
                            %request_id,
                            target = %route.target,
                            kind = err.kind(),
                            error = %err,
                            "request failed, routing to error path"
                        );
                        match table.error_handler() {
                            Some(handler) => handler(&mut sink, &mut ctx, &err),
                            None => {
                                sink.set_status(500);
                                sink.write_str(&err.to_string());
                            }
                        }
                    }
                }
            }
        }

        // Same order as the Before chain; the response is already final so
        // failures here are logged only.
        for interceptor in interceptors {
            if let Err(cause) = interceptor.after(&mut sink, &mut ctx) {
                warn!(
                    %request_id,
                    target = %route.target,
                    error = %cause,
                    "after hook failed"
                );
            }
        }

        sink
    }

    /// PREPROCESS -> BIND -> INVOKE. Exactly one call attempt, no retry.
    fn call_backend(
        &self,
        table: &RouteTable,
        route: &Route,
        sink: &mut ResponseSink,
        ctx: &mut RequestContext,
    ) -> Result<Value, GatewayError> {
        if let Some(preprocessor) = &route.binding.preprocessor {
            preprocessor(sink, ctx).map_err(|cause| GatewayError::PreprocessFailed {
                message: cause.to_string(),
            })?;
        }
        let signature =
            self.switcher
                .signature(&route.target)
                .ok_or_else(|| GatewayError::InvokeFailed {
                    message: format!("no switcher entry for method {}", route.target),
                })?;
        let args = bind_arguments(signature, ctx, table.convertors())?;
        self.switcher.invoke(&route.target, &args)
    }
}

fn validate_targets(table: &RouteTable, switcher: &Switcher) -> anyhow::Result<()> {
    for route in table.routes() {
        if !switcher.contains(&route.target) {
            anyhow::bail!(
                "route {} {} targets method {:?} which has no switcher entry",
                route.method,
                route.pattern,
                route.target
            );
        }
    }
    Ok(())
}

/// Default success encoding: the backend response serialized as a JSON
/// object keyed by its field names.
fn encode_response(sink: &mut ResponseSink, response: &Value) {
    sink.set_header("Content-Type", "application/json");
    match serde_json::to_vec(response) {
        Ok(bytes) => sink.write_bytes(&bytes),
        Err(e) => {
            // Value-to-bytes serialization only fails on pathological map
            // keys; surface it rather than silently dropping the body.
            error!(error = %e, "failed to encode backend response");
            sink.set_status(500);
            sink.write_str("response encoding failed");
        }
    }
}
