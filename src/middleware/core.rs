use serde_json::Value;

use crate::dispatcher::{RequestContext, ResponseSink};
use crate::error::GatewayError;

/// Middleware with Before/After hooks wrapping the whole dispatch pipeline.
///
/// Both hooks may write response bytes and mutate the per-request context
/// bag; mutations are visible to later hooks and to argument binding. An
/// error from `before` aborts the pipeline immediately: the bytes the hook
/// already wrote become the full response and only the After chain still
/// runs. Errors from `after` are logged and otherwise ignored, since the
/// response is already final at that point.
///
/// Default implementations are no-ops so a component can override only the
/// hook it cares about.
pub trait Interceptor: Send + Sync {
    fn before(&self, _res: &mut ResponseSink, _ctx: &mut RequestContext) -> anyhow::Result<()> {
        Ok(())
    }

    fn after(&self, _res: &mut ResponseSink, _ctx: &mut RequestContext) -> anyhow::Result<()> {
        Ok(())
    }
}

/// No-op interceptor, useful as a chain placeholder.
pub struct BaseInterceptor;

impl Interceptor for BaseInterceptor {}

/// Runs after the Before chain and before argument binding. An error skips
/// bind and invoke and is routed through the same error path as a failed
/// backend call.
pub type Preprocessor =
    dyn Fn(&mut ResponseSink, &mut RequestContext) -> anyhow::Result<()> + Send + Sync;

/// Owns the full response for a successful invocation; when absent the
/// dispatcher JSON-encodes the backend response instead.
pub type Postprocessor = dyn Fn(&mut ResponseSink, &mut RequestContext, &Value) + Send + Sync;

/// Fully replaces preprocess/bind/invoke/postprocess for its route.
pub type Hijacker = dyn Fn(&mut ResponseSink, &mut RequestContext) + Send + Sync;

/// Owns the full response for a failed preprocess/bind/invoke; when absent
/// the dispatcher writes the raw error message as the body.
pub type ErrorHandler = dyn Fn(&mut ResponseSink, &mut RequestContext, &GatewayError) + Send + Sync;

/// Produces a whole composite argument value directly from the request,
/// bypassing per-field binding. The only way to populate values the
/// declarative mapping cannot express.
pub type Convertor = dyn Fn(&RequestContext) -> Value + Send + Sync;
