use tracing::info;

use super::Interceptor;
use crate::dispatcher::{RequestContext, ResponseSink};

/// Logs one event when a request enters the pipeline and one when it
/// leaves, carrying the request id, target method and final status.
pub struct TracingInterceptor;

impl Interceptor for TracingInterceptor {
    fn before(&self, _res: &mut ResponseSink, ctx: &mut RequestContext) -> anyhow::Result<()> {
        info!(
            request_id = %ctx.request_id,
            method = %ctx.method,
            path = %ctx.path,
            target = %ctx.target,
            "request dispatched"
        );
        Ok(())
    }

    fn after(&self, res: &mut ResponseSink, ctx: &mut RequestContext) -> anyhow::Result<()> {
        info!(
            request_id = %ctx.request_id,
            target = %ctx.target,
            status = res.status(),
            latency_ms = ctx.started.elapsed().as_millis() as u64,
            "response written"
        );
        Ok(())
    }
}
