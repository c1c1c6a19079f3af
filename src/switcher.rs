//! Method-name to invocation resolution and the one-shot invoker.
//!
//! No introspection mechanism can discover callable signatures uniformly
//! across unrelated RPC backends, so backend-specific setup code registers
//! each callable method here by name: its static argument signature (used
//! by the binder) and a closure that performs the actual call against the
//! live client handle. The table is built once at startup and shared
//! read-only by all requests; reloads never touch it.

use serde_json::Value;
use std::collections::HashMap;

use crate::binder::MethodSignature;
use crate::error::GatewayError;

/// Boxed call against the backend client. The closure owns (or shares) the
/// connected client handle; the gateway performs no per-request connection
/// setup.
pub type Invocation = Box<dyn Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync>;

struct MethodEntry {
    signature: MethodSignature,
    invoke: Invocation,
}

/// Name-to-invocation map bridging the generic dispatcher to a concrete
/// RPC client.
#[derive(Default)]
pub struct Switcher {
    methods: HashMap<String, MethodEntry>,
}

impl Switcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one callable method. Last write wins, so test harnesses can
    /// re-point a method at a different stub.
    pub fn register<F>(&mut self, name: impl Into<String>, signature: MethodSignature, invoke: F)
    where
        F: Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.methods.insert(
            name.into(),
            MethodEntry {
                signature,
                invoke: Box::new(invoke),
            },
        );
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    #[must_use]
    pub fn signature(&self, name: &str) -> Option<&MethodSignature> {
        self.methods.get(name).map(|entry| &entry.signature)
    }

    /// Exactly one call attempt; no retry, no timeout beyond what the
    /// backend client itself applies. Any backend error surfaces verbatim
    /// as the invocation error message.
    pub fn invoke(&self, name: &str, args: &[Value]) -> Result<Value, GatewayError> {
        let entry = self
            .methods
            .get(name)
            .ok_or_else(|| GatewayError::InvokeFailed {
                message: format!("no switcher entry for method {name}"),
            })?;
        (entry.invoke)(args).map_err(|cause| GatewayError::InvokeFailed {
            message: cause.to_string(),
        })
    }
}
