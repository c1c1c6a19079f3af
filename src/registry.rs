//! Role-tagged component registry.
//!
//! One store for every middleware kind the bindings can reference by name.
//! Registration happens before serving begins; lookups run at wiring time
//! (table build), so a missing name or role mismatch is a fatal
//! configuration error, never a per-request failure.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

use crate::dispatcher::{RequestContext, ResponseSink};
use crate::error::GatewayError;
use crate::middleware::{Convertor, ErrorHandler, Hijacker, Interceptor, Postprocessor, Preprocessor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentRole {
    Interceptor,
    Preprocessor,
    Postprocessor,
    Hijacker,
    ErrorHandler,
    Convertor,
}

impl fmt::Display for ComponentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComponentRole::Interceptor => "interceptor",
            ComponentRole::Preprocessor => "preprocessor",
            ComponentRole::Postprocessor => "postprocessor",
            ComponentRole::Hijacker => "hijacker",
            ComponentRole::ErrorHandler => "error handler",
            ComponentRole::Convertor => "convertor",
        };
        f.write_str(s)
    }
}

/// Registry entry: the role is fixed at registration.
pub enum Component {
    Interceptor(Arc<dyn Interceptor>),
    Preprocessor(Arc<Preprocessor>),
    Postprocessor(Arc<Postprocessor>),
    Hijacker(Arc<Hijacker>),
    ErrorHandler(Arc<ErrorHandler>),
    Convertor(Arc<Convertor>),
}

impl Component {
    #[must_use]
    pub fn role(&self) -> ComponentRole {
        match self {
            Component::Interceptor(_) => ComponentRole::Interceptor,
            Component::Preprocessor(_) => ComponentRole::Preprocessor,
            Component::Postprocessor(_) => ComponentRole::Postprocessor,
            Component::Hijacker(_) => ComponentRole::Hijacker,
            Component::ErrorHandler(_) => ComponentRole::ErrorHandler,
            Component::Convertor(_) => ComponentRole::Convertor,
        }
    }
}

/// Wiring-time lookup failure; fatal at startup or reload, never surfaced
/// to a caller mid-request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WiringError {
    ComponentNotFound {
        name: String,
        expected: ComponentRole,
    },
    RoleMismatch {
        name: String,
        expected: ComponentRole,
        actual: ComponentRole,
    },
}

impl fmt::Display for WiringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WiringError::ComponentNotFound { name, expected } => {
                write!(f, "component {name:?} not registered (expected {expected})")
            }
            WiringError::RoleMismatch {
                name,
                expected,
                actual,
            } => write!(
                f,
                "component {name:?} is registered as {actual}, not {expected}"
            ),
        }
    }
}

impl std::error::Error for WiringError {}

/// Name-to-component store shared by route table builds.
#[derive(Default)]
pub struct ComponentRegistry {
    components: HashMap<String, Component>,
}

impl ComponentRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last write wins; overwriting is logged, not fatal.
    pub fn register(&mut self, name: impl Into<String>, component: Component) {
        let name = name.into();
        if let Some(previous) = self.components.insert(name.clone(), component) {
            warn!(component = %name, previous_role = %previous.role(), "component replaced");
        }
    }

    pub fn register_interceptor(
        &mut self,
        name: impl Into<String>,
        interceptor: impl Interceptor + 'static,
    ) {
        self.register(name, Component::Interceptor(Arc::new(interceptor)));
    }

    pub fn register_preprocessor<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut ResponseSink, &mut RequestContext) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.register(name, Component::Preprocessor(Arc::new(f)));
    }

    pub fn register_postprocessor<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut ResponseSink, &mut RequestContext, &Value) + Send + Sync + 'static,
    {
        self.register(name, Component::Postprocessor(Arc::new(f)));
    }

    pub fn register_hijacker<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut ResponseSink, &mut RequestContext) + Send + Sync + 'static,
    {
        self.register(name, Component::Hijacker(Arc::new(f)));
    }

    pub fn register_error_handler<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut ResponseSink, &mut RequestContext, &GatewayError) + Send + Sync + 'static,
    {
        self.register(name, Component::ErrorHandler(Arc::new(f)));
    }

    pub fn register_convertor<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&RequestContext) -> Value + Send + Sync + 'static,
    {
        self.register(name, Component::Convertor(Arc::new(f)));
    }

    pub fn interceptor(&self, name: &str) -> Result<Arc<dyn Interceptor>, WiringError> {
        match self.lookup(name, ComponentRole::Interceptor)? {
            Component::Interceptor(i) => Ok(i.clone()),
            _ => unreachable!("lookup checked the role"),
        }
    }

    pub fn preprocessor(&self, name: &str) -> Result<Arc<Preprocessor>, WiringError> {
        match self.lookup(name, ComponentRole::Preprocessor)? {
            Component::Preprocessor(p) => Ok(p.clone()),
            _ => unreachable!("lookup checked the role"),
        }
    }

    pub fn postprocessor(&self, name: &str) -> Result<Arc<Postprocessor>, WiringError> {
        match self.lookup(name, ComponentRole::Postprocessor)? {
            Component::Postprocessor(p) => Ok(p.clone()),
            _ => unreachable!("lookup checked the role"),
        }
    }

    pub fn hijacker(&self, name: &str) -> Result<Arc<Hijacker>, WiringError> {
        match self.lookup(name, ComponentRole::Hijacker)? {
            Component::Hijacker(h) => Ok(h.clone()),
            _ => unreachable!("lookup checked the role"),
        }
    }

    pub fn error_handler(&self, name: &str) -> Result<Arc<ErrorHandler>, WiringError> {
        match self.lookup(name, ComponentRole::ErrorHandler)? {
            Component::ErrorHandler(h) => Ok(h.clone()),
            _ => unreachable!("lookup checked the role"),
        }
    }

    pub fn convertor(&self, name: &str) -> Result<Arc<Convertor>, WiringError> {
        match self.lookup(name, ComponentRole::Convertor)? {
            Component::Convertor(c) => Ok(c.clone()),
            _ => unreachable!("lookup checked the role"),
        }
    }

    fn lookup(&self, name: &str, expected: ComponentRole) -> Result<&Component, WiringError> {
        let component =
            self.components
                .get(name)
                .ok_or_else(|| WiringError::ComponentNotFound {
                    name: name.to_string(),
                    expected,
                })?;
        if component.role() != expected {
            return Err(WiringError::RoleMismatch {
                name: name.to_string(),
                expected,
                actual: component.role(),
            });
        }
        Ok(component)
    }
}
