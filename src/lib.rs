//! # Switchgate
//!
//! **Switchgate** is an HTTP-to-RPC gateway: it serves a declaratively
//! configured REST-style surface in front of a backend that is only
//! reachable over an RPC protocol, translating each inbound HTTP request
//! into a call against a dynamically selected RPC method and turning the
//! result (or failure) back into an HTTP response.
//!
//! The backend stays pluggable through the *switcher*: generated or
//! hand-written setup code registers each callable method by name, with a
//! static argument signature and a closure over the connected client
//! handle. The gateway core never learns the wire protocol.
//!
//! ## Architecture
//!
//! - **[`config`]** - YAML service configuration: route mappings and
//!   middleware bindings
//! - **[`router`]** - immutable route table with `{name}` / `{name:regex}`
//!   patterns and specificity-ordered matching
//! - **[`registry`]** - role-tagged component store (interceptors,
//!   preprocessors, postprocessors, hijackers, error handlers, convertors)
//! - **[`dispatcher`]** - the per-request pipeline state machine
//! - **[`binder`]** - descriptor-table binding of request data into RPC
//!   argument values
//! - **[`switcher`]** - method-name to invocation resolution and the
//!   one-shot invoker
//! - **[`hot_reload`]** - config watching and atomic route table
//!   republication
//! - **[`server`]** - HTTP front end on `may_minihttp` plus the [`Gateway`]
//!   lifecycle owner
//!
//! ## Request flow
//!
//! ```text
//! request
//!   -> route table match (404 on miss, no middleware runs)
//!   -> interceptor Before chain (error aborts straight to After)
//!   -> hijacker short-circuit, or: preprocessor -> bind -> invoke
//!   -> postprocessor | error handler | default JSON encoding
//!   -> interceptor After chain (failures logged only)
//!   -> response sent
//! ```
//!
//! Requests are served concurrently; the only shared state is the route
//! table (atomically swapped on reload) and the read-only registry and
//! switcher. A request always finishes against the table it matched.
//!
//! ## Example
//!
//! ```rust,no_run
//! use switchgate::binder::{FieldKind, FieldSpec, MethodSignature};
//! use switchgate::registry::ComponentRegistry;
//! use switchgate::server::Gateway;
//! use switchgate::switcher::Switcher;
//!
//! fn main() -> anyhow::Result<()> {
//!     let registry = ComponentRegistry::new();
//!     let mut switcher = Switcher::new();
//!     switcher.register(
//!         "SayHello",
//!         MethodSignature::Aggregate {
//!             type_name: "SayHelloRequest".into(),
//!             fields: vec![FieldSpec::new("yourName", FieldKind::Str)],
//!         },
//!         |args| {
//!             let name = args[0]["yourName"].as_str().unwrap_or_default();
//!             Ok(serde_json::json!({ "message": format!("Hello, {name}") }))
//!         },
//!     );
//!     let mut gateway = Gateway::new("service.yaml", registry, switcher)?;
//!     let guard = switchgate::server::init_logging(gateway.config());
//!     let handle = gateway.start()?;
//!     gateway.run(handle)?;
//!     drop(guard);
//!     Ok(())
//! }
//! ```

pub mod binder;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod hot_reload;
pub mod ids;
pub mod middleware;
pub mod registry;
pub mod router;
pub mod server;
pub mod switcher;

pub use binder::{FieldKind, FieldSpec, MethodSignature};
pub use config::{RouteMapping, ServiceConfig};
pub use dispatcher::{Dispatcher, RequestContext, ResponseSink};
pub use error::GatewayError;
pub use ids::RequestId;
pub use registry::{Component, ComponentRegistry, ComponentRole, WiringError};
pub use router::{build_table, RouteTable};
pub use server::Gateway;
pub use switcher::Switcher;
