//! Request-path error type.
//!
//! Wiring and configuration failures use `anyhow` and are fatal; this enum
//! covers the per-request failure modes the dispatcher routes through the
//! error path. The `Display` of the preprocess/bind/invoke variants is the
//! raw cause message, because that string is also the default error
//! response body.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// No route matched the method + path.
    RouteNotFound { method: String, path: String },
    /// An interceptor's Before hook returned an error.
    InterceptorAborted { message: String },
    /// The route's preprocessor returned an error.
    PreprocessFailed { message: String },
    /// Request data could not be coerced into the target's arguments.
    BindFailed { message: String },
    /// The backend invocation failed, or the target had no switcher entry.
    InvokeFailed { message: String },
}

impl GatewayError {
    /// Stable short name for log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::RouteNotFound { .. } => "route_not_found",
            GatewayError::InterceptorAborted { .. } => "interceptor_aborted",
            GatewayError::PreprocessFailed { .. } => "preprocess_failed",
            GatewayError::BindFailed { .. } => "bind_failed",
            GatewayError::InvokeFailed { .. } => "invoke_failed",
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::RouteNotFound { method, path } => {
                write!(f, "no route for {method} {path}")
            }
            GatewayError::InterceptorAborted { message }
            | GatewayError::PreprocessFailed { message }
            | GatewayError::BindFailed { message }
            | GatewayError::InvokeFailed { message } => f.write_str(message),
        }
    }
}

impl std::error::Error for GatewayError {}
