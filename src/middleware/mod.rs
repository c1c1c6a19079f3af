mod core;
mod tracing;

pub use core::{
    BaseInterceptor, Convertor, ErrorHandler, Hijacker, Interceptor, Postprocessor, Preprocessor,
};
pub use tracing::TracingInterceptor;
