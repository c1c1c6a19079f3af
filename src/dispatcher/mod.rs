mod core;

pub use core::{Dispatcher, RequestContext, ResponseSink, NOT_FOUND_BODY};
