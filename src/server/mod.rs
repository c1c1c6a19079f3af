mod gateway;
mod http_server;
mod request;
mod response;
mod service;

pub use gateway::{init_logging, Gateway};
pub use http_server::{HttpServer, ServerHandle};
pub use request::{parse_query_params, parse_request, ParsedRequest};
pub use response::write_sink;
pub use service::GatewayService;
