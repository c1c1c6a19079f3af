use may_minihttp::Response;

use crate::dispatcher::ResponseSink;

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "OK",
    }
}

/// Flush a buffered [`ResponseSink`] to the wire.
pub fn write_sink(res: &mut Response, sink: ResponseSink) {
    let (status, headers, body) = sink.into_parts();
    res.status_code(status as usize, status_reason(status));
    for (name, value) in headers {
        match (name.as_str(), value.as_str()) {
            ("Content-Type", "application/json") => res.header("Content-Type: application/json"),
            ("Content-Type", "text/plain; charset=utf-8") => {
                res.header("Content-Type: text/plain; charset=utf-8")
            }
            // may_minihttp wants 'static header lines; arbitrary headers
            // from custom middleware are rare enough to leak.
            _ => res.header(Box::leak(format!("{name}: {value}").into_boxed_str())),
        };
    }
    res.body_vec(body);
}
