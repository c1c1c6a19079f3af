use may_minihttp::Request;
use std::collections::HashMap;
use std::io::Read;
use tracing::debug;

/// Parsed HTTP request data handed to the dispatcher.
#[derive(Debug, PartialEq)]
pub struct ParsedRequest {
    /// HTTP method token as sent.
    pub method: String,
    /// Path with the query string stripped.
    pub path: String,
    /// HTTP headers, lowercase keys.
    pub headers: HashMap<String, String>,
    /// URL-decoded query string parameters.
    pub query_params: HashMap<String, String>,
    /// JSON body, when one was sent and parsed.
    pub body: Option<serde_json::Value>,
}

/// Parse query string parameters from a raw request path.
#[must_use]
pub fn parse_query_params(path: &str) -> HashMap<String, String> {
    match path.find('?') {
        Some(pos) => url::form_urlencoded::parse(path[pos + 1..].as_bytes())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        None => HashMap::new(),
    }
}

/// Extract method, path, headers, query parameters and JSON body from a raw
/// `may_minihttp` request.
pub fn parse_request(req: Request) -> ParsedRequest {
    let method = req.method().to_string();
    let raw_path = req.path().to_string();
    let path = raw_path.split('?').next().unwrap_or("/").to_string();

    let headers: HashMap<String, String> = req
        .headers()
        .iter()
        .map(|h| {
            (
                h.name.to_ascii_lowercase(),
                String::from_utf8_lossy(h.value).to_string(),
            )
        })
        .collect();

    let query_params = parse_query_params(&raw_path);

    let body = {
        let mut body_str = String::new();
        match req.body().read_to_string(&mut body_str) {
            Ok(size) if size > 0 => serde_json::from_str(&body_str).ok(),
            _ => None,
        }
    };

    debug!(
        method = %method,
        path = %path,
        header_count = headers.len(),
        query_count = query_params.len(),
        has_body = body.is_some(),
        "HTTP request parsed"
    );

    ParsedRequest {
        method,
        path,
        headers,
        query_params,
        body,
    }
}
