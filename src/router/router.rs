use http::Method;
use regex::Regex;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;

use crate::middleware::{Convertor, ErrorHandler, Hijacker, Interceptor, Postprocessor, Preprocessor};

/// Stack-allocated path parameter captures; most routes have well under
/// eight placeholders.
pub type ParamVec = SmallVec<[(Arc<str>, String); 8]>;

/// One mapped endpoint: an HTTP method and path pattern pointing at a
/// target RPC method, with its middleware bindings.
pub struct Route {
    pub method: Method,
    /// Pattern as declared, with `{name}` / `{name:regex}` placeholders.
    pub pattern: String,
    /// Target RPC method name resolved through the switcher.
    pub target: String,
    pub binding: RouteBinding,
}

/// Per-route middleware configuration, fully resolved at table build time
/// so lookups never happen on the request path.
#[derive(Default, Clone)]
pub struct RouteBinding {
    pub interceptors: Vec<Arc<dyn Interceptor>>,
    pub preprocessor: Option<Arc<Preprocessor>>,
    pub postprocessor: Option<Arc<Postprocessor>>,
    pub hijacker: Option<Arc<Hijacker>>,
}

/// Result of matching a request against the table.
pub struct RouteMatch {
    pub route: Arc<Route>,
    pub path_params: ParamVec,
}

struct CompiledRoute {
    method: Method,
    regex: Regex,
    param_names: Vec<Arc<str>>,
    route: Arc<Route>,
}

/// Immutable snapshot of the routing and middleware configuration.
///
/// A reload builds a whole new table and republishes it with one atomic
/// pointer swap; nothing here is ever mutated after construction.
#[derive(Default)]
pub struct RouteTable {
    /// Sorted most-specific-first; declaration order breaks ties.
    routes: Vec<CompiledRoute>,
    common_interceptors: Vec<Arc<dyn Interceptor>>,
    error_handler: Option<Arc<ErrorHandler>>,
    /// Convertors keyed by destination composite type name.
    convertors: HashMap<String, Arc<Convertor>>,
}

impl RouteTable {
    pub(crate) fn from_parts(
        entries: Vec<(Regex, Vec<Arc<str>>, Route)>,
        common_interceptors: Vec<Arc<dyn Interceptor>>,
        error_handler: Option<Arc<ErrorHandler>>,
        convertors: HashMap<String, Arc<Convertor>>,
    ) -> Self {
        let mut routes: Vec<CompiledRoute> = entries
            .into_iter()
            .map(|(regex, param_names, route)| CompiledRoute {
                method: route.method.clone(),
                regex,
                param_names,
                route: Arc::new(route),
            })
            .collect();
        // More literal segments beat fewer; among equals, fewer placeholders
        // win. The sort is stable, so declaration order breaks exact ties.
        routes.sort_by_key(|r| {
            let (literals, placeholders) = specificity(&r.route.pattern);
            (std::cmp::Reverse(literals), placeholders)
        });
        Self {
            routes,
            common_interceptors,
            error_handler,
            convertors,
        }
    }

    /// Match a request method + path, extracting placeholder values. A path
    /// that matches only under a different method is a plain not-found;
    /// this table does not distinguish 404 from 405.
    #[must_use]
    pub fn matches(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        for compiled in &self.routes {
            if compiled.method != *method {
                continue;
            }
            if let Some(captures) = compiled.regex.captures(path) {
                let mut params = ParamVec::new();
                for (i, name) in compiled.param_names.iter().enumerate() {
                    if let Some(value) = captures.get(i + 1) {
                        params.push((name.clone(), value.as_str().to_string()));
                    }
                }
                return Some(RouteMatch {
                    route: compiled.route.clone(),
                    path_params: params,
                });
            }
        }
        None
    }

    pub fn routes(&self) -> impl Iterator<Item = &Arc<Route>> {
        self.routes.iter().map(|r| &r.route)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    #[must_use]
    pub fn common_interceptors(&self) -> &[Arc<dyn Interceptor>] {
        &self.common_interceptors
    }

    #[must_use]
    pub fn error_handler(&self) -> Option<&Arc<ErrorHandler>> {
        self.error_handler.as_ref()
    }

    #[must_use]
    pub fn convertors(&self) -> &HashMap<String, Arc<Convertor>> {
        &self.convertors
    }
}

/// Compile a path pattern into an anchored regex plus its placeholder
/// names, in capture order.
///
/// `{name}` matches one path segment (no `/`); `{name:regex}` constrains
/// the capture with the given expression. Placeholder regexes may not
/// contain `/`. An invalid constraint is a configuration error, reported
/// at build time so a reload can reject the pattern without going live.
pub(crate) fn pattern_to_regex(pattern: &str) -> anyhow::Result<(Regex, Vec<Arc<str>>)> {
    if pattern == "/" {
        return Ok((Regex::new(r"^/$")?, Vec::new()));
    }

    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');
    let mut param_names = Vec::new();

    for segment in pattern.split('/').filter(|s| !s.is_empty()) {
        expr.push('/');
        if let Some(inner) = segment
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
        {
            let (name, constraint) = match inner.split_once(':') {
                Some((name, re)) => (name, re),
                None => (inner, "[^/]+"),
            };
            if name.is_empty() {
                anyhow::bail!("empty placeholder name in pattern {pattern:?}");
            }
            expr.push('(');
            expr.push_str(constraint);
            expr.push(')');
            param_names.push(Arc::from(name));
        } else {
            expr.push_str(&regex::escape(segment));
        }
    }

    expr.push('$');
    let regex = Regex::new(&expr)
        .map_err(|e| anyhow::anyhow!("invalid placeholder regex in pattern {pattern:?}: {e}"))?;
    Ok((regex, param_names))
}

/// `(literal segment count, placeholder segment count)` for a pattern.
pub(crate) fn specificity(pattern: &str) -> (usize, usize) {
    let mut literals = 0usize;
    let mut placeholders = 0usize;
    for segment in pattern.split('/').filter(|s| !s.is_empty()) {
        if segment.starts_with('{') && segment.ends_with('}') {
            placeholders += 1;
        } else {
            literals += 1;
        }
    }
    (literals, placeholders)
}
