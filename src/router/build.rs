//! Route table construction from declarative configuration.
//!
//! Every component name in the bindings is resolved against the registry
//! here, once, so a missing or role-mismatched component fails the build
//! (fatal at startup, rejected without a swap at reload) and the request
//! path never performs a lookup.

use anyhow::Context;
use std::collections::HashMap;
use std::sync::Arc;

use super::router::{pattern_to_regex, Route, RouteBinding, RouteTable};
use crate::config::{BindingConfig, RouteMapping};
use crate::middleware::Interceptor;
use crate::registry::ComponentRegistry;

/// Bindings whose pattern is `/` declare the global default interceptor
/// list rather than a per-route one.
const COMMON_PATTERN: &str = "/";

/// Build an immutable [`RouteTable`] from parsed mappings and bindings.
pub fn build_table(
    mappings: &[RouteMapping],
    bindings: &BindingConfig,
    registry: &ComponentRegistry,
) -> anyhow::Result<RouteTable> {
    let mut entries = Vec::with_capacity(mappings.len());
    for mapping in mappings {
        let (regex, param_names) = pattern_to_regex(&mapping.pattern)?;
        let binding = resolve_binding(mapping, bindings, registry)
            .with_context(|| format!("binding for {} {}", mapping.method, mapping.pattern))?;
        entries.push((
            regex,
            param_names,
            Route {
                method: mapping.method.clone(),
                pattern: mapping.pattern.clone(),
                target: mapping.target.clone(),
                binding,
            },
        ));
    }

    let mut common_interceptors: Vec<Arc<dyn Interceptor>> = Vec::new();
    for ib in &bindings.interceptors {
        if ib.pattern == COMMON_PATTERN {
            for name in &ib.components {
                common_interceptors.push(registry.interceptor(name)?);
            }
        }
    }

    let error_handler = bindings
        .error_handler
        .as_deref()
        .map(|name| registry.error_handler(name))
        .transpose()?;

    let mut convertors = HashMap::with_capacity(bindings.convertors.len());
    for cb in &bindings.convertors {
        convertors.insert(cb.message.clone(), registry.convertor(&cb.component)?);
    }

    Ok(RouteTable::from_parts(
        entries,
        common_interceptors,
        error_handler,
        convertors,
    ))
}

fn resolve_binding(
    mapping: &RouteMapping,
    bindings: &BindingConfig,
    registry: &ComponentRegistry,
) -> anyhow::Result<RouteBinding> {
    let mut binding = RouteBinding::default();

    for ib in &bindings.interceptors {
        if ib.pattern != COMMON_PATTERN && ib.applies_to(&mapping.method, &mapping.pattern) {
            for name in &ib.components {
                binding.interceptors.push(registry.interceptor(name)?);
            }
        }
    }
    for sb in &bindings.preprocessors {
        if sb.applies_to(&mapping.method, &mapping.pattern) {
            binding.preprocessor = Some(registry.preprocessor(&sb.component)?);
        }
    }
    for sb in &bindings.postprocessors {
        if sb.applies_to(&mapping.method, &mapping.pattern) {
            binding.postprocessor = Some(registry.postprocessor(&sb.component)?);
        }
    }
    for sb in &bindings.hijackers {
        if sb.applies_to(&mapping.method, &mapping.pattern) {
            binding.hijacker = Some(registry.hijacker(&sb.component)?);
        }
    }

    Ok(binding)
}
