//! Declarative gateway configuration.
//!
//! A gateway is driven entirely by a YAML file: the HTTP port, the backend
//! service address, an ordered list of route mappings of the shape
//! `METHOD path_pattern target_method`, and per-route middleware bindings
//! referencing registered component names. The file is re-read verbatim on
//! every reload; nothing in it is cached between rebuilds.

use anyhow::{bail, Context};
use http::Method;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Deployment environment tag; selects default log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// Top-level service configuration consumed by the gateway core.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub http_port: u16,
    #[serde(default)]
    pub environment: Environment,
    pub service_name: String,
    #[serde(default = "default_service_host")]
    pub service_host: String,
    #[serde(default)]
    pub service_port: u16,
    /// Optional log file; absent means stdout only.
    #[serde(default)]
    pub log_path: Option<PathBuf>,
    /// Ordered `METHOD path_pattern target_method` entries. Order matters:
    /// it breaks specificity ties during route matching.
    #[serde(default)]
    pub route_mappings: Vec<String>,
    #[serde(default)]
    pub bindings: BindingConfig,
}

fn default_service_host() -> String {
    "127.0.0.1".to_string()
}

impl ServiceConfig {
    /// Load and deserialize a config file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: ServiceConfig = serde_yaml::from_str(&raw)
            .with_context(|| format!("malformed config file {}", path.display()))?;
        Ok(config)
    }

    /// Parse the raw mapping lines into structured entries, preserving
    /// declaration order. A single malformed line fails the whole parse so a
    /// reload never installs a partially understood table.
    pub fn parsed_mappings(&self) -> anyhow::Result<Vec<RouteMapping>> {
        self.route_mappings
            .iter()
            .map(|line| line.parse::<RouteMapping>())
            .collect()
    }
}

/// One `METHOD path_pattern target_method` route mapping entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMapping {
    pub method: Method,
    pub pattern: String,
    pub target: String,
}

impl FromStr for RouteMapping {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> anyhow::Result<Self> {
        let mut parts = line.split_whitespace();
        let (Some(method), Some(pattern), Some(target)) =
            (parts.next(), parts.next(), parts.next())
        else {
            bail!("malformed route mapping {line:?}, expected \"METHOD pattern target\"");
        };
        if parts.next().is_some() {
            bail!("malformed route mapping {line:?}, trailing tokens");
        }
        if !pattern.starts_with('/') {
            bail!("malformed route mapping {line:?}, pattern must start with '/'");
        }
        let method = Method::from_str(&method.to_ascii_uppercase())
            .with_context(|| format!("invalid HTTP method in route mapping {line:?}"))?;
        Ok(RouteMapping {
            method,
            pattern: pattern.to_string(),
            target: target.to_string(),
        })
    }
}

/// Middleware bindings keyed by `(methods, path_pattern)`.
///
/// An interceptor entry whose pattern is `/` declares the global default
/// interceptor list, applied to routes that bind none of their own.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BindingConfig {
    #[serde(default)]
    pub interceptors: Vec<InterceptorBinding>,
    #[serde(default)]
    pub preprocessors: Vec<SlotBinding>,
    #[serde(default)]
    pub postprocessors: Vec<SlotBinding>,
    #[serde(default)]
    pub hijackers: Vec<SlotBinding>,
    /// Convertor component per destination composite type name.
    #[serde(default)]
    pub convertors: Vec<ConvertorBinding>,
    /// Single global error handler component name.
    #[serde(default)]
    pub error_handler: Option<String>,
}

/// Ordered interceptor component list for one route pattern.
#[derive(Debug, Clone, Deserialize)]
pub struct InterceptorBinding {
    /// Empty means any method.
    #[serde(default)]
    pub methods: Vec<String>,
    pub pattern: String,
    pub components: Vec<String>,
}

/// Single-component slot (preprocessor, postprocessor or hijacker).
#[derive(Debug, Clone, Deserialize)]
pub struct SlotBinding {
    #[serde(default)]
    pub methods: Vec<String>,
    pub pattern: String,
    pub component: String,
}

impl InterceptorBinding {
    #[must_use]
    pub fn applies_to(&self, method: &Method, pattern: &str) -> bool {
        applies(&self.methods, &self.pattern, method, pattern)
    }
}

impl SlotBinding {
    #[must_use]
    pub fn applies_to(&self, method: &Method, pattern: &str) -> bool {
        applies(&self.methods, &self.pattern, method, pattern)
    }
}

fn applies(methods: &[String], own_pattern: &str, method: &Method, pattern: &str) -> bool {
    own_pattern == pattern
        && (methods.is_empty()
            || methods
                .iter()
                .any(|m| m.eq_ignore_ascii_case(method.as_str())))
}

/// Binds a convertor component to a composite argument type name.
#[derive(Debug, Clone, Deserialize)]
pub struct ConvertorBinding {
    /// Destination composite type name, e.g. `CommonValues`.
    pub message: String,
    pub component: String,
}
