//! Config inspection tool: parses a gateway config, compiles its route
//! table and reports what would be served, optionally probing sample
//! requests against the matcher. Useful for catching malformed mappings
//! before a deploy.

use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;

use switchgate::config::{BindingConfig, ServiceConfig};
use switchgate::middleware::BaseInterceptor;
use switchgate::registry::ComponentRegistry;
use switchgate::router::build_table;

#[derive(Parser)]
#[command(name = "switchgate", about = "Inspect a switchgate configuration")]
struct Cli {
    /// Path to the service config YAML
    #[arg(short, long, env = "SWITCHGATE_CONFIG")]
    config: PathBuf,

    /// Sample requests to probe, e.g. "GET /hello/world" (repeatable)
    #[arg(short, long)]
    probe: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ServiceConfig::load(&cli.config)?;
    let mappings = config.parsed_mappings()?;
    // The real components only exist inside a running service; stand-ins
    // under the declared names let binding resolution and the pattern
    // regexes be validated the same way the gateway would at startup.
    let registry = stub_registry(&config.bindings);
    let table = build_table(&mappings, &config.bindings, &registry)?;

    println!(
        "{}: {} route(s) on port {}",
        config.service_name,
        table.len(),
        config.http_port
    );
    for route in table.routes() {
        println!("  {} {} -> {}", route.method, route.pattern, route.target);
    }

    for probe in &cli.probe {
        let mut parts = probe.split_whitespace();
        let (Some(method), Some(path)) = (parts.next(), parts.next()) else {
            anyhow::bail!("malformed probe {probe:?}, expected \"METHOD /path\"");
        };
        let method = http::Method::from_str(&method.to_ascii_uppercase())?;
        match table.matches(&method, path) {
            Some(m) => {
                let params: Vec<String> = m
                    .path_params
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect();
                println!(
                    "probe {method} {path} -> {} [{}]",
                    m.route.target,
                    params.join(", ")
                );
            }
            None => println!("probe {method} {path} -> no match (404)"),
        }
    }

    Ok(())
}

/// A registry with a no-op component under every name the bindings
/// reference, each registered in the role the binding expects.
fn stub_registry(bindings: &BindingConfig) -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    for ib in &bindings.interceptors {
        for name in &ib.components {
            registry.register_interceptor(name.clone(), BaseInterceptor);
        }
    }
    for sb in &bindings.preprocessors {
        registry.register_preprocessor(sb.component.clone(), |_res, _ctx| Ok(()));
    }
    for sb in &bindings.postprocessors {
        registry.register_postprocessor(sb.component.clone(), |_res, _ctx, _value| {});
    }
    for sb in &bindings.hijackers {
        registry.register_hijacker(sb.component.clone(), |_res, _ctx| {});
    }
    for cb in &bindings.convertors {
        registry.register_convertor(cb.component.clone(), |_ctx| {
            serde_json::Value::Object(serde_json::Map::new())
        });
    }
    if let Some(name) = &bindings.error_handler {
        registry.register_error_handler(name.clone(), |_res, _ctx, _err| {});
    }
    registry
}
