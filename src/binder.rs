//! Generic binding of HTTP request data into RPC argument values.
//!
//! No runtime introspection: each target method registers a static
//! signature (field name + kind per argument) alongside its switcher entry,
//! and binding is a walk over that descriptor table. A scalar field resolves
//! by normalized name from the context value bag, then query parameters,
//! then path placeholders; composite fields resolve through a registered
//! convertor or fall back to an empty object.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::dispatcher::RequestContext;
use crate::error::GatewayError;
use crate::middleware::Convertor;

/// Value kind of one declared argument or message field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Str,
    I64,
    U64,
    F64,
    Bool,
    /// Composite sub-message, resolved through a convertor keyed by this
    /// type name.
    Message(String),
}

impl FieldKind {
    fn label(&self) -> &str {
        match self {
            FieldKind::Str => "string",
            FieldKind::I64 => "int64",
            FieldKind::U64 => "uint64",
            FieldKind::F64 => "float64",
            FieldKind::Bool => "bool",
            FieldKind::Message(name) => name,
        }
    }
}

/// One field of an aggregate request type, or one positional parameter.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Declared name, exactly as the backend schema spells it
    /// (e.g. `yourName` or `int64_value`).
    pub name: String,
    pub kind: FieldKind,
}

impl FieldSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Static descriptor for a target method's argument shape; registered once
/// per method when the switcher is built.
#[derive(Debug, Clone)]
pub enum MethodSignature {
    /// One aggregate request struct (the gRPC style).
    Aggregate {
        type_name: String,
        fields: Vec<FieldSpec>,
    },
    /// Several positional parameters in signature order (the Thrift style).
    Positional { params: Vec<FieldSpec> },
}

/// Build the argument values for one invocation. Always returns one value
/// per declared parameter; an `Aggregate` signature yields a single object.
pub fn bind_arguments(
    signature: &MethodSignature,
    ctx: &RequestContext,
    convertors: &HashMap<String, Arc<Convertor>>,
) -> Result<Vec<Value>, GatewayError> {
    match signature {
        MethodSignature::Aggregate { fields, .. } => {
            let mut object = Map::with_capacity(fields.len());
            for field in fields {
                object.insert(field.name.clone(), resolve_field(field, ctx, convertors)?);
            }
            Ok(vec![Value::Object(object)])
        }
        MethodSignature::Positional { params } => params
            .iter()
            .map(|param| resolve_field(param, ctx, convertors))
            .collect(),
    }
}

fn resolve_field(
    field: &FieldSpec,
    ctx: &RequestContext,
    convertors: &HashMap<String, Arc<Convertor>>,
) -> Result<Value, GatewayError> {
    if let FieldKind::Message(type_name) = &field.kind {
        // A convertor owns the whole sub-field; per-field resolution never
        // sees the composite's members.
        return Ok(match convertors.get(type_name) {
            Some(convertor) => convertor(ctx),
            None => Value::Object(Map::new()),
        });
    }

    let wanted = normalize(&field.name);
    match find_raw(ctx, &wanted) {
        Some(Raw::Text(text)) => coerce_text(text, field),
        Some(Raw::Json(value)) => coerce_value(value, field),
        None => Ok(zero_value(&field.kind)),
    }
}

enum Raw<'a> {
    /// Query parameter or path placeholder text.
    Text(&'a str),
    /// Value attached to the context bag by an interceptor.
    Json(&'a Value),
}

/// Priority order: context bag, then query parameters, then path
/// placeholders. Names are compared snake_case-normalized.
fn find_raw<'a>(ctx: &'a RequestContext, wanted: &str) -> Option<Raw<'a>> {
    if let Some((_, v)) = ctx.values.iter().find(|(k, _)| normalize(k) == wanted) {
        return Some(Raw::Json(v));
    }
    if let Some((_, v)) = ctx
        .query_params
        .iter()
        .find(|(k, _)| normalize(k) == wanted)
    {
        return Some(Raw::Text(v));
    }
    ctx.path_params
        .iter()
        .rfind(|(k, _)| normalize(k) == wanted)
        .map(|(_, v)| Raw::Text(v))
}

/// Lowercase snake_case normalization: `yourName` and `your_name` compare
/// equal, case-insensitively.
fn normalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    let mut prev_lower = false;
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
            prev_lower = false;
        } else {
            prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
            out.push(ch);
        }
    }
    out
}

fn coerce_text(raw: &str, field: &FieldSpec) -> Result<Value, GatewayError> {
    match &field.kind {
        FieldKind::Str => Ok(Value::String(raw.to_string())),
        FieldKind::I64 => raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| bind_error(field, raw)),
        FieldKind::U64 => raw
            .parse::<u64>()
            .map(Value::from)
            .map_err(|_| bind_error(field, raw)),
        FieldKind::F64 => raw
            .parse::<f64>()
            .map(Value::from)
            .map_err(|_| bind_error(field, raw)),
        FieldKind::Bool => {
            if raw.eq_ignore_ascii_case("true") {
                Ok(Value::Bool(true))
            } else if raw.eq_ignore_ascii_case("false") {
                Ok(Value::Bool(false))
            } else {
                Err(bind_error(field, raw))
            }
        }
        FieldKind::Message(_) => Err(bind_error(field, raw)),
    }
}

/// Context-bag values are used as-is when their JSON type already matches
/// the field kind; strings go through the same coercion as request text.
fn coerce_value(value: &Value, field: &FieldSpec) -> Result<Value, GatewayError> {
    let matches = match (&field.kind, value) {
        (FieldKind::Str, Value::String(_)) | (FieldKind::Bool, Value::Bool(_)) => true,
        (FieldKind::I64, Value::Number(n)) => n.is_i64(),
        (FieldKind::U64, Value::Number(n)) => n.is_u64(),
        (FieldKind::F64, Value::Number(_)) => true,
        _ => false,
    };
    if matches {
        return Ok(value.clone());
    }
    match value {
        Value::String(s) if field.kind != FieldKind::Str => coerce_text(s, field),
        other => Err(bind_error(field, &other.to_string())),
    }
}

/// Absent optional fields keep their zero value, mirroring protobuf
/// defaults; absence is not an error.
fn zero_value(kind: &FieldKind) -> Value {
    match kind {
        FieldKind::Str => Value::String(String::new()),
        FieldKind::I64 => Value::from(0i64),
        FieldKind::U64 => Value::from(0u64),
        FieldKind::F64 => Value::from(0.0f64),
        FieldKind::Bool => Value::Bool(false),
        FieldKind::Message(_) => Value::Object(Map::new()),
    }
}

fn bind_error(field: &FieldSpec, raw: &str) -> GatewayError {
    GatewayError::BindFailed {
        message: format!(
            "invalid {} value {:?} for field {:?}",
            field.kind.label(),
            raw,
            field.name
        ),
    }
}
