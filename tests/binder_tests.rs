mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use http::Method;
use serde_json::{json, Value};

use switchgate::binder::{bind_arguments, FieldKind, FieldSpec, MethodSignature};
use switchgate::dispatcher::RequestContext;
use switchgate::error::GatewayError;
use switchgate::ids::RequestId;
use switchgate::middleware::Convertor;
use switchgate::router::ParamVec;

fn ctx(query: &[(&str, &str)], path: &[(&str, &str)]) -> RequestContext {
    let mut path_params = ParamVec::new();
    for (k, v) in path {
        path_params.push((Arc::from(*k), (*v).to_string()));
    }
    RequestContext {
        request_id: RequestId::new(),
        method: Method::GET,
        path: "/test".to_string(),
        target: "Test".to_string(),
        path_params,
        query_params: query
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect(),
        headers: HashMap::new(),
        body: None,
        values: HashMap::new(),
        started: Instant::now(),
    }
}

fn no_convertors() -> HashMap<String, Arc<Convertor>> {
    HashMap::new()
}

fn aggregate(fields: Vec<FieldSpec>) -> MethodSignature {
    MethodSignature::Aggregate {
        type_name: "TestRequest".to_string(),
        fields,
    }
}

#[test]
fn test_scalars_coerce_from_query_text() {
    let signature = aggregate(vec![
        FieldSpec::new("yourName", FieldKind::Str),
        FieldSpec::new("int64Value", FieldKind::I64),
        FieldSpec::new("boolValue", FieldKind::Bool),
        FieldSpec::new("float64Value", FieldKind::F64),
    ]);
    let ctx = ctx(
        &[
            ("your_name", "grace"),
            ("int64_value", "64"),
            ("bool_value", "true"),
            ("float64_value", "1.23"),
        ],
        &[],
    );
    let args = bind_arguments(&signature, &ctx, &no_convertors()).unwrap();
    assert_eq!(
        args,
        vec![json!({
            "yourName": "grace",
            "int64Value": 64,
            "boolValue": true,
            "float64Value": 1.23,
        })]
    );
}

#[test]
fn test_camel_case_query_keys_also_match() {
    let signature = aggregate(vec![FieldSpec::new("int64_value", FieldKind::I64)]);
    let ctx = ctx(&[("int64Value", "7")], &[]);
    let args = bind_arguments(&signature, &ctx, &no_convertors()).unwrap();
    assert_eq!(args[0]["int64_value"], json!(7));
}

#[test]
fn test_absent_fields_get_zero_values() {
    let signature = aggregate(vec![
        FieldSpec::new("yourName", FieldKind::Str),
        FieldSpec::new("int64Value", FieldKind::I64),
        FieldSpec::new("uint64Value", FieldKind::U64),
        FieldSpec::new("boolValue", FieldKind::Bool),
        FieldSpec::new("float64Value", FieldKind::F64),
        FieldSpec::new("values", FieldKind::Message("CommonValues".to_string())),
    ]);
    let ctx = ctx(&[], &[]);
    let args = bind_arguments(&signature, &ctx, &no_convertors()).unwrap();
    assert_eq!(
        args,
        vec![json!({
            "yourName": "",
            "int64Value": 0,
            "uint64Value": 0,
            "boolValue": false,
            "float64Value": 0.0,
            "values": {},
        })]
    );
}

#[test]
fn test_context_bag_beats_query_beats_path() {
    let signature = aggregate(vec![FieldSpec::new("yourName", FieldKind::Str)]);

    let mut ctx_all = ctx(&[("your_name", "fromquery")], &[("your_name", "frompath")]);
    ctx_all.set_value("your_name", json!("frombag"));
    let args = bind_arguments(&signature, &ctx_all, &no_convertors()).unwrap();
    assert_eq!(args[0]["yourName"], json!("frombag"));

    let ctx_no_bag = ctx(&[("your_name", "fromquery")], &[("your_name", "frompath")]);
    let args = bind_arguments(&signature, &ctx_no_bag, &no_convertors()).unwrap();
    assert_eq!(args[0]["yourName"], json!("fromquery"));

    let ctx_path_only = ctx(&[], &[("your_name", "frompath")]);
    let args = bind_arguments(&signature, &ctx_path_only, &no_convertors()).unwrap();
    assert_eq!(args[0]["yourName"], json!("frompath"));
}

#[test]
fn test_duplicate_path_placeholder_last_wins() {
    let signature = aggregate(vec![FieldSpec::new("id", FieldKind::Str)]);
    let ctx = ctx(&[], &[("id", "outer"), ("id", "inner")]);
    let args = bind_arguments(&signature, &ctx, &no_convertors()).unwrap();
    assert_eq!(args[0]["id"], json!("inner"));
}

#[test]
fn test_bag_values_keep_matching_json_types() {
    let signature = aggregate(vec![
        FieldSpec::new("count", FieldKind::I64),
        FieldSpec::new("label", FieldKind::Str),
    ]);
    let mut ctx = ctx(&[], &[]);
    ctx.set_value("count", json!(42));
    ctx.set_value("label", json!("tagged"));
    let args = bind_arguments(&signature, &ctx, &no_convertors()).unwrap();
    assert_eq!(args[0], json!({ "count": 42, "label": "tagged" }));
}

#[test]
fn test_bag_string_is_coerced_to_field_kind() {
    let signature = aggregate(vec![FieldSpec::new("count", FieldKind::I64)]);
    let mut ctx = ctx(&[], &[]);
    ctx.set_value("count", json!("42"));
    let args = bind_arguments(&signature, &ctx, &no_convertors()).unwrap();
    assert_eq!(args[0]["count"], json!(42));
}

#[test]
fn test_unparseable_text_is_a_bind_error() {
    let signature = aggregate(vec![FieldSpec::new("int64Value", FieldKind::I64)]);
    let ctx = ctx(&[("int64_value", "not-a-number")], &[]);
    let err = bind_arguments(&signature, &ctx, &no_convertors()).unwrap_err();
    assert!(matches!(err, GatewayError::BindFailed { .. }));
    assert!(err.to_string().contains("int64Value"));

    let signature = aggregate(vec![FieldSpec::new("boolValue", FieldKind::Bool)]);
    let ctx = self::ctx(&[("bool_value", "yes")], &[]);
    assert!(bind_arguments(&signature, &ctx, &no_convertors()).is_err());
}

#[test]
fn test_convertor_output_taken_verbatim() {
    let signature = aggregate(vec![FieldSpec::new(
        "values",
        FieldKind::Message("CommonValues".to_string()),
    )]);
    let mut convertors: HashMap<String, Arc<Convertor>> = HashMap::new();
    convertors.insert(
        "CommonValues".to_string(),
        Arc::new(|ctx: &RequestContext| {
            json!({ "someId": 1111111, "path": ctx.path })
        }),
    );
    let ctx = ctx(&[("some_id", "999")], &[]);
    let args = bind_arguments(&signature, &ctx, &convertors).unwrap();
    // The convertor owns the composite; query data never leaks into it.
    assert_eq!(
        args[0]["values"],
        json!({ "someId": 1111111, "path": "/test" })
    );
}

#[test]
fn test_positional_signature_binds_in_order() {
    let signature = MethodSignature::Positional {
        params: vec![
            FieldSpec::new("yourName", FieldKind::Str),
            FieldSpec::new("int64Value", FieldKind::I64),
        ],
    };
    let ctx = ctx(&[("your_name", "grace"), ("int64_value", "64")], &[]);
    let args = bind_arguments(&signature, &ctx, &no_convertors()).unwrap();
    assert_eq!(args, vec![json!("grace"), json!(64)]);
}

#[test]
fn test_positional_absent_param_gets_zero_value() {
    let signature = MethodSignature::Positional {
        params: vec![FieldSpec::new("int64Value", FieldKind::I64)],
    };
    let ctx = ctx(&[], &[]);
    let args = bind_arguments(&signature, &ctx, &no_convertors()).unwrap();
    assert_eq!(args, vec![Value::from(0i64)]);
}
