#![allow(dead_code)]

pub mod temp_files {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

    /// Creates a temp file with a unique name to avoid cross-test races.
    pub fn create_temp_yaml(content: &str) -> PathBuf {
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::SeqCst);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "switchgate_test_{}_{}_{}.yaml",
            std::process::id(),
            counter,
            nanos
        ));
        std::fs::write(&path, content).unwrap();
        path
    }
}

pub mod test_server {
    use std::sync::Once;

    static MAY_INIT: Once = Once::new();

    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }
}

/// A small "hello" backend: the switcher and components the integration
/// tests wire together, standing in for backend-generated setup code.
pub mod demo {
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use switchgate::binder::{FieldKind, FieldSpec, MethodSignature};
    use switchgate::registry::ComponentRegistry;
    use switchgate::switcher::Switcher;

    /// Counts backend invocations so tests can assert INVOKE was skipped.
    pub fn hello_switcher(calls: Arc<AtomicUsize>) -> Switcher {
        let mut switcher = Switcher::new();
        switcher.register(
            "SayHello",
            MethodSignature::Aggregate {
                type_name: "SayHelloRequest".to_string(),
                fields: vec![
                    FieldSpec::new("values", FieldKind::Message("CommonValues".to_string())),
                    FieldSpec::new("yourName", FieldKind::Str),
                    FieldSpec::new("int64Value", FieldKind::I64),
                    FieldSpec::new("boolValue", FieldKind::Bool),
                    FieldSpec::new("float64Value", FieldKind::F64),
                ],
            },
            move |args: &[Value]| {
                calls.fetch_add(1, Ordering::SeqCst);
                let name = args[0]["yourName"].as_str().unwrap_or_default();
                Ok(json!({ "message": format!("Hello, {name}") }))
            },
        );
        switcher.register(
            "EchoValues",
            MethodSignature::Aggregate {
                type_name: "EchoValuesRequest".to_string(),
                fields: vec![FieldSpec::new(
                    "values",
                    FieldKind::Message("CommonValues".to_string()),
                )],
            },
            |args: &[Value]| Ok(args[0]["values"].clone()),
        );
        switcher.register(
            "AlwaysFails",
            MethodSignature::Positional { params: vec![] },
            |_args: &[Value]| Err(anyhow::anyhow!("rpc error: backend exploded")),
        );
        switcher
    }

    /// Interceptors/processors matching the names the test configs bind.
    pub fn hello_registry() -> ComponentRegistry {
        let mut registry = ComponentRegistry::new();
        registry.register_interceptor("prefixer", Prefixer("intercepted:"));
        registry.register_interceptor("prefixer1", Prefixer("test1_intercepted:"));
        registry.register_interceptor("aborter", Aborter);
        registry.register_preprocessor("failing_pre", |_res, _ctx| {
            Err(anyhow::anyhow!("error in preprocessor"))
        });
        registry.register_preprocessor("tagging_pre", |res, _ctx| {
            res.write_str("preprocessor:");
            Ok(())
        });
        registry.register_postprocessor("message_post", |res, _ctx, value| {
            res.write_str("postprocessor:");
            res.write_str(value["message"].as_str().unwrap_or_default());
        });
        registry.register_hijacker("hijack", |res, _ctx| {
            res.write_str("hijacker");
        });
        registry.register_error_handler("handler", |res, _ctx, err| {
            res.write_str("from errorHandler:");
            res.write_str(&err.to_string());
        });
        registry.register_convertor("common_values", |_ctx| json!({ "someId": 1111111 }));
        registry
    }

    struct Prefixer(&'static str);

    impl switchgate::middleware::Interceptor for Prefixer {
        fn before(
            &self,
            res: &mut switchgate::dispatcher::ResponseSink,
            _ctx: &mut switchgate::dispatcher::RequestContext,
        ) -> anyhow::Result<()> {
            res.write_str(self.0);
            Ok(())
        }
    }

    struct Aborter;

    impl switchgate::middleware::Interceptor for Aborter {
        fn before(
            &self,
            res: &mut switchgate::dispatcher::ResponseSink,
            _ctx: &mut switchgate::dispatcher::RequestContext,
        ) -> anyhow::Result<()> {
            res.write_str("interceptor_error:");
            Err(anyhow::anyhow!("interceptor aborted"))
        }
    }
}
