mod common;

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use switchgate::binder::MethodSignature;
use switchgate::config::BindingConfig;
use switchgate::dispatcher::Dispatcher;
use switchgate::registry::ComponentRegistry;
use switchgate::router::build_table;
use switchgate::server::{Gateway, GatewayService, HttpServer};
use switchgate::switcher::Switcher;

use common::{demo, temp_files::create_temp_yaml, test_server::setup_may_runtime};

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn send_request(addr: &SocketAddr, req: &str) -> String {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.write_all(req.as_bytes()).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_millis(100)))
        .unwrap();
    let mut buf = Vec::new();
    loop {
        let mut tmp = [0u8; 1024];
        match stream.read(&mut tmp) {
            Ok(0) => break,
            Ok(n) => buf.extend_from_slice(&tmp[..n]),
            Err(ref e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                break
            }
            Err(e) => panic!("read error: {:?}", e),
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

fn start_hello_server(calls: Arc<AtomicUsize>) -> (switchgate::server::ServerHandle, SocketAddr) {
    setup_may_runtime();
    let registry = demo::hello_registry();
    let mappings = vec![
        "GET /hello/{your_name:[a-zA-Z0-9]+} SayHello"
            .parse()
            .unwrap(),
        "GET /hello SayHello".parse().unwrap(),
    ];
    let table = build_table(&mappings, &BindingConfig::default(), &registry).unwrap();
    let dispatcher = Arc::new(Dispatcher::new(table, demo::hello_switcher(calls)).unwrap());

    let addr: SocketAddr = format!("127.0.0.1:{}", free_port()).parse().unwrap();
    let handle = HttpServer(GatewayService::new(dispatcher))
        .start(addr)
        .unwrap();
    handle.wait_ready().unwrap();
    (handle, addr)
}

#[test]
fn test_http_request_reaches_backend() {
    let calls = Arc::new(AtomicUsize::new(0));
    let (handle, addr) = start_hello_server(calls.clone());

    let response = send_request(
        &addr,
        "GET /hello/testtest HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    );
    assert!(response.starts_with("HTTP/1.1 200"), "got: {response}");
    assert!(response.contains(r#"{"message":"Hello, testtest"}"#));
    assert!(response.to_ascii_lowercase().contains("application/json"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    handle.stop();
}

#[test]
fn test_http_query_string_binds_arguments() {
    let calls = Arc::new(AtomicUsize::new(0));
    let (handle, addr) = start_hello_server(calls);

    let response = send_request(
        &addr,
        "GET /hello?your_name=fromquery HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    );
    assert!(response.contains(r#"{"message":"Hello, fromquery"}"#));

    handle.stop();
}

#[test]
fn test_http_unknown_route_is_404() {
    let calls = Arc::new(AtomicUsize::new(0));
    let (handle, addr) = start_hello_server(calls.clone());

    let response = send_request(
        &addr,
        "GET /nope HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    );
    assert!(response.starts_with("HTTP/1.1 404"), "got: {response}");
    assert!(response.contains("404 page not found"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    handle.stop();
}

#[test]
fn test_gateway_lifecycle_and_shutdown_order() {
    setup_may_runtime();
    let port = free_port();
    let config = format!(
        "http_port: {port}\nservice_name: hello\nroute_mappings:\n  - \"GET /hello/{{your_name:[a-zA-Z0-9]+}} SayHello\"\n"
    );
    let path = create_temp_yaml(&config);

    let calls = Arc::new(AtomicUsize::new(0));
    let mut gateway = Gateway::new(
        &path,
        demo::hello_registry(),
        demo::hello_switcher(calls),
    )
    .unwrap();

    let backend_stopped = Arc::new(AtomicBool::new(false));
    let flag = backend_stopped.clone();
    gateway.on_backend_stop(move || {
        flag.store(true, Ordering::SeqCst);
    });

    let handle = gateway.start().unwrap();
    handle.wait_ready().unwrap();

    let addr: SocketAddr = format!("127.0.0.1:{port}").parse().unwrap();
    let response = send_request(
        &addr,
        "GET /hello/testtest HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    );
    assert!(response.contains(r#"{"message":"Hello, testtest"}"#));
    assert!(!backend_stopped.load(Ordering::SeqCst));

    gateway.stop(handle);
    assert!(backend_stopped.load(Ordering::SeqCst));
    std::fs::remove_file(path).ok();
}

#[test]
fn test_stop_drains_in_flight_before_backend_hook() {
    setup_may_runtime();
    let port = free_port();
    let config = format!(
        "http_port: {port}\nservice_name: slow\nroute_mappings:\n  - \"GET /slow SlowCall\"\n"
    );
    let path = create_temp_yaml(&config);

    let completed = Arc::new(AtomicBool::new(false));
    let done = completed.clone();
    let mut switcher = Switcher::new();
    switcher.register(
        "SlowCall",
        MethodSignature::Positional { params: vec![] },
        move |_args| {
            std::thread::sleep(Duration::from_millis(300));
            done.store(true, Ordering::SeqCst);
            Ok(serde_json::json!({ "done": true }))
        },
    );

    let mut gateway = Gateway::new(&path, ComponentRegistry::new(), switcher).unwrap();
    // The hook records whether the slow invocation had finished by the
    // time the backend was torn down.
    let hook_saw_completed = Arc::new(AtomicBool::new(false));
    let saw = hook_saw_completed.clone();
    let at_hook = completed.clone();
    gateway.on_backend_stop(move || {
        saw.store(at_hook.load(Ordering::SeqCst), Ordering::SeqCst);
    });

    let handle = gateway.start().unwrap();
    handle.wait_ready().unwrap();

    let addr: SocketAddr = format!("127.0.0.1:{port}").parse().unwrap();
    let request = std::thread::spawn(move || {
        send_request(
            &addr,
            "GET /slow HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
    });
    // Let the request get past accept and into the backend call.
    std::thread::sleep(Duration::from_millis(100));

    gateway.stop(handle);
    assert!(hook_saw_completed.load(Ordering::SeqCst));
    let _ = request.join();
    std::fs::remove_file(path).ok();
}
