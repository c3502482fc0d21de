//! End-to-end upgrade relay over real sockets.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::Instant;

use wakegate_autoscale::{ScaleController, StaticCredentials, WorkloadRef};
use wakegate_health::HealthProber;
use wakegate_proxy::{build_router, Dispatcher, Forwarder};
use wakegate_state::{ProxyState, StateConfig};

/// Read until the end of an HTTP head.
async fn read_head(stream: &mut TcpStream) -> String {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        let n = stream.read(&mut byte).await.unwrap();
        assert!(n > 0, "connection closed before end of head");
        head.push(byte[0]);
    }
    String::from_utf8(head).unwrap()
}

/// A backend that accepts one upgrade and echoes bytes back.
async fn spawn_echo_backend() -> (SocketAddr, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let head = read_head(&mut stream).await;
        stream
            .write_all(
                b"HTTP/1.1 101 Switching Protocols\r\n\
                  connection: Upgrade\r\n\
                  upgrade: websocket\r\n\r\n",
            )
            .await
            .unwrap();

        let mut buf = [0u8; 64];
        loop {
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            stream.write_all(&buf[..n]).await.unwrap();
        }
        head
    });
    (addr, handle)
}

async fn spawn_proxy(backend: SocketAddr) -> SocketAddr {
    let state = ProxyState::new(
        StateConfig::new(Duration::from_secs(600), Duration::from_secs(3600)),
        Instant::now(),
    );
    // The raw backend only speaks the upgrade; skip the probe.
    state.mark_healthy(Instant::now());

    let forwarder = Forwarder::new(&format!("http://{backend}"), "/ws", Duration::from_secs(1)).unwrap();
    let prober = HealthProber::new(state.clone(), forwarder.target().clone(), Duration::from_secs(1)).unwrap();
    let scaler = ScaleController::new(
        state.clone(),
        WorkloadRef::new("http://127.0.0.1:1", "test", "t2"),
        Arc::new(StaticCredentials::new("secret")),
        Duration::from_secs(1),
    )
    .unwrap();
    let dispatcher = Dispatcher::new(state, prober, scaler, forwarder, Duration::ZERO);
    let router = build_router(Arc::new(dispatcher), "/vmessws");

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}

#[tokio::test]
async fn websocket_upgrade_is_relayed_both_ways() {
    let (backend_addr, backend) = spawn_echo_backend().await;
    let proxy_addr = spawn_proxy(backend_addr).await;

    let mut client = TcpStream::connect(proxy_addr).await.unwrap();
    client
        .write_all(
            b"GET /vmessws?ed=2048 HTTP/1.1\r\n\
              host: proxy.example\r\n\
              connection: Upgrade\r\n\
              upgrade: websocket\r\n\
              sec-websocket-key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
              sec-websocket-version: 13\r\n\r\n",
        )
        .await
        .unwrap();

    let head = read_head(&mut client).await;
    assert!(head.starts_with("HTTP/1.1 101"), "unexpected head: {head}");

    client.write_all(b"ping").await.unwrap();
    let mut echoed = [0u8; 4];
    tokio::time::timeout(Duration::from_secs(2), client.read_exact(&mut echoed))
        .await
        .expect("echo timed out")
        .unwrap();
    assert_eq!(&echoed, b"ping");

    drop(client);
    let backend_head = tokio::time::timeout(Duration::from_secs(2), backend)
        .await
        .expect("backend did not finish")
        .unwrap()
        .to_ascii_lowercase();

    assert!(backend_head.starts_with("get /ws?ed=2048 http/1.1"));
    assert!(backend_head.contains("upgrade: websocket"));
    assert!(backend_head.contains("sec-websocket-key: dghlihnhbxbszsbub25jzq=="));
    assert!(backend_head.contains(&format!("host: {backend_addr}")));
    assert!(backend_head.contains("x-forwarded-for: 127.0.0.1\r\n"));
}
