mod common;

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{header, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use common::write;
use gateway_lite::domain::{DomainLoader, PROXY_FILE};
use gateway_lite::middleware::Scheme;
use gateway_lite::proxy::ProxyClient;
use gateway_lite::routing::{https_pipeline, VirtualHostTable};
use gateway_lite::server::RequestHandler;
use gateway_lite::settings::GlobalOverrides;

const DOMAIN: &str = "www.example.com";

/// 업그레이드 후 받은 바이트를 그대로 돌려주는 다운스트림
async fn spawn_echo_upgrade() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let service = service_fn(|mut req: Request<Incoming>| async move {
                    if !req.headers().contains_key(header::UPGRADE) {
                        let mut res = Response::new(Full::new(Bytes::from_static(b"plain")));
                        *res.status_mut() = StatusCode::OK;
                        return Ok::<_, Infallible>(res);
                    }
                    tokio::spawn(async move {
                        if let Ok(upgraded) = hyper::upgrade::on(&mut req).await {
                            let mut io = TokioIo::new(upgraded);
                            let mut buf = [0u8; 64];
                            while let Ok(n) = io.read(&mut buf).await {
                                if n == 0 || io.write_all(&buf[..n]).await.is_err() {
                                    break;
                                }
                            }
                        }
                    });
                    let mut res = Response::new(Full::new(Bytes::new()));
                    *res.status_mut() = StatusCode::SWITCHING_PROTOCOLS;
                    res.headers_mut().insert(header::UPGRADE, "websocket".parse().unwrap());
                    res.headers_mut().insert(header::CONNECTION, "Upgrade".parse().unwrap());
                    Ok(res)
                });
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .with_upgrades()
                    .await;
            });
        }
    });
    addr
}

/// 게이트웨이 요청 처리기를 평문 TCP 위에서 띄웁니다.
async fn spawn_gateway(handler: RequestHandler) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);
    tokio::spawn(async move {
        while let Ok((stream, client_addr)) = listener.accept().await {
            let handler = handler.clone();
            tokio::spawn(async move {
                let _ = handler.handle_connection(TokioIo::new(stream), client_addr).await;
            });
        }
    });
    addr
}

async fn read_head(stream: &mut TcpStream) -> String {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        let n = stream.read(&mut byte).await.unwrap();
        assert!(n > 0, "연결이 닫힘");
        head.push(byte[0]);
    }
    String::from_utf8(head).unwrap()
}

#[tokio::test]
async fn test_websocket_upgrade_is_tunneled() {
    let downstream = spawn_echo_upgrade().await;
    let base = tempfile::tempdir().unwrap();
    write(
        &base.path().join(DOMAIN),
        PROXY_FILE,
        &format!(r#"[["/ws", "{}", {{"ws": true}}]]"#, downstream),
    );
    let overrides = GlobalOverrides::default();
    let config = DomainLoader::new(base.path(), &overrides).load(DOMAIN).unwrap();
    let mut table = VirtualHostTable::new();
    table.insert(https_pipeline(&config, 443, &ProxyClient::new()));
    let gateway = spawn_gateway(RequestHandler::new(table, Scheme::Https)).await;

    let mut stream = TcpStream::connect(gateway).await.unwrap();
    stream
        .write_all(
            format!(
                "GET /ws/chat HTTP/1.1\r\nHost: {}\r\nConnection: Upgrade\r\nUpgrade: websocket\r\n\r\n",
                DOMAIN
            )
            .as_bytes(),
        )
        .await
        .unwrap();

    let head = read_head(&mut stream).await;
    assert!(head.starts_with("HTTP/1.1 101"), "{}", head);

    stream.write_all(b"ping").await.unwrap();
    let mut echoed = [0u8; 4];
    stream.read_exact(&mut echoed).await.unwrap();
    assert_eq!(&echoed, b"ping");
}

#[tokio::test]
async fn test_plain_request_on_websocket_rule_is_forwarded() {
    let downstream = spawn_echo_upgrade().await;
    let base = tempfile::tempdir().unwrap();
    write(
        &base.path().join(DOMAIN),
        PROXY_FILE,
        &format!(r#"[["/ws", "{}", {{"ws": true}}]]"#, downstream),
    );
    let overrides = GlobalOverrides::default();
    let config = DomainLoader::new(base.path(), &overrides).load(DOMAIN).unwrap();
    let mut table = VirtualHostTable::new();
    table.insert(https_pipeline(&config, 443, &ProxyClient::new()));
    let handler = RequestHandler::new(table, Scheme::Https);

    let res = handler
        .dispatch(common::request("GET", DOMAIN, "/ws/info", b""), "127.0.0.1:40000".parse().unwrap())
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(common::body_string(res).await, "plain");
}

#[tokio::test]
async fn test_websocket_refused_is_504() {
    let dead = common::closed_port().await;
    let base = tempfile::tempdir().unwrap();
    write(
        &base.path().join(DOMAIN),
        PROXY_FILE,
        &format!(r#"[["/ws", "{}", {{"ws": true}}]]"#, dead),
    );
    let overrides = GlobalOverrides::default();
    let config = DomainLoader::new(base.path(), &overrides).load(DOMAIN).unwrap();
    let mut table = VirtualHostTable::new();
    table.insert(https_pipeline(&config, 443, &ProxyClient::new()));
    let handler = RequestHandler::new(table, Scheme::Https);

    let mut req = common::request("GET", DOMAIN, "/ws", b"");
    req.headers_mut().insert(header::CONNECTION, "Upgrade".parse().unwrap());
    req.headers_mut().insert(header::UPGRADE, "websocket".parse().unwrap());
    let res = handler.dispatch(req, "127.0.0.1:40000".parse().unwrap()).await;
    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
}
