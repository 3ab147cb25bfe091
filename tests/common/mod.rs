//! 통합 테스트 공용 헬퍼: 도메인 디렉토리 픽스처와 로컬 다운스트림 서버

#![allow(dead_code)]

use std::convert::Infallible;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::json;
use tokio::net::TcpListener;

use gateway_lite::middleware;

pub fn write(dir: &Path, name: &str, content: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(name), content).unwrap();
}

/// 요청 정보를 JSON으로 돌려주는 다운스트림.
///
/// - `not_found` 접두사로 시작하는 경로는 404
/// - 그 외에는 200과 `{"name", "path", "method", "host", "x_real_ip", "x_forwarded_for", "x_forwarded_proto", "body_len"}`
pub async fn spawn_downstream(name: &'static str, not_found: Option<&'static str>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| echo(name, not_found, req));
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    addr
}

async fn echo(name: &'static str, not_found: Option<&'static str>, req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    let header = |key: &str| {
        req.headers()
            .get(key)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let info = json!({
        "name": name,
        "path": req.uri().path_and_query().map(|pq| pq.as_str()).unwrap_or("/"),
        "method": req.method().as_str(),
        "host": header("host"),
        "x_real_ip": header("x-real-ip"),
        "x_forwarded_for": header("x-forwarded-for"),
        "x_forwarded_proto": header("x-forwarded-proto"),
    });
    let missing = not_found.is_some_and(|prefix| req.uri().path().starts_with(prefix));
    let body_len = req.into_body().collect().await.map(|c| c.to_bytes().len()).unwrap_or(0);

    let mut info = info;
    info["body_len"] = json!(body_len);

    let status = if missing { StatusCode::NOT_FOUND } else { StatusCode::OK };
    let mut res = Response::new(Full::new(Bytes::from(info.to_string())));
    *res.status_mut() = status;
    Ok(res)
}

/// 연결을 거부하는 주소 (바인딩 후 바로 닫음)
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub fn request(method: &str, host: &str, uri: &str, body: &'static [u8]) -> middleware::Request {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(hyper::header::HOST, host)
        .body(Full::new(Bytes::from_static(body)).map_err(|never| match never {}).boxed())
        .unwrap()
}

pub async fn body_json(res: middleware::Response) -> serde_json::Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_string(res: middleware::Response) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// 테스트용 CA. 도메인 인증서를 발급해 sni 디렉토리에 씁니다.
pub struct TestCa {
    ca: rcgen::Certificate,
}

impl TestCa {
    pub fn new() -> Self {
        let mut params = rcgen::CertificateParams::new(Vec::<String>::new());
        params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
        params
            .distinguished_name
            .push(rcgen::DnType::CommonName, "gateway-lite test CA");
        Self {
            ca: rcgen::Certificate::from_params(params).unwrap(),
        }
    }

    pub fn der(&self) -> Vec<u8> {
        self.ca.serialize_der().unwrap()
    }

    /// `<dir>/cert.pem`, `<dir>/key.pem`을 씁니다.
    pub fn issue(&self, name: &str, dir: &Path) {
        let leaf = rcgen::Certificate::from_params(rcgen::CertificateParams::new(vec![name.to_string()])).unwrap();
        write(dir, "cert.pem", &leaf.serialize_pem_with_signer(&self.ca).unwrap());
        write(dir, "key.pem", &leaf.serialize_private_key_pem());
    }

    /// 이 CA만 신뢰하는 TLS 클라이언트
    pub fn connector(&self) -> tokio_rustls::TlsConnector {
        use tokio_rustls::rustls;

        let mut roots = rustls::RootCertStore::empty();
        roots.add(&rustls::Certificate(self.der())).unwrap();
        let config = rustls::ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(roots)
            .with_no_client_auth();
        tokio_rustls::TlsConnector::from(std::sync::Arc::new(config))
    }
}
