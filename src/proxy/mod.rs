//! 프록시 엔진.
//!
//! 규칙 하나가 `ProxyMount` 하나가 되어 도메인 파이프라인에 등록됩니다.
//! 일반 HTTP 요청은 본문을 버퍼링해 전달하고, WebSocket 규칙은 업그레이드
//! 이후 양방향 스트림을 그대로 잇습니다.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{self, HeaderMap, HeaderName, HeaderValue};
use hyper_util::client::legacy;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tracing::{debug, warn};

use crate::domain::ProxyRule;
use crate::middleware::basic_auth::AuthGate;
use crate::middleware::{response, Flow, Middleware, MiddlewareError, Request, RequestContext, Response, Scheme};

mod error;
mod http;
pub mod path;
mod websocket;

pub use error::DownstreamError;

/// 버퍼링 요청의 기본 타임아웃. 응답 본문 수신까지 포함합니다.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(2 * 60);

const X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");
const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// 다운스트림 요청용 HTTP 클라이언트. 모든 규칙이 연결 풀을 공유합니다.
#[derive(Clone)]
pub struct ProxyClient {
    client: legacy::Client<HttpConnector, Full<Bytes>>,
    timeout: Duration,
}

impl ProxyClient {
    pub fn new() -> Self {
        let connector = HttpConnector::new();
        let client = legacy::Client::builder(TokioExecutor::new())
            .build::<_, Full<Bytes>>(connector);

        Self {
            client,
            timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for ProxyClient {
    fn default() -> Self {
        Self::new()
    }
}

/// 규칙 하나의 처리 결과
#[derive(Debug)]
pub enum ProxyOutcome {
    /// 다운스트림 응답을 클라이언트에 전달
    Forwarded(Response),
    /// cascade 규칙에서 다운스트림이 404를 돌려줌. 다음 규칙으로 진행
    CascadeToNext(Request),
    Failed(DownstreamError),
}

/// 요청 로그용으로 응답 extension에 남기는 전달 정보
#[derive(Debug, Clone)]
pub struct ForwardedTo {
    pub mount: String,
    pub downstream: String,
}

/// 마운트 경로에 연결된 프록시 규칙
pub struct ProxyMount {
    rule: ProxyRule,
    auth: Option<AuthGate>,
    client: ProxyClient,
}

impl ProxyMount {
    pub fn new(rule: ProxyRule, auth: Option<AuthGate>, client: ProxyClient) -> Self {
        Self { rule, auth, client }
    }

    pub fn rule(&self) -> &ProxyRule {
        &self.rule
    }

    pub fn matches(&self, path: &str) -> bool {
        path::mount_matches(&self.rule.request_path_prefix, path)
    }

    async fn dispatch(&self, req: Request, ctx: &RequestContext) -> ProxyOutcome {
        if self.rule.options.websocket {
            websocket::proxy(&self.client, &self.rule, req, ctx).await
        } else {
            http::forward(&self.client, &self.rule, req, ctx, self.rule.options.cascade).await
        }
    }

    fn tag(&self, res: &mut Response) {
        res.extensions_mut().insert(ForwardedTo {
            mount: self.rule.request_path_prefix.clone(),
            downstream: self.rule.downstream.to_string(),
        });
    }
}

#[async_trait]
impl Middleware for ProxyMount {
    fn name(&self) -> &str {
        &self.rule.request_path_prefix
    }

    async fn handle(&self, req: Request, ctx: &RequestContext) -> Result<Flow, MiddlewareError> {
        if !self.matches(req.uri().path()) {
            return Ok(Flow::Next(req));
        }

        let req = match &self.auth {
            Some(gate) => match gate.handle(req, ctx).await? {
                Flow::Next(req) => req,
                done @ Flow::Done(_) => return Ok(done),
            },
            None => req,
        };

        debug!(
            mount = %self.rule.request_path_prefix,
            downstream = %self.rule.downstream,
            path = %req.uri().path(),
            "프록시 규칙 일치"
        );

        match self.dispatch(req, ctx).await {
            ProxyOutcome::Forwarded(mut res) => {
                self.tag(&mut res);
                Ok(Flow::Done(res))
            }
            ProxyOutcome::CascadeToNext(req) => {
                debug!(mount = %self.rule.request_path_prefix, "다운스트림 404, 다음 규칙으로 진행");
                Ok(Flow::Next(req))
            }
            // WebSocket 규칙은 모든 오류를 여기서 응답
            ProxyOutcome::Failed(err) if err.is_local() || self.rule.options.websocket => {
                warn!(
                    mount = %self.rule.request_path_prefix,
                    downstream = %self.rule.downstream,
                    error = %err,
                    "다운스트림 요청 실패"
                );
                let mut res = response::json_error(err.status());
                self.tag(&mut res);
                Ok(Flow::Done(res))
            }
            ProxyOutcome::Failed(err) => Err(MiddlewareError::Downstream {
                mount: self.rule.request_path_prefix.clone(),
                source: err,
            }),
        }
    }
}

/// X-Real-IP, X-Forwarded-For, X-Forwarded-Proto를 설정합니다.
pub fn insert_forwarding_headers(headers: &mut HeaderMap, client_addr: SocketAddr, scheme: Scheme) {
    let ip = client_addr.ip().to_canonical().to_string();
    if let Ok(value) = HeaderValue::from_str(&ip) {
        headers.insert(X_REAL_IP, value.clone());
        headers.insert(X_FORWARDED_FOR, value);
    }
    headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static(scheme.as_str()));
}

/// 연결 단위 헤더. 다른 홉으로 전달하지 않습니다.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Connection 헤더에 나열된 헤더도 함께 제거
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in listed {
        headers.remove(name);
    }

    for name in [
        header::CONNECTION,
        header::PROXY_AUTHENTICATE,
        header::PROXY_AUTHORIZATION,
        header::TE,
        header::TRAILER,
        header::TRANSFER_ENCODING,
        header::UPGRADE,
    ] {
        headers.remove(name);
    }
    headers.remove("keep-alive");
    headers.remove("proxy-connection");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarding_headers_use_canonical_ip() {
        let mut headers = HeaderMap::new();
        let addr: SocketAddr = "[::ffff:10.0.0.7]:55000".parse().unwrap();
        insert_forwarding_headers(&mut headers, addr, Scheme::Https);

        assert_eq!(headers["x-real-ip"], "10.0.0.7");
        assert_eq!(headers["x-forwarded-for"], "10.0.0.7");
        assert_eq!(headers["x-forwarded-proto"], "https");
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-private"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-private", HeaderValue::from_static("1"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::HOST, HeaderValue::from_static("example.com"));

        strip_hop_by_hop(&mut headers);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[header::HOST], "example.com");
    }
}
