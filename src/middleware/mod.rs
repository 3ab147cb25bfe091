//! 도메인 파이프라인을 이루는 단계들.
//!
//! 각 단계는 요청을 다음 단계로 넘기거나(`Flow::Next`) 응답으로 끝냅니다(`Flow::Done`).

use std::net::SocketAddr;

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::Full;

pub mod basic_auth;
pub mod chain;
pub mod error;
pub mod redirector;
pub mod redirects;
pub mod response;
pub mod traits;
pub mod well_known;

pub use chain::{DomainPipeline, NoRules};
pub use error::MiddlewareError;
pub use redirector::Redirector;
pub use redirects::RedirectTable;
pub use traits::Middleware;
pub use well_known::WellKnown;

pub type Body = BoxBody<Bytes, hyper::Error>;
pub type Request = hyper::Request<Body>;
pub type Response = hyper::Response<Full<Bytes>>;

/// 단계 처리 결과
#[derive(Debug)]
pub enum Flow {
    /// 다음 단계로 진행
    Next(Request),
    /// 응답을 확정
    Done(Response),
}

/// 요청이 들어온 리스너의 스킴
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 연결 단위로 정해지는 요청 정보
#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    pub scheme: Scheme,
    pub client_addr: SocketAddr,
}

impl RequestContext {
    pub fn new(scheme: Scheme, client_addr: SocketAddr) -> Self {
        Self { scheme, client_addr }
    }
}
