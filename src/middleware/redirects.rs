use std::collections::HashMap;

use async_trait::async_trait;
use hyper::Method;
use tracing::debug;

use super::{response, Flow, Middleware, MiddlewareError, Request, RequestContext};

/// 정확히 일치하는 경로를 다른 경로로 302 리다이렉트합니다.
/// 쿼리 문자열은 그대로 유지됩니다.
#[derive(Debug, Clone)]
pub struct RedirectTable {
    redirects: HashMap<String, String>,
}

impl RedirectTable {
    pub fn new(redirects: HashMap<String, String>) -> Self {
        Self { redirects }
    }

    pub fn len(&self) -> usize {
        self.redirects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.redirects.is_empty()
    }

    /// 경로가 등록되어 있으면 `Location` 값을 만듭니다.
    pub fn location(&self, path: &str, query: Option<&str>) -> Option<String> {
        let target = self.redirects.get(path)?;
        Some(match query {
            Some(query) => format!("{}?{}", target, query),
            None => target.clone(),
        })
    }
}

#[async_trait]
impl Middleware for RedirectTable {
    fn name(&self) -> &str {
        "redirects"
    }

    async fn handle(&self, req: Request, _ctx: &RequestContext) -> Result<Flow, MiddlewareError> {
        if req.method() != Method::GET && req.method() != Method::HEAD {
            return Ok(Flow::Next(req));
        }

        match self.location(req.uri().path(), req.uri().query()) {
            Some(location) => {
                debug!(from = %req.uri().path(), to = %location, "리다이렉트");
                Ok(Flow::Done(response::redirect(&location, "Redirecting ...")))
            }
            None => Ok(Flow::Next(req)),
        }
    }
}
