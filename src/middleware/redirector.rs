use async_trait::async_trait;
use tracing::debug;

use super::{response, Flow, Middleware, MiddlewareError, Request, RequestContext, Scheme};
use crate::routing::HostInfo;

/// apex 도메인과 평문 HTTP 요청을 `https://www.` 주소로 보냅니다.
///
/// 모든 도메인 파이프라인의 첫 단계입니다.
#[derive(Debug, Clone)]
pub struct Redirector {
    https_port: u16,
}

impl Redirector {
    pub fn new(https_port: u16) -> Self {
        Self { https_port }
    }

    /// 리다이렉트가 필요하면 대상 URL을, 아니면 `None`을 반환합니다.
    pub fn target(&self, host: &HostInfo, scheme: Scheme, path_and_query: &str) -> Option<String> {
        let bare = host.is_bare();
        if !bare && scheme == Scheme::Https {
            return None;
        }

        let mut url = String::from("https://");
        if bare {
            url.push_str("www.");
        }
        url.push_str(&host.name);
        if self.https_port != 443 {
            url.push_str(&format!(":{}", self.https_port));
        }
        url.push_str(path_and_query);
        Some(url)
    }
}

#[async_trait]
impl Middleware for Redirector {
    fn name(&self) -> &str {
        "redirector"
    }

    async fn handle(&self, req: Request, ctx: &RequestContext) -> Result<Flow, MiddlewareError> {
        let host = HostInfo::from_request(&req)
            .map_err(|e| MiddlewareError::Processing(e.to_string()))?;
        let path_and_query = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        match self.target(&host, ctx.scheme, path_and_query) {
            Some(url) => {
                debug!(host = %host.name, bare = host.is_bare(), scheme = %ctx.scheme, to = %url, "HTTPS 리다이렉트");
                let body = format!("Found. Redirecting to {}", url);
                Ok(Flow::Done(response::redirect(&url, &body)))
            }
            None => Ok(Flow::Next(req)),
        }
    }
}
