use async_trait::async_trait;
use hyper::StatusCode;
use tracing::trace;

use super::{response, Flow, Middleware, MiddlewareError, Request, RequestContext};

/// 도메인 하나의 단계 목록. 등록 순서대로 실행됩니다.
pub struct DomainPipeline {
    domain: String,
    middlewares: Vec<Box<dyn Middleware>>,
}

impl DomainPipeline {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            middlewares: Vec::new(),
        }
    }

    pub fn add<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Box::new(middleware));
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// 단계 이름 목록 (실행 순서)
    pub fn stage_names(&self) -> Vec<&str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }

    /// 어느 단계도 응답하지 않으면 `Flow::Next`로 요청을 돌려줍니다.
    pub async fn run(&self, mut request: Request, ctx: &RequestContext) -> Result<Flow, MiddlewareError> {
        for middleware in &self.middlewares {
            trace!(domain = %self.domain, stage = middleware.name(), "단계 실행");
            match middleware.handle(request, ctx).await? {
                Flow::Next(next) => request = next,
                done @ Flow::Done(_) => return Ok(done),
            }
        }
        Ok(Flow::Next(request))
    }
}

impl std::fmt::Debug for DomainPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainPipeline")
            .field("domain", &self.domain)
            .field("stages", &self.stage_names())
            .finish()
    }
}

/// 프록시 규칙이 하나도 없는 도메인의 마지막 단계
#[derive(Debug, Clone)]
pub struct NoRules {
    message: String,
}

impl NoRules {
    pub fn new(domain: &str) -> Self {
        Self {
            message: format!("No proxy.json set up for {}", domain),
        }
    }
}

#[async_trait]
impl Middleware for NoRules {
    fn name(&self) -> &str {
        "no-rules"
    }

    async fn handle(&self, _req: Request, _ctx: &RequestContext) -> Result<Flow, MiddlewareError> {
        Ok(Flow::Done(response::json_message(StatusCode::NOT_FOUND, &self.message)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{RedirectTable, Scheme};
    use http_body_util::{BodyExt, Empty};
    use hyper::header;

    fn request(path: &str) -> Request {
        hyper::Request::builder()
            .uri(path)
            .header(header::HOST, "www.example.com")
            .body(Empty::new().map_err(|never| match never {}).boxed())
            .unwrap()
    }

    fn ctx() -> RequestContext {
        RequestContext::new(Scheme::Https, "127.0.0.1:40000".parse().unwrap())
    }

    #[tokio::test]
    async fn test_first_done_wins() {
        let mut pipeline = DomainPipeline::new("www.example.com");
        pipeline.add(RedirectTable::new(
            [("/old".to_string(), "/new".to_string())].into_iter().collect(),
        ));
        pipeline.add(NoRules::new("www.example.com"));
        assert_eq!(pipeline.stage_names(), vec!["redirects", "no-rules"]);

        match pipeline.run(request("/old"), &ctx()).await.unwrap() {
            Flow::Done(res) => assert_eq!(res.status(), StatusCode::FOUND),
            Flow::Next(_) => panic!("리다이렉트되어야 합니다"),
        }

        match pipeline.run(request("/other"), &ctx()).await.unwrap() {
            Flow::Done(res) => {
                assert_eq!(res.status(), StatusCode::NOT_FOUND);
                let body = res.into_body().collect().await.unwrap().to_bytes();
                assert_eq!(&body[..], br#"{"error":"No proxy.json set up for www.example.com"}"#);
            }
            Flow::Next(_) => panic!("404로 끝나야 합니다"),
        }
    }

    #[tokio::test]
    async fn test_empty_pipeline_passes_through() {
        let pipeline = DomainPipeline::new("www.example.com");
        assert!(matches!(pipeline.run(request("/"), &ctx()).await.unwrap(), Flow::Next(_)));
    }
}
