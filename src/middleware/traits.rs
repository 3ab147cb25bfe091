use super::{Flow, MiddlewareError, Request, RequestContext};
use async_trait::async_trait;

/// 미들웨어 트레이트
///
/// 도메인 파이프라인의 한 단계를 정의합니다. 요청을 소비하고,
/// 처리하지 않으면 `Flow::Next`로 돌려줍니다.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// 미들웨어의 고유 이름을 반환합니다.
    fn name(&self) -> &str;

    /// HTTP 요청을 처리합니다.
    async fn handle(&self, req: Request, ctx: &RequestContext) -> Result<Flow, MiddlewareError>;
}
