use std::convert::Infallible;
use std::net::SocketAddr;

use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::StatusCode;
use tracing::{debug, error};

use crate::logging::{log_request, RequestLog};
use crate::middleware::response::json_error;
use crate::middleware::{Flow, Request, RequestContext, Response, Scheme};
use crate::proxy::ForwardedTo;
use crate::routing::{RoutingError, VirtualHostTable};

/// 리스너 하나의 요청 처리기. 가상 호스트 테이블로 도메인 파이프라인을 골라 실행합니다.
pub struct RequestHandler {
    hosts: VirtualHostTable,
    scheme: Scheme,
}

impl RequestHandler {
    pub fn new(hosts: VirtualHostTable, scheme: Scheme) -> Self {
        Self { hosts, scheme }
    }

    pub fn hosts(&self) -> &VirtualHostTable {
        &self.hosts
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub async fn handle_request(
        &self,
        req: hyper::Request<Incoming>,
        client_addr: SocketAddr,
    ) -> Result<Response, Infallible> {
        Ok(self.dispatch(req.map(|body| body.boxed()), client_addr).await)
    }

    /// 라우팅 → 파이프라인 → 요약 로그
    pub async fn dispatch(&self, req: Request, client_addr: SocketAddr) -> Response {
        let mut log = RequestLog::new();
        log.with_request(&req);
        let ctx = RequestContext::new(self.scheme, client_addr);

        let response = match self.hosts.route(&req) {
            Ok((host, pipeline)) => match pipeline.run(req, &ctx).await {
                Ok(Flow::Done(response)) => response,
                Ok(Flow::Next(_)) => {
                    debug!(host = %host.name, "처리한 단계가 없음");
                    json_error(StatusCode::NOT_FOUND)
                }
                Err(e) => {
                    error!(host = %host.name, error = %e, "파이프라인 처리 실패");
                    log.with_error(&e);
                    json_error(StatusCode::INTERNAL_SERVER_ERROR)
                }
            },
            Err(e) => routing_error_response(&e),
        };

        if let Some(forwarded) = response.extensions().get::<ForwardedTo>() {
            log.with_forward(&forwarded.mount, &forwarded.downstream);
        }
        log.with_response(response.status());
        log_request(&log);
        response
    }

    pub async fn handle_connection<I>(&self, io: I, client_addr: SocketAddr) -> Result<(), hyper::Error>
    where
        I: hyper::rt::Read + hyper::rt::Write + Send + Unpin + 'static,
    {
        http1::Builder::new()
            .serve_connection(io, service_fn(|req| self.handle_request(req, client_addr)))
            .with_upgrades()
            .await
    }
}

fn routing_error_response(error: &RoutingError) -> Response {
    debug!(error = %error, "라우팅 실패");
    match error {
        RoutingError::UnknownHost { .. } => json_error(StatusCode::NOT_FOUND),
        RoutingError::MissingHost
        | RoutingError::InvalidHost { .. }
        | RoutingError::InvalidPort { .. }
        | RoutingError::HeaderParseError { .. } => json_error(StatusCode::BAD_REQUEST),
    }
}
