use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{self, HeaderMap};
use hyper::StatusCode;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use super::{http, insert_forwarding_headers, path, DownstreamError, ProxyClient, ProxyOutcome};
use crate::domain::ProxyRule;
use crate::middleware::{Request, RequestContext, Response};

/// `Connection: upgrade`와 `Upgrade` 헤더가 모두 있는 요청인지
pub fn is_upgrade_request(headers: &HeaderMap) -> bool {
    let connection_upgrade = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"));
    connection_upgrade && headers.contains_key(header::UPGRADE)
}

/// WebSocket 규칙 처리.
///
/// 업그레이드 요청이 아니면 일반 HTTP로 전달합니다. 업그레이드 요청은
/// 다운스트림과 핸드셰이크한 뒤, 101 응답이면 두 연결의 바이트를 그대로 잇습니다.
pub async fn proxy(client: &ProxyClient, rule: &ProxyRule, mut req: Request, ctx: &RequestContext) -> ProxyOutcome {
    if !is_upgrade_request(req.headers()) {
        return http::forward(client, rule, req, ctx, false).await;
    }

    let stream = match TcpStream::connect(rule.downstream.authority()).await {
        Ok(stream) => stream,
        Err(e) => return ProxyOutcome::Failed(e.into()),
    };
    let (mut sender, conn) = match hyper::client::conn::http1::handshake::<_, Full<Bytes>>(TokioIo::new(stream)).await {
        Ok(pair) => pair,
        Err(e) => return ProxyOutcome::Failed(DownstreamError::classify(&e)),
    };
    tokio::spawn(async move {
        if let Err(e) = conn.with_upgrades().await {
            debug!(error = %e, "다운스트림 WebSocket 연결 종료");
        }
    });

    let target = path::outbound_path_and_query(
        &rule.request_path_prefix,
        &rule.downstream.path_prefix,
        req.uri().path(),
        req.uri().query(),
    );
    let mut outbound = hyper::Request::new(Full::new(Bytes::new()));
    *outbound.method_mut() = req.method().clone();
    *outbound.uri_mut() = match target.parse() {
        Ok(uri) => uri,
        Err(e) => return ProxyOutcome::Failed(DownstreamError::InvalidRequest(format!("{}", e))),
    };
    // 업그레이드 헤더와 Host를 포함해 그대로 전달
    *outbound.headers_mut() = req.headers().clone();
    insert_forwarding_headers(outbound.headers_mut(), ctx.client_addr, ctx.scheme);

    let client_upgrade = hyper::upgrade::on(&mut req);
    let mut res = match sender.send_request(outbound).await {
        Ok(res) => res,
        Err(e) => return ProxyOutcome::Failed(DownstreamError::classify(&e)),
    };

    if res.status() != StatusCode::SWITCHING_PROTOCOLS {
        debug!(status = %res.status(), "다운스트림이 업그레이드를 거절함");
        let (parts, body) = res.into_parts();
        return match body.collect().await {
            Ok(collected) => ProxyOutcome::Forwarded(Response::from_parts(parts, Full::new(collected.to_bytes()))),
            Err(e) => ProxyOutcome::Failed(DownstreamError::classify(&e)),
        };
    }

    let downstream_upgrade = hyper::upgrade::on(&mut res);
    let downstream = rule.downstream.to_string();
    tokio::spawn(async move {
        let (client_io, downstream_io) = match tokio::try_join!(client_upgrade, downstream_upgrade) {
            Ok(pair) => pair,
            Err(e) => {
                warn!(downstream = %downstream, error = %e, "WebSocket 업그레이드 실패");
                return;
            }
        };
        let mut client_io = TokioIo::new(client_io);
        let mut downstream_io = TokioIo::new(downstream_io);
        match tokio::io::copy_bidirectional(&mut client_io, &mut downstream_io).await {
            Ok((up, down)) => debug!(downstream = %downstream, up, down, "WebSocket 연결 종료"),
            Err(e) => debug!(downstream = %downstream, error = %e, "WebSocket 스트림 오류"),
        }
    });

    let (parts, _) = res.into_parts();
    ProxyOutcome::Forwarded(Response::from_parts(parts, Full::new(Bytes::new())))
}
