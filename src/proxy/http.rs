use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::header::{self, HeaderValue};
use hyper::Uri;
use tracing::{debug, trace};

use super::{insert_forwarding_headers, path, strip_hop_by_hop, DownstreamError, ProxyClient, ProxyOutcome};
use crate::domain::ProxyRule;
use crate::middleware::{Request, RequestContext, Response};

/// 본문을 버퍼링해 다운스트림으로 보내고 응답을 돌려받습니다.
///
/// `cascade`가 켜져 있고 다운스트림이 404를 돌려주면, 같은 요청을
/// 다시 만들어 `CascadeToNext`로 돌려줍니다.
pub async fn forward(
    client: &ProxyClient,
    rule: &ProxyRule,
    req: Request,
    ctx: &RequestContext,
    cascade: bool,
) -> ProxyOutcome {
    let limit = rule.body_limit();
    let (parts, body) = req.into_parts();

    if let Some(length) = content_length(&parts.headers) {
        if length > limit {
            return ProxyOutcome::Failed(DownstreamError::BodyTooLarge { limit });
        }
    }

    let max = usize::try_from(limit).unwrap_or(usize::MAX);
    let bytes = match Limited::new(body, max).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            return ProxyOutcome::Failed(DownstreamError::BodyTooLarge { limit });
        }
        Err(e) => return ProxyOutcome::Failed(DownstreamError::classify(&*e)),
    };

    let target = path::outbound_path_and_query(
        &rule.request_path_prefix,
        &rule.downstream.path_prefix,
        parts.uri.path(),
        parts.uri.query(),
    );
    let uri: Uri = match format!("http://{}{}", rule.downstream.host, target).parse() {
        Ok(uri) => uri,
        Err(e) => return ProxyOutcome::Failed(DownstreamError::InvalidRequest(format!("{}", e))),
    };

    let mut outbound = hyper::Request::new(Full::new(bytes.clone()));
    *outbound.method_mut() = parts.method.clone();
    *outbound.uri_mut() = uri;
    // Host 헤더는 원래 값을 유지
    *outbound.headers_mut() = parts.headers.clone();
    strip_hop_by_hop(outbound.headers_mut());
    outbound.headers_mut().remove(header::CONTENT_LENGTH);
    if !bytes.is_empty() || parts.headers.contains_key(header::CONTENT_LENGTH) {
        outbound
            .headers_mut()
            .insert(header::CONTENT_LENGTH, HeaderValue::from(bytes.len()));
    }
    insert_forwarding_headers(outbound.headers_mut(), ctx.client_addr, ctx.scheme);

    trace!(uri = %outbound.uri(), method = %outbound.method(), "다운스트림 요청");

    // 헤더와 본문 수신 전체에 하나의 기한을 적용
    let deadline = tokio::time::Instant::now() + client.timeout;
    let res = match tokio::time::timeout_at(deadline, client.client.request(outbound)).await {
        Err(_) => return ProxyOutcome::Failed(DownstreamError::Timeout),
        Ok(Err(e)) => return ProxyOutcome::Failed(DownstreamError::classify(&e)),
        Ok(Ok(res)) => res,
    };

    if cascade && res.status() == hyper::StatusCode::NOT_FOUND {
        debug!(mount = %rule.request_path_prefix, "cascade: 다운스트림 404");
        let body = Full::new(bytes).map_err(|never| match never {}).boxed();
        return ProxyOutcome::CascadeToNext(hyper::Request::from_parts(parts, body));
    }

    let (mut res_parts, res_body) = res.into_parts();
    let res_bytes: Bytes = match tokio::time::timeout_at(deadline, res_body.collect()).await {
        Err(_) => {
            debug!(mount = %rule.request_path_prefix, "다운스트림 응답 본문 시간 초과");
            return ProxyOutcome::Failed(DownstreamError::Timeout);
        }
        Ok(Err(e)) => return ProxyOutcome::Failed(DownstreamError::classify(&e)),
        Ok(Ok(collected)) => collected.to_bytes(),
    };
    strip_hop_by_hop(&mut res_parts.headers);

    ProxyOutcome::Forwarded(Response::from_parts(res_parts, Full::new(res_bytes)))
}

fn content_length(headers: &hyper::HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}
