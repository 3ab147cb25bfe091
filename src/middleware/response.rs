use hyper::header::{self, HeaderValue};
use hyper::StatusCode;
use http_body_util::Full;
use bytes::Bytes;
use serde_json::json;

use super::Response;

/// `{"error": "<code>"}` 형식의 응답을 만듭니다.
pub fn json_error(status: StatusCode) -> Response {
    json_message(status, &status.as_u16().to_string())
}

/// `{"error": message}` 형식의 응답을 만듭니다.
pub fn json_message(status: StatusCode, message: &str) -> Response {
    let body = json!({ "error": message }).to_string();
    let mut res = Response::new(Full::new(Bytes::from(body)));
    *res.status_mut() = status;
    res.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    res
}

/// 302 리다이렉트 응답
pub fn redirect(location: &str, body: &str) -> Response {
    let Ok(value) = HeaderValue::from_str(location) else {
        return json_error(StatusCode::INTERNAL_SERVER_ERROR);
    };
    let mut res = Response::new(Full::new(Bytes::from(body.to_string())));
    *res.status_mut() = StatusCode::FOUND;
    res.headers_mut().insert(header::LOCATION, value);
    res.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    res
}
