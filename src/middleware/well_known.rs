use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{self, HeaderValue};
use hyper::{Method, StatusCode};
use tracing::{debug, warn};

use super::{response, Flow, Middleware, MiddlewareError, Request, RequestContext, Response};

pub const WELL_KNOWN_PREFIX: &str = "/.well-known";

/// ACME HTTP-01 챌린지 파일을 `webroot/.well-known`에서 제공합니다.
///
/// 파일이 없으면 다음 단계로 넘깁니다.
#[derive(Debug, Clone)]
pub struct WellKnown {
    root: PathBuf,
}

impl WellKnown {
    /// `webroot`는 도메인의 `webroot` 디렉토리입니다.
    pub fn new(webroot: impl AsRef<Path>) -> Self {
        Self {
            root: webroot.as_ref().join(".well-known"),
        }
    }

    /// 요청 경로를 디스크 경로로 바꿉니다. 상위 디렉토리 참조는 거부합니다.
    fn resolve(&self, rest: &str) -> Result<PathBuf, ()> {
        let relative = Path::new(rest.trim_start_matches('/'));
        let mut path = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                _ => return Err(()),
            }
        }
        Ok(path)
    }

    async fn serve(&self, path: &Path) -> Option<Response> {
        let metadata = tokio::fs::metadata(path).await.ok()?;
        if !metadata.is_file() {
            return None;
        }
        match tokio::fs::read(path).await {
            Ok(content) => {
                let mut res = Response::new(Full::new(Bytes::from(content)));
                res.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/octet-stream"),
                );
                Some(res)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "챌린지 파일 읽기 실패");
                None
            }
        }
    }
}

#[async_trait]
impl Middleware for WellKnown {
    fn name(&self) -> &str {
        "well-known"
    }

    async fn handle(&self, req: Request, _ctx: &RequestContext) -> Result<Flow, MiddlewareError> {
        if req.method() != Method::GET && req.method() != Method::HEAD {
            return Ok(Flow::Next(req));
        }
        let Some(rest) = req.uri().path().strip_prefix(WELL_KNOWN_PREFIX) else {
            return Ok(Flow::Next(req));
        };
        if !rest.is_empty() && !rest.starts_with('/') {
            return Ok(Flow::Next(req));
        }

        let path = match self.resolve(rest) {
            Ok(path) => path,
            Err(()) => {
                warn!(path = %req.uri().path(), "잘못된 .well-known 경로");
                return Ok(Flow::Done(response::json_error(StatusCode::FORBIDDEN)));
            }
        };

        match self.serve(&path).await {
            Some(res) => {
                debug!(file = %path.display(), "챌린지 파일 제공");
                Ok(Flow::Done(res))
            }
            None => Ok(Flow::Next(req)),
        }
    }
}
