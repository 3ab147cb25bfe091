use std::sync::Arc;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use hyper::{header, StatusCode};
use hyper::header::HeaderValue;
use tracing::{debug, warn};

use crate::middleware::{response, Flow, Middleware, MiddlewareError, Request, RequestContext, Response};
use super::auth::{AuthError, UserTable};

/// Basic 인증 게이트
///
/// `auth: true`인 프록시 규칙 앞에서 실행됩니다. 실패하면 다운스트림에
/// 도달하지 않고 401 챌린지로 끝납니다.
#[derive(Debug, Clone)]
pub struct AuthGate {
    realm: String,
    users: Arc<UserTable>,
}

impl AuthGate {
    pub fn new(realm: impl Into<String>, users: Arc<UserTable>) -> Self {
        Self {
            realm: realm.into(),
            users,
        }
    }

    /// Authorization 헤더에서 자격증명을 추출합니다.
    fn extract_credentials(req: &Request) -> Option<(String, String)> {
        req.headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|auth| {
                let (scheme, credentials) = auth.split_once(' ')?;
                if !scheme.eq_ignore_ascii_case("basic") {
                    return None;
                }
                BASE64.decode(credentials.trim()).ok()
            })
            .and_then(|decoded| String::from_utf8(decoded).ok())
            .and_then(|pair| {
                let (user, pass) = pair.split_once(':')?;
                Some((user.to_string(), pass.to_string()))
            })
    }

    /// 401 Unauthorized 응답을 생성합니다.
    fn unauthorized_response(&self) -> Response {
        let mut res = response::json_error(StatusCode::UNAUTHORIZED);
        let challenge = HeaderValue::from_str(&format!("Basic realm=\"{}\"", self.realm))
            .unwrap_or_else(|_| HeaderValue::from_static("Basic"));
        res.headers_mut().insert(header::WWW_AUTHENTICATE, challenge);
        res
    }

    async fn authenticate(&self, req: &Request) -> Result<(), AuthError> {
        let (username, password) =
            Self::extract_credentials(req).ok_or(AuthError::MissingCredentials)?;
        self.users.verify(&username, &password).await
    }
}

#[async_trait]
impl Middleware for AuthGate {
    fn name(&self) -> &str {
        "basic-auth"
    }

    async fn handle(&self, req: Request, _ctx: &RequestContext) -> Result<Flow, MiddlewareError> {
        match self.authenticate(&req).await {
            Ok(()) => {
                debug!(realm = %self.realm, "인증 성공");
                Ok(Flow::Next(req))
            }
            Err(e) => {
                match &e {
                    AuthError::HashVerify(_) => warn!(realm = %self.realm, error = %e, "인증 실패"),
                    _ => debug!(realm = %self.realm, error = %e, "인증 실패"),
                }
                Ok(Flow::Done(self.unauthorized_response()))
            }
        }
    }
}
