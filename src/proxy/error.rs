use std::error::Error as StdError;
use std::io;

use hyper::StatusCode;

/// 다운스트림 전송 오류.
///
/// 연결 재설정과 연결 거부는 규칙 안에서 바로 응답(405, 504)하고,
/// 나머지는 파이프라인의 공통 오류 경로(500)로 넘깁니다.
#[derive(Debug, thiserror::Error)]
pub enum DownstreamError {
    #[error("다운스트림 연결이 재설정됨: {0}")]
    ConnectionReset(String),

    #[error("다운스트림 연결 거부: {0}")]
    ConnectionRefused(String),

    #[error("다운스트림 응답 시간 초과")]
    Timeout,

    #[error("요청 본문이 제한({limit} 바이트)을 초과함")]
    BodyTooLarge { limit: u64 },

    #[error("잘못된 다운스트림 요청: {0}")]
    InvalidRequest(String),

    #[error("다운스트림 전송 오류: {0}")]
    Transport(String),
}

impl DownstreamError {
    /// 오류 체인을 따라가며 io::Error의 종류로 분류합니다.
    pub fn classify(err: &(dyn StdError + 'static)) -> Self {
        match io_error_kind(err) {
            Some(io::ErrorKind::ConnectionReset) => Self::ConnectionReset(err.to_string()),
            Some(io::ErrorKind::ConnectionRefused) => Self::ConnectionRefused(err.to_string()),
            Some(io::ErrorKind::TimedOut) => Self::Timeout,
            _ => Self::Transport(err.to_string()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::ConnectionReset(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::ConnectionRefused(_) | Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::InvalidRequest(_) | Self::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 규칙 안에서 바로 응답하는 오류인지
    pub fn is_local(&self) -> bool {
        !matches!(self, Self::InvalidRequest(_) | Self::Transport(_))
    }
}

impl From<io::Error> for DownstreamError {
    fn from(err: io::Error) -> Self {
        Self::classify(&err)
    }
}

fn io_error_kind(err: &(dyn StdError + 'static)) -> Option<io::ErrorKind> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            return Some(io_err.kind());
        }
        current = e.source();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Wrapper(io::Error);

    impl std::fmt::Display for Wrapper {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "wrapped: {}", self.0)
        }
    }

    impl StdError for Wrapper {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_classify_through_source_chain() {
        let reset = Wrapper(io::Error::from(io::ErrorKind::ConnectionReset));
        let err = DownstreamError::classify(&reset);
        assert!(matches!(err, DownstreamError::ConnectionReset(_)));
        assert_eq!(err.status(), StatusCode::METHOD_NOT_ALLOWED);

        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        let err = DownstreamError::from(refused);
        assert_eq!(err.status(), StatusCode::GATEWAY_TIMEOUT);
        assert!(err.is_local());
    }

    #[test]
    fn test_other_errors_are_not_local() {
        let other = io::Error::new(io::ErrorKind::Other, "boom");
        let err = DownstreamError::classify(&Wrapper(other));
        assert!(matches!(err, DownstreamError::Transport(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.is_local());
    }
}
