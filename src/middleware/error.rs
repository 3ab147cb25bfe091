use crate::proxy::DownstreamError;

#[derive(Debug, thiserror::Error)]
pub enum MiddlewareError {
    #[error("처리 오류: {0}")]
    Processing(String),

    #[error("미들웨어 {middleware} 실행 실패: {message}")]
    Execution {
        middleware: String,
        message: String,
    },

    #[error("{mount} 다운스트림 요청 실패: {source}")]
    Downstream {
        mount: String,
        #[source]
        source: DownstreamError,
    },

    #[error(transparent)]
    Hyper(#[from] hyper::Error),
}
