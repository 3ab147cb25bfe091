use std::path::PathBuf;

/// 도메인 설정 로드 중 발생하는 치명적 오류입니다.
///
/// 어떤 값이든 이 오류가 발생하면 프로세스 시작이 중단됩니다.
/// 파일 누락이나 파싱 실패처럼 복구 가능한 문제는 여기 포함되지 않고
/// 경고 로그만 남긴 뒤 빈 값으로 대체됩니다.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("도메인 디렉토리 {path} 읽기 실패: {source}")]
    DomainDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{domain}: 잘못된 리다이렉트 경로 '{path}' (리다이렉트 경로는 /로 시작해야 합니다)")]
    InvalidRedirectPath { domain: String, path: String },

    #[error("{domain}: 프록시 규칙 #{index} 형식 오류: {reason}")]
    MalformedProxyRule {
        domain: String,
        index: usize,
        reason: String,
    },

    #[error("{domain}: 프록시 규칙 #{index}의 다운스트림 '{target}' 오류: {reason}")]
    InvalidDownstream {
        domain: String,
        index: usize,
        target: String,
        reason: String,
    },

    #[error("{domain}: 프록시 규칙 #{index} 옵션 충돌: {reason}")]
    ConflictingOptions {
        domain: String,
        index: usize,
        reason: String,
    },
}
