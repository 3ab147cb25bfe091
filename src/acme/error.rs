use std::path::PathBuf;

use crate::domain::ConfigError;

/// 인증서 발급/복사 오류. 해당 도메인만 HTTPS에서 빠지고 프로세스는 계속 실행됩니다.
#[derive(Debug, thiserror::Error)]
pub enum CertificateError {
    #[error("{command} 실행 실패: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} 비정상 종료 (exit code: {code:?})")]
    ExitStatus { command: String, code: Option<i32> },

    #[error("{from} → {to} 복사 실패: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} 디렉토리 생성 실패: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ACME 계정 이메일이 설정되지 않음")]
    MissingEmail,

    #[error(transparent)]
    Discover(#[from] ConfigError),
}
