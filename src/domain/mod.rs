//! 도메인 디렉토리 탐색과 도메인별 설정 로드를 담당하는 모듈입니다.

mod config;
mod error;
mod loader;

pub use config::{
    build_user_table, ByteSize, Credential, DomainConfig, DownstreamTarget, ProxyOptions,
    ProxyRule, DEFAULT_BODY_LIMIT, PLAINTEXT_MAX_LEN,
};
pub use error::ConfigError;
pub use loader::{discover_domains, DomainLoader, PROXY_FILE, PWA_FILE, REDIRECTS_FILE, USERS_FILE};

/// TLS로 서비스하지 않는 예약 도메인
pub const LOCALHOST: &str = "localhost";
