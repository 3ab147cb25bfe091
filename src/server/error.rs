use std::fmt;

use crate::acme::CertificateError;
use crate::domain::ConfigError;
use crate::settings::SettingsError;
use crate::tls::TlsError;

/// 게이트웨이 시작과 리스너 실행 중의 오류. 모두 프로세스를 종료시킵니다.
#[derive(Debug)]
pub enum Error {
    Bind { port: u16, source: std::io::Error },
    Config(ConfigError),
    Settings(SettingsError),
    Tls(TlsError),
    Certificate(CertificateError),
    IoError(std::io::Error),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<SettingsError> for Error {
    fn from(err: SettingsError) -> Self {
        Error::Settings(err)
    }
}

impl From<TlsError> for Error {
    fn from(err: TlsError) -> Self {
        Error::Tls(err)
    }
}

impl From<CertificateError> for Error {
    fn from(err: CertificateError) -> Self {
        Error::Certificate(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Bind { port, source } => write!(f, "Bind Error: 포트 {}: {}", port, source),
            Error::Config(e) => write!(f, "Config Error: {}", e),
            Error::Settings(e) => write!(f, "Settings Error: {}", e),
            Error::Tls(e) => write!(f, "TLS Error: {}", e),
            Error::Certificate(e) => write!(f, "Certificate Error: {}", e),
            Error::IoError(e) => write!(f, "IO Error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Bind { source, .. } => Some(source),
            Error::Config(e) => Some(e),
            Error::Settings(e) => Some(e),
            Error::Tls(e) => Some(e),
            Error::Certificate(e) => Some(e),
            Error::IoError(e) => Some(e),
        }
    }
}
