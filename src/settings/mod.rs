//! 프로세스 설정.
//!
//! 기본값 → TOML 파일 → 명령행/환경 변수 순으로 쌓아 올린 뒤 한 번 검증하고,
//! 이후에는 불변 값으로 각 구성 요소에 전달됩니다.

use std::{fs, path::Path};
use serde::Deserialize;
use tracing::debug;

mod server;
pub mod logging;
mod tls;
mod acme;
mod error;
mod overrides;
pub mod cli;
pub mod watcher;

pub use server::ServerSettings;
pub use logging::{LogFormat, LogOutput, LogSettings};
pub use tls::TlsSettings;
pub use acme::AcmeSettings;
pub use error::SettingsError;
pub use overrides::GlobalOverrides;
pub use cli::Cli;

pub type Result<T> = std::result::Result<T, SettingsError>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    // 서버 설정
    #[serde(default)]
    pub server: ServerSettings,

    // 로깅 설정
    #[serde(default)]
    pub logging: LogSettings,

    // 기본 인증서 설정
    #[serde(default)]
    pub tls: TlsSettings,

    // 인증서 자동 발급/갱신
    #[serde(default)]
    pub acme: AcmeSettings,

    /// 도메인별 전역 오버라이드
    #[serde(default)]
    pub overrides: GlobalOverrides,
}

impl Settings {
    /// 명령행 인자에서 최종 설정을 만듭니다.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut settings = match &cli.config {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        cli.apply_to(&mut settings)?;
        settings.validate()?;

        debug!(settings = ?settings, "설정 로드 완료");
        Ok(settings)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).map_err(|e| SettingsError::FileError {
            path: path.as_ref().to_string_lossy().to_string(),
            error: e,
        })?;

        toml::from_str(&content).map_err(|e| SettingsError::ParseError { source: e })
    }

    /// 설정 유효성 검증
    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.tls.validate(self.server.https_enabled)?;
        self.acme.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_settings_from_toml() {
        let toml_content = r#"
            [server]
            domain_dir = "/srv/domain"
            http_port = 8080

            [logging]
            format = "json"
            level = "info"

            [acme]
            enabled = true
            email = "ops@example.com"
            staging = true

            [overrides.proxy]
            "example.com" = [["/", "localhost:8000"]]
        "#;

        let settings: Settings = toml::from_str(toml_content).unwrap();
        assert_eq!(settings.server.domain_dir, PathBuf::from("/srv/domain"));
        assert_eq!(settings.server.http_port, 8080);
        assert_eq!(settings.server.https_port, 443);
        assert!(!settings.server.https_enabled);
        assert!(settings.acme.enabled && settings.acme.staging);
        assert_eq!(settings.acme.command, "certbot");
        assert_eq!(settings.overrides.proxy["example.com"].len(), 1);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.server.domain_dir, PathBuf::from("domain"));
        assert_eq!(settings.server.http_port, 80);
        assert_eq!(settings.tls.key_path, PathBuf::from("private.key"));
        assert_eq!(settings.tls.cert_path, PathBuf::from("certificate.pem"));
        assert_eq!(settings.acme.live_dir, PathBuf::from("/etc/letsencrypt/live"));
        assert!(settings.overrides.is_empty());
    }

    #[test]
    fn test_missing_file() {
        let result = Settings::from_toml_file("/nonexistent/gateway.toml");
        assert!(matches!(result, Err(SettingsError::FileError { .. })));
    }
}
