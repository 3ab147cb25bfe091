use std::path::PathBuf;
use serde::Deserialize;
use super::SettingsError;

/// 외부 ACME 클라이언트(certbot) 연동 설정
#[derive(Debug, Clone, Deserialize)]
pub struct AcmeSettings {
    #[serde(default)]
    pub enabled: bool,

    /// 인증서 발급 시 등록할 연락처 이메일
    #[serde(default)]
    pub email: Option<String>,

    /// 스테이징 CA 사용 여부
    #[serde(default)]
    pub staging: bool,

    /// ACME 클라이언트가 발급한 인증서가 놓이는 디렉토리
    #[serde(default = "default_live_dir")]
    pub live_dir: PathBuf,

    /// 실행할 ACME 클라이언트 프로그램
    #[serde(default = "default_command")]
    pub command: String,
}

fn default_live_dir() -> PathBuf {
    PathBuf::from("/etc/letsencrypt/live")
}

fn default_command() -> String {
    "certbot".to_string()
}

impl AcmeSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.enabled {
            return Ok(());
        }
        match self.email.as_deref() {
            Some(email) if !email.trim().is_empty() => {}
            _ => {
                return Err(SettingsError::MissingValue {
                    name: "acme.email (--email)".to_string(),
                })
            }
        }
        if self.command.trim().is_empty() {
            return Err(SettingsError::InvalidValue {
                name: "acme.command".to_string(),
                value: self.command.clone(),
                reason: "실행할 프로그램이 비어 있습니다".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for AcmeSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            email: None,
            staging: false,
            live_dir: default_live_dir(),
            command: default_command(),
        }
    }
}
