use std::path::PathBuf;
use serde::Deserialize;
use super::SettingsError;

/// 기본 인증서 설정.
///
/// SNI를 보내지 않는 클라이언트에게만 사용되며, HTTPS가 켜져 있으면
/// 반드시 읽을 수 있어야 합니다.
#[derive(Debug, Clone, Deserialize)]
pub struct TlsSettings {
    /// 기본 개인키 파일 경로
    #[serde(default = "default_key_path")]
    pub key_path: PathBuf,

    /// 기본 인증서 파일 경로
    #[serde(default = "default_cert_path")]
    pub cert_path: PathBuf,
}

impl TlsSettings {
    /// HTTPS가 활성화된 경우에만 파일 존재 여부를 확인
    pub fn validate(&self, https_enabled: bool) -> Result<(), SettingsError> {
        if !https_enabled {
            return Ok(());
        }

        for path in [&self.key_path, &self.cert_path] {
            if !path.exists() {
                return Err(SettingsError::FileError {
                    path: path.to_string_lossy().to_string(),
                    error: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "기본 인증서/개인키 파일을 찾을 수 없습니다",
                    ),
                });
            }
        }

        Ok(())
    }
}

impl Default for TlsSettings {
    fn default() -> Self {
        Self {
            key_path: default_key_path(),
            cert_path: default_cert_path(),
        }
    }
}

fn default_key_path() -> PathBuf {
    PathBuf::from("private.key")
}

fn default_cert_path() -> PathBuf {
    PathBuf::from("certificate.pem")
}
