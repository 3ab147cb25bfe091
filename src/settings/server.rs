use std::path::PathBuf;

use serde::Deserialize;
use super::SettingsError;

#[derive(Clone, Debug, Deserialize)]
pub struct ServerSettings {
    /// 도메인 디렉토리들의 기본 경로 (기본값: ./domain)
    #[serde(default = "default_domain_dir")]
    pub domain_dir: PathBuf,

    /// HTTP 포트 (기본값: 80)
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// HTTPS 활성화 여부
    #[serde(default)]
    pub https_enabled: bool,

    /// HTTPS 포트 (기본값: 443)
    #[serde(default = "default_https_port")]
    pub https_port: u16,
}

fn default_domain_dir() -> PathBuf { PathBuf::from("domain") }
fn default_http_port() -> u16 { 80 }
fn default_https_port() -> u16 { 443 }

impl ServerSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.http_port == 0 {
            return Err(SettingsError::InvalidValue {
                name: "server.http_port".to_string(),
                value: "0".to_string(),
                reason: "포트는 0이 될 수 없습니다".to_string(),
            });
        }

        if self.https_enabled {
            if self.https_port == 0 {
                return Err(SettingsError::InvalidValue {
                    name: "server.https_port".to_string(),
                    value: "0".to_string(),
                    reason: "포트는 0이 될 수 없습니다".to_string(),
                });
            }

            // HTTP/HTTPS 포트 충돌 검사
            if self.http_port == self.https_port {
                return Err(SettingsError::InvalidValue {
                    name: "server.http_port/server.https_port".to_string(),
                    value: format!("{}/{}", self.http_port, self.https_port),
                    reason: "HTTP와 HTTPS 포트는 달라야 합니다".to_string(),
                });
            }
        }

        Ok(())
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            domain_dir: default_domain_dir(),
            http_port: default_http_port(),
            https_enabled: false,
            https_port: default_https_port(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_conflict() {
        let settings = ServerSettings {
            https_enabled: true,
            http_port: 8080,
            https_port: 8080,
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = ServerSettings {
            https_enabled: false,
            http_port: 8080,
            https_port: 8080,
            ..Default::default()
        };
        assert!(settings.validate().is_ok());
    }
}
