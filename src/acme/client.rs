use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::CertificateError;

/// 새 인증서 발급 요청 (webroot 방식)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObtainRequest {
    pub domain: String,
    pub webroot: PathBuf,
    pub email: String,
    pub staging: bool,
}

/// `renew` 실행 결과
#[derive(Debug, Clone, Default)]
pub struct RenewOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl RenewOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// 외부 ACME 클라이언트.
///
/// 프로토콜은 외부 프로그램이 처리하며, 성공 여부는 종료 코드로만 판단합니다.
#[async_trait]
pub trait AcmeClient: Send + Sync {
    /// 도메인 하나에 대해 새 인증서를 발급받습니다.
    async fn obtain(&self, request: &ObtainRequest) -> Result<(), CertificateError>;

    /// 만료가 가까운 모든 인증서를 갱신합니다.
    async fn renew_all(&self) -> Result<RenewOutput, CertificateError>;
}

/// certbot 명령을 하위 프로세스로 실행하는 클라이언트
#[derive(Debug, Clone)]
pub struct CertbotClient {
    command: String,
}

impl CertbotClient {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn obtain_args(request: &ObtainRequest) -> Vec<String> {
        let mut args = vec![
            "certonly".to_string(),
            "--webroot".to_string(),
            "-w".to_string(),
            request.webroot.to_string_lossy().to_string(),
            "-d".to_string(),
            request.domain.clone(),
            "-n".to_string(),
            "-m".to_string(),
            request.email.clone(),
            "--agree-tos".to_string(),
        ];
        if request.staging {
            args.push("--staging".to_string());
        }
        args
    }

    pub fn renew_args() -> Vec<String> {
        vec!["-q".to_string(), "renew".to_string()]
    }
}

#[async_trait]
impl AcmeClient for CertbotClient {
    async fn obtain(&self, request: &ObtainRequest) -> Result<(), CertificateError> {
        let args = Self::obtain_args(request);
        info!(command = %self.command, args = ?args, "인증서 발급 시도");

        // 운영자가 볼 수 있도록 출력은 그대로 통과
        let status = Command::new(&self.command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|source| CertificateError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        if status.success() {
            debug!(domain = %request.domain, "인증서 발급 성공");
            Ok(())
        } else {
            Err(CertificateError::ExitStatus {
                command: self.command.clone(),
                code: status.code(),
            })
        }
    }

    async fn renew_all(&self) -> Result<RenewOutput, CertificateError> {
        let output = Command::new(&self.command)
            .args(Self::renew_args())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| CertificateError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        Ok(RenewOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
