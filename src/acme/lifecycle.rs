use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::client::{AcmeClient, ObtainRequest};
use super::CertificateError;
use crate::domain::LOCALHOST;
use crate::settings::AcmeSettings;
use crate::tls::{SNI_CERT_FILE, SNI_DIR, SNI_KEY_FILE};

/// ACME 클라이언트 저장소의 인증서 체인 파일 이름
pub const LIVE_FULLCHAIN: &str = "fullchain.pem";
/// ACME 클라이언트 저장소의 개인키 파일 이름
pub const LIVE_PRIVKEY: &str = "privkey.pem";

/// 도메인 하나에 대한 시작 시 인증서 확보 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertOutcome {
    /// sni 디렉토리에 이미 PEM 파일이 두 개 이상 있음
    AlreadyPresent,
    /// ACME 클라이언트 저장소에 있던 인증서를 복사함
    Copied,
    /// 새로 발급받아 복사함
    Acquired,
    /// 인증서를 확보하지 못함. HTTPS로 제공하지 않음
    NoCert,
}

impl CertOutcome {
    pub fn is_ready(&self) -> bool {
        !matches!(self, CertOutcome::NoCert)
    }
}

/// `sni` 디렉토리 안의 `*.pem` 파일 개수
pub fn pem_count(sni_dir: &Path) -> usize {
    match fs::read_dir(sni_dir) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .filter(|e| e.path().is_file())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "pem"))
            .count(),
        Err(_) => 0,
    }
}

/// `<live_dir>/<domain>`의 인증서를 `sni/cert.pem`, `sni/key.pem`으로 복사합니다.
///
/// 개인키 복사에 실패하면 이번 호출이 새로 만든 인증서를 지워 반쪽 상태를 남기지 않습니다.
/// 원래 있던 `cert.pem`은 지우지 않습니다.
pub fn copy_from_live(live_dir: &Path, domain: &str, sni_dir: &Path) -> Result<(), CertificateError> {
    let source = live_dir.join(domain);
    let cert_from = source.join(LIVE_FULLCHAIN);
    let key_from = source.join(LIVE_PRIVKEY);
    let cert_to = sni_dir.join(SNI_CERT_FILE);
    let key_to = sni_dir.join(SNI_KEY_FILE);

    let cert_existed = cert_to.exists();
    copy(&cert_from, &cert_to)?;
    if let Err(e) = copy(&key_from, &key_to) {
        if !cert_existed {
            if let Err(remove_err) = fs::remove_file(&cert_to) {
                warn!(path = %cert_to.display(), error = %remove_err, "복사한 인증서를 지우지 못했습니다");
            }
        }
        return Err(e);
    }
    Ok(())
}

fn copy(from: &Path, to: &Path) -> Result<(), CertificateError> {
    fs::copy(from, to).map(|_| ()).map_err(|source| CertificateError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}

fn create_dir(path: &Path) -> Result<(), CertificateError> {
    fs::create_dir_all(path).map_err(|source| CertificateError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

/// 도메인별 인증서 상태를 확인하고 필요하면 복사하거나 새로 발급받습니다.
pub struct CertificateManager<C> {
    domain_dir: PathBuf,
    live_dir: PathBuf,
    email: String,
    staging: bool,
    client: C,
}

impl<C: AcmeClient> CertificateManager<C> {
    pub fn new(domain_dir: impl Into<PathBuf>, live_dir: impl Into<PathBuf>, email: impl Into<String>, staging: bool, client: C) -> Self {
        Self {
            domain_dir: domain_dir.into(),
            live_dir: live_dir.into(),
            email: email.into(),
            staging,
            client,
        }
    }

    pub fn from_settings(domain_dir: &Path, acme: &AcmeSettings, client: C) -> Result<Self, CertificateError> {
        let email = acme.email.clone().ok_or(CertificateError::MissingEmail)?;
        Ok(Self::new(domain_dir, &acme.live_dir, email, acme.staging, client))
    }

    fn sni_dir(&self, domain: &str) -> PathBuf {
        self.domain_dir.join(domain).join(SNI_DIR)
    }

    fn webroot(&self, domain: &str) -> PathBuf {
        self.domain_dir.join(domain).join("webroot")
    }

    /// 도메인 하나를 처리합니다. 실패는 로그로만 남기고 `NoCert`를 돌려줍니다.
    pub async fn ensure(&self, domain: &str) -> CertOutcome {
        let sni = self.sni_dir(domain);
        if let Err(e) = create_dir(&sni) {
            warn!(domain = %domain, error = %e, "sni 디렉토리를 만들 수 없음");
            return CertOutcome::NoCert;
        }

        let found = pem_count(&sni);
        debug!(domain = %domain, count = found, "sni 디렉토리의 PEM 파일");
        if found >= 2 {
            return CertOutcome::AlreadyPresent;
        }

        match copy_from_live(&self.live_dir, domain, &sni) {
            Ok(()) => {
                info!(domain = %domain, "기존 인증서를 복사했습니다");
                return CertOutcome::Copied;
            }
            Err(e) => debug!(domain = %domain, error = %e, "기존 인증서 없음"),
        }

        match self.acquire(domain, &sni).await {
            Ok(()) => {
                info!(domain = %domain, "새 인증서를 발급받았습니다");
                CertOutcome::Acquired
            }
            Err(e) => {
                warn!(domain = %domain, error = %e, "인증서를 확보하지 못해 HTTPS로 제공하지 않습니다");
                CertOutcome::NoCert
            }
        }
    }

    async fn acquire(&self, domain: &str, sni: &Path) -> Result<(), CertificateError> {
        let webroot = self.webroot(domain);
        create_dir(&webroot)?;

        let request = ObtainRequest {
            domain: domain.to_string(),
            webroot,
            email: self.email.clone(),
            staging: self.staging,
        };
        self.client.obtain(&request).await?;
        copy_from_live(&self.live_dir, domain, sni)
    }

    /// localhost를 제외한 모든 도메인을 순서대로 처리합니다.
    pub async fn ensure_all(&self, domains: &[String]) -> Vec<(String, CertOutcome)> {
        let mut outcomes = Vec::with_capacity(domains.len());
        for domain in domains {
            if domain == LOCALHOST {
                debug!("localhost는 인증서 대상에서 제외");
                continue;
            }
            let outcome = self.ensure(domain).await;
            outcomes.push((domain.clone(), outcome));
        }
        outcomes
    }
}
