use std::path::Path;

use tracing::{debug, info, warn};

use super::lifecycle::copy_from_live;
use super::CertificateError;
use crate::domain::discover_domains;
use crate::tls::SNI_DIR;

/// 설치 작업 결과
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub installed: Vec<String>,
    pub skipped: Vec<String>,
}

impl InstallReport {
    pub fn count(&self) -> usize {
        self.installed.len()
    }
}

/// 갱신된 인증서를 모든 도메인의 `sni` 디렉토리로 복사합니다.
///
/// 메모리의 TLS 컨텍스트는 갱신되지 않으므로 적용하려면 프로세스를 재시작해야 합니다.
/// 도메인 디렉토리를 읽을 수 없을 때만 오류를 돌려줍니다.
pub fn install_certificates(domain_dir: &Path, live_dir: &Path) -> Result<InstallReport, CertificateError> {
    let mut report = InstallReport::default();

    for domain in discover_domains(domain_dir)? {
        let sni = domain_dir.join(&domain).join(SNI_DIR);
        if let Err(source) = std::fs::create_dir_all(&sni) {
            warn!(domain = %domain, error = %source, "sni 디렉토리 생성 실패");
            report.skipped.push(domain);
            continue;
        }

        match copy_from_live(live_dir, &domain, &sni) {
            Ok(()) => {
                debug!(domain = %domain, "인증서 설치");
                report.installed.push(domain);
            }
            Err(e) => {
                debug!(domain = %domain, error = %e, "설치할 인증서 없음");
                report.skipped.push(domain);
            }
        }
    }

    info!(installed = report.count(), skipped = report.skipped.len(), "인증서 설치 완료");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acme::{LIVE_FULLCHAIN, LIVE_PRIVKEY};
    use std::fs;

    #[test]
    fn test_installs_only_domains_with_live_material() {
        let base = tempfile::tempdir().unwrap();
        let domains = base.path().join("domain");
        let live = base.path().join("live");
        fs::create_dir_all(domains.join("a.example.com")).unwrap();
        fs::create_dir_all(domains.join("b.example.com")).unwrap();
        fs::create_dir_all(live.join("a.example.com")).unwrap();
        fs::write(live.join("a.example.com").join(LIVE_FULLCHAIN), "chain").unwrap();
        fs::write(live.join("a.example.com").join(LIVE_PRIVKEY), "key").unwrap();

        let report = install_certificates(&domains, &live).unwrap();
        assert_eq!(report.installed, vec!["a.example.com"]);
        assert_eq!(report.skipped, vec!["b.example.com"]);
        assert!(domains.join("a.example.com/sni/cert.pem").is_file());
        assert!(domains.join("a.example.com/sni/key.pem").is_file());
    }

    #[test]
    fn test_missing_domain_dir_is_error() {
        let base = tempfile::tempdir().unwrap();
        let result = install_certificates(&base.path().join("missing"), base.path());
        assert!(matches!(result, Err(CertificateError::Discover(_))));
    }
}
