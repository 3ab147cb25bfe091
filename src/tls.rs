//! SNI 기반 TLS 컨텍스트 저장소.
//!
//! 시작 시 각 도메인의 `sni/key.pem`, `sni/cert.pem`을 읽어 메모리에 올리고,
//! 핸드셰이크마다 요청된 서버 이름으로 인증서를 고릅니다. 등록되지 않은
//! 이름은 핸드셰이크가 실패합니다.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_rustls::rustls::server::{ClientHello, ResolvesServerCert};
use tokio_rustls::rustls::sign::{self, CertifiedKey};
use tokio_rustls::rustls::{self, Certificate, PrivateKey};
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info, warn};

use crate::domain::LOCALHOST;

pub const SNI_DIR: &str = "sni";
pub const SNI_KEY_FILE: &str = "key.pem";
pub const SNI_CERT_FILE: &str = "cert.pem";

#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("{path} 읽기 실패: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}에 인증서가 없음")]
    NoCertificates { path: PathBuf },

    #[error("{path}에 개인키가 없음")]
    NoPrivateKey { path: PathBuf },

    #[error("{path}의 개인키를 사용할 수 없음: {reason}")]
    UnsupportedKey { path: PathBuf, reason: String },
}

/// 인증서 체인과 개인키를 읽어 rustls 서명 키로 만듭니다.
pub fn load_certified_key(cert_path: &Path, key_path: &Path) -> Result<CertifiedKey, TlsError> {
    let certs = load_certs(cert_path)?;
    let key = load_private_key(key_path)?;
    let signing_key = sign::any_supported_type(&key).map_err(|e| TlsError::UnsupportedKey {
        path: key_path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(CertifiedKey::new(certs, signing_key))
}

fn open(path: &Path) -> Result<BufReader<File>, TlsError> {
    File::open(path).map(BufReader::new).map_err(|source| TlsError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn load_certs(path: &Path) -> Result<Vec<Certificate>, TlsError> {
    let mut reader = open(path)?;
    let certs: Vec<Certificate> = rustls_pemfile::certs(&mut reader)
        .map_err(|source| TlsError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .into_iter()
        .map(Certificate)
        .collect();

    if certs.is_empty() {
        return Err(TlsError::NoCertificates { path: path.to_path_buf() });
    }
    Ok(certs)
}

// PKCS#8, PKCS#1(RSA), SEC1(EC) 형식을 모두 허용
fn load_private_key(path: &Path) -> Result<PrivateKey, TlsError> {
    let mut reader = open(path)?;
    loop {
        let item = rustls_pemfile::read_one(&mut reader).map_err(|source| TlsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match item {
            Some(rustls_pemfile::Item::PKCS8Key(key))
            | Some(rustls_pemfile::Item::RSAKey(key))
            | Some(rustls_pemfile::Item::ECKey(key)) => return Ok(PrivateKey(key)),
            Some(_) => continue,
            None => return Err(TlsError::NoPrivateKey { path: path.to_path_buf() }),
        }
    }
}

/// 도메인 이름 → 인증서.
///
/// SNI가 없는 클라이언트에게만 기본 인증서를 돌려줍니다.
#[derive(Default)]
pub struct TlsContextStore {
    contexts: HashMap<String, Arc<CertifiedKey>>,
    default: Option<Arc<CertifiedKey>>,
}

impl TlsContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(mut self, key: CertifiedKey) -> Self {
        self.default = Some(Arc::new(key));
        self
    }

    pub fn insert(&mut self, domain: &str, key: CertifiedKey) {
        self.contexts.insert(domain.to_ascii_lowercase(), Arc::new(key));
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.contexts.contains_key(&domain.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn domains(&self) -> Vec<&str> {
        let mut domains: Vec<_> = self.contexts.keys().map(String::as_str).collect();
        domains.sort_unstable();
        domains
    }

    /// 각 도메인의 sni 디렉토리에서 인증서를 읽어 등록합니다.
    /// 읽지 못한 도메인은 경고만 남기고 HTTPS로 제공하지 않습니다.
    pub fn load_domains(&mut self, base_dir: &Path, domains: &[String]) -> usize {
        let mut loaded = 0;
        for domain in domains {
            if domain == LOCALHOST {
                debug!(domain = %domain, "localhost는 TLS 대상에서 제외");
                continue;
            }
            let sni = base_dir.join(domain).join(SNI_DIR);
            match load_certified_key(&sni.join(SNI_CERT_FILE), &sni.join(SNI_KEY_FILE)) {
                Ok(key) => {
                    info!(domain = %domain, "TLS 컨텍스트 등록");
                    self.insert(domain, key);
                    loaded += 1;
                }
                Err(e) => warn!(domain = %domain, error = %e, "TLS 컨텍스트를 만들 수 없어 HTTPS로 제공하지 않습니다"),
            }
        }
        loaded
    }

    /// 핸드셰이크 시 서버 이름으로 인증서를 고릅니다.
    pub fn resolve_name(&self, server_name: Option<&str>) -> Option<Arc<CertifiedKey>> {
        match server_name {
            Some(name) => {
                let found = self.contexts.get(&name.to_ascii_lowercase()).cloned();
                if found.is_none() {
                    debug!(server_name = %name, "등록되지 않은 SNI 이름");
                }
                found
            }
            None => self.default.clone(),
        }
    }
}

impl std::fmt::Debug for TlsContextStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsContextStore")
            .field("domains", &self.domains())
            .field("default", &self.default.is_some())
            .finish()
    }
}

impl ResolvesServerCert for TlsContextStore {
    fn resolve(&self, client_hello: ClientHello) -> Option<Arc<CertifiedKey>> {
        self.resolve_name(client_hello.server_name())
    }
}

/// SNI 저장소를 사용하는 TLS acceptor
pub fn build_acceptor(store: Arc<TlsContextStore>) -> TlsAcceptor {
    let mut config = rustls::ServerConfig::builder()
        .with_safe_defaults()
        .with_no_client_auth()
        .with_cert_resolver(store);
    config.alpn_protocols = vec![b"http/1.1".to_vec()];
    TlsAcceptor::from(Arc::new(config))
}
