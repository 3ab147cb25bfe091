use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::future::select_all;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use super::handler::RequestHandler;
use super::listener;
use super::Result;
use crate::acme::{CertbotClient, CertificateManager, RenewalSchedule};
use crate::domain::{discover_domains, DomainConfig, DomainLoader, LOCALHOST};
use crate::middleware::Scheme;
use crate::proxy::ProxyClient;
use crate::routing::{http_pipeline, https_pipeline, VirtualHostTable};
use crate::settings::watcher::DomainDirWatcher;
use crate::settings::Settings;
use crate::tls::{build_acceptor, load_certified_key, TlsContextStore};

/// 설정에서 리스너, 인증서, 백그라운드 작업까지 조립하는 최상위 구성 요소
pub struct Gateway {
    settings: Settings,
}

/// 시작된 게이트웨이. 리스너 주소와 백그라운드 작업 핸들을 가집니다.
pub struct RunningGateway {
    pub http_addr: SocketAddr,
    pub https_addr: Option<SocketAddr>,
    listeners: Vec<JoinHandle<Result<()>>>,
    background: Vec<JoinHandle<()>>,
}

impl Gateway {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// 도메인 디렉토리를 탐색하고 도메인 설정을 읽습니다. 실패하면 시작을 중단합니다.
    ///
    /// 도메인 이름 목록에는 localhost가 포함되지만 설정 목록에는 없습니다.
    pub fn load_domains(&self) -> Result<(Vec<String>, Vec<DomainConfig>)> {
        let base = &self.settings.server.domain_dir;
        let domains = discover_domains(base)?;
        let loader = DomainLoader::new(base, &self.settings.overrides);
        let configs = loader.load_all(&domains)?;
        Ok((domains, configs))
    }

    /// HTTP 리스너용 테이블. localhost를 포함한 모든 도메인에 리다이렉터를 둡니다.
    pub fn http_table(&self, domains: &[String]) -> VirtualHostTable {
        let server = &self.settings.server;
        let mut table = VirtualHostTable::new();
        for domain in domains {
            let dir = server.domain_dir.join(domain);
            table.insert(http_pipeline(domain, &dir, server.https_port, self.settings.acme.enabled));
        }
        table
    }

    /// HTTPS 리스너용 테이블. localhost는 제외합니다.
    pub fn https_table(&self, configs: &[DomainConfig], client: &ProxyClient) -> VirtualHostTable {
        let mut table = VirtualHostTable::new();
        for config in configs.iter().filter(|c| c.name != LOCALHOST) {
            table.insert(https_pipeline(config, self.settings.server.https_port, client));
        }
        table
    }

    /// 기본 인증서(필수)와 도메인별 sni 인증서를 읽습니다.
    pub fn tls_store(&self, domains: &[String]) -> Result<TlsContextStore> {
        let tls = &self.settings.tls;
        let default = load_certified_key(&tls.cert_path, &tls.key_path)?;
        let mut store = TlsContextStore::new().with_default(default);
        let loaded = store.load_domains(&self.settings.server.domain_dir, domains);
        info!(loaded, total = domains.len(), "TLS 컨텍스트 로드 완료");
        Ok(store)
    }

    /// 시작 순서: 설정 로드 → HTTP 리스너 → 인증서 확보 → 갱신/감시 작업 → HTTPS 리스너.
    ///
    /// HTTP 리스너가 먼저 떠 있어야 webroot 방식 인증서 발급이 가능합니다.
    #[instrument(skip(self), level = "info", err(Display))]
    pub async fn start(self) -> Result<RunningGateway> {
        let (domains, configs) = self.load_domains()?;

        let http_handler = Arc::new(RequestHandler::new(self.http_table(&domains), Scheme::Http));
        let http_listener = listener::bind(self.settings.server.http_port).await?;
        let http_addr = http_listener.local_addr()?;
        let http_task = tokio::spawn(listener::serve_http(http_listener, http_handler));

        // 시작 실패 시 이미 띄운 작업 정리
        let background = match self.start_certificates(&domains).await {
            Ok(background) => background,
            Err(e) => {
                http_task.abort();
                return Err(e);
            }
        };
        let (https_addr, https_task) = match self.start_https(&configs, &domains).await {
            Ok(started) => started,
            Err(e) => {
                http_task.abort();
                background.iter().for_each(JoinHandle::abort);
                return Err(e);
            }
        };

        let mut listeners = vec![http_task];
        listeners.extend(https_task);
        Ok(RunningGateway {
            http_addr,
            https_addr,
            listeners,
            background,
        })
    }

    /// ACME가 켜져 있으면 도메인별 인증서를 확보하고 갱신/감시 작업을 띄웁니다.
    async fn start_certificates(&self, domains: &[String]) -> Result<Vec<JoinHandle<()>>> {
        let acme = &self.settings.acme;
        let domain_dir = &self.settings.server.domain_dir;
        let mut background = Vec::new();
        if !acme.enabled {
            return Ok(background);
        }

        let client = CertbotClient::new(&acme.command);
        let manager = CertificateManager::from_settings(domain_dir, acme, client.clone())?;
        let outcomes = manager.ensure_all(domains).await;
        let ready = outcomes.iter().filter(|(_, o)| o.is_ready()).count();
        info!(ready, total = outcomes.len(), "인증서 확인 완료");

        background.push(RenewalSchedule::new(Arc::new(client)).spawn());
        match DomainDirWatcher::new(domain_dir).spawn() {
            Ok(handle) => background.push(handle),
            Err(e) => warn!(error = %e, "도메인 디렉토리 감시를 시작할 수 없습니다"),
        }
        Ok(background)
    }

    async fn start_https(
        &self,
        configs: &[DomainConfig],
        domains: &[String],
    ) -> Result<(Option<SocketAddr>, Option<JoinHandle<Result<()>>>)> {
        if !self.settings.server.https_enabled {
            info!("HTTPS가 비활성화되어 HTTP 리다이렉트만 제공합니다");
            return Ok((None, None));
        }

        let store = self.tls_store(domains)?;
        let acceptor = build_acceptor(Arc::new(store));
        let handler = Arc::new(RequestHandler::new(
            self.https_table(configs, &ProxyClient::new()),
            Scheme::Https,
        ));
        let https_listener = listener::bind(self.settings.server.https_port).await?;
        let addr = https_listener.local_addr()?;
        let task = tokio::spawn(listener::serve_https(https_listener, acceptor, handler));
        Ok((Some(addr), Some(task)))
    }

    /// 시작한 뒤 리스너가 끝나거나 종료 신호를 받을 때까지 실행합니다.
    pub async fn run(self) -> Result<()> {
        self.start().await?.wait().await
    }
}

impl RunningGateway {
    /// 리스너 중 하나가 끝나거나 Ctrl-C를 받을 때까지 대기합니다.
    pub async fn wait(mut self) -> Result<()> {
        let result = tokio::select! {
            (joined, _, _) = select_all(self.listeners.iter_mut()) => flatten(joined),
            signal = tokio::signal::ctrl_c() => {
                info!("종료 신호 수신");
                signal.map_err(Into::into)
            }
        };

        self.shutdown();
        result
    }

    /// 모든 작업을 중단합니다.
    pub fn shutdown(&self) {
        self.listeners.iter().for_each(JoinHandle::abort);
        self.background.iter().for_each(JoinHandle::abort);
    }
}

fn flatten(joined: std::result::Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
    match joined {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "리스너 작업 비정상 종료");
            Err(std::io::Error::new(std::io::ErrorKind::Other, e).into())
        }
    }
}
