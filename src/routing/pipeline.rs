use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::domain::DomainConfig;
use crate::middleware::basic_auth::{AuthGate, UserTable};
use crate::middleware::{DomainPipeline, NoRules, RedirectTable, Redirector, WellKnown};
use crate::proxy::{ProxyClient, ProxyMount};

/// HTTPS 리스너용 도메인 파이프라인.
///
/// 순서: 리다이렉터 → 리다이렉트 테이블 → 프록시 규칙(설정 순서) → 규칙이 없으면 404
pub fn https_pipeline(config: &DomainConfig, https_port: u16, client: &ProxyClient) -> DomainPipeline {
    let mut pipeline = DomainPipeline::new(&config.name);
    pipeline.add(Redirector::new(https_port));

    if !config.redirects.is_empty() {
        debug!(domain = %config.name, count = config.redirects.len(), "리다이렉트 등록");
        pipeline.add(RedirectTable::new(config.redirects.clone()));
    }

    let users = Arc::new(UserTable::new(config.users.clone()));
    for rule in &config.proxy_rules {
        let gate = rule
            .options
            .auth
            .then(|| AuthGate::new(&config.name, Arc::clone(&users)));
        debug!(
            domain = %config.name,
            mount = %rule.request_path_prefix,
            downstream = %rule.downstream,
            auth = rule.options.auth,
            users = users.len(),
            "프록시 규칙 등록"
        );
        pipeline.add(ProxyMount::new(rule.clone(), gate, client.clone()));
    }

    if config.proxy_rules.is_empty() {
        pipeline.add(NoRules::new(&config.name));
    }

    pipeline
}

/// HTTP 리스너용 도메인 파이프라인.
///
/// ACME가 켜져 있으면 `webroot/.well-known`을 먼저 제공하고, 나머지는 모두
/// HTTPS로 리다이렉트합니다.
pub fn http_pipeline(domain: &str, domain_dir: &Path, https_port: u16, acme_enabled: bool) -> DomainPipeline {
    let mut pipeline = DomainPipeline::new(domain);
    if acme_enabled {
        let webroot = domain_dir.join("webroot");
        debug!(domain = %domain, webroot = %webroot.display(), "/.well-known 제공");
        pipeline.add(WellKnown::new(webroot));
    }
    pipeline.add(Redirector::new(https_port));
    pipeline
}
