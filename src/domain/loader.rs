use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};

use super::config::{build_user_table, DomainConfig, ProxyRule};
use super::error::ConfigError;
use super::LOCALHOST;
use crate::settings::GlobalOverrides;

pub const REDIRECTS_FILE: &str = "redirects.json";
pub const PROXY_FILE: &str = "proxy.json";
pub const USERS_FILE: &str = "users.json";
pub const PWA_FILE: &str = "pwa.json";

/// 기본 디렉토리 바로 아래의 하위 디렉토리 이름을 도메인 목록으로 반환합니다.
/// 결과는 이름순으로 정렬됩니다.
pub fn discover_domains(base_dir: &Path) -> Result<Vec<String>, ConfigError> {
    let to_error = |source| ConfigError::DomainDir {
        path: base_dir.to_path_buf(),
        source,
    };

    let mut domains = Vec::new();
    for entry in fs::read_dir(base_dir).map_err(to_error)? {
        let entry = entry.map_err(to_error)?;
        if entry.path().is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                domains.push(name.to_string());
            }
        }
    }
    domains.sort();

    info!(dir = %base_dir.display(), count = domains.len(), "도메인 디렉토리 탐색 완료");
    Ok(domains)
}

/// 도메인별 설정 파일과 전역 오버라이드를 병합해 `DomainConfig`를 만듭니다.
pub struct DomainLoader<'a> {
    base_dir: &'a Path,
    overrides: &'a GlobalOverrides,
}

impl<'a> DomainLoader<'a> {
    pub fn new(base_dir: &'a Path, overrides: &'a GlobalOverrides) -> Self {
        Self { base_dir, overrides }
    }

    pub fn domain_path(&self, domain: &str) -> PathBuf {
        self.base_dir.join(domain)
    }

    /// localhost는 HTTPS로 제공하지 않으므로 설정 파일을 읽지 않습니다.
    pub fn load_all(&self, domains: &[String]) -> Result<Vec<DomainConfig>, ConfigError> {
        domains
            .iter()
            .filter(|d| {
                let skip = d.as_str() == LOCALHOST;
                if skip {
                    debug!(domain = %d, "도메인 설정 건너뜀");
                }
                !skip
            })
            .map(|d| self.load(d))
            .collect()
    }

    pub fn load(&self, domain: &str) -> Result<DomainConfig, ConfigError> {
        let dir = self.domain_path(domain);
        let mut config = DomainConfig::new(domain);

        // 리다이렉트: 파일 값 위에 오버라이드를 덮어씀
        let mut redirects = read_object(&dir.join(REDIRECTS_FILE));
        if let Some(extra) = self.overrides.redirect.get(domain) {
            redirects.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        for (path, target) in redirects {
            if !path.starts_with('/') {
                return Err(ConfigError::InvalidRedirectPath {
                    domain: domain.to_string(),
                    path,
                });
            }
            match target {
                Value::String(target) => {
                    debug!(domain = %domain, from = %path, to = %target, "리다이렉트 등록");
                    config.redirects.insert(path, target);
                }
                other => {
                    warn!(domain = %domain, path = %path, value = %other, "리다이렉트 대상이 문자열이 아니므로 무시합니다");
                }
            }
        }

        // 프록시 규칙: 파일 규칙 뒤에 오버라이드 규칙을 이어 붙임
        let mut raw_rules = read_array(&dir.join(PROXY_FILE));
        if let Some(extra) = self.overrides.proxy.get(domain) {
            raw_rules.extend(extra.iter().cloned());
        }
        config.proxy_rules = raw_rules
            .iter()
            .enumerate()
            .map(|(index, raw)| ProxyRule::from_value(domain, index, raw))
            .collect::<Result<_, _>>()?;

        let mut users = read_object(&dir.join(USERS_FILE));
        if let Some(extra) = self.overrides.user.get(domain) {
            users.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        config.users = build_user_table(domain, &users);

        let mut pwa: serde_json::Map<String, Value> =
            read_object(&dir.join(PWA_FILE)).into_iter().collect();
        if let Some(extra) = self.overrides.pwa.get(domain) {
            pwa.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        config.pwa = (!pwa.is_empty()).then_some(pwa);

        info!(
            domain = %domain,
            redirects = config.redirects.len(),
            proxy_rules = config.proxy_rules.len(),
            users = config.users.len(),
            pwa = config.pwa.is_some(),
            "도메인 설정 로드 완료"
        );
        Ok(config)
    }
}

/// 설정 파일을 읽습니다. 없거나 해석할 수 없으면 `None`.
fn read_spec(path: &Path) -> Option<Value> {
    if !path.exists() {
        return None;
    }
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "설정 파일 읽기 실패");
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "설정 파일 파싱 실패");
            None
        }
    }
}

fn read_object(path: &Path) -> HashMap<String, Value> {
    match read_spec(path) {
        Some(Value::Object(map)) => map.into_iter().collect(),
        Some(Value::Null) | None => HashMap::new(),
        Some(_) => {
            warn!(path = %path.display(), "객체 형식이 아니므로 무시합니다");
            HashMap::new()
        }
    }
}

fn read_array(path: &Path) -> Vec<Value> {
    match read_spec(path) {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => Vec::new(),
        Some(_) => {
            warn!(path = %path.display(), "배열 형식이 아니므로 무시합니다");
            Vec::new()
        }
    }
}
