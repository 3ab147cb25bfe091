use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;
use url::Url;

use super::error::ConfigError;

/// 평문 비밀번호로 간주되는 최대 길이입니다. 이보다 길면 해시로 취급합니다.
pub const PLAINTEXT_MAX_LEN: usize = 64;

/// 별도 지정이 없을 때의 요청 본문 크기 제한 (500mb)
pub const DEFAULT_BODY_LIMIT: u64 = 500 * 1024 * 1024;

/// 하나의 도메인 디렉토리에서 만들어진 설정입니다.
#[derive(Debug, Clone, Default)]
pub struct DomainConfig {
    pub name: String,
    /// 정확한 경로 → 대체 경로
    pub redirects: HashMap<String, String>,
    /// 설정 순서가 곧 매칭 순서입니다.
    pub proxy_rules: Vec<ProxyRule>,
    /// 소문자 사용자 이름 → 자격증명
    pub users: HashMap<String, Credential>,
    /// PWA 설정은 해석하지 않고 그대로 보관합니다.
    pub pwa: Option<serde_json::Map<String, Value>>,
}

impl DomainConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// 도메인 안의 프록시 라우팅 규칙
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyRule {
    pub request_path_prefix: String,
    pub downstream: DownstreamTarget,
    pub options: ProxyOptions,
}

impl ProxyRule {
    /// `proxy.json`의 `[mount, downstream, options?]` 항목을 검증하며 변환합니다.
    pub fn from_value(domain: &str, index: usize, value: &Value) -> Result<Self, ConfigError> {
        let malformed = |reason: String| ConfigError::MalformedProxyRule {
            domain: domain.to_string(),
            index,
            reason,
        };

        let items = value
            .as_array()
            .ok_or_else(|| malformed(format!("배열이 아님: {}", value)))?;
        if items.len() > 3 {
            return Err(malformed(format!("항목이 너무 많음 ({}개)", items.len())));
        }
        if items.len() < 2 {
            return Err(malformed("mount와 downstream이 필요합니다".to_string()));
        }

        let mount = items[0]
            .as_str()
            .ok_or_else(|| malformed("mount 경로는 문자열이어야 합니다".to_string()))?;
        if !mount.starts_with('/') {
            return Err(malformed(format!("mount 경로 '{}'는 /로 시작해야 합니다", mount)));
        }

        let target = items[1]
            .as_str()
            .ok_or_else(|| malformed("downstream은 문자열이어야 합니다".to_string()))?;
        let downstream = DownstreamTarget::parse(target).map_err(|reason| {
            ConfigError::InvalidDownstream {
                domain: domain.to_string(),
                index,
                target: target.to_string(),
                reason,
            }
        })?;

        let options = match items.get(2) {
            None | Some(Value::Null) => ProxyOptions::default(),
            Some(raw) => ProxyOptions::deserialize(raw)
                .map_err(|e| malformed(format!("옵션 오류: {}", e)))?,
        };
        options
            .validate()
            .map_err(|reason| ConfigError::ConflictingOptions {
                domain: domain.to_string(),
                index,
                reason: reason.to_string(),
            })?;

        Ok(Self {
            request_path_prefix: mount.to_string(),
            downstream,
            options,
        })
    }

    /// 설정되지 않은 경우 기본값(500mb)을 적용한 본문 제한
    pub fn body_limit(&self) -> u64 {
        self.options
            .limit
            .map(|l| l.as_u64())
            .unwrap_or(DEFAULT_BODY_LIMIT)
    }
}

/// `host[/path...]` 형식의 다운스트림 대상
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownstreamTarget {
    /// 첫 번째 `/` 앞까지의 authority (예: `backend:9000`)
    pub host: String,
    /// 나머지 경로. 항상 `/`로 시작합니다.
    pub path_prefix: String,
}

impl DownstreamTarget {
    pub fn parse(spec: &str) -> Result<Self, String> {
        let (host, rest) = match spec.split_once('/') {
            Some((host, rest)) => (host, rest),
            None => (spec, ""),
        };
        if host.is_empty() {
            return Err("호스트가 비어 있습니다".to_string());
        }

        let url = Url::parse(&format!("http://{}/", host)).map_err(|e| e.to_string())?;
        if url.host_str().is_none() || !url.username().is_empty() {
            return Err("올바른 authority가 아닙니다".to_string());
        }

        Ok(Self {
            host: host.to_string(),
            path_prefix: format!("/{}", rest),
        })
    }

    /// 포트가 생략된 경우 80을 붙인 연결 주소
    pub fn authority(&self) -> String {
        match Url::parse(&format!("http://{}/", self.host)) {
            Ok(url) if url.port().is_none() => format!("{}:80", self.host),
            _ => self.host.clone(),
        }
    }
}

impl fmt::Display for DownstreamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.host, self.path_prefix)
    }
}

/// 프록시 규칙 옵션. 알 수 없는 키는 역직렬화 단계에서 거부됩니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProxyOptions {
    #[serde(default)]
    pub auth: bool,
    #[serde(default)]
    pub limit: Option<ByteSize>,
    #[serde(default)]
    pub cascade: bool,
    #[serde(default, rename = "ws", alias = "websocket")]
    pub websocket: bool,
}

impl ProxyOptions {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.websocket && self.cascade {
            return Err("Cannot use 'cascade' with 'ws=true'");
        }
        if self.websocket && self.limit.is_some() {
            return Err("Cannot use 'limit' with 'ws=true'");
        }
        Ok(())
    }
}

/// 바이트 크기. 정수 또는 `"500mb"` 같은 단위 문자열로 표현합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteSize(u64);

impl ByteSize {
    pub const fn new(bytes: u64) -> Self {
        Self(bytes)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl FromStr for ByteSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let split = lower
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(lower.len());
        let (number, unit) = lower.split_at(split);

        let value: f64 = number
            .parse()
            .map_err(|_| format!("잘못된 크기 값: {}", s))?;
        let multiplier: u64 = match unit.trim() {
            "" | "b" => 1,
            "kb" => 1 << 10,
            "mb" => 1 << 20,
            "gb" => 1 << 30,
            "tb" => 1 << 40,
            other => return Err(format!("알 수 없는 단위: {}", other)),
        };

        Ok(Self((value * multiplier as f64).floor() as u64))
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bytes(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Bytes(n) => Ok(ByteSize(n)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// 사용자 자격증명.
///
/// 길이로만 구분합니다. 64자 이하이면 평문, 초과하면 base64로 인코딩된
/// 저장 해시(pbkdf2 JSON 또는 bcrypt)입니다. 65자 이상의 평문 비밀번호는 해시로 잘못 분류됩니다.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Plain(String),
    Hashed(Vec<u8>),
}

impl Credential {
    pub fn classify(raw: &str) -> Result<Self, base64::DecodeError> {
        if raw.len() <= PLAINTEXT_MAX_LEN {
            Ok(Credential::Plain(raw.to_string()))
        } else {
            BASE64.decode(raw.trim()).map(Credential::Hashed)
        }
    }
}

// 비밀번호가 로그에 남지 않도록 직접 구현
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Plain(_) => f.write_str("Credential::Plain(..)"),
            Credential::Hashed(_) => f.write_str("Credential::Hashed(..)"),
        }
    }
}

/// 사용자 맵을 소문자 키와 분류된 자격증명으로 변환합니다.
/// 해석할 수 없는 항목은 경고 후 제외합니다.
pub fn build_user_table(domain: &str, raw: &HashMap<String, Value>) -> HashMap<String, Credential> {
    let mut users = HashMap::with_capacity(raw.len());
    for (name, value) in raw {
        let Some(secret) = value.as_str() else {
            warn!(domain = %domain, user = %name, "자격증명이 문자열이 아니므로 무시합니다");
            continue;
        };
        match Credential::classify(secret) {
            Ok(credential) => {
                users.insert(name.to_lowercase(), credential);
            }
            Err(e) => {
                warn!(domain = %domain, user = %name, error = %e, "해시 자격증명 디코딩 실패, 사용자를 무시합니다");
            }
        }
    }
    users
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_downstream_target_split() {
        let target = DownstreamTarget::parse("backend:9000").unwrap();
        assert_eq!(target.host, "backend:9000");
        assert_eq!(target.path_prefix, "/");

        let target = DownstreamTarget::parse("backend:9000/api/v1").unwrap();
        assert_eq!(target.host, "backend:9000");
        assert_eq!(target.path_prefix, "/api/v1");
        assert_eq!(target.to_string(), "backend:9000/api/v1");
    }

    #[test]
    fn test_downstream_target_rejects_empty_host() {
        assert!(DownstreamTarget::parse("/api").is_err());
        assert!(DownstreamTarget::parse("").is_err());
    }

    #[test]
    fn test_downstream_authority_default_port() {
        assert_eq!(DownstreamTarget::parse("backend").unwrap().authority(), "backend:80");
        assert_eq!(DownstreamTarget::parse("backend:9000").unwrap().authority(), "backend:9000");
    }

    #[test]
    fn test_byte_size_units() {
        assert_eq!("500mb".parse::<ByteSize>().unwrap().as_u64(), 500 * 1024 * 1024);
        assert_eq!("1KB".parse::<ByteSize>().unwrap().as_u64(), 1024);
        assert_eq!("1.5kb".parse::<ByteSize>().unwrap().as_u64(), 1536);
        assert_eq!("42".parse::<ByteSize>().unwrap().as_u64(), 42);
        assert!("ten".parse::<ByteSize>().is_err());
        assert!("10xb".parse::<ByteSize>().is_err());
    }

    #[test]
    fn test_proxy_rule_defaults() {
        let rule = ProxyRule::from_value("example.com", 0, &json!(["/api", "backend:9000"])).unwrap();
        assert_eq!(rule.request_path_prefix, "/api");
        assert_eq!(rule.options, ProxyOptions::default());
        assert_eq!(rule.body_limit(), DEFAULT_BODY_LIMIT);
    }

    #[test]
    fn test_proxy_rule_options() {
        let rule = ProxyRule::from_value(
            "example.com",
            0,
            &json!(["/api", "backend:9000/v1", {"auth": true, "limit": "1mb", "cascade": true}]),
        )
        .unwrap();
        assert!(rule.options.auth);
        assert!(rule.options.cascade);
        assert_eq!(rule.body_limit(), 1024 * 1024);
        assert_eq!(rule.downstream.path_prefix, "/v1");
    }

    #[test]
    fn test_proxy_rule_rejects_unknown_option() {
        let err = ProxyRule::from_value("example.com", 3, &json!(["/api", "b:1", {"timeout": 5}]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MalformedProxyRule { index: 3, .. }));
    }

    #[test]
    fn test_proxy_rule_rejects_websocket_conflicts() {
        for options in [
            json!({"ws": true, "cascade": true}),
            json!({"ws": true, "limit": "1mb"}),
            json!({"websocket": true, "limit": 10}),
        ] {
            let err = ProxyRule::from_value("example.com", 0, &json!(["/ws", "b:1", options]))
                .unwrap_err();
            assert!(matches!(err, ConfigError::ConflictingOptions { .. }));
        }
    }

    #[test]
    fn test_proxy_rule_rejects_bad_shape() {
        assert!(ProxyRule::from_value("d", 0, &json!(["/a", "b:1", {}, "extra"])).is_err());
        assert!(ProxyRule::from_value("d", 0, &json!(["/a"])).is_err());
        assert!(ProxyRule::from_value("d", 0, &json!({"path": "/a"})).is_err());
    }

    #[test]
    fn test_credential_classification_by_length() {
        assert!(matches!(Credential::classify("secret"), Ok(Credential::Plain(_))));

        let hash = bcrypt::hash("secret", 4).unwrap();
        let encoded = BASE64.encode(&hash);
        assert!(encoded.len() > PLAINTEXT_MAX_LEN);
        match Credential::classify(&encoded).unwrap() {
            Credential::Hashed(bytes) => assert_eq!(bytes, hash.as_bytes()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_user_table_lowercases_names() {
        let mut raw = HashMap::new();
        raw.insert("Alice".to_string(), json!("secret"));
        raw.insert("bob".to_string(), json!(42));

        let users = build_user_table("example.com", &raw);
        assert_eq!(users.len(), 1);
        assert_eq!(users.get("alice"), Some(&Credential::Plain("secret".to_string())));
    }
}
