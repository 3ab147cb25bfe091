use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Map, Value};

use super::SettingsError;

/// 도메인 디렉토리의 파일 위에 덮어쓰는 전역 오버라이드.
///
/// 모든 맵은 도메인 이름을 키로 가지며, 값의 형식은 도메인 디렉토리의
/// 같은 이름 파일과 동일합니다.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GlobalOverrides {
    /// 도메인 → proxy.json 항목 목록 (파일 규칙 뒤에 추가)
    pub proxy: HashMap<String, Vec<Value>>,
    /// 도메인 → 경로 → 대상 경로
    pub redirect: HashMap<String, HashMap<String, Value>>,
    /// 도메인 → 사용자 → 자격 증명
    pub user: HashMap<String, HashMap<String, Value>>,
    /// 도메인 → PWA 매니페스트 필드
    pub pwa: HashMap<String, Map<String, Value>>,
}

impl GlobalOverrides {
    /// `--proxy` 같은 플래그에 전달된 JSON 문서를 해석합니다.
    pub fn parse_spec<T>(name: &str, raw: &str) -> Result<T, SettingsError>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_str(raw).map_err(|source| SettingsError::SpecError {
            name: name.to_string(),
            source,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.proxy.is_empty() && self.redirect.is_empty() && self.user.is_empty() && self.pwa.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_proxy_spec() {
        let proxy: HashMap<String, Vec<Value>> = GlobalOverrides::parse_spec(
            "proxy",
            r#"{"example.com": [["/", "localhost:8080", {"cascade": true}]]}"#,
        )
        .unwrap();
        assert_eq!(proxy["example.com"][0], json!(["/", "localhost:8080", {"cascade": true}]));
    }

    #[test]
    fn test_parse_spec_error_names_flag() {
        let err = GlobalOverrides::parse_spec::<HashMap<String, Vec<Value>>>("redirect", "[1")
            .unwrap_err();
        assert!(err.to_string().contains("redirect"));
    }

    #[test]
    fn test_overrides_from_toml_section() {
        let overrides: GlobalOverrides = toml::from_str(
            r#"
            [redirect."example.com"]
            "/old" = "/new"

            [user."example.com"]
            alice = "secret"
            "#,
        )
        .unwrap();
        assert!(!overrides.is_empty());
        assert_eq!(overrides.redirect["example.com"]["/old"], json!("/new"));
        assert!(overrides.proxy.is_empty());
    }
}
