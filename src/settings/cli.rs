use std::path::PathBuf;

use clap::Parser;

use super::logging::{parse_log_level, LogFormat, LogOutput};
use super::overrides::GlobalOverrides;
use super::{Result, Settings};

/// gateway-lite 명령행 인자.
///
/// 각 플래그는 환경 변수로도 줄 수 있으며, TOML 설정 파일보다 우선합니다.
#[derive(Debug, Default, Parser)]
#[command(name = "gateway-lite", version, about = "Multi-domain reverse proxy gateway")]
pub struct Cli {
    /// TOML 설정 파일 경로
    #[arg(long, env = "GATEWAY_CONFIG_FILE", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// 모든 도메인 디렉토리의 기본 경로
    #[arg(long, env = "GATEWAY_DOMAIN_DIR", value_name = "DIR")]
    pub domain: Option<PathBuf>,

    /// 기본 HTTPS 개인키 경로
    #[arg(long, env = "GATEWAY_KEY", value_name = "PATH")]
    pub key: Option<PathBuf>,

    /// 기본 HTTPS 인증서 경로
    #[arg(long, env = "GATEWAY_CERT", value_name = "PATH")]
    pub cert: Option<PathBuf>,

    /// HTTP 포트 (기본 80)
    #[arg(long, env = "GATEWAY_PORT", value_name = "PORT")]
    pub port: Option<u16>,

    /// HTTPS 포트 (기본 443)
    #[arg(long = "https-port", env = "GATEWAY_HTTPS_PORT", value_name = "PORT")]
    pub https_port: Option<u16>,

    /// Let's Encrypt 계정 이메일
    #[arg(long, env = "GATEWAY_EMAIL", value_name = "EMAIL")]
    pub email: Option<String>,

    /// 누락된 인증서를 발급하고 주기적으로 갱신
    #[arg(long = "lets-encrypt", env = "GATEWAY_LETS_ENCRYPT")]
    pub lets_encrypt: bool,

    /// Let's Encrypt 스테이징 서버 사용
    #[arg(long, env = "GATEWAY_STAGING")]
    pub staging: bool,

    /// 도메인별 proxy 오버라이드 (JSON)
    #[arg(long, env = "GATEWAY_PROXY", value_name = "SPEC")]
    pub proxy: Option<String>,

    /// 도메인별 redirect 오버라이드 (JSON)
    #[arg(long, env = "GATEWAY_REDIRECT", value_name = "SPEC")]
    pub redirect: Option<String>,

    /// 도메인별 user 오버라이드 (JSON)
    #[arg(long, env = "GATEWAY_USER", value_name = "SPEC")]
    pub user: Option<String>,

    /// 도메인별 PWA 오버라이드 (JSON)
    #[arg(long, env = "GATEWAY_PWA", value_name = "SPEC")]
    pub pwa: Option<String>,

    #[arg(long = "log-level", env = "GATEWAY_LOG_LEVEL", value_name = "LEVEL")]
    pub log_level: Option<String>,

    #[arg(long = "log-format", env = "GATEWAY_LOG_FORMAT", value_name = "FORMAT")]
    pub log_format: Option<LogFormat>,

    /// stdout 또는 로그 파일 경로
    #[arg(long = "log-output", env = "GATEWAY_LOG_OUTPUT", value_name = "OUTPUT")]
    pub log_output: Option<LogOutput>,
}

impl Cli {
    /// 명령행 값을 설정 위에 덮어씁니다.
    pub fn apply_to(&self, settings: &mut Settings) -> Result<()> {
        if let Some(domain) = &self.domain {
            settings.server.domain_dir = domain.clone();
        }
        if let Some(port) = self.port {
            settings.server.http_port = port;
        }

        // https-port, key, cert 중 하나라도 주어지면 HTTPS 활성화
        if self.https_port.is_some() || self.key.is_some() || self.cert.is_some() {
            settings.server.https_enabled = true;
        }
        if let Some(port) = self.https_port {
            settings.server.https_port = port;
        }
        if let Some(key) = &self.key {
            settings.tls.key_path = key.clone();
        }
        if let Some(cert) = &self.cert {
            settings.tls.cert_path = cert.clone();
        }

        if self.lets_encrypt {
            settings.acme.enabled = true;
        }
        if self.staging {
            settings.acme.staging = true;
        }
        if let Some(email) = &self.email {
            settings.acme.email = Some(email.clone());
        }

        self.apply_overrides(&mut settings.overrides)?;

        if let Some(level) = &self.log_level {
            settings.logging.level = parse_log_level(level)?;
        }
        if let Some(format) = &self.log_format {
            settings.logging.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            settings.logging.output = output.clone();
        }

        Ok(())
    }

    // 도메인 단위로 교체 (같은 도메인이면 명령행 값이 이김)
    fn apply_overrides(&self, overrides: &mut GlobalOverrides) -> Result<()> {
        if let Some(raw) = &self.proxy {
            let spec: std::collections::HashMap<_, _> = GlobalOverrides::parse_spec("proxy", raw)?;
            overrides.proxy.extend(spec);
        }
        if let Some(raw) = &self.redirect {
            let spec: std::collections::HashMap<_, _> = GlobalOverrides::parse_spec("redirect", raw)?;
            overrides.redirect.extend(spec);
        }
        if let Some(raw) = &self.user {
            let spec: std::collections::HashMap<_, _> = GlobalOverrides::parse_spec("user", raw)?;
            overrides.user.extend(spec);
        }
        if let Some(raw) = &self.pwa {
            let spec: std::collections::HashMap<_, _> = GlobalOverrides::parse_spec("pwa", raw)?;
            overrides.pwa.extend(spec);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["gateway-lite"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_https_enabled_by_any_tls_flag() {
        for args in [
            &["--https-port", "8443"][..],
            &["--key", "k.pem"][..],
            &["--cert", "c.pem"][..],
        ] {
            let mut settings = Settings::default();
            parse(args).apply_to(&mut settings).unwrap();
            assert!(settings.server.https_enabled, "{:?}", args);
        }

        let mut settings = Settings::default();
        parse(&["--port", "8080"]).apply_to(&mut settings).unwrap();
        assert!(!settings.server.https_enabled);
        assert_eq!(settings.server.http_port, 8080);
    }

    #[test]
    fn test_override_specs_are_parsed() {
        let mut settings = Settings::default();
        parse(&[
            "--proxy",
            r#"{"example.com": [["/", "localhost:8000"]]}"#,
            "--user",
            r#"{"example.com": {"alice": "secret"}}"#,
        ])
        .apply_to(&mut settings)
        .unwrap();

        assert_eq!(settings.overrides.proxy["example.com"].len(), 1);
        assert!(settings.overrides.user["example.com"].contains_key("alice"));
    }

    #[test]
    fn test_bad_override_spec_is_error() {
        let mut settings = Settings::default();
        let result = parse(&["--redirect", "{nope"]).apply_to(&mut settings);
        assert!(result.is_err());
    }

    #[test]
    fn test_logging_flags() {
        let mut settings = Settings::default();
        parse(&["--log-level", "debug", "--log-format", "json", "--log-output", "gw.log"])
            .apply_to(&mut settings)
            .unwrap();
        assert_eq!(settings.logging.level, Level::DEBUG);
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert_eq!(settings.logging.output, LogOutput::File("gw.log".to_string()));
    }
}
