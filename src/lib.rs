//! Gateway Lite는 여러 도메인을 한 프로세스에서 서비스하는 경량 리버스 프록시 게이트웨이입니다.
//!
//! # 주요 기능
//!
//! - Host 헤더 기반 가상 호스트 라우팅
//! - 도메인별 리다이렉트, Basic 인증, 경로 기반 프록시 (cascade, WebSocket)
//! - SNI로 도메인별 인증서 선택
//! - certbot을 이용한 인증서 발급과 주기적 갱신
//!
//! # 도메인 디렉토리
//!
//! ```text
//! domain/
//!   www.example.com/
//!     proxy.json       [["/api", "backend:9000", {"auth": true}], ["/", "web:8000"]]
//!     redirects.json   {"/old": "/new"}
//!     users.json       {"alice": "secret"}
//!     sni/             cert.pem, key.pem
//!     webroot/         ACME 인증용 정적 파일
//! ```
//!
//! # 예제
//!
//! ```
//! use gateway_lite::routing::HostInfo;
//!
//! let host = HostInfo::from_header_value("Example.com:8443").unwrap();
//! assert_eq!(host.name, "example.com");
//! assert_eq!(host.port, Some(8443));
//! assert!(host.is_bare());
//! ```

pub mod acme;
pub mod domain;
pub mod logging;
pub mod middleware;
pub mod proxy;
pub mod routing;
pub mod server;
pub mod settings;
pub mod tls;
