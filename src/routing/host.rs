use hyper::header;

use super::error::RoutingError;

/// Host 헤더에서 얻은 호스트 정보입니다.
///
/// # 필드
///
/// * `name` - 소문자로 정규화된 호스트 이름 (예: "example.com")
/// * `port` - 선택적 포트 번호
#[derive(Clone, Debug, PartialEq)]
pub struct HostInfo {
    pub name: String,
    pub port: Option<u16>,
}

impl HostInfo {
    /// 호스트 헤더 값에서 HostInfo를 생성합니다.
    ///
    /// # 예제
    ///
    /// ```
    /// use gateway_lite::routing::HostInfo;
    ///
    /// let host_info = HostInfo::from_header_value("Example.COM:8080").unwrap();
    /// assert_eq!(host_info.name, "example.com");
    /// assert_eq!(host_info.port, Some(8080));
    /// ```
    pub fn from_header_value(value: &str) -> Result<Self, RoutingError> {
        let invalid = |reason: &str| RoutingError::InvalidHost {
            host: value.to_string(),
            reason: reason.to_string(),
        };

        let value = value.trim();
        if value.is_empty() {
            return Err(invalid("Invalid format"));
        }

        // IPv6 리터럴: [::1]:8080
        let (name, port) = if let Some(rest) = value.strip_prefix('[') {
            let (addr, after) = rest.split_once(']').ok_or_else(|| invalid("Unclosed bracket"))?;
            let port = match after {
                "" => None,
                p => Some(p.strip_prefix(':').ok_or_else(|| invalid("Invalid format"))?),
            };
            (format!("[{}]", addr), port)
        } else {
            match value.split_once(':') {
                None => (value.to_string(), None),
                Some((name, port)) => (name.to_string(), Some(port)),
            }
        };

        if name.is_empty() || name == "[]" {
            return Err(invalid("Invalid format"));
        }

        let port = match port {
            None => None,
            Some(raw) => {
                let port = raw.parse::<u16>().map_err(|_| RoutingError::InvalidPort {
                    port: raw.to_string(),
                    reason: "Invalid format".to_string(),
                })?;
                if port == 0 {
                    return Err(RoutingError::InvalidPort {
                        port: raw.to_string(),
                        reason: "Port must be greater than 0".to_string(),
                    });
                }
                Some(port)
            }
        };

        Ok(HostInfo {
            name: name.to_ascii_lowercase(),
            port,
        })
    }

    /// 요청의 Host 헤더를 해석합니다.
    pub fn from_request<B>(req: &hyper::Request<B>) -> Result<Self, RoutingError> {
        // HTTP/1.1 요청은 Host 헤더, 절대 URI 요청은 authority를 사용
        if let Some(value) = req.headers().get(header::HOST) {
            let host = value.to_str().map_err(|e| RoutingError::HeaderParseError {
                header_name: "Host".to_string(),
                error: e.to_string(),
            })?;
            return Self::from_header_value(host);
        }
        match req.uri().authority() {
            Some(authority) => Self::from_header_value(authority.as_str()),
            None => Err(RoutingError::MissingHost),
        }
    }

    /// 서브도메인이 없는 apex 도메인인지 (라벨이 정확히 두 개)
    pub fn is_bare(&self) -> bool {
        self.name.split('.').count() == 2
    }
}
